//! Drives rrdtool through create, update and graph against a temporary database.

use super::{
    Error, TimeTemp, DS_NAME, GRAPH_BACK, GRAPH_HEIGHT, GRAPH_LINE, GRAPH_TITLE,
    GRAPH_VERTICAL_LABEL, GRAPH_WIDTH, HEARTBEAT, RRA_FUNCTIONS, RRA_ROWS, RRA_XFF, STEP,
    TEMP_MAX, TEMP_MIN,
};
use log::{debug, error, info};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

pub const DEFAULT_PROGRAM: &str = "rrdtool";
pub const DEFAULT_RRD: &str = "tmp.rrd";

/// One external call, built fresh for every invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalCommand {
    pub program: String,
    pub args: Vec<String>,
    pub success_code: i32,
}

impl ExternalCommand {
    pub fn new(program: &str, args: Vec<String>) -> ExternalCommand {
        ExternalCommand {
            program: program.to_string(),
            args,
            success_code: 0,
        }
    }

    /// program and arguments joined by spaces, as reported on failure
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for a in self.args.iter() {
            line.push(' ');
            line.push_str(a);
        }
        line
    }

    /// None when the process was killed without an exit code
    pub fn succeeded(&self, code: Option<i32>) -> bool {
        code == Some(self.success_code)
    }
}

/// Runs an external command to completion and returns its exit code.
pub trait CommandRunner {
    fn status(&mut self, cmd: &ExternalCommand) -> std::io::Result<Option<i32>>;
}

/// Spawns the real process and blocks until it exits, no timeout.
#[derive(Debug, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn status(&mut self, cmd: &ExternalCommand) -> std::io::Result<Option<i32>> {
        let status = Command::new(&cmd.program).args(&cmd.args).status()?;
        Ok(status.code())
    }
}

/// Where a run got to; a failure leaves the database as it was at that point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Start,
    Created,
    Loaded,
    Graphed,
    CleanedUp,
}

fn path_arg(p: &Path) -> String {
    p.to_string_lossy().into_owned()
}

/// keeps a decimal point on integral values, 22 is written as 22.0
pub fn fmt_temp(w: f64) -> String {
    format!("{:?}", w)
}

pub struct RrdGraph<R: CommandRunner> {
    runner: R,
    program: String,
    rrd: PathBuf,
    phase: Phase,
}

impl<R: CommandRunner> RrdGraph<R> {
    pub fn new(runner: R, program: &str, rrd: &Path) -> RrdGraph<R> {
        RrdGraph {
            runner,
            program: program.to_string(),
            rrd: rrd.to_path_buf(),
            phase: Phase::Start,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn rrd(&self) -> &Path {
        &self.rrd
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn create_command(&self, start: i64) -> ExternalCommand {
        let mut args = vec![
            "create".to_string(),
            path_arg(&self.rrd),
            "--step".to_string(),
            STEP.to_string(),
            "--start".to_string(),
            start.to_string(),
            format!("DS:{}:GAUGE:{}:{}:{}", DS_NAME, HEARTBEAT, TEMP_MIN, TEMP_MAX),
        ];
        for cf in RRA_FUNCTIONS.iter() {
            args.push(format!("RRA:{}:{}:1:{}", cf, RRA_XFF, RRA_ROWS));
        }
        ExternalCommand::new(&self.program, args)
    }

    pub fn update_command(&self, t: i64, w: f64) -> ExternalCommand {
        let args = vec![
            "update".to_string(),
            path_arg(&self.rrd),
            "--".to_string(),
            format!("{}:{}", t, fmt_temp(w)),
        ];
        ExternalCommand::new(&self.program, args)
    }

    pub fn graph_command(&self, image: &Path, start: i64, end: i64) -> ExternalCommand {
        let args = vec![
            "graph".to_string(),
            path_arg(image),
            "-s".to_string(),
            start.to_string(),
            "-e".to_string(),
            end.to_string(),
            format!("--height={}", GRAPH_HEIGHT),
            format!("--width={}", GRAPH_WIDTH),
            format!("--color=BACK{}", GRAPH_BACK),
            "--vertical-label".to_string(),
            GRAPH_VERTICAL_LABEL.to_string(),
            "--title".to_string(),
            GRAPH_TITLE.to_string(),
            format!("DEF:{}={}:{}:AVERAGE", DS_NAME, path_arg(&self.rrd), DS_NAME),
            format!("LINE2:{}{}", DS_NAME, GRAPH_LINE),
        ];
        ExternalCommand::new(&self.program, args)
    }

    fn call(&mut self, cmd: &ExternalCommand) -> Result<(), Error> {
        let command = cmd.command_line();
        debug!("calling: {}", command);
        let code = self
            .runner
            .status(cmd)
            .map_err(|source| Error::Spawn {
                command: command.clone(),
                source,
            })?;
        if cmd.succeeded(code) {
            Ok(())
        } else {
            error!("{} exited with {:?}", cmd.program, code);
            Err(Error::CommandFailed { command, code })
        }
    }

    /// creates the database one step before the first sample
    pub fn create(&mut self, tt: &TimeTemp) -> Result<(), Error> {
        let first = tt.first_time().ok_or(Error::NoSamples)?;
        let start = first
            .checked_sub(1)
            .ok_or(Error::StartOutOfRange { first })?;
        let cmd = self.create_command(start);
        info!("creating rrd: {}", cmd.command_line());
        self.call(&cmd)?;
        self.phase = Phase::Created;
        Ok(())
    }

    /// one update per sample, in log order, with a progress line on stdout
    pub fn load(&mut self, tt: &TimeTemp) -> Result<(), Error> {
        let n = tt.len();
        info!("loading {} samples into {}", n, self.rrd.display());
        let stdout = std::io::stdout();
        for (i, (t, w)) in tt.samples().enumerate() {
            {
                let mut out = stdout.lock();
                // progress is best effort
                if let Err(e) = write!(out, "{} {}\r", i, n).and_then(|_| out.flush()) {
                    debug!("could not write progress: {}", e);
                }
            }
            let cmd = self.update_command(t, w);
            self.call(&cmd)?;
        }
        println!();
        self.phase = Phase::Loaded;
        Ok(())
    }

    pub fn graph(&mut self, tt: &TimeTemp, image: &Path) -> Result<(), Error> {
        let (first, last) = match (tt.first_time(), tt.last_time()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(Error::NoSamples),
        };
        let cmd = self.graph_command(image, first, last);
        info!("plotting rrd: {}", cmd.command_line());
        self.call(&cmd)?;
        self.phase = Phase::Graphed;
        Ok(())
    }

    pub fn cleanup(&mut self) -> Result<(), Error> {
        std::fs::remove_file(&self.rrd).map_err(|source| Error::Cleanup {
            path: self.rrd.clone(),
            source,
        })?;
        debug!("removed {}", self.rrd.display());
        self.phase = Phase::CleanedUp;
        Ok(())
    }

    /// Start → Created → Loaded → Graphed → CleanedUp, the first failure stops the run.
    /// The database is removed only when every phase succeeded.
    pub fn run(&mut self, tt: &TimeTemp, image: &Path) -> Result<(), Error> {
        if tt.is_empty() {
            return Err(Error::NoSamples);
        }
        self.create(tt)?;
        self.load(tt)?;
        self.graph(tt, image)?;
        self.cleanup()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// records every call, fails the call with index `fail_at`
    #[derive(Default)]
    struct Recorder {
        calls: Vec<ExternalCommand>,
        fail_at: Option<usize>,
    }

    impl CommandRunner for Recorder {
        fn status(&mut self, cmd: &ExternalCommand) -> std::io::Result<Option<i32>> {
            self.calls.push(cmd.clone());
            if self.fail_at == Some(self.calls.len() - 1) {
                Ok(Some(1))
            } else {
                Ok(Some(0))
            }
        }
    }

    struct Unspawnable;

    impl CommandRunner for Unspawnable {
        fn status(&mut self, _cmd: &ExternalCommand) -> std::io::Result<Option<i32>> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"))
        }
    }

    fn two_samples() -> TimeTemp {
        TimeTemp {
            time: vec![60, 61],
            temp: vec![21.5, 22.],
        }
    }

    fn graph_with(fail_at: Option<usize>) -> RrdGraph<Recorder> {
        let runner = Recorder {
            calls: Vec::new(),
            fail_at,
        };
        RrdGraph::new(runner, DEFAULT_PROGRAM, Path::new("tmp.rrd"))
    }

    #[test]
    fn create_arguments() {
        let g = graph_with(None);
        assert_eq!(
            g.create_command(1000).command_line(),
            "rrdtool create tmp.rrd --step 60 --start 1000 DS:temp:GAUGE:120:-20:50 \
             RRA:AVERAGE:0.5:1:1440 RRA:MIN:0.5:1:1440 RRA:MAX:0.5:1:1440"
        );
    }

    #[test]
    fn graph_arguments() {
        let g = graph_with(None);
        let cmd = g.graph_command(Path::new("out.png"), 60, 61);
        assert_eq!(
            cmd.args,
            vec![
                "graph",
                "out.png",
                "-s",
                "60",
                "-e",
                "61",
                "--height=200",
                "--width=750",
                "--color=BACK#FFFFFF",
                "--vertical-label",
                "°C",
                "--title",
                "temperature",
                "DEF:temp=tmp.rrd:temp:AVERAGE",
                "LINE2:temp#3366CC",
            ]
        );
    }

    #[test]
    fn update_entry_keeps_the_decimal_point() {
        let g = graph_with(None);
        assert_eq!(g.update_command(61, 22.).args, vec!["update", "tmp.rrd", "--", "61:22.0"]);
        assert_eq!(g.update_command(60, -3.25).args[3], "60:-3.25");
    }

    #[test]
    fn phases_in_order() {
        let tt = two_samples();
        let mut g = graph_with(None);
        g.create(&tt).unwrap();
        assert_eq!(g.phase(), Phase::Created);
        g.load(&tt).unwrap();
        g.graph(&tt, Path::new("out.png")).unwrap();
        assert_eq!(g.phase(), Phase::Graphed);

        let calls = &g.runner().calls;
        assert_eq!(calls.len(), 4);
        assert_eq!(calls[0].args[5], "59");
        assert_eq!(calls[1].args[3], "60:21.5");
        assert_eq!(calls[2].args[3], "61:22.0");
        assert_eq!(&calls[3].args[2..6], &["-s", "60", "-e", "61"]);
    }

    #[test]
    fn create_failure_stops_everything() {
        let mut g = graph_with(Some(0));
        let err = g.run(&two_samples(), Path::new("out.png")).unwrap_err();
        assert!(matches!(err, Error::CommandFailed { code: Some(1), .. }));
        assert!(err.to_string().starts_with("ERROR calling: rrdtool create tmp.rrd"));
        assert_eq!(g.runner().calls.len(), 1);
        assert_eq!(g.phase(), Phase::Start);
    }

    #[test]
    fn update_failure_skips_the_graph() {
        let mut g = graph_with(Some(1));
        let err = g.run(&two_samples(), Path::new("out.png")).unwrap_err();
        assert_eq!(err.to_string(), "ERROR calling: rrdtool update tmp.rrd -- 60:21.5");
        assert_eq!(g.runner().calls.len(), 2);
        assert_eq!(g.phase(), Phase::Created);
    }

    #[test]
    fn graph_failure_names_the_graph_command() {
        let mut g = graph_with(Some(3));
        let err = g.run(&two_samples(), Path::new("out.png")).unwrap_err();
        assert!(err.to_string().starts_with("ERROR calling: rrdtool graph out.png"));
        assert_eq!(g.phase(), Phase::Loaded);
    }

    #[test]
    fn killed_process_is_a_failure() {
        let cmd = ExternalCommand::new("rrdtool", vec![]);
        assert!(cmd.succeeded(Some(0)));
        assert!(!cmd.succeeded(Some(2)));
        assert!(!cmd.succeeded(None));
    }

    #[test]
    fn missing_program_is_reported() {
        let mut g = RrdGraph::new(Unspawnable, "rrdtool-missing", Path::new("tmp.rrd"));
        match g.run(&two_samples(), Path::new("out.png")) {
            Err(Error::Spawn { command, .. }) => assert!(command.starts_with("rrdtool-missing create")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn first_timestamp_at_the_bottom_of_the_range() {
        let tt = TimeTemp {
            time: vec![i64::MIN, 0],
            temp: vec![21.5, 22.],
        };
        let mut g = graph_with(None);
        match g.run(&tt, Path::new("out.png")) {
            Err(Error::StartOutOfRange { first }) => assert_eq!(first, i64::MIN),
            other => panic!("unexpected {:?}", other),
        }
        assert!(g.runner().calls.is_empty());
        assert_eq!(g.phase(), Phase::Start);
    }

    #[test]
    fn signed_hex_timestamps() {
        let (t, w) = crate::parse_line("A B 21.5 -8000000000000000", 1).unwrap();
        assert_eq!(t, i64::MIN);
        let mut g = graph_with(None);
        let tt = TimeTemp {
            time: vec![t],
            temp: vec![w],
        };
        assert!(matches!(g.create(&tt), Err(Error::StartOutOfRange { .. })));

        let (t, _) = crate::parse_line("A B 21.5 -3c", 1).unwrap();
        let tt = TimeTemp {
            time: vec![t],
            temp: vec![w],
        };
        g.create(&tt).unwrap();
        assert_eq!(g.runner().calls[0].args[5], "-61");
    }

    #[test]
    fn no_samples_no_calls() {
        let mut g = graph_with(None);
        let err = g.run(&TimeTemp::new(0), Path::new("out.png")).unwrap_err();
        assert!(matches!(err, Error::NoSamples));
        assert!(g.runner().calls.is_empty());
    }
}
