use super::rrd::{DEFAULT_PROGRAM, DEFAULT_RRD};
use super::VERSION;
use clap::{App, Arg};
use std::ffi::OsString;
use std::path::PathBuf;

/// Settings of one templog_plot run.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotArgs {
    pub login: PathBuf,
    pub imageout: PathBuf,
    pub program: String,
    pub rrd: PathBuf,
    pub verbose: bool,
}

/// Takes the CLI arguments that control the rrdtool plotting of the temperature log,
/// prints the usage and exits with 1 when they do not fit.
pub fn parse_cli() -> PlotArgs {
    match parse_cli_from(std::env::args_os()) {
        Ok(args) => args,
        Err(e) => e.exit(),
    }
}

pub fn parse_cli_from<I, T>(itr: I) -> Result<PlotArgs, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let arg_login = Arg::with_name("log_file")
        .help("temperature log, one sample per line")
        .index(1)
        .required(true);
    let arg_imageout = Arg::with_name("image_file")
        .help("graph written by rrdtool")
        .index(2)
        .required(true);
    let arg_program = Arg::with_name("rrdtool")
        .help("rrdtool executable")
        .long("rrdtool")
        .takes_value(true)
        .default_value(DEFAULT_PROGRAM);
    let arg_rrd = Arg::with_name("rrd")
        .help("temporary round robin database, removed after a successful run")
        .long("rrd")
        .takes_value(true)
        .default_value(DEFAULT_RRD);
    let arg_verbose = Arg::with_name("verbose")
        .help("log every rrdtool call")
        .short("v")
        .long("verbose")
        .takes_value(false);
    let cli_args = App::new("templog_plot")
        .version(VERSION.unwrap_or("unknown"))
        .author("Luca Peruzzo")
        .about("cli app to plot a temperature log through rrdtool")
        .arg(arg_login)
        .arg(arg_imageout)
        .arg(arg_program)
        .arg(arg_rrd)
        .arg(arg_verbose)
        .get_matches_from_safe(itr)?;
    let login = PathBuf::from(cli_args.value_of_os("log_file").unwrap_or_default());
    let imageout = PathBuf::from(cli_args.value_of_os("image_file").unwrap_or_default());
    let program = String::from(cli_args.value_of("rrdtool").unwrap_or(DEFAULT_PROGRAM));
    let rrd = PathBuf::from(cli_args.value_of_os("rrd").unwrap_or_default());
    let verbose = cli_args.is_present("verbose");
    Ok(PlotArgs {
        login,
        imageout,
        program,
        rrd,
        verbose,
    })
}
