use log::info;
use templog_rrd::logging::setup_logging;
use templog_rrd::plot::parse_cli;
use templog_rrd::rrd::{RrdGraph, SystemRunner};
use templog_rrd::{Error, TimeTemp};

fn main() {
    let args = parse_cli();
    if let Err(e) = setup_logging(args.verbose) {
        eprintln!("could not init logging: {}", e);
    }
    info!(
        "read data from {} and plot to {}",
        args.login.display(),
        args.imageout.display()
    );
    if let Err(e) = run(&args) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
    println!("done");
}

fn run(args: &templog_rrd::plot::PlotArgs) -> Result<(), Error> {
    let tt = TimeTemp::from_log(&args.login)?;
    let mut rrd = RrdGraph::new(SystemRunner, &args.program, &args.rrd);
    rrd.run(&tt, &args.imageout)
}
