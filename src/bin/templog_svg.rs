use log::info;
use templog_rrd::logging::setup_logging;
use templog_rrd::svg::parse_cli;
use templog_rrd::TimeTemp;

fn main() {
    let (login, svgout, verbose) = parse_cli();
    if let Err(e) = setup_logging(verbose) {
        eprintln!("could not init logging: {}", e);
    }
    info!(
        "read data from {} and plot to {}",
        login.display(),
        svgout.display()
    );
    let result = TimeTemp::from_log(&login).and_then(|tt| tt.plot_datetime(&svgout));
    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
