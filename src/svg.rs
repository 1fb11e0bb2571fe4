use super::VERSION;
use clap::{App, Arg};
use std::ffi::OsString;
use std::path::PathBuf;

/// Takes the CLI arguments for the native svg plot: (log file, svg file, verbose).
pub fn parse_cli() -> (PathBuf, PathBuf, bool) {
    match parse_cli_from(std::env::args_os()) {
        Ok(args) => args,
        Err(e) => e.exit(),
    }
}

pub fn parse_cli_from<I, T>(itr: I) -> Result<(PathBuf, PathBuf, bool), clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let arg_login = Arg::with_name("log_file")
        .help("temperature log, one sample per line")
        .index(1)
        .required(true);
    let arg_svgout = Arg::with_name("svg_file")
        .help("name of the output svg file, defaults to the log name with svg extension")
        .index(2);
    let arg_verbose = Arg::with_name("verbose")
        .help("print verbose information")
        .short("v")
        .long("verbose")
        .takes_value(false);
    let cli_args = App::new("templog_svg")
        .version(VERSION.unwrap_or("unknown"))
        .author("Luca Peruzzo")
        .about("cli app to plot a temperature log to svg, without rrdtool")
        .arg(arg_login)
        .arg(arg_svgout)
        .arg(arg_verbose)
        .get_matches_from_safe(itr)?;
    let login = PathBuf::from(cli_args.value_of_os("log_file").unwrap_or_default());
    let svgout = match cli_args.value_of_os("svg_file") {
        Some(p) => PathBuf::from(p),
        None => {
            let mut svgout = login.clone();
            svgout.set_extension("svg");
            svgout
        }
    };
    Ok((login, svgout, cli_args.is_present("verbose")))
}
