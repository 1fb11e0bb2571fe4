use chrono::prelude::*;
use log::{debug, info};
use plotters::prelude::*;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::ops::Range;
use std::path::Path;
pub mod error;
pub mod logging;
pub mod plot;
pub mod rrd;
pub mod svg;

pub use error::Error;

pub const VERSION: Option<&str> = option_env!("CARGO_PKG_VERSION");

/// seconds between two database slots
pub const STEP: i64 = 60;
/// max seconds between two samples before the value becomes unknown
pub const HEARTBEAT: i64 = 120;
pub const TEMP_MIN: i64 = -20;
pub const TEMP_MAX: i64 = 50;
pub const DS_NAME: &str = "temp";
pub const RRA_FUNCTIONS: [&str; 3] = ["AVERAGE", "MIN", "MAX"];
pub const RRA_XFF: f64 = 0.5;
pub const RRA_ROWS: u32 = 1440;

pub const GRAPH_HEIGHT: u32 = 200;
pub const GRAPH_WIDTH: u32 = 750;
pub const GRAPH_TITLE: &str = "temperature";
pub const GRAPH_VERTICAL_LABEL: &str = "°C";
pub const GRAPH_BACK: &str = "#FFFFFF";
pub const GRAPH_LINE: &str = "#3366CC";
pub const LINE_COLOR: RGBColor = RGBColor(0x33, 0x66, 0xCC);

/// The main struct for the temperature time series,
/// epoch seconds and degrees as two parallel columns
#[derive(Debug, Clone, PartialEq)]
pub struct TimeTemp {
    pub time: Vec<i64>,
    pub temp: Vec<f64>,
}

impl TimeTemp {
    pub fn new(capacity: usize) -> TimeTemp {
        let time: Vec<i64> = Vec::with_capacity(capacity);
        let temp: Vec<f64> = Vec::with_capacity(capacity);
        TimeTemp { time, temp }
    }

    /// Init a TimeTemp from a temperature log.
    /// The first malformed line aborts the whole read,
    /// the order of the timestamps is not checked.
    pub fn from_log(fin: &Path) -> Result<TimeTemp, Error> {
        let file = File::open(fin).map_err(|source| Error::ReadLog {
            path: fin.to_path_buf(),
            source,
        })?;
        let buf = BufReader::new(file);
        let mut timetemp = TimeTemp::new(RRA_ROWS as usize);
        for (i, l) in buf.lines().enumerate() {
            let l = l.map_err(|source| Error::ReadLog {
                path: fin.to_path_buf(),
                source,
            })?;
            let (t, w) = parse_line(&l, i + 1)?;
            timetemp.time.push(t);
            timetemp.temp.push(w);
        }
        let (first, last) = match (timetemp.first_time(), timetemp.last_time()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(Error::NoSamples),
        };
        info!(
            "read {} samples from {}, {} to {}",
            timetemp.len(),
            fin.display(),
            fmt_epoch(first),
            fmt_epoch(last)
        );
        Ok(timetemp)
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn first_time(&self) -> Option<i64> {
        self.time.first().copied()
    }

    pub fn last_time(&self) -> Option<i64> {
        self.time.last().copied()
    }

    /// (timestamp, temperature) pairs in log order
    pub fn samples(&self) -> impl Iterator<Item = (i64, f64)> + '_ {
        self.time.iter().copied().zip(self.temp.iter().copied())
    }

    /// splits the series where two consecutive samples are more than max_gap seconds apart
    pub fn segments(&self, max_gap: i64) -> Vec<Range<usize>> {
        let mut segments = Vec::new();
        let mut start = 0;
        for i in 1..self.time.len() {
            if self.time[i].saturating_sub(self.time[i - 1]) > max_gap {
                segments.push(start..i);
                start = i;
            }
        }
        if !self.time.is_empty() {
            segments.push(start..self.time.len());
        }
        segments
    }

    /// plots the temperature time series to svg, same look as the rrdtool graph
    pub fn plot_datetime(&self, fout: &Path) -> Result<(), Error> {
        if self.is_empty() {
            return Err(Error::NoSamples);
        }
        self.draw_svg(fout).map_err(|e| Error::Draw {
            path: fout.to_path_buf(),
            message: e.to_string(),
        })
    }

    fn draw_svg(&self, fout: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let datetimes: Vec<DateTime<Utc>> = self
            .time
            .iter()
            .map(|&t| to_datetime(t))
            .collect::<Option<Vec<_>>>()
            .ok_or("timestamp out of range")?;
        let (xmindt, xmaxdt) = min_and_max(&datetimes[..]).ok_or("no samples")?;
        let xspan: chrono::Duration = xmaxdt - xmindt;
        let xmargin = std::cmp::max(xspan / 20, chrono::Duration::seconds(STEP));
        let xmindt = xmindt - xmargin;
        let xmaxdt = xmaxdt + xmargin;
        let xfmt = suitable_xfmt(xspan);
        let finite: Vec<f64> = self.temp.iter().copied().filter(|w| w.is_finite()).collect();
        let (ymin, ymax) = min_and_max(&finite[..]).ok_or("no finite temperature")?;
        let yspan = if ymax > ymin { (ymax - ymin) / 10f64 } else { 1. };
        let ymin = ymin - yspan;
        let ymax = ymax + yspan;

        let root = SVGBackend::new(fout, (GRAPH_WIDTH, GRAPH_HEIGHT)).into_drawing_area();
        root.fill(&WHITE)?;
        let mut chart = ChartBuilder::on(&root)
            .caption(GRAPH_TITLE, ("sans-serif", 16))
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(50)
            .build_cartesian_2d(xmindt..xmaxdt, ymin..ymax)?;
        chart
            .configure_mesh()
            .light_line_style(&TRANSPARENT)
            .bold_line_style(RGBColor(200, 200, 200).stroke_width(1))
            .set_all_tick_mark_size(2)
            .label_style(("sans-serif", 12))
            .y_desc(GRAPH_VERTICAL_LABEL)
            .x_labels(10)
            .x_label_formatter(&|x: &DateTime<Utc>| x.format(xfmt).to_string())
            .y_label_formatter(&|y: &f64| format!("{:.1}", y))
            .draw()?;

        // the database would store unknowns across these gaps, leave them blank
        for seg in self.segments(HEARTBEAT) {
            debug!("drawing samples {} to {}", seg.start, seg.end);
            let line = LineSeries::new(
                datetimes[seg.clone()]
                    .iter()
                    .zip(self.temp[seg].iter())
                    .map(|(x, y)| (*x, *y)),
                LINE_COLOR.stroke_width(2),
            );
            chart.draw_series(line)?;
        }
        root.present()?;
        Ok(())
    }
}

impl std::fmt::Display for TimeTemp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "timestamp, temperature [°C]\n")?;
        for (t, w) in self.samples() {
            write!(f, "{},{}\n", t, w)?
        }
        Ok(())
    }
}

/// Parses one log line, space separated:
/// field 2 is the temperature, field 3 the hex timestamp.
/// `lineno` is only used for the error.
pub fn parse_line(line: &str, lineno: usize) -> Result<(i64, f64), Error> {
    let fields: Vec<&str> = line.split(' ').collect();
    if fields.len() < 4 {
        return Err(Error::MissingField {
            line: lineno,
            found: fields.len(),
        });
    }
    let temp_str = fields[2].trim();
    let temp = temp_str
        .parse::<f64>()
        .map_err(|source| Error::InvalidTemperature {
            line: lineno,
            value: temp_str.to_string(),
            source,
        })?;
    let time_str = fields[3].trim();
    let digits = time_str
        .strip_prefix("0x")
        .or_else(|| time_str.strip_prefix("0X"))
        .unwrap_or(time_str);
    let time = i64::from_str_radix(digits, 16).map_err(|source| Error::InvalidTimestamp {
        line: lineno,
        value: time_str.to_string(),
        source,
    })?;
    Ok((time, temp))
}

pub fn to_datetime(t: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(t, 0).single()
}

/// epoch seconds as a readable UTC datetime, falls back to the raw number
pub fn fmt_epoch(t: i64) -> String {
    match to_datetime(t) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => t.to_string(),
    }
}

pub fn min_and_max<T: std::cmp::PartialOrd + Copy>(s: &[T]) -> Option<(T, T)> {
    let mut self_iter = s.iter();
    let (mut min, mut max) = match self_iter.next() {
        Some(v) => (*v, *v),
        None => return None,
    };
    for es in self_iter {
        if *es > max {
            max = *es
        }
        if *es < min {
            min = *es
        }
    }
    Some((min, max))
}

pub fn suitable_xfmt(d: chrono::Duration) -> &'static str {
    if d > chrono::Duration::weeks(1) {
        "%y-%m-%d"
    } else if d > chrono::Duration::days(1) {
        "%m-%d %H"
    } else {
        "%H:%M"
    }
}
