use std::num::{ParseFloatError, ParseIntError};
use std::path::PathBuf;
use thiserror::Error;

/// Everything that can stop a run; the binaries map any of these to exit code 1.
#[derive(Debug, Error)]
pub enum Error {
    #[error("could not read log file {path}: {source}")]
    ReadLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: expected at least 4 space separated fields, found {found}")]
    MissingField { line: usize, found: usize },

    #[error("line {line}: invalid temperature '{value}': {source}")]
    InvalidTemperature {
        line: usize,
        value: String,
        #[source]
        source: ParseFloatError,
    },

    #[error("line {line}: invalid hex timestamp '{value}': {source}")]
    InvalidTimestamp {
        line: usize,
        value: String,
        #[source]
        source: ParseIntError,
    },

    #[error("no samples to plot")]
    NoSamples,

    #[error("first timestamp {first} leaves no room for the database start")]
    StartOutOfRange { first: i64 },

    #[error("ERROR calling: {command}")]
    CommandFailed { command: String, code: Option<i32> },

    #[error("ERROR calling: {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not remove temporary database {path}: {source}")]
    Cleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not draw {path}: {message}")]
    Draw { path: PathBuf, message: String },
}
