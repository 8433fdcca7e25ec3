//! Error types for ccnstore

use std::fmt;
use std::io;

/// Result type alias for ccnstore operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for content store operations
///
/// Cache misses and duplicate insertions are ordinary outcomes and never
/// show up here.
#[derive(Debug)]
pub enum Error {
    /// I/O error while reading configuration
    Io(io::Error),

    /// Parse error (name URI or configuration document)
    Parse(String),

    /// Configuration value out of range
    InvalidConfig(String),

    /// Work submitted before its completion sink was registered
    SinkNotRegistered(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Parse(msg) => write!(f, "Parse error: {}", msg),
            Error::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            Error::SinkNotRegistered(sink) => {
                write!(f, "No {} callback registered before submitting work", sink)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Parse(err.to_string())
    }
}

impl From<nom::Err<nom::error::Error<&str>>> for Error {
    fn from(err: nom::Err<nom::error::Error<&str>>) -> Self {
        Error::Parse(format!("{:?}", err))
    }
}
