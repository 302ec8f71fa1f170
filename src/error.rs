use std::error::Error;
use std::fmt;

/// Errors raised by the linking engine and the experiment container.
/// Structural errors abort the operation that produced them; no partially
/// updated container or registry is ever visible alongside one.
#[derive(Debug)]
pub enum ExperimentError {
    /// Link matrix (or the index pairs used to build one) has the wrong
    /// shape: mismatched column lengths, a zero index, a missing join field.
    MalformedLink(String),
    /// A sample or element index exceeds the bounds of the table or
    /// collection it refers to.
    OutOfRangeLink(String),
    /// An address names a storage location the container does not declare.
    UnknownSlot(String),
    /// Attempt to link against a zero-length collection.
    EmptyTarget(String),
    /// Join expression is not of the form `<address> = <address>`.
    UnsupportedJoinFormat(String),
    /// A value does not fit the destination it is being assigned to.
    InvalidValue(String),
    Io(std::io::Error),
    Serde(serde_json::Error),
}

impl Error for ExperimentError {}

impl fmt::Display for ExperimentError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ExperimentError::MalformedLink(msg) => write!(f, "malformed link: {msg}"),
            ExperimentError::OutOfRangeLink(msg) => write!(f, "link index out of range: {msg}"),
            ExperimentError::UnknownSlot(msg) => write!(f, "unknown slot: {msg}"),
            ExperimentError::EmptyTarget(msg) => write!(f, "empty link target: {msg}"),
            ExperimentError::UnsupportedJoinFormat(msg) => {
                write!(f, "unsupported join format: {msg}")
            }
            ExperimentError::InvalidValue(msg) => write!(f, "invalid value: {msg}"),
            ExperimentError::Io(err) => write!(f, "I/O error: {err}"),
            ExperimentError::Serde(err) => write!(f, "JSON error: {err}"),
        }
    }
}

impl From<std::io::Error> for ExperimentError {
    fn from(err: std::io::Error) -> Self {
        ExperimentError::Io(err)
    }
}

impl From<serde_json::Error> for ExperimentError {
    fn from(err: serde_json::Error) -> Self {
        ExperimentError::Serde(err)
    }
}
