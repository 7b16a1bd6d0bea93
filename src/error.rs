use std::fmt::{self, Debug, Display};
use std::io;

/// Provides `ModelError` and maps to other errors to
/// convert to a `ModelError`
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub enum ModelError {
    IoError(io::Error),
    JsonError(serde_json::Error),
    CSVError(csv::Error),
    /// The parameters describe a model that cannot be run. Raised before any
    /// simulation step executes.
    ConfigError(String),
    /// An internal invariant was broken, e.g. an age that no band covers.
    InvariantViolation(String),
    ReportError(String),
    ReplicateFailed {
        replicate: usize,
        source: Box<ModelError>,
    },
}

impl From<io::Error> for ModelError {
    fn from(error: io::Error) -> Self {
        ModelError::IoError(error)
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(error: serde_json::Error) -> Self {
        ModelError::JsonError(error)
    }
}

impl From<csv::Error> for ModelError {
    fn from(error: csv::Error) -> Self {
        ModelError::CSVError(error)
    }
}

impl std::error::Error for ModelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ModelError::IoError(error) => Some(error),
            ModelError::JsonError(error) => Some(error),
            ModelError::CSVError(error) => Some(error),
            ModelError::ReplicateFailed { source, .. } => Some(source.as_ref()),
            ModelError::ConfigError(_)
            | ModelError::InvariantViolation(_)
            | ModelError::ReportError(_) => None,
        }
    }
}

impl Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ModelError::ConfigError(msg) => write!(f, "Invalid configuration: {msg}"),
            ModelError::InvariantViolation(msg) => write!(f, "Invariant violated: {msg}"),
            ModelError::ReportError(msg) => write!(f, "Report error: {msg}"),
            ModelError::ReplicateFailed { replicate, source } => {
                write!(f, "Replicate {replicate} failed: {source}")
            }
            _ => write!(f, "Error: {self:?}"),
        }
    }
}
