//! Error types for dirigo-core.

use thiserror::Error;

/// Result type alias for dirigo operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Rejected user input.
///
/// Raised at the edit boundary of a panel model. The model that raised it is
/// left exactly as it was before the edit.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Text that does not parse as a number.
    #[error("malformed number: {0:?}")]
    MalformedNumber(String),

    /// Text that parses as a number but carries no unit suffix.
    #[error("missing unit in {0:?}")]
    MissingUnit(String),

    /// Unit suffix not recognised for this quantity.
    #[error("unknown unit {unit:?} for {quantity}")]
    UnknownUnit { quantity: &'static str, unit: String },

    /// Value parsed but lies outside the field's domain.
    #[error("{field} out of range: {value} ({constraint})")]
    OutOfRange {
        field: &'static str,
        value: String,
        constraint: &'static str,
    },
}

impl ValidationError {
    pub(crate) fn out_of_range(
        field: &'static str,
        value: impl ToString,
        constraint: &'static str,
    ) -> Self {
        Self::OutOfRange {
            field,
            value: value.to_string(),
            constraint,
        }
    }
}

/// Core error types for dirigo operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Rejected input.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure reported by an engine backend.
    #[error("engine error: {0}")]
    Engine(String),

    /// A worker thread panicked or could not be joined.
    #[error("worker {0} terminated abnormally")]
    WorkerFailed(String),

    /// Operation requires hardware the engine does not have.
    #[error("hardware not available: {0}")]
    HardwareUnavailable(&'static str),
}
