//! Simulated engine error types.

use thiserror::Error;

/// Result type for simulated engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Simulated engine error types.
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TIFF encoding error.
    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    /// Frame geometry the logger cannot write.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// Core library error.
    #[error("core error: {0}")]
    Core(#[from] dirigo_core::Error),
}

impl From<Error> for dirigo_core::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Io(io) => dirigo_core::Error::Io(io),
            Error::Core(core) => core,
            other => dirigo_core::Error::Engine(other.to_string()),
        }
    }
}
