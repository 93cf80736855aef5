//! Core error types for the vestfolio engine.
//!
//! Every failure is a value returned to the caller; the engine never
//! terminates the process and never retries on its own. Reconstruction-level
//! errors abort a run, matching-level errors are carried per disposal.

use thiserror::Error;

use crate::disposals::MatchingError;
use crate::fx::FxError;
use crate::holdings::ReconstructionError;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the engine.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Holdings reconstruction failed: {0}")]
    Reconstruction(#[from] ReconstructionError),

    #[error("Disposal matching failed: {0}")]
    Matching(#[from] MatchingError),

    #[error("Fx error: {0}")]
    Fx(#[from] FxError),

    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Export failed: {0}")]
    Export(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Validation errors for the supplied transaction sequence and companion
/// inputs.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Required field '{0}' is missing")]
    MissingField(String),

    #[error("Unknown broker: {0}")]
    UnknownBroker(String),

    #[error("Failed to parse decimal number: {0}")]
    DecimalParse(#[from] rust_decimal::Error),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Export(err.to_string())
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::Export(err.to_string())
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        Error::Export(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Export(err.to_string())
    }
}
