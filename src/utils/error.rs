use thiserror::Error;

use crate::models::ScreenState;

/// Every failure the check-in core can surface. None of them is fatal: each
/// path hands control back to the visitor for a retry or an edit.
#[derive(Debug, Error)]
pub enum CheckInError {
    /// Transport, HTTP status or response decoding failure on a backend call.
    #[error("Network failure: {0}")]
    NetworkFailure(String),

    /// A hint or stage token that maps to no known screen.
    #[error("Unknown stage: {0}")]
    UnknownStage(String),

    /// The OCR engine failed or returned nothing usable.
    #[error("OCR failure: {0}")]
    OcrFailure(String),

    /// A required field was left empty; no network call was made.
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// A new capture was requested while an upload is still in flight.
    #[error("Capture in progress: an upload has not finished yet")]
    CaptureInProgress,

    /// A step handler was called while another screen is active.
    #[error("Unexpected screen: expected {expected}, currently at {actual}")]
    UnexpectedScreen {
        expected: ScreenState,
        actual: ScreenState,
    },

    #[error("Visitor id conflict: already {existing}, backend sent {received}")]
    VisitorIdConflict { existing: u64, received: u64 },

    /// A step that needs a visitor id ran before details were stored.
    #[error("No visitor has been created for this session")]
    NoVisitor,

    /// A role or field name that is not one of the known values.
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<reqwest::Error> for CheckInError {
    fn from(err: reqwest::Error) -> Self {
        CheckInError::NetworkFailure(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CheckInError>;
