use http::StatusCode;
use thiserror::Error;

/// Result type alias for relay operations
pub type Result<T, E = RelayError> = std::result::Result<T, E>;

/// Errors that can occur while handling an inbound request
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("No script URL configured.")]
    NoDestinationConfigured,

    #[error("{0}")]
    InvalidPayload(String),

    #[error("Request body exceeds the configured size limit")]
    RequestTooLarge,

    #[error("Failed to read request body: {0}")]
    RequestBodyError(String),

    #[error(transparent)]
    Forward(#[from] ForwardError),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RelayError {
    /// HTTP status surfaced to the caller for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::NoDestinationConfigured
            | RelayError::InvalidPayload(_)
            | RelayError::RequestBodyError(_) => StatusCode::BAD_REQUEST,
            RelayError::RequestTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            RelayError::Forward(_) => StatusCode::BAD_GATEWAY,
            RelayError::InternalError(_) | RelayError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Terminal outcome of the delivery loop.
///
/// `Rejected` carries the downstream status and best-effort body; it covers
/// both non-retryable statuses and a retryable status on the final attempt.
/// `Unreachable` means the attempt budget was spent on network-level
/// failures or timeouts.
#[derive(Error, Debug)]
pub enum ForwardError {
    #[error("Forward failed {status}")]
    Rejected { status: u16, body: String },

    #[error("{detail}")]
    Unreachable { detail: String },
}
