use crate::errors::{ForwardError, RelayError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sheet written to when the caller does not name one.
pub const DEFAULT_SHEET_NAME: &str = "PIF_Master";

/// Inbound body for `POST /upload`. Unknown fields are accepted and ignored;
/// only the fields named here are ever forwarded.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    pub sheet_name: Option<String>,
    /// Kept structural: must be a JSON array, contents are opaque rows.
    pub values: Option<Value>,
    /// Per-request destination override.
    pub google_script_url: Option<String>,
}

/// Exactly what the downstream receives. The destination override and any
/// other inbound fields are stripped.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardPayload {
    pub sheet_name: String,
    pub values: Value,
}

/// `GET /` liveness payload.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub ok: bool,
    pub service: &'static str,
    #[serde(rename = "defaultDestination")]
    pub default_destination: bool,
}

/// `POST /upload` success payload.
#[derive(Debug, Serialize)]
pub struct UploadSuccess {
    pub ok: bool,
    pub forwarded: bool,
    /// Downstream status of the successful attempt.
    pub status: u16,
    /// Downstream body, best effort.
    pub text: String,
}

/// Error payload. `status`/`gasResponse` are present when the downstream
/// rejected with a status, `details` when the failure was network-level or
/// internal.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(rename = "gasResponse", skip_serializing_if = "Option::is_none")]
    pub gas_response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    fn bare(error: String) -> Self {
        Self {
            ok: false,
            error,
            status: None,
            gas_response: None,
            details: None,
        }
    }

    pub fn from_error(error: &RelayError) -> Self {
        match error {
            RelayError::Forward(ForwardError::Rejected { status, body }) => Self {
                status: Some(*status),
                gas_response: Some(body.clone()),
                ..Self::bare(format!("Forward failed {status}"))
            },
            RelayError::Forward(ForwardError::Unreachable { detail }) => Self {
                details: Some(detail.clone()),
                ..Self::bare("Forward failed after retries".to_string())
            },
            RelayError::InternalError(_) | RelayError::Io(_) => Self {
                details: Some(error.to_string()),
                ..Self::bare("Internal server error".to_string())
            },
            other => Self::bare(other.to_string()),
        }
    }
}
