use crate::errors::RelayError;
use crate::forwarder::Forwarder;
use crate::protocol::{DEFAULT_SHEET_NAME, ForwardPayload, UploadRequest, UploadSuccess};
use hyper::body::Bytes;
use url::Url;

/// Handler for `POST /upload`: validates the payload, resolves the
/// destination, projects the forward payload, and translates the delivery
/// outcome. Validation always completes before any network call.
pub struct UploadHandler {
    default_url: Option<Url>,
    forwarder: Forwarder,
}

impl UploadHandler {
    pub fn new(default_url: Option<Url>, forwarder: Forwarder) -> Self {
        Self {
            default_url,
            forwarder,
        }
    }

    pub async fn handle(&self, body: Bytes) -> Result<UploadSuccess, RelayError> {
        let request: UploadRequest = serde_json::from_slice(&body)
            .map_err(|e| RelayError::InvalidPayload(format!("Malformed JSON body: {e}")))?;

        let destination = self.resolve_destination(request.google_script_url.as_deref())?;

        let values = match request.values {
            Some(values) if values.is_array() => values,
            _ => {
                return Err(RelayError::InvalidPayload(
                    "Missing or invalid 'values' array in payload.".to_string(),
                ));
            }
        };

        let payload = ForwardPayload {
            sheet_name: request
                .sheet_name
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| DEFAULT_SHEET_NAME.to_string()),
            values,
        };

        let rows = payload.values.as_array().map(Vec::len).unwrap_or(0);
        tracing::info!(
            rows,
            sheet = %payload.sheet_name,
            destination = %destination.host_str().unwrap_or("-"),
            "forwarding upload"
        );

        let outcome = self.forwarder.forward(&destination, &payload).await?;

        Ok(UploadSuccess {
            ok: true,
            forwarded: true,
            status: outcome.status,
            text: outcome.body,
        })
    }

    /// A trimmed, non-empty per-request override wins over the configured
    /// default. Neither present is a client error.
    fn resolve_destination(&self, override_url: Option<&str>) -> Result<Url, RelayError> {
        if let Some(raw) = override_url {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                return Url::parse(trimmed).map_err(|e| {
                    RelayError::InvalidPayload(format!("Invalid 'googleScriptUrl': {e}"))
                });
            }
        }

        self.default_url
            .clone()
            .ok_or(RelayError::NoDestinationConfigured)
    }
}
