use crate::config::Config;
use crate::errors::RelayError;
use crate::forwarder::Forwarder;
use crate::handler::UploadHandler;
use crate::http::{json_response, make_error_response};
use crate::metrics_defs;
use crate::protocol::{ErrorResponse, StatusResponse, UploadSuccess};
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Limited};
use hyper::body::{Bytes, Incoming};
use hyper::service::Service;
use hyper::{Method, Request, Response, StatusCode};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

/// Largest accepted request body. Uploads can carry tens of thousands of
/// rows in one batch.
pub const MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

pub const SERVICE_NAME: &str = "sheetrelay";

/// The relay's single HTTP service: `GET /` liveness, `POST /upload` relay,
/// 404 for everything else. Requests share nothing but the immutable config
/// and the pooled outbound client.
#[derive(Clone)]
pub struct RelayService {
    handler: Arc<UploadHandler>,
    default_configured: bool,
}

impl RelayService {
    pub fn new(config: &Config) -> Result<Self, RelayError> {
        let forwarder = Forwarder::new(config.forward.policy.clone())?;
        Ok(Self {
            handler: Arc::new(UploadHandler::new(
                config.forward.default_url.clone(),
                forwarder,
            )),
            default_configured: config.forward.default_url.is_some(),
        })
    }

    /// Routes one request. Generic over the body type so tests can drive it
    /// with in-memory bodies.
    pub async fn handle<B>(&self, req: Request<B>) -> Response<BoxBody<Bytes, RelayError>>
    where
        B: hyper::body::Body + Send + 'static,
        B::Data: Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let started = Instant::now();
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        let response = if method == Method::GET && path == "/" {
            self.status()
        } else if method == Method::POST && path == "/upload" {
            self.upload(req.into_body()).await
        } else {
            tracing::debug!(method = %method, path = %path, "no route matched");
            make_error_response(StatusCode::NOT_FOUND)
        };

        metrics::histogram!(metrics_defs::REQUEST_DURATION.name)
            .record(started.elapsed().as_secs_f64());
        metrics::counter!(
            metrics_defs::REQUESTS.name,
            "status" => response.status().as_u16().to_string()
        )
        .increment(1);

        response
    }

    fn status(&self) -> Response<BoxBody<Bytes, RelayError>> {
        json_response(
            StatusCode::OK,
            &StatusResponse {
                ok: true,
                service: SERVICE_NAME,
                default_destination: self.default_configured,
            },
        )
    }

    async fn upload<B>(&self, body: B) -> Response<BoxBody<Bytes, RelayError>>
    where
        B: hyper::body::Body + Send + 'static,
        B::Data: Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        match self.upload_inner(body).await {
            Ok(success) => json_response(StatusCode::OK, &success),
            Err(error) => {
                let status = error.status_code();
                if status.is_server_error() {
                    tracing::error!(error = %error, "upload failed");
                }
                json_response(status, &ErrorResponse::from_error(&error))
            }
        }
    }

    async fn upload_inner<B>(&self, body: B) -> Result<UploadSuccess, RelayError>
    where
        B: hyper::body::Body + Send + 'static,
        B::Data: Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let bytes = Limited::new(body, MAX_BODY_BYTES)
            .collect()
            .await
            .map(|collected| collected.to_bytes())
            .map_err(|e| {
                if e.downcast_ref::<http_body_util::LengthLimitError>().is_some() {
                    RelayError::RequestTooLarge
                } else {
                    RelayError::RequestBodyError(e.to_string())
                }
            })?;

        self.handler.handle(bytes).await
    }
}

impl Service<Request<Incoming>> for RelayService {
    type Response = Response<BoxBody<Bytes, RelayError>>;
    type Error = RelayError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move { Ok(service.handle(req).await) })
    }
}
