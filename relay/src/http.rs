use crate::config::Listener;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::service::Service;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioExecutor;
use hyper_util::rt::TokioIo;
use hyper_util::server::conn::auto::Builder;
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Accept loop for the relay listener. Each connection is handed to hyper on
/// its own task; h1/h2 are auto-detected per socket.
pub async fn serve<S, E>(listener: &Listener, service: S) -> Result<(), E>
where
    S: Service<Request<Incoming>, Response = Response<BoxBody<Bytes, E>>, Error = E>
        + Send
        + Sync
        + 'static,
    S::Future: Send + 'static,
    E: From<std::io::Error> + std::error::Error + Send + Sync + 'static,
{
    let tcp = TcpListener::bind((listener.host.as_str(), listener.port)).await?;
    let local_addr = tcp.local_addr()?;
    tracing::info!(addr = %local_addr, "listening");

    let service_arc = Arc::new(service);

    loop {
        let (stream, peer_addr) = tcp.accept().await?;
        let _ = stream.set_nodelay(true);
        let io = TokioIo::new(stream);
        let svc = service_arc.clone();

        tokio::spawn(async move {
            if let Err(err) = Builder::new(TokioExecutor::new())
                .serve_connection(io, svc)
                .await
            {
                tracing::debug!(peer = %peer_addr, error = %err, "connection closed with error");
            }
        });
    }
}

/// Serializes `value` into a JSON response with the given status.
pub fn json_response<T, E>(status: StatusCode, value: &T) -> Response<BoxBody<Bytes, E>>
where
    T: Serialize,
{
    let Ok(bytes) = serde_json::to_vec(value) else {
        return make_error_response(StatusCode::INTERNAL_SERVER_ERROR);
    };

    Response::builder()
        .status(status)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(bytes)).map_err(|e| match e {}).boxed())
        .unwrap_or_else(|_| make_error_response(StatusCode::INTERNAL_SERVER_ERROR))
}

/// Bodyless response with the given status.
pub fn make_error_response<E>(status: StatusCode) -> Response<BoxBody<Bytes, E>> {
    let mut response = Response::new(Full::new(Bytes::new()).map_err(|e| match e {}).boxed());
    *response.status_mut() = status;
    response
}
