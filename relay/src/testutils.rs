//! Scripted downstream server for delivery tests.

use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use url::Url;

/// One scripted reply. Replies are consumed in request order; once the
/// script is exhausted the last entry repeats.
#[derive(Clone)]
pub enum Script {
    Respond(StatusCode, &'static str),
    /// 302 with a Location header, to prove the caller does not follow it.
    Redirect(&'static str),
    /// Hold the response long enough to trip the attempt timeout.
    Stall(Duration),
}

/// What the downstream saw for one request.
#[derive(Clone)]
pub struct ReceivedRequest {
    pub body: Bytes,
    pub content_type: Option<String>,
}

pub struct TestDownstream {
    pub url: Url,
    hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<ReceivedRequest>>>,
}

impl TestDownstream {
    pub async fn start(script: Vec<Script>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test downstream");
        let port = listener.local_addr().expect("local addr").port();
        let hits = Arc::new(AtomicUsize::new(0));
        let requests = Arc::new(Mutex::new(Vec::new()));

        let server_hits = hits.clone();
        let server_requests = requests.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _peer)) = listener.accept().await else {
                    break;
                };
                let io = TokioIo::new(stream);
                let hits = server_hits.clone();
                let requests = server_requests.clone();
                let script = script.clone();

                tokio::spawn(async move {
                    let service = service_fn(move |req: Request<Incoming>| {
                        let hits = hits.clone();
                        let requests = requests.clone();
                        let script = script.clone();
                        async move { handle(req, &hits, &requests, &script).await }
                    });
                    let _ = hyper_util::server::conn::auto::Builder::new(TokioExecutor::new())
                        .serve_connection(io, service)
                        .await;
                });
            }
        });

        Self {
            url: Url::parse(&format!("http://127.0.0.1:{port}/")).expect("downstream url"),
            hits,
            requests,
        }
    }

    /// Requests received so far, including ones whose response was never
    /// delivered because the caller timed out.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ReceivedRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

async fn handle(
    req: Request<Incoming>,
    hits: &AtomicUsize,
    requests: &Mutex<Vec<ReceivedRequest>>,
    script: &[Script],
) -> Result<Response<Full<Bytes>>, Infallible> {
    let sequence = hits.fetch_add(1, Ordering::SeqCst);

    let content_type = req
        .headers()
        .get(hyper::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());
    let body = req
        .into_body()
        .collect()
        .await
        .map(|collected| collected.to_bytes())
        .unwrap_or_default();
    requests
        .lock()
        .expect("requests lock")
        .push(ReceivedRequest { body, content_type });

    let step = script.get(sequence).or_else(|| script.last());
    let response = match step {
        Some(Script::Respond(status, text)) => {
            let mut response = Response::new(Full::new(Bytes::from_static(text.as_bytes())));
            *response.status_mut() = *status;
            response
        }
        Some(Script::Redirect(location)) => Response::builder()
            .status(StatusCode::FOUND)
            .header(hyper::header::LOCATION, *location)
            .body(Full::new(Bytes::new()))
            .expect("redirect response"),
        Some(Script::Stall(pause)) => {
            tokio::time::sleep(*pause).await;
            Response::new(Full::new(Bytes::from_static(b"late")))
        }
        None => Response::new(Full::new(Bytes::new())),
    };

    Ok(response)
}
