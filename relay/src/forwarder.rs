use crate::errors::{ForwardError, RelayError};
use crate::metrics_defs;
use crate::protocol::ForwardPayload;
use crate::retry::{RetryPolicy, StatusDisposition};
use std::time::Duration;
use tokio::time::{sleep, timeout};
use url::Url;

/// Result of a successful delivery. The body is best effort; a read failure
/// does not downgrade success.
#[derive(Clone, Debug)]
pub struct ForwardOutcome {
    pub status: u16,
    pub body: String,
}

/// How one attempt ended, as seen by the delivery loop.
enum AttemptOutcome {
    Delivered(ForwardOutcome),
    /// Retry after `wait` if budget remains; `error` surfaces on exhaustion.
    Retry { wait: Duration, error: ForwardError },
    Fatal(ForwardError),
}

/// Retrying HTTP delivery helper. Holds a pooled client and the policy;
/// knows nothing about inbound validation or response shapes.
#[derive(Clone)]
pub struct Forwarder {
    client: reqwest::Client,
    policy: RetryPolicy,
}

impl Forwarder {
    /// The client never follows redirects: the downstream's success-redirect
    /// must be observed as a status, not chased.
    pub fn new(policy: RetryPolicy) -> Result<Self, RelayError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| RelayError::InternalError(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, policy })
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Delivers the payload to `url`, retrying per the policy. Attempts are
    /// strictly sequential; a timed-out attempt's request future is dropped
    /// before the next attempt starts.
    pub async fn forward(
        &self,
        url: &Url,
        payload: &ForwardPayload,
    ) -> Result<ForwardOutcome, ForwardError> {
        for attempt in 1..=self.policy.max_attempts {
            metrics::counter!(metrics_defs::FORWARD_ATTEMPTS.name).increment(1);

            match self.attempt(url, payload).await {
                AttemptOutcome::Delivered(outcome) => {
                    tracing::info!(status = outcome.status, attempt, "forward succeeded");
                    return Ok(outcome);
                }
                AttemptOutcome::Retry { wait, error } => {
                    if attempt == self.policy.max_attempts {
                        metrics::counter!(metrics_defs::FORWARD_FAILURES.name, "kind" => failure_kind(&error))
                            .increment(1);
                        tracing::error!(attempt, error = %error, "forward failed, budget spent");
                        return Err(error);
                    }
                    tracing::warn!(attempt, error = %error, wait_ms = wait.as_millis() as u64, "forward attempt failed, retrying");
                    sleep(wait).await;
                }
                AttemptOutcome::Fatal(error) => {
                    metrics::counter!(metrics_defs::FORWARD_FAILURES.name, "kind" => failure_kind(&error))
                        .increment(1);
                    tracing::error!(attempt, error = %error, "forward failed");
                    return Err(error);
                }
            }
        }

        // Only reachable with an empty attempt budget, which validation rejects.
        Err(ForwardError::Unreachable {
            detail: "no attempts were made".to_string(),
        })
    }

    async fn attempt(&self, url: &Url, payload: &ForwardPayload) -> AttemptOutcome {
        let send = self.client.post(url.clone()).json(payload).send();

        let response = match timeout(self.policy.attempt_timeout, send).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                return AttemptOutcome::Retry {
                    wait: self.policy.network_backoff,
                    error: ForwardError::Unreachable {
                        detail: e.to_string(),
                    },
                };
            }
            // Timeout elapsed; the dropped send future aborts the in-flight
            // request.
            Err(_) => {
                return AttemptOutcome::Retry {
                    wait: self.policy.network_backoff,
                    error: ForwardError::Unreachable {
                        detail: format!(
                            "Request timeout ({}s)",
                            self.policy.attempt_timeout.as_secs()
                        ),
                    },
                };
            }
        };

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        match self.policy.classify(status) {
            StatusDisposition::Success => AttemptOutcome::Delivered(ForwardOutcome {
                status: status.as_u16(),
                body,
            }),
            StatusDisposition::Retryable => AttemptOutcome::Retry {
                wait: self.policy.status_backoff,
                error: ForwardError::Rejected {
                    status: status.as_u16(),
                    body,
                },
            },
            StatusDisposition::Terminal => AttemptOutcome::Fatal(ForwardError::Rejected {
                status: status.as_u16(),
                body,
            }),
        }
    }
}

fn failure_kind(error: &ForwardError) -> &'static str {
    match error {
        ForwardError::Rejected { .. } => "rejected",
        ForwardError::Unreachable { .. } => "unreachable",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::{Script, TestDownstream};
    use http::StatusCode;
    use serde_json::json;
    use std::time::Instant;

    fn test_payload() -> ForwardPayload {
        ForwardPayload {
            sheet_name: "PIF_Master".to_string(),
            values: json!([["a", 1], ["b", 2]]),
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 2,
            attempt_timeout: Duration::from_millis(500),
            status_backoff: Duration::from_millis(50),
            network_backoff: Duration::from_millis(50),
        }
    }

    #[tokio::test]
    async fn first_attempt_success_makes_one_call() {
        let downstream =
            TestDownstream::start(vec![Script::Respond(StatusCode::OK, "done")]).await;
        let forwarder = Forwarder::new(fast_policy()).unwrap();

        let outcome = forwarder
            .forward(&downstream.url, &test_payload())
            .await
            .unwrap();

        assert_eq!(outcome.status, 200);
        assert_eq!(outcome.body, "done");
        assert_eq!(downstream.hits(), 1);
    }

    #[tokio::test]
    async fn redirect_counts_as_success_and_is_not_followed() {
        let downstream = TestDownstream::start(vec![Script::Redirect("/elsewhere")]).await;
        let forwarder = Forwarder::new(fast_policy()).unwrap();

        let outcome = forwarder
            .forward(&downstream.url, &test_payload())
            .await
            .unwrap();

        assert_eq!(outcome.status, 302);
        // Following the Location would have produced a second hit.
        assert_eq!(downstream.hits(), 1);
    }

    #[tokio::test]
    async fn server_error_then_success_retries_once_with_backoff() {
        let downstream = TestDownstream::start(vec![
            Script::Respond(StatusCode::SERVICE_UNAVAILABLE, "busy"),
            Script::Respond(StatusCode::OK, "done"),
        ])
        .await;
        let forwarder = Forwarder::new(fast_policy()).unwrap();

        let started = Instant::now();
        let outcome = forwarder
            .forward(&downstream.url, &test_payload())
            .await
            .unwrap();

        assert_eq!(outcome.status, 200);
        assert_eq!(downstream.hits(), 2);
        // One status backoff must have elapsed between the two attempts.
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn server_error_twice_surfaces_downstream_status() {
        let downstream = TestDownstream::start(vec![
            Script::Respond(StatusCode::SERVICE_UNAVAILABLE, "busy"),
            Script::Respond(StatusCode::SERVICE_UNAVAILABLE, "still busy"),
        ])
        .await;
        let forwarder = Forwarder::new(fast_policy()).unwrap();

        let error = forwarder
            .forward(&downstream.url, &test_payload())
            .await
            .unwrap_err();

        assert_eq!(downstream.hits(), 2);
        match error {
            ForwardError::Rejected { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "still busy");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn client_error_is_terminal_without_retry() {
        let downstream =
            TestDownstream::start(vec![Script::Respond(StatusCode::NOT_FOUND, "missing")]).await;
        let forwarder = Forwarder::new(fast_policy()).unwrap();

        let error = forwarder
            .forward(&downstream.url, &test_payload())
            .await
            .unwrap_err();

        assert_eq!(downstream.hits(), 1);
        match error {
            ForwardError::Rejected { status, .. } => assert_eq!(status, 404),
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn timeout_on_both_attempts_is_cancelled_and_reported() {
        let downstream = TestDownstream::start(vec![
            Script::Stall(Duration::from_secs(5)),
            Script::Stall(Duration::from_secs(5)),
        ])
        .await;
        let forwarder = Forwarder::new(RetryPolicy {
            attempt_timeout: Duration::from_millis(100),
            ..fast_policy()
        })
        .unwrap();

        let started = Instant::now();
        let error = forwarder
            .forward(&downstream.url, &test_payload())
            .await
            .unwrap_err();

        // Both stalled attempts were dropped at timeout expiry, well before
        // the downstream would have answered.
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(downstream.hits(), 2);
        match error {
            ForwardError::Unreachable { detail } => {
                assert!(detail.contains("Request timeout"), "detail: {detail}");
            }
            other => panic!("expected unreachable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn connection_failure_exhausts_budget() {
        // Bound then dropped, so nothing listens on this port.
        let url = {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let port = listener.local_addr().unwrap().port();
            drop(listener);
            Url::parse(&format!("http://127.0.0.1:{port}/")).unwrap()
        };
        let forwarder = Forwarder::new(fast_policy()).unwrap();

        let error = forwarder.forward(&url, &test_payload()).await.unwrap_err();
        match error {
            ForwardError::Unreachable { detail } => {
                assert!(!detail.contains("Request timeout"), "detail: {detail}");
            }
            other => panic!("expected unreachable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn forwarded_body_is_json_with_content_type() {
        let downstream =
            TestDownstream::start(vec![Script::Respond(StatusCode::OK, "")]).await;
        let forwarder = Forwarder::new(fast_policy()).unwrap();

        forwarder
            .forward(&downstream.url, &test_payload())
            .await
            .unwrap();

        let requests = downstream.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].content_type.as_deref(),
            Some("application/json")
        );
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        let object = body.as_object().unwrap();
        assert_eq!(object.len(), 2);
        assert_eq!(object["sheetName"], json!("PIF_Master"));
        assert!(object["values"].is_array());
    }
}
