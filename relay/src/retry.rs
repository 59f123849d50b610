use http::StatusCode;
use std::time::Duration;

/// Redirect status the downstream returns on successful processing.
/// Treated as success, never followed.
pub const SUCCESS_REDIRECT: StatusCode = StatusCode::FOUND;

/// Delivery policy: attempt budget, per-attempt timeout, and the backoff
/// applied between attempts. The backoff differs by failure class: a
/// server-error response retries sooner than a network-level failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the initial one.
    pub max_attempts: u32,
    /// Budget for one attempt; the in-flight request is dropped on expiry.
    pub attempt_timeout: Duration,
    /// Wait after a retryable downstream status.
    pub status_backoff: Duration,
    /// Wait after a network-level failure or timeout.
    pub network_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            attempt_timeout: Duration::from_secs(30),
            status_backoff: Duration::from_secs(1),
            network_backoff: Duration::from_secs(2),
        }
    }
}

/// How a completed attempt's status is treated by the delivery loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusDisposition {
    /// Delivered; stop and report success.
    Success,
    /// Worth another attempt if budget remains.
    Retryable,
    /// Stop immediately, no retry.
    Terminal,
}

impl RetryPolicy {
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Classifies a downstream status. Success is the 2xx range plus the
    /// known success-redirect; 5xx is retryable; everything else terminal.
    pub fn classify(&self, status: StatusCode) -> StatusDisposition {
        if status.is_success() || status == SUCCESS_REDIRECT {
            StatusDisposition::Success
        } else if status.is_server_error() {
            StatusDisposition::Retryable
        } else {
            StatusDisposition::Terminal
        }
    }
}
