use crate::retry::RetryPolicy;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 10000;
const DEFAULT_FORWARD_TIMEOUT_SECS: u64 = 30;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {name}: {reason}")]
    InvalidVar { name: &'static str, reason: String },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Forward timeout cannot be 0")]
    InvalidForwardTimeout,

    #[error("Retry budget must allow at least one attempt")]
    InvalidAttemptBudget,
}

/// Network listener configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

impl Default for Listener {
    fn default() -> Self {
        Listener {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

/// Outbound delivery configuration
#[derive(Clone, Debug)]
pub struct ForwardConfig {
    /// Destination used when a request carries no override of its own.
    /// Absence only becomes an error when a request arrives without one.
    pub default_url: Option<Url>,
    pub policy: RetryPolicy,
}

/// Relay configuration, read once from the environment at process start and
/// passed into the service. Nothing reads the environment after startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub listener: Listener,
    pub forward: ForwardConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from a variable lookup. `from_env` passes the
    /// process environment; tests pass a plain map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST")
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = parse_var(&lookup, "PORT", DEFAULT_PORT)?;

        let default_url = match lookup("GOOGLE_SCRIPT_URL") {
            Some(raw) if !raw.trim().is_empty() => Some(Url::parse(raw.trim()).map_err(|e| {
                ConfigError::InvalidVar {
                    name: "GOOGLE_SCRIPT_URL",
                    reason: e.to_string(),
                }
            })?),
            _ => None,
        };

        let timeout_secs = parse_var(
            &lookup,
            "FORWARD_TIMEOUT_SECS",
            DEFAULT_FORWARD_TIMEOUT_SECS,
        )?;
        let policy =
            RetryPolicy::default().with_attempt_timeout(Duration::from_secs(timeout_secs));

        Ok(Config {
            listener: Listener { host, port },
            forward: ForwardConfig {
                default_url,
                policy,
            },
        })
    }

    /// Validates the relay configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.listener.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        if self.forward.policy.attempt_timeout.is_zero() {
            return Err(ValidationError::InvalidForwardTimeout);
        }
        if self.forward.policy.max_attempts == 0 {
            return Err(ValidationError::InvalidAttemptBudget);
        }
        Ok(())
    }
}

fn parse_var<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) if !raw.trim().is_empty() => {
            raw.trim()
                .parse()
                .map_err(|e: T::Err| ConfigError::InvalidVar {
                    name,
                    reason: e.to_string(),
                })
        }
        _ => Ok(default),
    }
}
