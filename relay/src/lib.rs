pub mod config;
pub mod errors;
pub mod forwarder;
pub mod handler;
pub mod http;
pub mod metrics_defs;
pub mod protocol;
pub mod retry;
pub mod service;

#[cfg(test)]
mod testutils;

use crate::errors::RelayError;

/// Builds the relay service from the config and serves it until the listener
/// fails.
pub async fn run(config: config::Config) -> Result<(), RelayError> {
    let relay_service = service::RelayService::new(&config)?;
    http::serve(&config.listener, relay_service).await
}
