//! Process-level telemetry wiring, sourced from the environment.

use metrics_exporter_statsd::StatsdBuilder;
use sentry::ClientInitGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const DEFAULT_STATSD_PORT: u16 = 8125;

pub struct Telemetry {
    sentry_dsn: Option<String>,
    statsd: Option<(String, u16)>,
}

impl Telemetry {
    pub fn from_env() -> Self {
        let sentry_dsn = std::env::var("SENTRY_DSN")
            .ok()
            .filter(|value| !value.is_empty());
        let statsd = std::env::var("STATSD_HOST")
            .ok()
            .filter(|value| !value.is_empty())
            .map(|host| {
                let port = std::env::var("STATSD_PORT")
                    .ok()
                    .and_then(|raw| raw.parse().ok())
                    .unwrap_or(DEFAULT_STATSD_PORT);
                (host, port)
            });

        Self { sentry_dsn, statsd }
    }

    pub fn init_sentry(&self) -> Option<ClientInitGuard> {
        self.sentry_dsn.as_deref().map(|dsn| {
            sentry::init((
                dsn,
                sentry::ClientOptions {
                    release: sentry::release_name!(),
                    ..Default::default()
                },
            ))
        })
    }

    pub fn init_tracing(&self) {
        tracing_subscriber::registry()
            .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
            .with(tracing_subscriber::fmt::layer())
            .with(sentry::integrations::tracing::layer())
            .init();
    }

    pub fn init_metrics(&self) -> Result<(), Box<dyn std::error::Error>> {
        let Some((host, port)) = &self.statsd else {
            return Ok(());
        };

        let recorder = StatsdBuilder::from(host.as_str(), *port)
            .with_queue_size(5000)
            .with_buffer_size(1024)
            .build(Some("sheetrelay"))?;
        metrics::set_global_recorder(recorder)
            .map_err(|e| format!("failed to install metrics recorder: {e}"))?;

        Ok(())
    }
}
