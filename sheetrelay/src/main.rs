use clap::Parser;
use relay::config::Config;
use std::error::Error;

mod telemetry;

/// Relay accepting row uploads over HTTP and forwarding them to the
/// configured Apps Script endpoint.
#[derive(Parser)]
#[command(name = "sheetrelay", version)]
struct Cli {
    /// Override the listening port from the environment.
    #[arg(long)]
    port: Option<u16>,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let telemetry = telemetry::Telemetry::from_env();
    // The guard flushes pending events on drop; keep it for the process
    // lifetime.
    let _sentry_guard = telemetry.init_sentry();
    telemetry.init_tracing();
    telemetry.init_metrics()?;

    let mut config = Config::from_env()?;
    if let Some(port) = cli.port {
        config.listener.port = port;
    }
    config.validate()?;

    tracing::info!(
        port = config.listener.port,
        default_destination = config.forward.default_url.is_some(),
        "starting sheetrelay"
    );

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(relay::run(config))?;

    Ok(())
}
