//! Health check daemon.
//!
//! Loads a TOML configuration, starts one adjuster per endpoint and logs the
//! resulting share table whenever an endpoint changes status.
//!
//! ```text
//!   config.toml ──▶ loader ──▶ Supervisor ──▶ HttpHealthCheck (per endpoint)
//!        │                         ▲                 │
//!        └── watcher (reload) ─────┘                 ├──▶ metrics (Prometheus)
//!                                                    └──▶ update signal ──▶ share report
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use health_share::config::loader::load_config;
use health_share::config::schema::LogFormat;
use health_share::config::watcher::ConfigWatcher;
use health_share::health::probe::HttpProbe;
use health_share::lifecycle::signals::shutdown_on_signal;
use health_share::lifecycle::supervisor::report_shares;
use health_share::lifecycle::{Shutdown, Supervisor};
use health_share::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "health-share")]
#[command(about = "Active HTTP health checking that drives endpoint traffic shares", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "health-share.toml")]
    config: PathBuf,

    /// Override the configured log level.
    #[arg(long)]
    log_level: Option<String>,

    /// Override the configured log format.
    #[arg(long, value_parser = parse_log_format)]
    log_format: Option<LogFormat>,

    /// Do not reload when the config file changes.
    #[arg(long)]
    no_watch: bool,
}

fn parse_log_format(s: &str) -> Result<LogFormat, String> {
    match s {
        "pretty" => Ok(LogFormat::Pretty),
        "compact" => Ok(LogFormat::Compact),
        other => Err(format!("unknown log format {other:?}, expected pretty or compact")),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Fail fast on a bad config; nothing has been started yet.
    let config = load_config(&cli.config)?;

    let level = cli.log_level.as_deref().unwrap_or(&config.observability.log_level);
    let format = cli.log_format.unwrap_or(config.observability.log_format);
    logging::init(level, format)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = ?cli.config,
        endpoints = config.endpoints.len(),
        "health-share starting"
    );

    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse()?;
        metrics::install_prometheus(addr)?;
    }

    let shutdown = Shutdown::new();
    tokio::spawn(shutdown_on_signal(shutdown.clone()));

    let (supervisor, updates) = Supervisor::new(Arc::new(HttpProbe::new()), Arc::new(metrics::MetricsSink));
    let supervisor = Arc::new(supervisor);
    tokio::spawn(report_shares(supervisor.clone(), updates, shutdown.clone()));

    if config.start_delay_secs > 0 {
        tracing::info!(delay_secs = config.start_delay_secs, "Delaying start of health checks");
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(config.start_delay_secs)) => {}
            _ = shutdown.wait() => {
                tracing::info!("Shutdown before health checks started");
                return Ok(());
            }
        }
    }
    supervisor.apply(&config);

    let (watcher, mut reloads) = ConfigWatcher::new(&cli.config, config.clone());
    // Dropping the handle stops the watcher.
    let _watch_handle = if cli.no_watch {
        None
    } else {
        match watcher.run() {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::warn!(error = %e, "Config watcher unavailable, hot reload disabled");
                None
            }
        }
    };

    loop {
        tokio::select! {
            Some(new_config) = reloads.recv() => {
                tracing::info!(endpoints = new_config.endpoints.len(), "Applying reloaded configuration");
                supervisor.apply(&new_config);
            }
            _ = shutdown.wait() => break,
        }
    }

    supervisor.shutdown().await;
    tracing::info!("Shutdown complete");
    Ok(())
}
