//! rr-balancer: round-robin HTTP load balancer.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────┐
//!                     │                 LOAD BALANCER                │
//!   Client Request    │  ┌──────────┐   ┌───────────┐   ┌─────────┐  │
//!   ──────────────────┼─▶│  http    │──▶│ scheduler │──▶│ backend │──┼──▶ Backend
//!                     │  │dispatcher│   │ (cursor)  │   │ client  │  │    Server
//!   Client Response   │  └──────────┘   └─────┬─────┘   └─────────┘  │
//!   ◀─────────────────┼── streamed back       │ reads liveness       │
//!                     │                 ┌─────┴─────┐                │
//!                     │                 │  health   │── probes ──────┼──▶ Backends
//!                     │                 │  checker  │                │
//!                     │                 └───────────┘                │
//!                     └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use rr_balancer::config::{loader, BackendConfig, BalancerConfig};
use rr_balancer::lifecycle::startup;
use rr_balancer::observability::logging;

#[derive(Parser)]
#[command(name = "rr-balancer")]
#[command(about = "Round-robin HTTP load balancer with health checks", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address (e.g. 0.0.0.0:8000).
    #[arg(short, long)]
    listen: Option<String>,

    /// Backend address; repeat for several. Replaces configured backends.
    #[arg(short, long = "backend")]
    backends: Vec<String>,

    /// Override observability.log_level.
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn into_config(self) -> Result<BalancerConfig, loader::ConfigError> {
        let mut config = match &self.config {
            Some(path) => loader::read_config(path)?,
            None => BalancerConfig::default(),
        };
        if let Some(listen) = self.listen {
            config.listener.bind_address = listen;
        }
        if !self.backends.is_empty() {
            config.backends = self.backends.into_iter().map(BackendConfig::new).collect();
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Cli::parse().into_config()?;

    logging::init(&config.observability)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        backends = config.backends.len(),
        health_checks = config.health_check.enabled,
        retries = config.retries.enabled,
        "rr-balancer starting"
    );

    if let Err(e) = startup::run(config).await {
        tracing::error!(error = %e, "Startup failed");
        return Err(e.into());
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
