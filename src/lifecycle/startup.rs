//! Startup orchestration.
//!
//! Order: validate config → build pool (fail fast) → metrics → bind →
//! serve with health checker until a termination signal.

use std::net::SocketAddr;

use tokio::net::TcpListener;

use crate::config::validation::{validate_config, ValidationError};
use crate::config::BalancerConfig;
use crate::http::HttpServer;
use crate::lifecycle::Shutdown;
use crate::load_balancer::PoolError;
use crate::observability::metrics;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("invalid configuration: {}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "))]
    Config(Vec<ValidationError>),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(std::io::Error),
}

/// Boot the balancer and serve until SIGINT/SIGTERM.
pub async fn run(config: BalancerConfig) -> Result<(), StartupError> {
    validate_config(&config).map_err(StartupError::Config)?;

    let server = HttpServer::new(config.clone())?;

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let address = config.listener.bind_address.clone();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind { address, source })?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    shutdown.trigger_on_signal();

    server
        .run(listener, server_shutdown)
        .await
        .map_err(StartupError::Serve)
}
