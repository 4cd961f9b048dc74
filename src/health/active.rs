//! Active health checking.
//!
//! # Responsibilities
//! - Periodically (or on demand) probe every backend
//! - Flip backend liveness on the first contrary result
//! - Never let one backend's probe hold up another's

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, Uri};
use futures_util::future::join_all;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::time::{self, MissedTickBehavior};

use crate::config::{HealthCheckConfig, ProbeKind};
use crate::load_balancer::{Backend, BackendPool};
use crate::observability::metrics;
use crate::resilience::timeouts::with_deadline;

const USER_AGENT: &str = "rr-balancer-health-check";

pub struct HealthChecker {
    pool: Arc<BackendPool>,
    config: HealthCheckConfig,
    client: Client<HttpConnector, Body>,
}

impl HealthChecker {
    pub fn new(pool: Arc<BackendPool>, config: HealthCheckConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_millis(config.timeout_ms)));
        let client = Client::builder(TokioExecutor::new())
            .pool_max_idle_per_host(0)
            .build(connector);

        Self {
            pool,
            config,
            client,
        }
    }

    /// Probe until a shutdown signal arrives. The first round runs immediately.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Active health checks disabled");
            return;
        }

        tracing::info!(
            interval_ms = self.config.interval_ms,
            timeout_ms = self.config.timeout_ms,
            probe = ?self.config.probe,
            path = %self.config.path,
            "Health checker starting"
        );

        let mut ticker = time::interval(Duration::from_millis(self.config.interval_ms));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check_all().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health checker received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Probe every backend once, concurrently, and apply the results.
    pub async fn check_all(&self) {
        let rounds = self.pool.backends().iter().map(|backend| async move {
            let healthy = self.probe(backend).await;
            self.apply(backend, healthy);
        });
        join_all(rounds).await;
    }

    /// One liveness check within the configured timeout. Any error means dead.
    pub async fn probe(&self, backend: &Backend) -> bool {
        let timeout = Duration::from_millis(self.config.timeout_ms);
        match self.config.probe {
            ProbeKind::Tcp => self.probe_tcp(backend, timeout).await,
            ProbeKind::Http => self.probe_http(backend, timeout).await,
        }
    }

    async fn probe_tcp(&self, backend: &Backend, timeout: Duration) -> bool {
        let addr = backend.authority().as_str();
        match with_deadline(timeout, TcpStream::connect(addr)).await {
            Ok(Ok(_stream)) => true,
            Ok(Err(e)) => {
                tracing::debug!(backend = %backend.address(), error = %e, "TCP probe failed");
                false
            }
            Err(_) => {
                tracing::debug!(backend = %backend.address(), "TCP probe timed out");
                false
            }
        }
    }

    async fn probe_http(&self, backend: &Backend, timeout: Duration) -> bool {
        let uri = match self
            .config
            .path
            .parse::<Uri>()
            .map_err(axum::http::Error::from)
            .and_then(|path| backend.upstream_uri(&path))
        {
            Ok(uri) => uri,
            Err(e) => {
                tracing::error!(backend = %backend.address(), error = %e, "Failed to build health check URI");
                return false;
            }
        };

        let request = match Request::builder()
            .method(Method::GET)
            .uri(uri)
            .header(header::USER_AGENT, USER_AGENT)
            .body(Body::empty())
        {
            Ok(req) => req,
            Err(e) => {
                tracing::error!(error = %e, "Failed to build health check request");
                return false;
            }
        };

        match with_deadline(timeout, self.client.request(request)).await {
            Ok(Ok(response)) => {
                let success = response.status().is_success();
                if !success {
                    tracing::debug!(backend = %backend.address(), status = %response.status(), "HTTP probe failed: non-success status");
                }
                success
            }
            Ok(Err(e)) => {
                tracing::debug!(backend = %backend.address(), error = %e, "HTTP probe failed: connection error");
                false
            }
            Err(_) => {
                tracing::debug!(backend = %backend.address(), "HTTP probe failed: timeout");
                false
            }
        }
    }

    fn apply(&self, backend: &Backend, healthy: bool) {
        if backend.set_alive(healthy) {
            if healthy {
                tracing::info!(backend = %backend.address(), "Backend is alive again");
            } else {
                tracing::warn!(backend = %backend.address(), "Backend marked dead");
            }
        } else {
            tracing::trace!(backend = %backend.address(), healthy, "Probe result unchanged");
        }
        metrics::record_backend_health(backend.address(), healthy);
    }
}
