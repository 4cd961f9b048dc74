//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the backend pool, scheduler and dispatcher from config
//! - Create the Axum router: every method and path goes to the dispatcher
//! - Wire up middleware (request ID, tracing)
//! - Spawn the health checker and optional admin API
//! - Serve until the shutdown signal, then drain

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{body::Body, extract::State, http::Request, response::Response, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{request_id::SetRequestIdLayer, trace::TraceLayer};

use crate::admin;
use crate::config::BalancerConfig;
use crate::health::HealthChecker;
use crate::http::dispatcher::Dispatcher;
use crate::http::request::{MakeRequestUuid, X_REQUEST_ID};
use crate::load_balancer::{BackendPool, PoolError, Scheduler};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
}

/// HTTP server for the load balancer.
pub struct HttpServer {
    router: Router,
    config: BalancerConfig,
    pool: Arc<BackendPool>,
}

impl HttpServer {
    /// Create a new HTTP server. Fails when the backend pool cannot be built.
    pub fn new(config: BalancerConfig) -> Result<Self, PoolError> {
        let pool = Arc::new(BackendPool::from_config(&config.backends, &config.timeouts)?);
        let scheduler = Arc::new(Scheduler::new(pool.clone()));
        let dispatcher = Arc::new(Dispatcher::new(scheduler, &config.retries));

        let router = Self::build_router(AppState { dispatcher });
        Ok(Self {
            router,
            config,
            pool,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .fallback(proxy_handler)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
                    .layer(TraceLayer::new_for_http()),
            )
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            backends = self.pool.len(),
            "HTTP server starting"
        );

        if self.config.health_check.enabled {
            let checker = HealthChecker::new(self.pool.clone(), self.config.health_check.clone());
            tokio::spawn(checker.run(shutdown.resubscribe()));
        }

        if self.config.admin.enabled {
            let admin_config = self.config.admin.clone();
            let pool = self.pool.clone();
            let admin_shutdown = shutdown.resubscribe();
            tokio::spawn(async move {
                if let Err(e) = admin::serve(admin_config, pool, admin_shutdown).await {
                    tracing::error!(error = %e, "Admin API stopped");
                }
            });
        }

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn pool(&self) -> &Arc<BackendPool> {
        &self.pool
    }
}

/// Catch-all handler: every request is dispatched to a backend.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    state.dispatcher.handle(request).await
}
