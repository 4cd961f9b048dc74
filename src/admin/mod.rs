//! Read-only admin API.
//!
//! Served on its own listener: the dispatching listener forwards every path,
//! so nothing can be mounted there.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{middleware, routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::config::AdminConfig;
use crate::load_balancer::BackendPool;

use self::auth::admin_auth_middleware;
use self::handlers::{get_backends, get_status};

#[derive(Clone)]
pub struct AdminState {
    pub pool: Arc<BackendPool>,
    pub api_key: Arc<str>,
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/backends", get(get_backends))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}

/// Bind the admin listener and serve until `shutdown` fires.
pub async fn serve(
    config: AdminConfig,
    pool: Arc<BackendPool>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), std::io::Error> {
    let listener = TcpListener::bind(&config.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Admin API listening");

    let router = setup_admin_router(AdminState {
        pool,
        api_key: config.api_key.into(),
    });

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BackendConfig, TimeoutConfig};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn router() -> (Router, Arc<BackendPool>) {
        let pool = Arc::new(
            BackendPool::from_config(
                &[BackendConfig::new("127.0.0.1:8001"), BackendConfig::new("127.0.0.1:8002")],
                &TimeoutConfig::default(),
            )
            .unwrap(),
        );
        let state = AdminState {
            pool: pool.clone(),
            api_key: "secret".into(),
        };
        (setup_admin_router(state), pool)
    }

    #[tokio::test]
    async fn test_requires_token() {
        let (router, _) = router();
        let response = router
            .oneshot(Request::get("/admin/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_backends_report_liveness() {
        let (router, pool) = router();
        pool.backends()[1].set_alive(false);

        let response = router
            .oneshot(
                Request::get("/admin/backends")
                    .header("authorization", "Bearer secret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json[0]["address"], "127.0.0.1:8001");
        assert_eq!(json[0]["state"], "unknown");
        assert_eq!(json[0]["alive"], true);
        assert_eq!(json[1]["state"], "dead");
        assert_eq!(json[1]["alive"], false);
    }
}
