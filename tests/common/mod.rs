//! Shared mock backends and balancer harness for integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    http::{HeaderMap, HeaderValue, Method, StatusCode, Uri},
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::StreamExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use rr_balancer::config::{BackendConfig, BalancerConfig, ProbeKind};
use rr_balancer::load_balancer::BackendPool;
use rr_balancer::{HttpServer, Shutdown};

/// Serve `router` on an ephemeral port.
pub async fn spawn_backend(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    addr
}

/// A backend that answers every request with its own name.
pub async fn named_backend(name: &'static str) -> SocketAddr {
    spawn_backend(Router::new().fallback(move || async move { name })).await
}

/// A backend that echoes method, URI, `x-test`, `x-request-id` and body.
pub async fn echo_backend() -> SocketAddr {
    async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> impl IntoResponse {
        let mut out = HeaderMap::new();
        out.insert("x-echo-method", HeaderValue::from_str(method.as_str()).unwrap());
        out.insert("x-echo-uri", HeaderValue::from_str(&uri.to_string()).unwrap());
        if let Some(v) = headers.get("x-test") {
            out.insert("x-echo-test", v.clone());
        }
        if let Some(v) = headers.get("x-request-id") {
            out.insert("x-echo-request-id", v.clone());
        }
        (StatusCode::CREATED, out, body)
    }
    spawn_backend(Router::new().fallback(echo)).await
}

/// A backend whose `/health` is 200 while `healthy` is set, 500 otherwise.
pub async fn toggle_backend(healthy: Arc<AtomicBool>) -> SocketAddr {
    let router = Router::new().route(
        "/health",
        get(move || {
            let healthy = healthy.clone();
            async move {
                if healthy.load(Ordering::SeqCst) {
                    (StatusCode::OK, "ok")
                } else {
                    (StatusCode::INTERNAL_SERVER_ERROR, "dead")
                }
            }
        }),
    );
    spawn_backend(router).await
}

/// A backend that waits `delay` before answering.
pub async fn slow_backend(delay: Duration) -> SocketAddr {
    spawn_backend(Router::new().fallback(move || async move {
        tokio::time::sleep(delay).await;
        "late"
    }))
    .await
}

/// Sets its flag when dropped.
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// A backend whose handler never finishes in test time. `dropped` is set
/// once the handler future is dropped.
pub async fn hanging_backend(dropped: Arc<AtomicBool>) -> SocketAddr {
    spawn_backend(Router::new().fallback(move || {
        let guard = DropFlag(dropped.clone());
        async move {
            let _guard = guard;
            tokio::time::sleep(Duration::from_secs(10)).await;
            "finished"
        }
    }))
    .await
}

/// A backend that sends headers and a first chunk, then never sends more.
pub async fn stalled_body_backend() -> SocketAddr {
    spawn_backend(Router::new().fallback(|| async {
        let first = futures_util::stream::once(async { Ok::<_, std::io::Error>(Bytes::from("part")) });
        Body::from_stream(first.chain(futures_util::stream::pending()))
    }))
    .await
}

/// A raw TCP backend that writes `response` verbatim to every connection.
pub async fn raw_backend(response: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let mut buf = [0u8; 1024];
                        let _ = socket.read(&mut buf).await;
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });
    addr
}

/// An address nothing is listening on.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Config for the given backends with checks off and short timeouts.
pub fn config_for(backends: &[SocketAddr]) -> BalancerConfig {
    let mut config = BalancerConfig::default();
    config.backends = backends
        .iter()
        .map(|addr| BackendConfig::new(format!("http://{}", addr)))
        .collect();
    config.health_check.enabled = false;
    config.health_check.probe = ProbeKind::Tcp;
    config.health_check.interval_ms = 50;
    config.health_check.timeout_ms = 200;
    config.timeouts.connect_ms = 500;
    config.timeouts.request_ms = 2_000;
    config
}

pub struct Balancer {
    pub addr: SocketAddr,
    pub pool: Arc<BackendPool>,
    pub shutdown: Shutdown,
}

impl Balancer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for Balancer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start a balancer on an ephemeral port.
pub async fn start_balancer(mut config: BalancerConfig) -> Balancer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    config.listener.bind_address = addr.to_string();

    let server = HttpServer::new(config).unwrap();
    let pool = server.pool().clone();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    Balancer {
        addr,
        pool,
        shutdown,
    }
}

/// Poll until `check` holds, panicking after a few seconds.
pub async fn wait_until(mut check: impl FnMut() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("condition not reached in time");
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .build()
        .unwrap()
}
