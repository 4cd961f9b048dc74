//! Request dispatch.
//!
//! # Flow
//! ```text
//! inbound request
//!     → Scheduler::next()          (503 if nothing is alive)
//!     → Backend::forward()         (streamed back on success)
//!     → on Unreachable/Timeout:    retry on a fresh backend if enabled
//!     → otherwise                  502 / 504
//! ```
//!
//! Nothing is kept once `handle` returns. The upstream call lives inside the
//! handler future, so a client that disconnects cancels it.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::body::{Body, Bytes};
use axum::extract::ConnectInfo;
use axum::http::request::Parts;
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use http_body_util::{BodyExt, LengthLimitError, Limited};

use crate::config::RetryConfig;
use crate::error::DispatchError;
use crate::http::request::{prepare_upstream_request, request_id};
use crate::http::response::relay;
use crate::load_balancer::Scheduler;
use crate::observability::metrics;
use crate::resilience::retries::RetryPolicy;

#[derive(Debug)]
pub struct Dispatcher {
    scheduler: Arc<Scheduler>,
    retry: RetryPolicy,
    max_buffered_body_bytes: usize,
}

impl Dispatcher {
    pub fn new(scheduler: Arc<Scheduler>, retries: &RetryConfig) -> Self {
        Self {
            scheduler,
            retry: RetryPolicy::from_config(retries),
            max_buffered_body_bytes: retries.max_buffered_body_bytes,
        }
    }

    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    /// Serve one inbound request. Never fails: errors become responses.
    pub async fn handle(&self, request: Request<Body>) -> Response {
        let start = Instant::now();
        let client = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        let (parts, body) = request.into_parts();
        let method = parts.method.to_string();

        match self.dispatch(&parts, body, client).await {
            Ok((response, backend)) => {
                metrics::record_request(&method, response.status().as_u16(), &backend, start);
                response
            }
            Err(err) => {
                let backend = err.backend().unwrap_or("none").to_string();
                let response = err.into_response();
                metrics::record_request(&method, response.status().as_u16(), &backend, start);
                response
            }
        }
    }

    async fn dispatch(
        &self,
        parts: &Parts,
        body: Body,
        client: Option<SocketAddr>,
    ) -> Result<(Response, String), DispatchError> {
        let request_id = request_id(&parts.headers);

        // A retry must replay the body, so buffer it only when retries are on.
        let (mut streaming, replay) = if self.retry.is_enabled() {
            (None, Some(self.buffer_body(body).await?))
        } else {
            (Some(body), None)
        };

        let mut attempt = 0;
        loop {
            attempt += 1;

            let selection = match self.scheduler.next() {
                Ok(selection) => selection,
                Err(e) => {
                    tracing::warn!(request_id = %request_id, error = %e, "No backend available");
                    metrics::record_no_backend();
                    return Err(e.into());
                }
            };
            let backend = selection.backend;

            let body = match (&replay, streaming.take()) {
                (Some(bytes), _) => Body::from(bytes.clone()),
                (None, Some(body)) => body,
                (None, None) => Body::empty(),
            };
            let upstream = prepare_upstream_request(parts, body, client);

            match backend.forward(upstream).await {
                Ok(response) => {
                    tracing::info!(
                        request_id = %request_id,
                        method = %parts.method,
                        path = %parts.uri.path(),
                        backend = %backend.address(),
                        index = selection.index,
                        status = %response.status(),
                        attempt,
                        "Forwarded request"
                    );
                    return Ok((relay(response), backend.address().to_string()));
                }
                Err(e) if self.retry.should_retry(attempt, &e) => {
                    tracing::warn!(
                        request_id = %request_id,
                        backend = %backend.address(),
                        error = %e,
                        attempt,
                        "Upstream failed, retrying on next backend"
                    );
                    metrics::record_retry(backend.address());
                }
                Err(e) => {
                    tracing::error!(
                        request_id = %request_id,
                        backend = %backend.address(),
                        error = %e,
                        attempt,
                        "Upstream request failed"
                    );
                    return Err(e.into());
                }
            }
        }
    }

    async fn buffer_body(&self, body: Body) -> Result<Bytes, DispatchError> {
        let limit = self.max_buffered_body_bytes;
        match Limited::new(body, limit).collect().await {
            Ok(collected) => Ok(collected.to_bytes()),
            Err(e) if e.is::<LengthLimitError>() => Err(DispatchError::BodyTooLarge { limit }),
            Err(e) => Err(DispatchError::BodyRead(e)),
        }
    }
}
