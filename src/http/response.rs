//! Response handling and transformation.
//!
//! # Responsibilities
//! - Relay the backend response to the client, body still streaming
//! - Strip hop-by-hop headers from the backend response
//! - Map dispatch errors to HTTP status codes
//!
//! # Design Decisions
//! - Status, end-to-end headers and body of a backend response are untouched
//! - No backend alive → 503; timeout → 504; other upstream failures → 502

use axum::body::Body;
use axum::http::{header, HeaderValue, Response as HttpResponse};
use axum::response::{IntoResponse, Response};

use crate::error::DispatchError;
use crate::http::request::remove_hop_by_hop_headers;

/// Prepare a backend response for the client.
pub fn relay(response: HttpResponse<Body>) -> Response {
    let (mut parts, body) = response.into_parts();
    remove_hop_by_hop_headers(&mut parts.headers);
    Response::from_parts(parts, body)
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = format!("{}: {}\n", status, self);
        let mut response = (status, body).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_balancer::SchedulerError;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_no_backend_response() {
        let err: DispatchError = SchedulerError::NoBackendAvailable { pool_size: 3 }.into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("no alive backend among 3"), "{}", text);
    }

    #[test]
    fn test_relay_strips_hop_by_hop() {
        let upstream = HttpResponse::builder()
            .status(StatusCode::CREATED)
            .header("connection", "close")
            .header("x-backend", "a")
            .body(Body::empty())
            .unwrap();
        let response = relay(upstream);
        assert_eq!(response.status(), StatusCode::CREATED);
        assert!(response.headers().get("connection").is_none());
        assert_eq!(response.headers()["x-backend"], "a");
    }
}
