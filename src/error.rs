//! Request-path error taxonomy.
//!
//! Every variant is recoverable: the dispatcher turns it into an HTTP
//! response (see `http::response`) and the serving task carries on.

use axum::http::StatusCode;

use crate::load_balancer::{SchedulerError, UpstreamError};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    NoBackend(#[from] SchedulerError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("request body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("failed to read request body: {0}")]
    BodyRead(BoxError),
}

impl DispatchError {
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::NoBackend(_) => StatusCode::SERVICE_UNAVAILABLE,
            DispatchError::Upstream(UpstreamError::Timeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
            DispatchError::Upstream(_) => StatusCode::BAD_GATEWAY,
            DispatchError::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            DispatchError::BodyRead(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// The backend involved, if one was selected.
    pub fn backend(&self) -> Option<&str> {
        match self {
            DispatchError::Upstream(e) => Some(e.address()),
            _ => None,
        }
    }
}
