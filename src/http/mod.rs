//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → dispatcher.rs (pick backend, forward, retry policy)
//!     → request.rs (upstream request: hop-by-hop stripped, X-Forwarded-For)
//!     → response.rs (relay backend response, or map error to status)
//!     → Send to client
//! ```

pub mod dispatcher;
pub mod request;
pub mod response;
pub mod server;

pub use dispatcher::Dispatcher;
pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use server::HttpServer;
