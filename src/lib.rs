//! Round-robin HTTP load balancer with active health checking.

pub mod admin;
pub mod config;
pub mod error;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;
pub mod resilience;

pub use config::schema::BalancerConfig;
pub use error::DispatchError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
