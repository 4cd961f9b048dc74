//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → round_robin.rs (claim cursor slot, skip dead backends)
//!     → pool.rs (fixed, ordered backends)
//!     → backend.rs (forward over the backend's own client)
//!     → Return streaming response or UpstreamError
//! ```
//!
//! # Design Decisions
//! - Pool is fixed at startup and never empty
//! - Only the rotation cursor and per-backend liveness are mutable
//! - Liveness is read-only here; the health checker writes it

pub mod backend;
pub mod pool;
pub mod round_robin;

pub use backend::{Backend, UpstreamError};
pub use pool::{BackendPool, PoolError};
pub use round_robin::{Scheduler, SchedulerError, Selection};
