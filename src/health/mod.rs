//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     Periodic timer (or on-demand check_all)
//!     → Probe each backend concurrently (TCP connect or HTTP 2xx)
//!     → Update state.rs per backend
//!
//! State (state.rs):
//!     Alive ←→ Dead
//!     One failed probe kills, one successful probe revives
//! ```
//!
//! # Design Decisions
//! - The request path never writes liveness; only probes do
//! - Probe errors are swallowed into "dead" and never propagate
//! - Health state is per-backend, read lock-free by the scheduler

pub mod active;
pub mod state;

pub use active::HealthChecker;
pub use state::HealthState;
