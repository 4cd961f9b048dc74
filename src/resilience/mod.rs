//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to backend:
//!     → timeouts.rs (deadline on the upstream response)
//!     → On failure: retries.rs (optionally retry once on a fresh backend)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Retries are opt-in and bounded

pub mod retries;
pub mod timeouts;
