//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap backend calls with a deadline
//! - Cancel operations cleanly on timeout (the inner future is dropped)
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from other errors
//! - Timed-out requests return 504 Gateway Timeout

use std::future::Future;
use std::time::Duration;

pub use tokio::time::error::Elapsed;

/// Run `fut` to completion or fail once `deadline` has passed.
pub async fn with_deadline<F>(deadline: Duration, fut: F) -> Result<F::Output, Elapsed>
where
    F: Future,
{
    tokio::time::timeout(deadline, fut).await
}
