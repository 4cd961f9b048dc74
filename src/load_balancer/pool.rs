//! Backend pool management.
//!
//! # Responsibilities
//! - Build the ordered, fixed-size set of backends from configuration
//! - Refuse to exist when empty
//! - Share backends with the scheduler and the health checker

use std::sync::Arc;

use crate::config::{BackendConfig, TimeoutConfig};
use crate::load_balancer::backend::{AddressError, Backend};

/// Error building a pool.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("backend pool is empty")]
    Empty,

    #[error("invalid backend address {address:?}: {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: AddressError,
    },
}

/// An ordered, non-empty sequence of backends. Fixed after construction.
#[derive(Debug)]
pub struct BackendPool {
    backends: Vec<Arc<Backend>>,
}

impl BackendPool {
    /// Create a pool. Fails with [`PoolError::Empty`] when `backends` is empty.
    pub fn new(backends: Vec<Backend>) -> Result<Self, PoolError> {
        if backends.is_empty() {
            return Err(PoolError::Empty);
        }
        Ok(Self {
            backends: backends.into_iter().map(Arc::new).collect(),
        })
    }

    /// Create a pool from configuration, keeping configured order.
    pub fn from_config(
        configs: &[BackendConfig],
        timeouts: &TimeoutConfig,
    ) -> Result<Self, PoolError> {
        let backends = configs
            .iter()
            .map(|config| {
                Backend::new(&config.address, timeouts).map_err(|source| {
                    PoolError::InvalidAddress {
                        address: config.address.clone(),
                        source,
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let pool = Self::new(backends)?;
        for (index, backend) in pool.backends.iter().enumerate() {
            tracing::info!(index, backend = %backend.address(), "Backend registered");
        }
        Ok(pool)
    }

    /// All backends, in rotation order.
    pub fn backends(&self) -> &[Arc<Backend>] {
        &self.backends
    }

    /// Number of backends (always ≥ 1).
    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Number of backends currently believed alive.
    pub fn alive_count(&self) -> usize {
        self.backends.iter().filter(|b| b.is_alive()).count()
    }
}
