//! Backend liveness state.
//!
//! # States
//! - Unknown: never probed; treated as alive so a pool without active
//!   checks still serves traffic
//! - Alive: last probe succeeded
//! - Dead: last probe failed; excluded from selection
//!
//! # State Transitions
//! ```text
//! Unknown/Alive → Dead: one failed probe
//! Unknown/Dead  → Alive: one successful probe
//! ```

use serde::Serialize;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Unknown = 0,
    Alive = 1,
    Dead = 2,
}

impl HealthState {
    /// Whether the scheduler may select a backend in this state.
    pub fn is_alive(self) -> bool {
        self != HealthState::Dead
    }

    pub fn from_probe(healthy: bool) -> Self {
        if healthy {
            HealthState::Alive
        } else {
            HealthState::Dead
        }
    }
}

impl From<u8> for HealthState {
    fn from(val: u8) -> Self {
        match val {
            1 => HealthState::Alive,
            2 => HealthState::Dead,
            _ => HealthState::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_counts_as_alive() {
        assert!(HealthState::Unknown.is_alive());
        assert!(HealthState::Alive.is_alive());
        assert!(!HealthState::Dead.is_alive());
    }

    #[test]
    fn test_u8_round_trip() {
        for state in [HealthState::Unknown, HealthState::Alive, HealthState::Dead] {
            assert_eq!(HealthState::from(state as u8), state);
        }
        assert_eq!(HealthState::from(42), HealthState::Unknown);
    }
}
