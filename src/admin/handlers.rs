use axum::{extract::State, Json};
use serde::Serialize;

use crate::admin::AdminState;
use crate::health::HealthState;

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub backends: usize,
    pub alive: usize,
}

#[derive(Debug, Serialize)]
pub struct BackendStatus {
    pub index: usize,
    pub address: String,
    pub state: HealthState,
    pub alive: bool,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let alive = state.pool.alive_count();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: if alive > 0 { "operational" } else { "unavailable" },
        backends: state.pool.len(),
        alive,
    })
}

pub async fn get_backends(State(state): State<AdminState>) -> Json<Vec<BackendStatus>> {
    let statuses = state
        .pool
        .backends()
        .iter()
        .enumerate()
        .map(|(index, b)| BackendStatus {
            index,
            address: b.address().to_string(),
            state: b.health_state(),
            alive: b.is_alive(),
        })
        .collect();

    Json(statuses)
}
