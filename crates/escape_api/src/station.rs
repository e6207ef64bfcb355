use axum::{Json, extract::State};
use escape_core::{RoomConfig, StationStatusMap};
use serde::{Deserialize, Serialize};

use crate::Snapshots;

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationStatusResponse {
    pub stations: StationStatusMap,
}

/// Get the room configuration currently in use
pub async fn get_station_config(State(snapshots): State<Snapshots>) -> Json<RoomConfig> {
    tracing::debug!("Getting station configuration");
    let config = snapshots.borrow().config().clone();
    Json(config.as_ref().clone())
}

/// Get the status of every station that completed during this session
pub async fn get_station_status(State(snapshots): State<Snapshots>) -> Json<StationStatusResponse> {
    tracing::debug!("Getting station status");
    let stations = snapshots.borrow().station_status().clone();
    Json(StationStatusResponse { stations })
}
