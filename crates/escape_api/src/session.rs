use axum::{Json, extract::State};
use escape_core::{SessionState, StationStatusMap};
use serde::{Deserialize, Serialize};

use crate::Snapshots;

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub session_state: SessionState,
    pub station_status: StationStatusMap,
}

/// Get the current session state together with the station progress
pub async fn get_session(State(snapshots): State<Snapshots>) -> Json<SessionResponse> {
    tracing::debug!("Getting session state");
    let state = snapshots.borrow().clone();
    Json(SessionResponse {
        session_state: state.session_state(),
        station_status: state.station_status().clone(),
    })
}
