mod models;

pub use crate::models::*;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read configuration file '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Could not parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Lifecycle of the room's play-through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SessionState {
    #[default]
    Pending,
    Running,
    Stopped,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Stopped => "STOPPED",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of everything the server knows at one point in time.
///
/// A `ServerState` is never modified once built. Transitions go through
/// [`ServerState::next`], which hands back the very same `Arc` when nothing
/// changed so callers can detect changes with [`Arc::ptr_eq`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerState {
    session_state: SessionState,
    station_status: StationStatusMap,
    #[serde(skip)]
    config: Arc<RoomConfig>,
}

impl ServerState {
    /// Initial state of a freshly started server.
    pub fn new(config: RoomConfig) -> Self {
        ServerState {
            session_state: SessionState::Pending,
            station_status: StationStatusMap::new(),
            config: Arc::new(config),
        }
    }

    pub fn from_parts(
        session_state: SessionState,
        station_status: StationStatusMap,
        config: Arc<RoomConfig>,
    ) -> Self {
        ServerState {
            session_state,
            station_status,
            config,
        }
    }

    pub fn session_state(&self) -> SessionState {
        self.session_state
    }

    pub fn station_status(&self) -> &StationStatusMap {
        &self.station_status
    }

    pub fn config(&self) -> &Arc<RoomConfig> {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.session_state == SessionState::Running
    }

    /// Build the state that follows `self`.
    ///
    /// Returns a clone of `self` (same allocation) if every field equals the
    /// current one, a brand-new snapshot otherwise.
    pub fn next(
        self: &Arc<Self>,
        session_state: SessionState,
        station_status: StationStatusMap,
        config: Arc<RoomConfig>,
    ) -> Arc<Self> {
        if self.session_state == session_state
            && self.station_status == station_status
            && self.config == config
        {
            return Arc::clone(self);
        }
        Arc::new(ServerState::from_parts(
            session_state,
            station_status,
            config,
        ))
    }

    /// Same session and config, different station status.
    pub fn with_station_status(self: &Arc<Self>, station_status: StationStatusMap) -> Arc<Self> {
        self.next(
            self.session_state,
            station_status,
            Arc::clone(&self.config),
        )
    }
}
