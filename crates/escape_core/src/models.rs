use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::ConfigError;

/// Sensor rules of one station, keyed by sensor id.
pub type StationSensors = BTreeMap<String, SensorRule>;

/// Status records of the stations that completed during the current session.
pub type StationStatusMap = BTreeMap<String, StationStatus>;

/// The part of the configuration that drives the room logic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoomConfig {
    #[serde(default)]
    pub station_configs: BTreeMap<String, StationSensors>,
    /// Sound played when a session starts running
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_start_sound: Option<String>,
    /// Sound played when a session is stopped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_stop_sound: Option<String>,
}

impl RoomConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn station(&self, station_id: &str) -> Option<&StationSensors> {
        self.station_configs.get(station_id)
    }
}

/// A configured condition and effect for one sensor of a station.
///
/// Only `event_type` is structural, every other field is specific to the
/// event type and is read on demand by the rule evaluators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorRule {
    pub event_type: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl SensorRule {
    pub fn new(event_type: impl Into<String>) -> Self {
        SensorRule {
            event_type: event_type.into(),
            fields: Map::new(),
        }
    }

    pub fn with_field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(name.to_owned(), value.into());
        self
    }

    /// Return a rule field, treating an explicit `null` as absent.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name).filter(|value| !value.is_null())
    }

    pub fn sound_on_trigger(&self) -> Option<&str> {
        self.field("sound_on_trigger")
            .and_then(Value::as_str)
            .filter(|sound| !sound.is_empty())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationStatus {
    pub completed: bool,
}

impl StationStatus {
    pub const COMPLETED: StationStatus = StationStatus { completed: true };
}
