//! Fakes for the collaborator traits and a log recorder, shared by the unit
//! tests of this crate.

use std::fmt;
use std::sync::{Arc, Mutex};

use escape_core::{
    ConfigError, RoomConfig, SensorRule, ServerState, SessionState, StationStatusMap,
};
use serde_json::Value;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::Registry;

use crate::payload::Payload;
use crate::ports::{AudioPlayer, ConfigSource, Transport, TransportError};

#[derive(Default)]
pub(crate) struct RecordingAudio {
    played: Mutex<Vec<String>>,
}

impl RecordingAudio {
    pub(crate) fn played(&self) -> Vec<String> {
        self.played.lock().unwrap().clone()
    }
}

impl AudioPlayer for RecordingAudio {
    fn play(&self, sound_file: &str) {
        self.played.lock().unwrap().push(sound_file.to_owned());
    }
}

#[derive(Default)]
pub(crate) struct RecordingTransport {
    published: Mutex<Vec<(String, Value, bool)>>,
    offline: bool,
}

impl RecordingTransport {
    /// A transport whose every publish fails.
    pub(crate) fn offline() -> Self {
        RecordingTransport {
            offline: true,
            ..Default::default()
        }
    }

    pub(crate) fn published(&self) -> Vec<(String, Value, bool)> {
        self.published.lock().unwrap().clone()
    }
}

impl Transport for RecordingTransport {
    fn publish(&self, topic: &str, payload: Vec<u8>, retain: bool) -> Result<(), TransportError> {
        if self.offline {
            return Err(TransportError::Publish {
                topic: topic.to_owned(),
                reason: "not connected".into(),
            });
        }
        let payload = serde_json::from_slice(&payload).unwrap();
        self.published
            .lock()
            .unwrap()
            .push((topic.to_owned(), payload, retain));
        Ok(())
    }
}

/// Serves a fixed configuration, or a corrupt document when built with
/// [`StaticConfigSource::corrupt`].
pub(crate) struct StaticConfigSource {
    json: String,
}

impl StaticConfigSource {
    pub(crate) fn new(config: &RoomConfig) -> Self {
        StaticConfigSource {
            json: serde_json::to_string(config).unwrap(),
        }
    }

    pub(crate) fn corrupt() -> Self {
        StaticConfigSource {
            json: r#"{"station_configs": {"s1": "#.into(),
        }
    }
}

impl ConfigSource for StaticConfigSource {
    fn load(&self) -> Result<RoomConfig, ConfigError> {
        RoomConfig::from_json_str(&self.json)
    }
}

/// `s1` has a beacon with threshold 5 and a door triggered by `OPEN`.
pub(crate) fn room_config() -> RoomConfig {
    let mut config = RoomConfig::default();
    config.station_configs.insert(
        "s1".into(),
        [
            (
                "beacon".to_owned(),
                SensorRule::new("beacon_proximity")
                    .with_field("range_threshold", 5)
                    .with_field("sound_on_trigger", "beep.wav"),
            ),
            (
                "door".to_owned(),
                SensorRule::new("door_status")
                    .with_field("trigger_value", "OPEN")
                    .with_field("sound_on_trigger", "creak.wav"),
            ),
        ]
        .into(),
    );
    config
}

pub(crate) fn state_in(session_state: SessionState) -> Arc<ServerState> {
    Arc::new(ServerState::from_parts(
        session_state,
        StationStatusMap::new(),
        Arc::new(room_config()),
    ))
}

pub(crate) fn payload(value: Value) -> Payload {
    match value {
        Value::Object(map) => map,
        other => panic!("Expected an object, got {other}"),
    }
}

/// Log events recorded while running a closure under [`capture_logs`].
#[derive(Clone, Default)]
pub(crate) struct CapturedLogs(Arc<Mutex<Vec<(Level, String)>>>);

impl CapturedLogs {
    pub(crate) fn count(&self, level: Level) -> usize {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|(event_level, _)| *event_level == level)
            .count()
    }

    pub(crate) fn contains(&self, level: Level, needle: &str) -> bool {
        self.0
            .lock()
            .unwrap()
            .iter()
            .any(|(event_level, message)| *event_level == level && message.contains(needle))
    }
}

struct CaptureLayer(CapturedLogs);

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut message = MessageVisitor::default();
        event.record(&mut message);
        let CaptureLayer(CapturedLogs(events)) = self;
        events
            .lock()
            .unwrap()
            .push((*event.metadata().level(), message.0));
    }
}

#[derive(Default)]
struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

pub(crate) fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, CapturedLogs) {
    let logs = CapturedLogs::default();
    let subscriber = Registry::default().with(CaptureLayer(logs.clone()));
    let output = tracing::subscriber::with_default(subscriber, f);
    (output, logs)
}
