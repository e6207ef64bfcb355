use std::borrow::Cow;
use std::sync::Arc;

use escape_core::{ServerState, StationStatus};

use crate::handler::{HandlerError, MessageHandler};
use crate::payload::Payload;
use crate::ports::{AudioPlayer, Transport};
use crate::rules::{Evaluation, RuleEvaluator};
use crate::topics::StationTopic;

/// Matches station sensor events against the configured rules while a
/// session is running.
pub struct StationEventHandler {
    audio: Arc<dyn AudioPlayer>,
}

impl StationEventHandler {
    pub fn new(audio: Arc<dyn AudioPlayer>) -> Self {
        StationEventHandler { audio }
    }
}

impl MessageHandler for StationEventHandler {
    fn name(&self) -> &'static str {
        "StationEventHandler"
    }

    fn can_handle(&self, topic: &str, _payload: &Payload, state: &ServerState) -> bool {
        if StationTopic::parse(topic).is_none() {
            return false;
        }
        if !state.is_running() {
            tracing::debug!(
                topic,
                session_state = %state.session_state(),
                "Ignoring station event, session is not RUNNING"
            );
            return false;
        }
        true
    }

    fn handle(
        &self,
        topic: &str,
        payload: &Payload,
        _transport: &dyn Transport,
        state: &Arc<ServerState>,
    ) -> Result<Arc<ServerState>, HandlerError> {
        let StationTopic {
            station_id,
            event_type,
        } = StationTopic::parse(topic).ok_or_else(|| HandlerError::MalformedTopic {
            topic: topic.to_owned(),
        })?;

        let config = state.config();
        let Some(sensors) = config.station(station_id) else {
            tracing::debug!(station_id, "No configuration found for station");
            return Ok(Arc::clone(state));
        };

        let evaluator = RuleEvaluator::for_event_type(event_type);
        // Copied on the first change only
        let mut station_status = Cow::Borrowed(state.station_status());

        for (sensor_id, rule) in sensors
            .iter()
            .filter(|(_, rule)| rule.event_type == event_type)
        {
            let sensor_id = sensor_id.as_str();
            match evaluator.evaluate(rule, payload) {
                Evaluation::Triggered { sound_file, reason } => {
                    tracing::info!(station_id, sensor_id, event_type, %reason, "Sensor rule triggered");
                    self.audio.play(sound_file);
                    if station_status.get(station_id) != Some(&StationStatus::COMPLETED) {
                        tracing::info!(station_id, "Station completed");
                        station_status
                            .to_mut()
                            .insert(station_id.to_owned(), StationStatus::COMPLETED);
                    }
                }
                Evaluation::NotTriggered => {
                    tracing::debug!(station_id, sensor_id, event_type, "Sensor rule not triggered");
                }
                Evaluation::Incomplete => {
                    tracing::warn!(
                        station_id,
                        sensor_id,
                        event_type,
                        "Incomplete configuration or payload for sensor rule"
                    );
                }
                Evaluation::Malformed(problem) => {
                    tracing::error!(station_id, sensor_id, event_type, %problem, "Invalid value for sensor rule");
                }
                Evaluation::Unsupported => {
                    tracing::debug!(station_id, sensor_id, event_type, "No logic defined for event type");
                }
            }
        }

        match station_status {
            Cow::Owned(station_status) => Ok(state.with_station_status(station_status)),
            Cow::Borrowed(_) => Ok(Arc::clone(state)),
        }
    }
}
