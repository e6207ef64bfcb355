use std::sync::Arc;

use escape_core::{ServerState, SessionState, StationStatusMap};
use serde_json::Value;

use crate::handler::{HandlerError, MessageHandler};
use crate::payload::Payload;
use crate::ports::{AudioPlayer, ConfigSource, Transport};
use crate::topics::CONTROL_TOPIC;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    Start,
    Stop,
    Reset,
    ReloadConfig,
}

impl ControlAction {
    pub fn parse(action: &str) -> Option<Self> {
        match action {
            "start" => Some(Self::Start),
            "stop" => Some(Self::Stop),
            "reset" => Some(Self::Reset),
            "reload_config" => Some(Self::ReloadConfig),
            _ => None,
        }
    }
}

/// Drives the session lifecycle from commands on the control topic.
pub struct ControlMessageHandler {
    config_source: Arc<dyn ConfigSource>,
    audio: Arc<dyn AudioPlayer>,
}

impl ControlMessageHandler {
    pub fn new(config_source: Arc<dyn ConfigSource>, audio: Arc<dyn AudioPlayer>) -> Self {
        ControlMessageHandler {
            config_source,
            audio,
        }
    }

    fn start(&self, state: &Arc<ServerState>) -> Arc<ServerState> {
        if state.is_running() {
            tracing::warn!("Received start command, but session is already RUNNING");
            return Arc::clone(state);
        }
        tracing::info!("Escape room session STARTED");
        state.next(
            SessionState::Running,
            StationStatusMap::new(),
            Arc::clone(state.config()),
        )
    }

    fn stop(&self, state: &Arc<ServerState>) -> Arc<ServerState> {
        tracing::info!("Escape room session STOPPED");
        state.next(
            SessionState::Stopped,
            StationStatusMap::new(),
            Arc::clone(state.config()),
        )
    }

    fn reset(&self, state: &Arc<ServerState>) -> Arc<ServerState> {
        tracing::info!("Escape room session RESET to PENDING state");
        state.next(
            SessionState::Pending,
            StationStatusMap::new(),
            Arc::clone(state.config()),
        )
    }

    fn reload_config(&self, state: &Arc<ServerState>) -> Arc<ServerState> {
        if !state.is_running() {
            tracing::warn!(
                session_state = %state.session_state(),
                "Ignoring reload_config command, session must be RUNNING"
            );
            return Arc::clone(state);
        }

        tracing::info!("Reloading configuration");
        match self.config_source.load() {
            Ok(config) => {
                let next = state.next(
                    state.session_state(),
                    state.station_status().clone(),
                    Arc::new(config),
                );
                if Arc::ptr_eq(&next, state) {
                    tracing::info!("Configuration reloaded, nothing changed");
                } else {
                    tracing::info!("Configuration successfully reloaded");
                }
                next
            }
            Err(error) => {
                tracing::error!(%error, "Failed to reload configuration, keeping the previous one");
                Arc::clone(state)
            }
        }
    }

    /// Play the cue of the session state just entered, if one is configured.
    fn play_session_cue(&self, state: &ServerState) {
        let config = state.config();
        let cue = match state.session_state() {
            SessionState::Running => config.session_start_sound.as_deref(),
            SessionState::Stopped => config.session_stop_sound.as_deref(),
            SessionState::Pending => None,
        };
        if let Some(sound_file) = cue {
            self.audio.play(sound_file);
        }
    }
}

impl MessageHandler for ControlMessageHandler {
    fn name(&self) -> &'static str {
        "ControlMessageHandler"
    }

    fn can_handle(&self, topic: &str, _payload: &Payload, _state: &ServerState) -> bool {
        topic == CONTROL_TOPIC
    }

    fn handle(
        &self,
        _topic: &str,
        payload: &Payload,
        _transport: &dyn Transport,
        state: &Arc<ServerState>,
    ) -> Result<Arc<ServerState>, HandlerError> {
        let action = payload.get("action");
        let next = match action.and_then(Value::as_str).and_then(ControlAction::parse) {
            Some(ControlAction::Start) => self.start(state),
            Some(ControlAction::Stop) => self.stop(state),
            Some(ControlAction::Reset) => self.reset(state),
            Some(ControlAction::ReloadConfig) => self.reload_config(state),
            None => {
                let action = action.map_or_else(|| "<missing>".to_owned(), Value::to_string);
                tracing::warn!(%action, "Unknown control action received");
                Arc::clone(state)
            }
        };

        if next.session_state() != state.session_state() {
            self.play_session_cue(&next);
        }
        Ok(next)
    }
}
