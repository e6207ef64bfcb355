//! Interfaces of the collaborators the engine drives but does not own.

use escape_core::{ConfigError, RoomConfig};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Could not publish on '{topic}': {reason}")]
    Publish { topic: String, reason: String },
}

/// Outbound side of the publish/subscribe bus.
///
/// Implementations must not block: the dispatcher calls this while it holds
/// the only copy of the current state.
pub trait Transport: Send + Sync {
    fn publish(&self, topic: &str, payload: Vec<u8>, retain: bool) -> Result<(), TransportError>;
}

/// Fire-and-forget sound playback.
///
/// Playback failures (missing file, player errors) are the implementation's
/// business and never reach the caller.
pub trait AudioPlayer: Send + Sync {
    fn play(&self, sound_file: &str);
}

/// Where `reload_config` gets a fresh room configuration from.
pub trait ConfigSource: Send + Sync {
    fn load(&self) -> Result<RoomConfig, ConfigError>;
}
