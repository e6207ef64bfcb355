use std::sync::Arc;

use escape_core::ServerState;
use thiserror::Error;

use crate::payload::Payload;
use crate::ports::Transport;

#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("Topic '{topic}' is not a station event topic")]
    MalformedTopic { topic: String },
}

/// One link of the dispatch chain.
///
/// The dispatcher asks every handler in turn whether it wants a message and
/// gives the message to the first one that does.
pub trait MessageHandler: Send {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    fn can_handle(&self, topic: &str, payload: &Payload, state: &ServerState) -> bool;

    /// Process the message and return the state that follows `state`.
    ///
    /// Must return `state` itself (an `Arc` clone of it) when nothing changed
    /// and a new snapshot otherwise. `state` is never modified.
    fn handle(
        &self,
        topic: &str,
        payload: &Payload,
        transport: &dyn Transport,
        state: &Arc<ServerState>,
    ) -> Result<Arc<ServerState>, HandlerError>;
}
