use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use escape_core::ServerState;
use tokio::sync::{mpsc, watch};

use crate::control::ControlMessageHandler;
use crate::handler::MessageHandler;
use crate::payload::decode_payload;
use crate::ports::{AudioPlayer, ConfigSource, Transport};
use crate::station::StationEventHandler;

/// A raw message as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The payload could not be decoded.
    Dropped,
    /// No handler claimed the message.
    Unhandled,
    Unchanged { handler: &'static str },
    Updated { handler: &'static str },
    /// The handler failed; the previous state was kept.
    Faulted { handler: &'static str },
}

/// Owner of the current server state.
///
/// Messages are offered to the handlers in order and the first handler that
/// claims a message is the only one to process it. Committed states are
/// published to every [`Dispatcher::subscribe`]r.
pub struct Dispatcher {
    state: Arc<ServerState>,
    handlers: Vec<Box<dyn MessageHandler>>,
    transport: Arc<dyn Transport>,
    snapshots: watch::Sender<Arc<ServerState>>,
}

impl Dispatcher {
    pub fn new(
        initial: ServerState,
        handlers: Vec<Box<dyn MessageHandler>>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let state = Arc::new(initial);
        let (snapshots, _) = watch::channel(Arc::clone(&state));
        Dispatcher {
            state,
            handlers,
            transport,
            snapshots,
        }
    }

    /// Dispatcher with the room's handler chain: control commands first,
    /// then station events.
    pub fn with_room_handlers(
        initial: ServerState,
        transport: Arc<dyn Transport>,
        config_source: Arc<dyn ConfigSource>,
        audio: Arc<dyn AudioPlayer>,
    ) -> Self {
        let handlers: Vec<Box<dyn MessageHandler>> = vec![
            Box::new(ControlMessageHandler::new(config_source, Arc::clone(&audio))),
            Box::new(StationEventHandler::new(audio)),
        ];
        Self::new(initial, handlers, transport)
    }

    pub fn state(&self) -> &Arc<ServerState> {
        &self.state
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<ServerState>> {
        self.snapshots.subscribe()
    }

    pub fn dispatch(&mut self, topic: &str, raw: &[u8]) -> DispatchOutcome {
        tracing::info!(topic, payload = %String::from_utf8_lossy(raw), "Received message");
        let payload = match decode_payload(raw) {
            Ok(payload) => payload,
            Err(error) => {
                tracing::error!(topic, %error, "Could not decode payload, dropping message");
                return DispatchOutcome::Dropped;
            }
        };

        let current = Arc::clone(&self.state);
        for handler in &self.handlers {
            let name = handler.name();
            let claimed = panic::catch_unwind(AssertUnwindSafe(|| {
                handler.can_handle(topic, &payload, &current)
            }));
            match claimed {
                Ok(true) => {}
                Ok(false) => continue,
                Err(panic) => {
                    tracing::error!(
                        topic,
                        handler = name,
                        panic = panic_message(&*panic),
                        "Handler panicked while inspecting message, dropping message"
                    );
                    return DispatchOutcome::Faulted { handler: name };
                }
            }

            tracing::debug!(topic, handler = name, "Handling message");
            let handled = panic::catch_unwind(AssertUnwindSafe(|| {
                handler.handle(topic, &payload, self.transport.as_ref(), &current)
            }));
            return match handled {
                Ok(Ok(next)) if Arc::ptr_eq(&next, &current) => {
                    tracing::debug!(handler = name, "Message processed without state change");
                    DispatchOutcome::Unchanged { handler: name }
                }
                Ok(Ok(next)) => {
                    tracing::debug!(
                        handler = name,
                        session_state = %next.session_state(),
                        "State updated"
                    );
                    self.state = Arc::clone(&next);
                    self.snapshots.send_replace(next);
                    DispatchOutcome::Updated { handler: name }
                }
                Ok(Err(error)) => {
                    tracing::error!(topic, handler = name, %error, "Handler failed, dropping message");
                    DispatchOutcome::Faulted { handler: name }
                }
                Err(panic) => {
                    tracing::error!(
                        topic,
                        handler = name,
                        panic = panic_message(&*panic),
                        "Handler panicked, dropping message"
                    );
                    DispatchOutcome::Faulted { handler: name }
                }
            };
        }

        tracing::warn!(topic, "Received message on unhandled topic");
        DispatchOutcome::Unhandled
    }

    /// Process inbound messages one at a time until `shutdown` resolves or
    /// the transport side of the channel goes away.
    ///
    /// A message being dispatched when shutdown is requested is finished
    /// first. Returns the last committed state.
    pub async fn run(
        mut self,
        mut inbound: mpsc::Receiver<InboundMessage>,
        shutdown: impl Future<Output = ()>,
    ) -> Arc<ServerState> {
        tokio::pin!(shutdown);
        tracing::info!("Dispatcher running, waiting for messages");
        loop {
            tokio::select! {
                biased;
                () = &mut shutdown => {
                    tracing::info!("Shutdown requested, dispatcher stopping");
                    break;
                }
                message = inbound.recv() => match message {
                    Some(InboundMessage { topic, payload }) => {
                        self.dispatch(&topic, &payload);
                    }
                    None => {
                        tracing::info!("Inbound channel closed, dispatcher stopping");
                        break;
                    }
                },
            }
        }
        self.state
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
