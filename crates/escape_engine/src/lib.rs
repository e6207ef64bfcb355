//! Message dispatch and state transitions of the escape room server.
//!
//! Inbound bus messages go through the [`Dispatcher`], which offers them to an
//! ordered chain of [`MessageHandler`]s. Handlers never modify the current
//! [`escape_core::ServerState`]; they return either the same snapshot or a
//! new one.

mod control;
mod dispatcher;
mod handler;
mod payload;
mod ports;
mod rules;
mod station;
pub mod topics;

#[cfg(test)]
mod testing;

pub use crate::control::{ControlAction, ControlMessageHandler};
pub use crate::dispatcher::{DispatchOutcome, Dispatcher, InboundMessage};
pub use crate::handler::{HandlerError, MessageHandler};
pub use crate::payload::{DecodeError, Payload, decode_payload};
pub use crate::ports::{AudioPlayer, ConfigSource, Transport, TransportError};
pub use crate::rules::{Evaluation, RuleEvaluator};
pub use crate::station::StationEventHandler;
