//! Evaluation of configured sensor rules against incoming station events.
//!
//! Each event type the room understands has an evaluator. Event types
//! without one are accepted in the configuration but never fire.

use std::borrow::Cow;

use escape_core::SensorRule;
use serde_json::Value;

use crate::payload::Payload;

pub const BEACON_PROXIMITY: &str = "beacon_proximity";
pub const DOOR_STATUS: &str = "door_status";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleEvaluator {
    /// Fires when the reported `range` is at most the rule's `range_threshold`.
    BeaconProximity,
    /// Fires when the reported `status` equals the rule's `trigger_value`,
    /// ignoring case.
    DoorStatus,
    Unrecognized,
}

/// Result of checking one sensor rule against one event payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation<'r> {
    Triggered { sound_file: &'r str, reason: String },
    NotTriggered,
    /// A field the rule needs is missing from the payload or the rule.
    Incomplete,
    /// A field is present but unusable.
    Malformed(String),
    Unsupported,
}

impl RuleEvaluator {
    pub fn for_event_type(event_type: &str) -> Self {
        match event_type {
            BEACON_PROXIMITY => Self::BeaconProximity,
            DOOR_STATUS => Self::DoorStatus,
            _ => Self::Unrecognized,
        }
    }

    pub fn evaluate<'r>(self, rule: &'r SensorRule, payload: &Payload) -> Evaluation<'r> {
        match self {
            Self::BeaconProximity => beacon_proximity(rule, payload),
            Self::DoorStatus => door_status(rule, payload),
            Self::Unrecognized => Evaluation::Unsupported,
        }
    }
}

fn beacon_proximity<'r>(rule: &'r SensorRule, payload: &Payload) -> Evaluation<'r> {
    let (Some(range), Some(threshold), Some(sound_file)) = (
        payload_field(payload, "range"),
        rule.field("range_threshold"),
        rule.sound_on_trigger(),
    ) else {
        return Evaluation::Incomplete;
    };

    let range = match as_number(range) {
        Ok(range) => range,
        Err(error) => return Evaluation::Malformed(format!("range {error}")),
    };
    let threshold = match as_number(threshold) {
        Ok(threshold) => threshold,
        Err(error) => return Evaluation::Malformed(format!("range_threshold {error}")),
    };

    if range <= threshold {
        Evaluation::Triggered {
            sound_file,
            reason: format!("range {range} <= {threshold}"),
        }
    } else {
        Evaluation::NotTriggered
    }
}

fn door_status<'r>(rule: &'r SensorRule, payload: &Payload) -> Evaluation<'r> {
    let (Some(status), Some(trigger_value), Some(sound_file)) = (
        payload_field(payload, "status"),
        rule.field("trigger_value"),
        rule.sound_on_trigger(),
    ) else {
        return Evaluation::Incomplete;
    };

    let status = as_text(status);
    let trigger_value = as_text(trigger_value);
    if status.to_uppercase() == trigger_value.to_uppercase() {
        Evaluation::Triggered {
            sound_file,
            reason: format!("status {status} == {trigger_value}"),
        }
    } else {
        Evaluation::NotTriggered
    }
}

fn payload_field<'p>(payload: &'p Payload, name: &str) -> Option<&'p Value> {
    payload.get(name).filter(|value| !value.is_null())
}

/// Numbers may arrive as JSON numbers or as numeric strings.
fn as_number(value: &Value) -> Result<f64, String> {
    match value {
        Value::Number(number) => number
            .as_f64()
            .ok_or_else(|| format!("{number} is out of range")),
        Value::String(text) => text
            .trim()
            .parse()
            .map_err(|_| format!("{text:?} is not a number")),
        other => Err(format!("{other} is not a number")),
    }
}

fn as_text(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(text) => Cow::Borrowed(text),
        other => Cow::Owned(other.to_string()),
    }
}
