//! MQTT topic namespace of the room.

/// Session lifecycle commands.
pub const CONTROL_TOPIC: &str = "escaperoom/server/control";

/// Subscription filter matching every station event.
pub const STATION_EVENT_FILTER: &str = "escaperoom/station/+/event/+";

/// Everything the server subscribes to.
pub const SUBSCRIPTIONS: [&str; 2] = [CONTROL_TOPIC, STATION_EVENT_FILTER];

/// A topic of the form `escaperoom/station/<station_id>/event/<event_type>`.
///
/// Segments may be empty; an empty station id is then a configuration miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StationTopic<'a> {
    pub station_id: &'a str,
    pub event_type: &'a str,
}

impl<'a> StationTopic<'a> {
    pub fn parse(topic: &'a str) -> Option<Self> {
        let segments: Vec<&str> = topic.split('/').collect();
        match *segments.as_slice() {
            ["escaperoom", "station", station_id, "event", event_type] => Some(StationTopic {
                station_id,
                event_type,
            }),
            _ => None,
        }
    }
}
