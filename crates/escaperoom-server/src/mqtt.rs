//! MQTT side of the server, built on rumqttc.
//!
//! The event loop runs in its own task and forwards every received publish to
//! the dispatcher's inbound channel. Outbound publishes are queued on the
//! client without waiting for the broker.

use std::ops::ControlFlow;
use std::time::Duration;

use escape_engine::topics::SUBSCRIPTIONS;
use escape_engine::{InboundMessage, Transport, TransportError};
use rumqttc::{
    AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Outgoing, Packet, Publish, QoS,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::MqttBroker;

/// Requests the client may queue before `try_publish` starts failing
const REQUEST_CAPACITY: usize = 64;

pub struct MqttTransport {
    client: AsyncClient,
}

impl MqttTransport {
    pub fn disconnect(&self) {
        if let Err(error) = self.client.try_disconnect() {
            tracing::warn!(%error, "Could not disconnect cleanly from the MQTT broker");
        }
    }
}

impl Transport for MqttTransport {
    fn publish(&self, topic: &str, payload: Vec<u8>, retain: bool) -> Result<(), TransportError> {
        self.client
            .try_publish(topic, QoS::AtLeastOnce, retain, payload)
            .map_err(|error| TransportError::Publish {
                topic: topic.to_owned(),
                reason: error.to_string(),
            })
    }
}

pub fn options(broker: &MqttBroker) -> MqttOptions {
    let client_id = format!("{}{}", broker.client_id_prefix, std::process::id());
    let mut options = MqttOptions::new(client_id, broker.host.clone(), broker.port);
    options.set_keep_alive(Duration::from_secs(broker.keepalive_secs.max(1)));
    options
}

/// Starts the connection to the broker.
///
/// Connection failures are retried until `inbound` is closed, so the returned
/// transport is usable right away even if the broker is not reachable yet.
pub fn connect(
    broker: &MqttBroker,
    inbound: mpsc::Sender<InboundMessage>,
) -> (MqttTransport, JoinHandle<()>) {
    tracing::info!(host = %broker.host, port = broker.port, "Connecting to MQTT broker");
    let (client, event_loop) = AsyncClient::new(options(broker), REQUEST_CAPACITY);
    let reconnect_delay = Duration::from_secs(broker.reconnect_delay_secs);
    let task = tokio::spawn(run_event_loop(
        client.clone(),
        event_loop,
        inbound,
        reconnect_delay,
    ));
    (MqttTransport { client }, task)
}

async fn run_event_loop(
    client: AsyncClient,
    mut event_loop: EventLoop,
    inbound: mpsc::Sender<InboundMessage>,
    reconnect_delay: Duration,
) {
    loop {
        match event_loop.poll().await {
            Ok(event) => {
                if on_event(event, &client, &inbound).await.is_break() {
                    break;
                }
            }
            Err(error) => {
                if inbound.is_closed() {
                    break;
                }
                tracing::warn!(
                    %error,
                    retry_in_secs = reconnect_delay.as_secs(),
                    "MQTT connection error"
                );
                tokio::time::sleep(reconnect_delay).await;
            }
        }
    }
}

/// Breaks once the client has sent its Disconnect or the dispatcher is gone.
async fn on_event(
    event: Event,
    client: &AsyncClient,
    inbound: &mpsc::Sender<InboundMessage>,
) -> ControlFlow<()> {
    match event {
        Event::Incoming(Packet::ConnAck(ack)) if ack.code == ConnectReturnCode::Success => {
            tracing::info!("Connected to MQTT broker");
            // Subscriptions are not kept across reconnects.
            subscribe(client);
        }
        Event::Incoming(Packet::ConnAck(ack)) => {
            tracing::error!(code = ?ack.code, "MQTT broker refused the connection");
        }
        Event::Incoming(Packet::Publish(publish)) => {
            if inbound.send(inbound_message(&publish)).await.is_err() {
                tracing::debug!("Dispatcher is gone, stopping MQTT event loop");
                return ControlFlow::Break(());
            }
        }
        Event::Incoming(Packet::Disconnect) => {
            tracing::warn!("MQTT broker closed the connection");
        }
        Event::Outgoing(Outgoing::Disconnect) => {
            tracing::info!("Disconnected from MQTT broker");
            return ControlFlow::Break(());
        }
        _ => {}
    }
    ControlFlow::Continue(())
}

fn subscribe(client: &AsyncClient) {
    for filter in SUBSCRIPTIONS {
        match client.try_subscribe(filter, QoS::AtLeastOnce) {
            Ok(()) => tracing::info!(filter, "Subscribed"),
            Err(error) => tracing::error!(filter, %error, "Could not subscribe"),
        }
    }
}

fn inbound_message(publish: &Publish) -> InboundMessage {
    InboundMessage {
        topic: publish.topic.clone(),
        payload: publish.payload.to_vec(),
    }
}
