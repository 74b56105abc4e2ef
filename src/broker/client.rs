//! MQTT client wrapper around rumqttc.

use crate::config::MqttConfig;
use log::{debug, error};
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, Publish, Transport};
use std::time::Duration;
use tokio::sync::mpsc;

/// Message received from the broker.
#[derive(Debug, Clone)]
pub struct TopicMessage {
    pub topic: String,
    pub payload: String,
}

impl TopicMessage {
    /// Decode a publish packet.
    ///
    /// The payload is decoded lossily: the fire topic is presence-only, so
    /// a binary payload must still reach the alert machine, and a sensor
    /// payload mangled by the replacement character fails JSON parsing
    /// downstream and is discarded there.
    fn from_publish(publish: &Publish) -> Self {
        Self {
            topic: publish.topic.clone(),
            payload: String::from_utf8_lossy(&publish.payload).into_owned(),
        }
    }
}

/// Lifecycle and traffic events emitted by the client task.
#[derive(Debug)]
pub enum BrokerEvent {
    /// CONNACK received; subscriptions must be (re)established.
    Connected,
    Message(TopicMessage),
    ConnectionLost { reason: String },
}

/// Owns the rumqttc connection and translates its packets into
/// [`BrokerEvent`]s.
pub struct MqttClient {
    client: AsyncClient,
    event_loop: EventLoop,
    reconnect: bool,
}

impl MqttClient {
    /// Create a new MQTT client from configuration.
    pub fn new(config: &MqttConfig) -> Self {
        let mut options =
            MqttOptions::new(&config.client_id, &config.broker_host, config.broker_port);
        options.set_keep_alive(Duration::from_secs(30));

        if config.use_tls {
            options.set_transport(Transport::tls_with_default_config());
        }

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            options.set_credentials(username, password);
        }

        let (client, event_loop) = AsyncClient::new(options, 100);

        Self {
            client,
            event_loop,
            reconnect: config.reconnect,
        }
    }

    /// Clone of the async handle for subscribing and publishing from
    /// other tasks.
    pub fn handle(&self) -> AsyncClient {
        self.client.clone()
    }

    /// Drive the event loop, forwarding events to the channel.
    ///
    /// Messages are forwarded in the order the transport delivers them.
    /// Returns when the receiver is dropped, or after the first transport
    /// error when reconnect is disabled.
    pub async fn run(mut self, tx: mpsc::Sender<BrokerEvent>) {
        loop {
            match self.event_loop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    if tx.send(BrokerEvent::Connected).await.is_err() {
                        break;
                    }
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    let message = TopicMessage::from_publish(&publish);
                    debug!("Received message on {}: {}", message.topic, message.payload);

                    if tx.send(BrokerEvent::Message(message)).await.is_err() {
                        error!("Broker event channel closed");
                        break;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    let reason = e.to_string();
                    if tx.send(BrokerEvent::ConnectionLost { reason }).await.is_err() {
                        break;
                    }
                    if !self.reconnect {
                        break;
                    }
                    // rumqttc reconnects on the next poll; pace the retries
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rumqttc::QoS;

    #[test]
    fn binary_payload_is_still_delivered() {
        let publish = Publish::new("casa/incendio", QoS::AtMostOnce, vec![0xff, 0xfe]);
        let message = TopicMessage::from_publish(&publish);
        assert_eq!(message.topic, "casa/incendio");
        // Lossy decode keeps the message routable; content is replaced
        assert!(!message.payload.is_empty());
    }

    #[test]
    fn text_payload_decodes_unchanged() {
        let publish = Publish::new(
            "casa/sensores",
            QoS::AtMostOnce,
            r#"{"temperatura":23,"umidade":55}"#.as_bytes().to_vec(),
        );
        let message = TopicMessage::from_publish(&publish);
        assert_eq!(message.payload, r#"{"temperatura":23,"umidade":55}"#);
    }
}
