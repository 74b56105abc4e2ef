//! Broker link orchestrator.
//!
//! Owns the MQTT client task, keeps the fixed topic set subscribed across
//! reconnects, and forwards inbound messages to the alert machine's channel
//! without exposing MQTT internals to the binary.

use super::client::{BrokerEvent, MqttClient, TopicMessage};
use crate::config::MqttConfig;
use crate::error::{AlertError, Result};
use log::{info, warn};
use rumqttc::{AsyncClient, QoS};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// One connection to the broker plus the topic set to keep subscribed.
pub struct BrokerLink {
    config: MqttConfig,
    topics: Vec<String>,
}

/// Handle for a running link.
pub struct LinkHandle {
    client: AsyncClient,
    task: JoinHandle<()>,
}

impl LinkHandle {
    /// Release the connection. Idempotent, and safe to call even if the
    /// connection was never established.
    pub async fn disconnect(self) {
        let _ = self.client.disconnect().await;
        self.task.abort();
    }
}

impl BrokerLink {
    pub fn new(config: MqttConfig, topics: impl IntoIterator<Item = String>) -> Self {
        Self {
            config,
            topics: topics.into_iter().collect(),
        }
    }

    /// Connect and start delivering messages on the returned channel.
    ///
    /// The link task keeps running across reconnects. It ends when the
    /// receiver is dropped, or when the transport fails with reconnect
    /// disabled; either way the failure is logged, never fatal.
    pub fn start(self) -> (mpsc::Receiver<TopicMessage>, LinkHandle) {
        let (out_tx, out_rx) = mpsc::channel(64);
        let client = MqttClient::new(&self.config);
        let handle = client.handle();
        let task = tokio::spawn(async move {
            if let Err(e) = self.run(client, out_tx).await {
                warn!("Broker link stopped: {}", e);
            }
        });
        (out_rx, LinkHandle {
            client: handle,
            task,
        })
    }

    async fn run(self, client: MqttClient, out: mpsc::Sender<TopicMessage>) -> Result<()> {
        info!(
            "Connecting to {}:{} as {}",
            self.config.broker_host, self.config.broker_port, self.config.client_id
        );

        let subscriber = client.handle();
        let reconnect = self.config.reconnect;

        let (event_tx, mut event_rx) = mpsc::channel::<BrokerEvent>(64);
        let client_task = tokio::spawn(client.run(event_tx));

        // Bound the initial connection attempt so a dead broker is reported
        // instead of hanging.
        let connect_deadline = tokio::time::sleep(CONNECT_TIMEOUT);
        tokio::pin!(connect_deadline);
        let mut deadline_armed = true;
        let mut connected_once = false;

        loop {
            tokio::select! {
                _ = &mut connect_deadline, if deadline_armed && !connected_once => {
                    deadline_armed = false;
                    if !reconnect {
                        client_task.abort();
                        return Err(AlertError::ConnectionFailed(format!(
                            "no connection within {:?}",
                            CONNECT_TIMEOUT
                        )));
                    }
                    warn!("No connection after {:?}, retrying in the background", CONNECT_TIMEOUT);
                }
                event = event_rx.recv() => match event {
                    Some(BrokerEvent::Connected) => {
                        connected_once = true;
                        info!("Connected, subscribing to {} topic(s)", self.topics.len());
                        for topic in &self.topics {
                            match subscriber.subscribe(topic, QoS::AtMostOnce).await {
                                Ok(()) => info!("Subscribed to {}", topic),
                                Err(e) => warn!("Failed to subscribe to {}: {}", topic, e),
                            }
                        }
                    }
                    Some(BrokerEvent::Message(message)) => {
                        // Receiver dropped means the binary is shutting down
                        if out.send(message).await.is_err() {
                            break;
                        }
                    }
                    Some(BrokerEvent::ConnectionLost { reason }) => {
                        warn!("Connection lost: {}", reason);
                        if !reconnect {
                            client_task.abort();
                            return Err(if connected_once {
                                AlertError::TransportLost(reason)
                            } else {
                                AlertError::ConnectionFailed(reason)
                            });
                        }
                    }
                    None => break,
                },
            }
        }

        client_task.abort();
        Ok(())
    }
}
