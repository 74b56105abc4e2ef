//! Broker link: MQTT connection lifecycle and message delivery.

mod client;
mod link;

pub use client::{BrokerEvent, MqttClient, TopicMessage};
pub use link::{BrokerLink, LinkHandle};
