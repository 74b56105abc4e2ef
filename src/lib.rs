//! fire-watch library.
//!
//! A headless MQTT client for a household fire-alert system: it subscribes
//! to a fire topic and a sensor topic, drives the alert state machine, and
//! delegates notification and sound playback to collaborator traits.

pub mod alert;
pub mod broker;
pub mod config;
pub mod error;
pub mod instance_lock;
