//! The alert state machine.
//!
//! Consumes broker messages for the fire and sensor topics, owns the
//! client-visible alert state, and suppresses duplicate alarm triggers.
//! Side effects (notification, alert sound) go through the collaborator
//! traits and are fire-and-forget.

use crate::alert::{Notifier, SoundPlayer};
use crate::broker::TopicMessage;
use crate::config::TopicConfig;
use log::{debug, info, warn};
use serde::Deserialize;
use std::sync::Arc;

/// Snapshot of the client-visible alert state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertState {
    pub fire_active: bool,
    /// Last temperature reading (°C), if any arrived yet.
    pub temperature: Option<f64>,
    /// Last humidity reading (%), if any arrived yet.
    pub humidity: Option<f64>,
}

/// The two phases of the alert machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertPhase {
    Calm,
    Alarmed,
}

/// Periodic reading published on the sensor topic.
#[derive(Debug, Deserialize)]
struct SensorReading {
    #[serde(default)]
    temperatura: Option<f64>,
    #[serde(default)]
    umidade: Option<f64>,
}

/// Alert state machine driven by broker messages and operator commands.
///
/// `fire_active` is the single source of truth for the alarm; there is no
/// separate suppression flag that could drift out of sync with it. All
/// entry points are infallible: unparseable input is logged and dropped.
pub struct AlertMachine {
    topics: TopicConfig,
    state: AlertState,
    notifier: Arc<dyn Notifier>,
    sound: Arc<dyn SoundPlayer>,
}

impl AlertMachine {
    pub fn new(
        topics: TopicConfig,
        notifier: Arc<dyn Notifier>,
        sound: Arc<dyn SoundPlayer>,
    ) -> Self {
        Self {
            topics,
            state: AlertState::default(),
            notifier,
            sound,
        }
    }

    /// Apply one inbound broker message.
    ///
    /// Messages on topics outside the configured pair are ignored.
    pub fn handle(&mut self, message: &TopicMessage) {
        if message.topic == self.topics.fire {
            self.on_fire_trigger();
        } else if message.topic == self.topics.sensor {
            self.on_sensor_reading(&message.payload);
        } else {
            debug!("Ignoring message on unexpected topic {}", message.topic);
        }
    }

    /// Operator-initiated return to `Calm`, stopping the alert sound.
    /// A no-op while already calm.
    pub fn reset(&mut self) {
        if !self.state.fire_active {
            debug!("Reset requested while calm, nothing to do");
            return;
        }
        self.state.fire_active = false;
        self.sound.stop();
        info!("Alarm reset, back to calm");
    }

    pub fn phase(&self) -> AlertPhase {
        if self.state.fire_active {
            AlertPhase::Alarmed
        } else {
            AlertPhase::Calm
        }
    }

    /// Snapshot read of the current state. No side effects.
    pub fn snapshot(&self) -> AlertState {
        self.state.clone()
    }

    fn on_fire_trigger(&mut self) {
        if self.state.fire_active {
            // Sensors re-publish the trigger while the hazard persists;
            // re-notifying and restarting the sound would be noise.
            debug!("Duplicate fire trigger suppressed");
            return;
        }
        self.state.fire_active = true;
        warn!("Fire detected, raising alarm");
        self.notifier.notify("Fire alert", "Fire detected at home");
        self.sound.play(true);
    }

    fn on_sensor_reading(&mut self, payload: &str) {
        let reading = match serde_json::from_str::<SensorReading>(payload) {
            Ok(reading) => reading,
            Err(e) => {
                warn!("Discarding malformed sensor payload: {}", e);
                return;
            }
        };
        let (Some(temperature), Some(humidity)) = (reading.temperatura, reading.umidade) else {
            warn!("Discarding sensor payload with missing fields");
            return;
        };
        self.state.temperature = Some(temperature);
        self.state.humidity = Some(humidity);
        debug!("Sensor reading: {:.1}°C, {:.1}%", temperature, humidity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingNotifier {
        calls: Mutex<Vec<(String, String)>>,
    }

    impl RecordingNotifier {
        fn count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, title: &str, body: &str) {
            self.calls
                .lock()
                .unwrap()
                .push((title.to_string(), body.to_string()));
        }
    }

    #[derive(Default)]
    struct RecordingPlayer {
        plays: Mutex<Vec<bool>>,
        stops: Mutex<usize>,
    }

    impl RecordingPlayer {
        fn plays(&self) -> Vec<bool> {
            self.plays.lock().unwrap().clone()
        }

        fn stops(&self) -> usize {
            *self.stops.lock().unwrap()
        }
    }

    impl SoundPlayer for RecordingPlayer {
        fn play(&self, looped: bool) {
            self.plays.lock().unwrap().push(looped);
        }

        fn stop(&self) {
            *self.stops.lock().unwrap() += 1;
        }
    }

    fn machine() -> (AlertMachine, Arc<RecordingNotifier>, Arc<RecordingPlayer>) {
        let notifier = Arc::new(RecordingNotifier::default());
        let player = Arc::new(RecordingPlayer::default());
        let topics = TopicConfig {
            fire: "casa/incendio".to_string(),
            sensor: "casa/sensores".to_string(),
        };
        let machine = AlertMachine::new(topics, notifier.clone(), player.clone());
        (machine, notifier, player)
    }

    fn fire_message() -> TopicMessage {
        TopicMessage {
            topic: "casa/incendio".to_string(),
            payload: "1".to_string(),
        }
    }

    fn sensor_message(payload: &str) -> TopicMessage {
        TopicMessage {
            topic: "casa/sensores".to_string(),
            payload: payload.to_string(),
        }
    }

    #[test]
    fn starts_calm_with_no_readings() {
        let (machine, _, _) = machine();
        assert_eq!(machine.phase(), AlertPhase::Calm);
        assert_eq!(machine.snapshot(), AlertState::default());
    }

    #[test]
    fn first_fire_trigger_raises_alarm() {
        let (mut machine, notifier, player) = machine();
        machine.handle(&fire_message());
        assert_eq!(machine.phase(), AlertPhase::Alarmed);
        assert!(machine.snapshot().fire_active);
        assert_eq!(notifier.count(), 1);
        assert_eq!(player.plays(), vec![true]);
    }

    #[test]
    fn fire_trigger_payload_content_is_ignored() {
        // The fire topic is presence-only; even a payload that arrived as
        // binary garbage must raise the alarm
        let (mut machine, notifier, _) = machine();
        machine.handle(&TopicMessage {
            topic: "casa/incendio".to_string(),
            payload: "\u{FFFD}\u{FFFD}".to_string(),
        });
        assert_eq!(machine.phase(), AlertPhase::Alarmed);
        assert_eq!(notifier.count(), 1);
    }

    #[test]
    fn duplicate_fire_triggers_are_suppressed() {
        let (mut machine, notifier, player) = machine();
        for _ in 0..3 {
            machine.handle(&fire_message());
        }
        assert_eq!(machine.phase(), AlertPhase::Alarmed);
        assert_eq!(notifier.count(), 1);
        assert_eq!(player.plays(), vec![true]);
        assert_eq!(player.stops(), 0);
    }

    #[test]
    fn reset_while_calm_is_a_noop() {
        let (mut machine, _, player) = machine();
        machine.reset();
        assert_eq!(machine.phase(), AlertPhase::Calm);
        assert_eq!(player.stops(), 0);
    }

    #[test]
    fn reset_stops_the_sound_once() {
        let (mut machine, _, player) = machine();
        machine.handle(&fire_message());
        machine.handle(&fire_message());
        machine.reset();
        assert_eq!(machine.phase(), AlertPhase::Calm);
        assert_eq!(player.stops(), 1);
    }

    #[test]
    fn sensor_reading_updates_fields() {
        let (mut machine, _, _) = machine();
        machine.handle(&sensor_message(r#"{"temperatura":23,"umidade":55}"#));
        let state = machine.snapshot();
        assert_eq!(state.temperature, Some(23.0));
        assert_eq!(state.humidity, Some(55.0));
        assert!(!state.fire_active);
    }

    #[test]
    fn sensor_reading_does_not_clear_an_alarm() {
        let (mut machine, _, _) = machine();
        machine.handle(&fire_message());
        machine.handle(&sensor_message(r#"{"temperatura":80.5,"umidade":10}"#));
        assert_eq!(machine.phase(), AlertPhase::Alarmed);
        assert_eq!(machine.snapshot().temperature, Some(80.5));
    }

    #[test]
    fn non_numeric_reading_is_discarded() {
        let (mut machine, _, _) = machine();
        machine.handle(&sensor_message(r#"{"temperatura":"x"}"#));
        assert_eq!(machine.snapshot(), AlertState::default());
    }

    #[test]
    fn incomplete_reading_is_discarded() {
        let (mut machine, _, _) = machine();
        machine.handle(&sensor_message(r#"{"temperatura":23}"#));
        assert_eq!(machine.snapshot(), AlertState::default());

        machine.handle(&sensor_message(r#"{"umidade":55}"#));
        assert_eq!(machine.snapshot(), AlertState::default());
    }

    #[test]
    fn garbage_payload_is_discarded() {
        let (mut machine, _, _) = machine();
        machine.handle(&sensor_message("not json"));
        assert_eq!(machine.snapshot(), AlertState::default());
    }

    #[test]
    fn unknown_topic_is_ignored() {
        let (mut machine, notifier, player) = machine();
        machine.handle(&TopicMessage {
            topic: "casa/outro".to_string(),
            payload: "1".to_string(),
        });
        assert_eq!(machine.snapshot(), AlertState::default());
        assert_eq!(notifier.count(), 0);
        assert!(player.plays().is_empty());
    }

    #[test]
    fn full_alarm_cycle_side_effect_counts() {
        let (mut machine, notifier, player) = machine();

        machine.handle(&fire_message());
        assert_eq!(machine.phase(), AlertPhase::Alarmed);

        machine.handle(&fire_message());
        assert_eq!(notifier.count(), 1);

        machine.reset();
        assert_eq!(machine.phase(), AlertPhase::Calm);

        machine.handle(&fire_message());
        assert_eq!(machine.phase(), AlertPhase::Alarmed);

        assert_eq!(notifier.count(), 2);
        assert_eq!(player.plays(), vec![true, true]);
        assert_eq!(player.stops(), 1);
    }
}
