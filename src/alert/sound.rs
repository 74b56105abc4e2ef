//! Alert sound collaborator.

use log::info;

/// Controls the alert sound.
///
/// At most one sound is active at a time from the alert machine's point of
/// view: `play` while already playing replaces the previous request, and
/// `stop` with nothing playing is a no-op.
pub trait SoundPlayer: Send + Sync {
    fn play(&self, looped: bool);
    fn stop(&self);
}

/// Default player that only logs playback requests.
#[derive(Debug, Default)]
pub struct LogSoundPlayer;

impl SoundPlayer for LogSoundPlayer {
    fn play(&self, looped: bool) {
        info!("[sound] play alert (loop: {})", looped);
    }

    fn stop(&self) {
        info!("[sound] stop alert");
    }
}
