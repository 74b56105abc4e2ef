//! Alert state machine and its side-effect collaborators.

mod machine;
mod notifier;
mod sound;

pub use machine::{AlertMachine, AlertPhase, AlertState};
pub use notifier::{LogNotifier, Notifier};
pub use sound::{LogSoundPlayer, SoundPlayer};
