//! Notification collaborator for alarm transitions.

use log::warn;

/// Receives fire-and-forget alert notifications.
///
/// Implementations deliver through whatever channel the deployment has
/// (push service, desktop notification daemon). Delivery permissions are
/// the implementation's business; the alert machine only calls `notify`.
pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, body: &str);
}

/// Default notifier that writes the alert to the log.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, body: &str) {
        warn!("[notify] {}: {}", title, body);
    }
}
