use tokio::sync::broadcast;

use crate::domain::context::{Notification, NotificationSink, Severity};

/// Notification sink that only writes to the log. Useful for headless hosts
/// and tests that do not care about notifications.
pub struct LogNotifier;

impl NotificationSink for LogNotifier {
    fn notify(&self, notification: Notification) {
        match notification.severity {
            Severity::Info => {
                tracing::info!("[{}] {}", notification.title, notification.message)
            }
            Severity::Warning => {
                tracing::warn!("[{}] {}", notification.title, notification.message)
            }
            Severity::Error => {
                tracing::error!("[{}] {}", notification.title, notification.message)
            }
        }
    }
}

/// Notification sink that fans notifications out to UI subscribers.
///
/// Sending never blocks and never fails: with no subscribers the message is
/// dropped after being logged.
pub struct BroadcastNotifier {
    sender: broadcast::Sender<Notification>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to future notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(16)
    }
}

impl NotificationSink for BroadcastNotifier {
    fn notify(&self, notification: Notification) {
        LogNotifier.notify(notification.clone());
        let _ = self.sender.send(notification);
    }
}
