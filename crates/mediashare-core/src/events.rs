//! Notification bus
//!
//! Fire-and-forget user-facing notifications, decoupled from whatever
//! renders them. Services publish; any number of subscribers (a CLI printer,
//! a UI toast layer) drain independently.

use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl std::fmt::Display for NotificationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            NotificationLevel::Info => "info",
            NotificationLevel::Success => "ok",
            NotificationLevel::Warning => "warn",
            NotificationLevel::Error => "error",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

/// Broadcast channel for user-facing notifications.
///
/// Publishing never blocks and never fails; with no live subscriber the
/// notification is dropped.
#[derive(Clone)]
pub struct NotificationBus {
    sender: broadcast::Sender<Notification>,
}

impl NotificationBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    pub fn publish(&self, level: NotificationLevel, message: impl Into<String>) {
        let _ = self.sender.send(Notification {
            level,
            message: message.into(),
        });
    }

    pub fn info(&self, message: impl Into<String>) {
        self.publish(NotificationLevel::Info, message);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.publish(NotificationLevel::Success, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.publish(NotificationLevel::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.publish(NotificationLevel::Error, message);
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new(64)
    }
}
