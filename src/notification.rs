//! User-visible notifications.
//!
//! The session reports the end of every prediction call through a
//! [`Notifier`]: a success notice when a verdict arrives, an error notice
//! when the call fails. Nothing else is notified.

/// Message shown after a completed prediction.
pub const PREDICTION_SUCCEEDED: &str = "Predicted Successfully";

/// Message shown after a failed prediction call.
pub const PREDICTION_FAILED: &str = "API Error!";

/// A notice for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Something finished well.
    Success(String),
    /// Something failed; the user may retry.
    Error(String),
}

impl Notification {
    /// Text of the notice.
    pub fn message(&self) -> &str {
        match self {
            Notification::Success(message) | Notification::Error(message) => message,
        }
    }

    /// Returns `true` for error notices.
    pub fn is_error(&self) -> bool {
        matches!(self, Notification::Error(_))
    }
}

/// Receives notifications. Must be shareable with background tasks.
pub trait Notifier: Send + Sync {
    /// Show `notification` to the user.
    fn notify(&self, notification: &Notification);
}

/// Forwards notifications to the `log` facade. The default.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: &Notification) {
        match notification {
            Notification::Success(message) => log::info!("{message}"),
            Notification::Error(message) => log::warn!("{message}"),
        }
    }
}
