//! User notification channel.
//!
//! Notifications are fire-and-forget: a failed delivery is logged and never
//! interrupts the caller.

use async_trait::async_trait;
use tracing::{info, warn};

/// Errors a notification channel may report.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The channel could not display the notification.
    #[error("notification channel unavailable: {0}")]
    Unavailable(String),
}

/// Displays short user-facing messages.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Shows a notification with a title and message body.
    async fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError>;
}

/// Notifier that renders messages as `info` log events.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        info!(title, "{message}");
        Ok(())
    }
}

/// Sends a notification, logging and swallowing any failure.
pub async fn notify(notifier: &dyn Notifier, title: &str, message: &str) {
    if let Err(error) = notifier.notify(title, message).await {
        warn!(error = %error, title, "Notification failed");
    }
}
