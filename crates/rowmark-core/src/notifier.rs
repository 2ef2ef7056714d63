//! Outbound notification channel.
//!
//! The core only needs a non-blocking `send`. Failures are logged by
//! [`deliver`] and never reach the caller of the pipeline operations.

use tokio::sync::mpsc;

use crate::types::Notification;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotifyError {
    #[error("notification channel is closed")]
    Closed,
    #[error("notification channel is full")]
    Full,
    #[error("notification rejected: {0}")]
    Rejected(String),
}

/// A send-only channel to the notification consumer.
pub trait Notifier: Send + Sync + 'static {
    fn send(&self, notification: Notification) -> Result<(), NotifyError>;
}

impl Notifier for mpsc::UnboundedSender<Notification> {
    fn send(&self, notification: Notification) -> Result<(), NotifyError> {
        mpsc::UnboundedSender::send(self, notification).map_err(|_| NotifyError::Closed)
    }
}

impl Notifier for mpsc::Sender<Notification> {
    fn send(&self, notification: Notification) -> Result<(), NotifyError> {
        self.try_send(notification).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => NotifyError::Full,
            mpsc::error::TrySendError::Closed(_) => NotifyError::Closed,
        })
    }
}

/// Notifier that drops everything. Used when nobody listens.
#[derive(Debug, Default, Clone, Copy)]
pub struct Discard;

impl Notifier for Discard {
    fn send(&self, _notification: Notification) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Send `notification`, logging a failure instead of returning it.
pub fn deliver(notifier: &dyn Notifier, notification: Notification) {
    let stream = notification.stream_id().clone();
    if let Err(error) = notifier.send(notification) {
        tracing::warn!(%stream, %error, "failed to send notification");
    }
}
