//! Error types for the notification system

use std::fmt;

#[derive(Debug, Clone)]
pub enum NotificationError {
    PublishFailed {
        event_kind: String,
        failed_subscribers: Vec<String>,
    },
}

impl fmt::Display for NotificationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationError::PublishFailed {
                event_kind,
                failed_subscribers,
            } => {
                write!(
                    f,
                    "Failed to publish {} event to {} subscribers: {:?}",
                    event_kind,
                    failed_subscribers.len(),
                    failed_subscribers
                )
            }
        }
    }
}

impl std::error::Error for NotificationError {}
