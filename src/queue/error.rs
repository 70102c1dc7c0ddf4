//! Consumer Engine Error Types

use crate::provider::error::ProviderError;

/// Failures surfaced through the event channel while the engine runs
///
/// Lifecycle methods never return these to a caller; every failure is
/// reported as an `Error` event so subscribers decide how to react.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConsumerError {
    /// The provider fetch failed; the poll loop halts until restarted
    #[error("failed to fetch messages from provider: {source}")]
    Fetch {
        #[source]
        source: ProviderError,
    },

    /// The application handler reported failure for a message
    #[error("handler failed for message {message_id}: {reason}")]
    Handler { message_id: String, reason: String },

    /// The provider rejected the acknowledgment; the message may remain
    /// visible in the backing queue even though the engine counts it as done
    #[error("failed to delete message {message_id}: {source}")]
    Delete {
        message_id: String,
        #[source]
        source: ProviderError,
    },
}

/// Failure reported by an application [`MessageHandler`](crate::queue::consumer::MessageHandler)
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consumer_error_display() {
        let fetch = ConsumerError::Fetch {
            source: ProviderError::Fetch("connection refused".to_string()),
        };
        assert!(fetch.to_string().contains("failed to fetch"));
        assert!(fetch.to_string().contains("connection refused"));

        let delete = ConsumerError::Delete {
            message_id: "receipt-3".to_string(),
            source: ProviderError::Delete("unknown handle".to_string()),
        };
        assert!(delete.to_string().contains("receipt-3"));
    }

    #[test]
    fn test_handler_error_round_trip() {
        let error: HandlerError = "downstream 503".into();
        assert_eq!(error.message(), "downstream 503");
        assert_eq!(error.to_string(), "downstream 503");
    }
}
