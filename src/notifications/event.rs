//! Event types for the notification system
//!
//! The engine emits six lifecycle notifications: four per-message stages,
//! one per completed poll cycle, and one for failures.

use std::sync::Arc;
use std::time::SystemTime;

use crate::queue::error::ConsumerError;
use crate::queue::message::Message;

/// Per-message lifecycle stages
#[derive(Clone, Debug, PartialEq)]
pub enum MessageEventType {
    /// The message was dispatched to the application handler
    Received,
    /// The handler completed successfully and the delete stage finished
    Processed,
    /// The delete call is about to be issued
    Deleting,
    /// The provider acknowledged the delete
    Deleted,
}

#[derive(Clone, Debug)]
pub struct MessageEvent {
    pub event_type: MessageEventType,
    pub timestamp: SystemTime,
    pub message: Arc<Message>,
}

impl MessageEvent {
    pub fn new(event_type: MessageEventType, message: Arc<Message>) -> Self {
        Self {
            event_type,
            timestamp: SystemTime::now(),
            message,
        }
    }
}

/// One poll cycle finished: every message in the batch completed its full
/// receive/delete protocol. Empty-poll cycles publish an empty batch.
#[derive(Clone, Debug)]
pub struct BatchEvent {
    pub timestamp: SystemTime,
    pub batch: Vec<Arc<Message>>,
}

impl BatchEvent {
    pub fn new(batch: Vec<Arc<Message>>) -> Self {
        Self {
            timestamp: SystemTime::now(),
            batch,
        }
    }

    pub fn len(&self) -> usize {
        self.batch.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batch.is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct ErrorEvent {
    pub timestamp: SystemTime,
    pub error: ConsumerError,
}

impl ErrorEvent {
    pub fn new(error: ConsumerError) -> Self {
        Self {
            timestamp: SystemTime::now(),
            error,
        }
    }
}

/// Unified event enum that encompasses all notification kinds
#[derive(Clone, Debug)]
pub enum Event {
    Message(MessageEvent),
    Batch(BatchEvent),
    Error(ErrorEvent),
}

impl Event {
    /// Short category label used in logs and publish failures.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Message(_) => "Message",
            Event::Batch(_) => "Batch",
            Event::Error(_) => "Error",
        }
    }
}

/// Event filtering options for subscribers
#[derive(Clone, Debug, PartialEq)]
pub enum EventFilter {
    MessageOnly,
    BatchOnly,
    ErrorOnly,
    MessageAndError,
    All,
}

impl EventFilter {
    /// Check if an event should be accepted by this filter
    pub fn accepts(&self, event: &Event) -> bool {
        matches!(
            (self, event),
            (EventFilter::MessageOnly, Event::Message(_))
                | (EventFilter::BatchOnly, Event::Batch(_))
                | (EventFilter::ErrorOnly, Event::Error(_))
                | (EventFilter::MessageAndError, Event::Message(_))
                | (EventFilter::MessageAndError, Event::Error(_))
                | (EventFilter::All, _)
        )
    }
}
