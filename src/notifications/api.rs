//! Public API for the notification system
//!
//! External code should import from here rather than from the internal
//! modules.

// Core event types and enums
pub use crate::notifications::event::{
    BatchEvent, ErrorEvent, Event, EventFilter, MessageEvent, MessageEventType,
};

// Manager and utilities
pub use crate::notifications::error::NotificationError;
pub use crate::notifications::manager::AsyncNotificationManager;

// Statistics
pub use crate::notifications::traits::SubscriberStatistics;
