//! Public API for the queue consumer engine
//!
//! External code should import from here rather than from the internal
//! modules.

// The engine and its handler interface
pub use crate::queue::consumer::{MessageHandler, QueueConsumer};

// Configuration
pub use crate::queue::config::{ConsumerConfig, RetryConfig};

// Message types
pub use crate::queue::message::{Message, Payload};

// Error handling
pub use crate::queue::error::{ConsumerError, HandlerError};
