//! Capability interface for backing-queue backends
//!
//! The engine consumes a backend exclusively through this trait. A conforming
//! backend maps `fetch` to its batch receive call (typically with visibility
//! timeout and long-poll parameters) and `delete` to a single
//! delete-by-handle call; the message `id` is the backend's acknowledgment
//! handle. Backends are expected to implement their own long-poll or backoff
//! inside `fetch` so that empty polls do not busy-spin the engine.

use async_trait::async_trait;

use crate::provider::error::ProviderResult;
use crate::queue::message::Message;

#[async_trait]
pub trait QueueProvider: Send + Sync {
    /// Fetch up to `max_messages` messages from the backing queue.
    ///
    /// Returning an empty vec is normal and means the queue had nothing to
    /// deliver within the backend's wait window.
    async fn fetch(&self, max_messages: usize) -> ProviderResult<Vec<Message>>;

    /// Delete (acknowledge) a fetched message by its handle.
    ///
    /// Handles are single-use: a second delete for the same handle fails.
    async fn delete(&self, message: &Message) -> ProviderResult<()>;
}
