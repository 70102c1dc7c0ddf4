//! In-Memory Queue Backend
//!
//! A process-local [`QueueProvider`] with at-least-once semantics: fetched
//! messages are parked in an unacked map until deleted, and can be returned
//! to the queue for redelivery. Serves as the crate's reference backend and
//! as the workhorse for tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::core::sync::handle_mutex_poison;
use crate::provider::error::{ProviderError, ProviderResult};
use crate::provider::traits::QueueProvider;
use crate::queue::message::Message;

// Sleep slice while emulating a long poll
const POLL_INTERVAL: Duration = Duration::from_millis(10);

struct ProviderState {
    ready: VecDeque<Message>,
    unacked: HashMap<String, Message>,
}

pub struct InMemoryProvider {
    state: Mutex<ProviderState>,
    wait_time: Duration,
}

impl Default for InMemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryProvider {
    /// Create a provider that returns immediately when the queue is empty.
    pub fn new() -> Self {
        Self::with_wait_time(Duration::ZERO)
    }

    /// Create a provider that emulates a long poll: an empty fetch waits up
    /// to `wait_time` for messages before returning an empty batch.
    pub fn with_wait_time(wait_time: Duration) -> Self {
        Self {
            state: Mutex::new(ProviderState {
                ready: VecDeque::new(),
                unacked: HashMap::new(),
            }),
            wait_time,
        }
    }

    /// Enqueue a message for delivery.
    pub fn push(&self, message: Message) -> ProviderResult<()> {
        let mut state = handle_mutex_poison(self.state.lock(), ProviderError::Backend)?;
        state.ready.push_back(message);
        Ok(())
    }

    /// Enqueue several messages, preserving order.
    pub fn push_batch(&self, messages: impl IntoIterator<Item = Message>) -> ProviderResult<()> {
        let mut state = handle_mutex_poison(self.state.lock(), ProviderError::Backend)?;
        state.ready.extend(messages);
        Ok(())
    }

    /// Number of messages waiting for delivery.
    pub fn ready_len(&self) -> ProviderResult<usize> {
        let state = handle_mutex_poison(self.state.lock(), ProviderError::Backend)?;
        Ok(state.ready.len())
    }

    /// Number of fetched-but-unacknowledged messages.
    pub fn unacked_len(&self) -> ProviderResult<usize> {
        let state = handle_mutex_poison(self.state.lock(), ProviderError::Backend)?;
        Ok(state.unacked.len())
    }

    /// Return every unacknowledged message to the front of the queue for
    /// redelivery. Returns how many were requeued.
    pub fn requeue_unacked(&self) -> ProviderResult<usize> {
        let mut state = handle_mutex_poison(self.state.lock(), ProviderError::Backend)?;
        let requeued: Vec<Message> = state.unacked.drain().map(|(_, message)| message).collect();
        let count = requeued.len();
        for message in requeued {
            state.ready.push_front(message);
        }
        Ok(count)
    }

    fn try_take(&self, max_messages: usize) -> ProviderResult<Vec<Message>> {
        let mut state = handle_mutex_poison(self.state.lock(), ProviderError::Backend)?;
        let count = state.ready.len().min(max_messages);
        let mut batch = Vec::with_capacity(count);
        for _ in 0..count {
            if let Some(message) = state.ready.pop_front() {
                state
                    .unacked
                    .insert(message.id.clone(), message.clone());
                batch.push(message);
            }
        }
        Ok(batch)
    }
}

#[async_trait]
impl QueueProvider for InMemoryProvider {
    async fn fetch(&self, max_messages: usize) -> ProviderResult<Vec<Message>> {
        let deadline = Instant::now() + self.wait_time;

        loop {
            let batch = self.try_take(max_messages)?;
            if !batch.is_empty() {
                log::trace!("delivering {} message(s)", batch.len());
                return Ok(batch);
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(Vec::new());
            }
            tokio::time::sleep(POLL_INTERVAL.min(deadline - now)).await;
        }
    }

    async fn delete(&self, message: &Message) -> ProviderResult<()> {
        let mut state = handle_mutex_poison(self.state.lock(), ProviderError::Backend)?;
        match state.unacked.remove(&message.id) {
            Some(_) => Ok(()),
            None => Err(ProviderError::Delete(format!(
                "unknown or already-acknowledged handle: {}",
                message.id
            ))),
        }
    }
}
