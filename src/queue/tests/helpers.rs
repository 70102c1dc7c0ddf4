//! Shared fakes and assertions for the engine scenario tests

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;

use crate::notifications::event::{Event, MessageEventType};
use crate::provider::error::{ProviderError, ProviderResult};
use crate::provider::memory::InMemoryProvider;
use crate::provider::traits::QueueProvider;
use crate::queue::consumer::MessageHandler;
use crate::queue::error::HandlerError;
use crate::queue::message::{Message, Payload};

pub fn message(id: &str) -> Message {
    Message::new(id, Payload::from("body"))
}

/// Poll `probe` until it holds, panicking after `wait`.
pub async fn wait_until(what: &str, wait: Duration, mut probe: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + wait;
    while !probe() {
        if tokio::time::Instant::now() >= deadline {
            panic!("timed out waiting for {what}");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Receive the next event, panicking if none arrives in time.
pub async fn recv_event(receiver: &mut UnboundedReceiver<Event>) -> Event {
    timeout(Duration::from_secs(2), receiver.recv())
        .await
        .expect("timed out waiting for an event")
        .expect("event channel closed")
}

pub fn assert_message_event(event: Event, expected_type: MessageEventType, expected_id: &str) {
    match event {
        Event::Message(message_event) => {
            assert_eq!(message_event.event_type, expected_type);
            assert_eq!(message_event.message.id, expected_id);
        }
        other => panic!(
            "expected Message event {:?} for {}, got: {:?}",
            expected_type, expected_id, other
        ),
    }
}

/// In-memory provider wrapper that counts fetches and fails on script.
pub struct ScriptedProvider {
    inner: InMemoryProvider,
    fetch_calls: AtomicUsize,
    fetch_failures_remaining: AtomicUsize,
    failing_delete_ids: Mutex<HashSet<String>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        // A short wait keeps empty polls from spinning hot during tests
        Self::with_wait_time(Duration::from_millis(20))
    }

    pub fn with_wait_time(wait_time: Duration) -> Self {
        Self {
            inner: InMemoryProvider::with_wait_time(wait_time),
            fetch_calls: AtomicUsize::new(0),
            fetch_failures_remaining: AtomicUsize::new(0),
            failing_delete_ids: Mutex::new(HashSet::new()),
        }
    }

    pub fn push(&self, message: Message) {
        self.inner.push(message).expect("push should succeed");
    }

    pub fn push_batch(&self, messages: impl IntoIterator<Item = Message>) {
        self.inner
            .push_batch(messages)
            .expect("push_batch should succeed");
    }

    /// Fail the next `count` fetch calls with a scripted error.
    pub fn fail_next_fetches(&self, count: usize) {
        self.fetch_failures_remaining.store(count, Ordering::SeqCst);
    }

    /// Fail every delete for the given handle.
    pub fn fail_delete_of(&self, id: &str) {
        self.failing_delete_ids
            .lock()
            .unwrap()
            .insert(id.to_string());
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn unacked_len(&self) -> usize {
        self.inner.unacked_len().expect("state should be readable")
    }

    pub fn requeue_unacked(&self) -> usize {
        self.inner
            .requeue_unacked()
            .expect("requeue should succeed")
    }
}

#[async_trait]
impl QueueProvider for ScriptedProvider {
    async fn fetch(&self, max_messages: usize) -> ProviderResult<Vec<Message>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);

        let should_fail = self
            .fetch_failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
                Some(remaining.saturating_sub(1))
            })
            .map(|previous| previous > 0)
            .unwrap_or(false);
        if should_fail {
            return Err(ProviderError::Fetch("scripted fetch failure".to_string()));
        }

        self.inner.fetch(max_messages).await
    }

    async fn delete(&self, message: &Message) -> ProviderResult<()> {
        if self.failing_delete_ids.lock().unwrap().contains(&message.id) {
            return Err(ProviderError::Delete(format!(
                "scripted delete failure for {}",
                message.id
            )));
        }
        self.inner.delete(message).await
    }
}

/// Handler whose per-message delay and outcome are scripted, recording
/// completion order and peak concurrency.
pub struct ScriptedHandler {
    delays: HashMap<String, Duration>,
    failing_ids: HashSet<String>,
    completions: Mutex<Vec<String>>,
    current: AtomicUsize,
    max_concurrent: AtomicUsize,
}

impl ScriptedHandler {
    pub fn new() -> Self {
        Self {
            delays: HashMap::new(),
            failing_ids: HashSet::new(),
            completions: Mutex::new(Vec::new()),
            current: AtomicUsize::new(0),
            max_concurrent: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, id: &str, delay: Duration) -> Self {
        self.delays.insert(id.to_string(), delay);
        self
    }

    pub fn with_failure(mut self, id: &str) -> Self {
        self.failing_ids.insert(id.to_string());
        self
    }

    pub fn completions(&self) -> Vec<String> {
        self.completions.lock().unwrap().clone()
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageHandler for ScriptedHandler {
    async fn handle(&self, message: &Message) -> Result<(), HandlerError> {
        let entered = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrent.fetch_max(entered, Ordering::SeqCst);

        if let Some(delay) = self.delays.get(&message.id) {
            tokio::time::sleep(*delay).await;
        }

        self.current.fetch_sub(1, Ordering::SeqCst);
        self.completions.lock().unwrap().push(message.id.clone());

        if self.failing_ids.contains(&message.id) {
            Err(HandlerError::new("scripted handler failure"))
        } else {
            Ok(())
        }
    }
}

/// Handler that never signals completion, pinning its message in flight.
pub struct StallingHandler;

#[async_trait]
impl MessageHandler for StallingHandler {
    async fn handle(&self, _message: &Message) -> Result<(), HandlerError> {
        std::future::pending::<()>().await;
        Ok(())
    }
}
