//! Queue Consumer Engine
//!
//! The engine owns the poll/dispatch/drain state machine. Each cycle fetches
//! a batch from the provider, dispatches every message to the application
//! handler under a bounded concurrency limit, deletes messages after their
//! handler stage, publishes a batch notification once the whole batch has
//! finished, and loops. Failures never propagate to callers of the lifecycle
//! methods; they are reported through the notification channel.
//!
//! ```text
//!            ┌────────────┐  fetch(batch_size)  ┌──────────────┐
//!            │ QueueConsumer ├────────────────────▶│ QueueProvider │
//!            └──┬───────▲──┘                     └──────┬───────┘
//!   handle(msg) │       │ delete(msg)                   │
//!            ┌──▼───────┴──┐                            │
//!            │ MessageHandler│        batch of Messages ◀┘
//!            └─────────────┘
//!                   │ events (Received/Processed/Deleting/Deleted/Batch/Error)
//!            ┌──────▼──────────────┐
//!            │ AsyncNotificationManager │──▶ subscribers
//!            └─────────────────────┘
//! ```

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::Mutex;

use crate::core::retry::retry_async;
use crate::notifications::event::{
    BatchEvent, ErrorEvent, Event, EventFilter, MessageEvent, MessageEventType,
};
use crate::notifications::manager::AsyncNotificationManager;
use crate::provider::error::ProviderResult;
use crate::provider::traits::QueueProvider;
use crate::queue::config::ConsumerConfig;
use crate::queue::error::{ConsumerError, HandlerError};
use crate::queue::message::Message;

/// Application-side processing stage
///
/// The returned `Result` is the message's completion signal: the engine
/// awaits it before moving to the delete stage, so a handler that never
/// resolves keeps its message in flight indefinitely.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: &Message) -> Result<(), HandlerError>;
}

/// Pull-based consumer over a pluggable backing queue
///
/// # Lifecycle
///
/// [`start`](Self::start) clears the stop flag and spawns
/// [`process`](Self::process), the engine's poll loop. [`stop`](Self::stop)
/// prevents the next cycle from starting but never cancels the one in
/// flight. [`shutdown`](Self::shutdown) stops the consumer, drains in-flight
/// work (bounded by the configured timeout), and terminates the process.
///
/// At most one poll cycle runs at a time; calling `process` while a cycle is
/// in flight (or while stopped) is a logged no-op.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use siphon::notifications::api::EventFilter;
/// use siphon::provider::api::InMemoryProvider;
/// use siphon::queue::api::{
///     ConsumerConfig, HandlerError, Message, MessageHandler, QueueConsumer,
/// };
///
/// struct Worker;
///
/// #[async_trait::async_trait]
/// impl MessageHandler for Worker {
///     async fn handle(&self, message: &Message) -> Result<(), HandlerError> {
///         println!("working on {:?}", message.data);
///         Ok(())
///     }
/// }
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let provider = Arc::new(InMemoryProvider::new());
/// provider.push(Message::from_raw("receipt-1", r#"{"job":"demo"}"#))?;
///
/// let consumer = QueueConsumer::new(ConsumerConfig::default(), provider, Arc::new(Worker));
/// let mut events = consumer
///     .subscribe("worker".to_string(), EventFilter::All, "app:worker".to_string())
///     .await;
/// consumer.start();
/// # Ok(())
/// # }
/// ```
pub struct QueueConsumer {
    config: ConsumerConfig,
    provider: Arc<dyn QueueProvider>,
    handler: Arc<dyn MessageHandler>,
    notifications: Mutex<AsyncNotificationManager>,
    in_progress: AtomicBool,
    stopped: AtomicBool,
    shutting_down: AtomicBool,
    in_flight: AtomicUsize,
}

impl QueueConsumer {
    pub fn new(
        config: ConsumerConfig,
        provider: Arc<dyn QueueProvider>,
        handler: Arc<dyn MessageHandler>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            provider,
            handler,
            notifications: Mutex::new(AsyncNotificationManager::new()),
            in_progress: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            shutting_down: AtomicBool::new(false),
            in_flight: AtomicUsize::new(0),
        })
    }

    /// Register an event subscriber and return its receiving end.
    pub async fn subscribe(
        &self,
        subscriber_id: String,
        filter: EventFilter,
        source: String,
    ) -> UnboundedReceiver<Event> {
        self.notifications
            .lock()
            .await
            .subscribe(subscriber_id, filter, source)
    }

    /// Number of messages fetched but not yet fully acknowledged.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    pub fn is_in_progress(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    /// Clear the stop flag and spawn the poll loop onto the runtime.
    pub fn start(self: &Arc<Self>) {
        log::debug!("starting consumer");
        self.stopped.store(false, Ordering::Release);

        let consumer = Arc::clone(self);
        tokio::spawn(async move {
            consumer.process().await;
        });
    }

    /// Stop the consumer, letting the in-flight cycle finish.
    pub fn stop(&self) {
        log::debug!("stopping consumer; in-flight work is left to drain");
        self.stopped.store(true, Ordering::Release);
    }

    /// Run the poll loop until stopped or until a fetch fails.
    ///
    /// This is the engine's driver: called once by [`start`](Self::start) it
    /// keeps cycling on its own, including through empty polls. Calling it
    /// while a cycle is in flight or while stopped is a no-op.
    pub async fn process(&self) {
        if self.stopped.load(Ordering::Acquire) {
            log::debug!("not polling: the consumer is stopped");
            return;
        }
        if self
            .in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log::debug!("not polling: a poll cycle is already in progress");
            return;
        }

        self.poll_loop().await;
        self.in_progress.store(false, Ordering::Release);
    }

    async fn poll_loop(&self) {
        loop {
            if self.stopped.load(Ordering::Acquire) {
                log::debug!("consumer stopped; ending poll loop");
                return;
            }

            let batch_size = self.config.effective_batch_size();
            log::trace!("fetching up to {batch_size} message(s)");

            let batch = match self.fetch_batch(batch_size).await {
                Ok(batch) => batch,
                Err(source) => {
                    // The loop halts here until process() is called again
                    log::error!("fetch failed; poll loop halting: {source}");
                    self.emit(Event::Error(ErrorEvent::new(ConsumerError::Fetch {
                        source,
                    })))
                    .await;
                    return;
                }
            };

            if batch.is_empty() {
                log::trace!("received no messages");
                self.emit(Event::Batch(BatchEvent::new(Vec::new()))).await;
                continue;
            }

            log::debug!("received {} message(s)", batch.len());
            let batch: Vec<Arc<Message>> = batch.into_iter().map(Arc::new).collect();
            self.in_flight.fetch_add(batch.len(), Ordering::AcqRel);

            // Barrier: the whole batch finishes before the cycle completes
            let limit = self.config.effective_concurrency();
            stream::iter(batch.iter().cloned())
                .for_each_concurrent(limit, |message| self.run_message(message))
                .await;

            self.emit(Event::Batch(BatchEvent::new(batch))).await;
        }
    }

    async fn fetch_batch(&self, batch_size: usize) -> ProviderResult<Vec<Message>> {
        match &self.config.fetch_retry {
            Some(retry) => {
                retry_async("provider fetch", retry.policy(), || {
                    self.provider.fetch(batch_size)
                })
                .await
            }
            None => self.provider.fetch(batch_size).await,
        }
    }

    /// Per-message completion protocol: notify receipt, await the handler,
    /// delete, then report the handler outcome and release the in-flight slot.
    async fn run_message(&self, message: Arc<Message>) {
        log::trace!("processing message {}", message.id);
        self.emit(Event::Message(MessageEvent::new(
            MessageEventType::Received,
            Arc::clone(&message),
        )))
        .await;

        let handler_result = self.handler.handle(&message).await;

        if handler_result.is_ok() || !self.config.requeue_on_handler_failure {
            self.delete_message(&message).await;
        } else {
            log::debug!(
                "leaving message {} to the backing queue for redelivery",
                message.id
            );
        }

        match handler_result {
            Ok(()) => {
                self.emit(Event::Message(MessageEvent::new(
                    MessageEventType::Processed,
                    Arc::clone(&message),
                )))
                .await;
            }
            Err(err) => {
                log::warn!("handler failed for message {}: {err}", message.id);
                self.emit(Event::Error(ErrorEvent::new(ConsumerError::Handler {
                    message_id: message.id.clone(),
                    reason: err.message().to_string(),
                })))
                .await;
            }
        }

        self.release_in_flight();
    }

    async fn delete_message(&self, message: &Arc<Message>) {
        self.emit(Event::Message(MessageEvent::new(
            MessageEventType::Deleting,
            Arc::clone(message),
        )))
        .await;

        match self.provider.delete(message).await {
            Ok(()) => {
                log::trace!("deleted message {}", message.id);
                self.emit(Event::Message(MessageEvent::new(
                    MessageEventType::Deleted,
                    Arc::clone(message),
                )))
                .await;
            }
            Err(source) => {
                log::warn!("failed to delete message {}: {source}", message.id);
                self.emit(Event::Error(ErrorEvent::new(ConsumerError::Delete {
                    message_id: message.id.clone(),
                    source,
                })))
                .await;
            }
        }
    }

    /// Publish an event to subscribers, logging any delivery failure.
    async fn emit(&self, event: Event) {
        if let Err(err) = self.notifications.lock().await.publish(event).await {
            log::warn!("failed to publish event to all subscribers: {err}");
        }
    }

    fn release_in_flight(&self) {
        self.in_flight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                Some(current.saturating_sub(1))
            })
            .ok();
    }

    /// Wait for in-flight messages to finish, polling every
    /// `shutdown_retry_wait` until the count reaches zero or
    /// `shutdown_max_wait` has elapsed.
    ///
    /// The elapsed check runs before each wait, so the total wait may exceed
    /// the cap by up to one interval. Observers cannot distinguish a clean
    /// drain from a timeout; the outcome is only logged.
    pub async fn drain(&self) {
        let retry_wait = self.config.shutdown_retry_wait();
        let max_wait = self.config.shutdown_max_wait();
        let mut waited = Duration::ZERO;

        while self.in_flight() > 0 && waited <= max_wait {
            log::info!(
                "waiting {:?} for {} in-flight message(s)",
                retry_wait,
                self.in_flight()
            );
            tokio::time::sleep(retry_wait).await;
            waited += retry_wait;
        }

        if self.in_flight() == 0 {
            log::info!("all in-flight messages drained");
        } else {
            log::warn!(
                "drain timed out with {} message(s) still in flight",
                self.in_flight()
            );
        }
    }

    /// Stop the consumer, drain in-flight work, and terminate the process.
    ///
    /// This is a hard stop: after the drain loop exits (cleanly or by
    /// timeout) the hosting process exits with status 0. Calling it while a
    /// shutdown is already running is a no-op. The engine never wires this to
    /// OS signals itself; see
    /// [`spawn_signal_listener`](crate::core::shutdown::spawn_signal_listener).
    pub async fn shutdown(&self) {
        if self
            .shutting_down
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log::debug!("shutdown already in progress");
            return;
        }

        log::info!("shutting down: waiting for the queue to empty");
        self.stop();
        self.drain().await;

        log::info!("terminating process");
        std::process::exit(0);
    }
}
