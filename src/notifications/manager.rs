//! AsyncNotificationManager implementation
//!
//! Delivers engine lifecycle events to any number of subscribers over
//! per-subscriber unbounded channels. A subscriber whose receiver has been
//! dropped is removed on the next publish.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::notifications::error::NotificationError;
use crate::notifications::event::{Event, EventFilter};
use crate::notifications::traits::SubscriberStatistics;

struct SubscriberInfo {
    filter: EventFilter,
    source: String,
    sender: UnboundedSender<Event>,
    statistics: Arc<SubscriberStatistics>,
}

pub struct AsyncNotificationManager {
    subscribers: HashMap<String, SubscriberInfo>,
}

impl Default for AsyncNotificationManager {
    fn default() -> Self {
        Self::new()
    }
}

impl AsyncNotificationManager {
    pub fn new() -> Self {
        Self {
            subscribers: HashMap::new(),
        }
    }

    /// Register a subscriber and hand back its receiving end.
    ///
    /// `source` identifies the subscribing component for diagnostics.
    /// Subscribing again under the same id replaces the previous
    /// subscription with a warning.
    pub fn subscribe(
        &mut self,
        subscriber_id: String,
        filter: EventFilter,
        source: String,
    ) -> UnboundedReceiver<Event> {
        let (sender, receiver) = unbounded_channel();

        let subscriber_info = SubscriberInfo {
            filter,
            source: source.clone(),
            sender,
            statistics: Arc::new(SubscriberStatistics::new()),
        };

        if let Some(existing) = self.subscribers.insert(subscriber_id.clone(), subscriber_info) {
            log::warn!(
                "Subscriber '{}' replaced existing subscription (source: {} -> {})",
                subscriber_id,
                existing.source,
                source
            );
        }

        receiver
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn has_subscriber(&self, subscriber_id: &str) -> bool {
        self.subscribers.contains_key(subscriber_id)
    }

    pub fn subscriber_statistics(&self, subscriber_id: &str) -> Option<Arc<SubscriberStatistics>> {
        self.subscribers
            .get(subscriber_id)
            .map(|info| Arc::clone(&info.statistics))
    }

    /// Remove every subscriber. Used by tests that need isolation.
    pub fn clear_subscribers(&mut self) {
        self.subscribers.clear();
    }

    /// Deliver an event to every subscriber whose filter accepts it.
    ///
    /// Subscribers with closed channels are removed and reported in the
    /// returned error; delivery to the remaining subscribers still happens.
    pub async fn publish(&mut self, event: Event) -> Result<(), NotificationError> {
        let event_kind = event.kind().to_string();
        let mut failed_subscribers = Vec::new();

        for (subscriber_id, subscriber_info) in &self.subscribers {
            if subscriber_info.filter.accepts(&event) {
                subscriber_info.statistics.increment_queue_size();

                if subscriber_info.sender.send(event.clone()).is_err() {
                    // Channel is closed, mark for removal
                    failed_subscribers.push(subscriber_id.clone());
                }
            }
        }

        for subscriber_id in &failed_subscribers {
            self.subscribers.remove(subscriber_id);
        }

        if !failed_subscribers.is_empty() {
            return Err(NotificationError::PublishFailed {
                event_kind,
                failed_subscribers,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::event::{BatchEvent, ErrorEvent, MessageEvent, MessageEventType};
    use crate::provider::error::ProviderError;
    use crate::queue::error::ConsumerError;
    use crate::queue::message::{Message, Payload};
    use tokio::time::{timeout, Duration};

    fn message_event(event_type: MessageEventType) -> Event {
        Event::Message(MessageEvent::new(
            event_type,
            Arc::new(Message::new("receipt-1", Payload::from("body"))),
        ))
    }

    #[tokio::test]
    async fn test_subscribe_and_publish() {
        let mut manager = AsyncNotificationManager::new();

        let mut receiver = manager.subscribe(
            "observer".to_string(),
            EventFilter::All,
            "test:observer".to_string(),
        );

        manager
            .publish(message_event(MessageEventType::Received))
            .await
            .expect("publish should succeed");

        let received = timeout(Duration::from_millis(100), receiver.recv())
            .await
            .expect("should not time out")
            .expect("should receive event");
        assert!(matches!(
            received,
            Event::Message(MessageEvent {
                event_type: MessageEventType::Received,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_filtering_routes_events() {
        let mut manager = AsyncNotificationManager::new();

        let mut batch_receiver = manager.subscribe(
            "batch_watcher".to_string(),
            EventFilter::BatchOnly,
            "test:batch".to_string(),
        );
        let mut error_receiver = manager.subscribe(
            "error_watcher".to_string(),
            EventFilter::ErrorOnly,
            "test:error".to_string(),
        );
        let mut all_receiver = manager.subscribe(
            "audit".to_string(),
            EventFilter::All,
            "test:audit".to_string(),
        );

        let batch = Event::Batch(BatchEvent::new(Vec::new()));
        let error = Event::Error(ErrorEvent::new(ConsumerError::Fetch {
            source: ProviderError::Fetch("boom".to_string()),
        }));
        let message = message_event(MessageEventType::Deleted);

        manager.publish(batch).await.unwrap();
        manager.publish(error).await.unwrap();
        manager.publish(message).await.unwrap();

        let batch_seen = timeout(Duration::from_millis(100), batch_receiver.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(batch_seen, Event::Batch(_)));

        let error_seen = timeout(Duration::from_millis(100), error_receiver.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(error_seen, Event::Error(_)));

        // Audit subscriber sees all three, in publish order
        let mut kinds = Vec::new();
        for _ in 0..3 {
            let event = timeout(Duration::from_millis(100), all_receiver.recv())
                .await
                .unwrap()
                .unwrap();
            kinds.push(event.kind());
        }
        assert_eq!(kinds, vec!["Batch", "Error", "Message"]);
    }

    #[tokio::test]
    async fn test_closed_channels_are_cleaned_up() {
        let mut manager = AsyncNotificationManager::new();

        let dropped = manager.subscribe(
            "will_drop".to_string(),
            EventFilter::All,
            "test:drop".to_string(),
        );
        let mut kept = manager.subscribe(
            "kept".to_string(),
            EventFilter::All,
            "test:kept".to_string(),
        );
        assert_eq!(manager.subscriber_count(), 2);

        drop(dropped);

        let result = manager.publish(message_event(MessageEventType::Received)).await;
        match result {
            Err(NotificationError::PublishFailed {
                failed_subscribers, ..
            }) => {
                assert_eq!(failed_subscribers, vec!["will_drop".to_string()]);
            }
            other => panic!("Expected PublishFailed, got: {:?}", other),
        }

        assert_eq!(manager.subscriber_count(), 1);
        assert!(!manager.has_subscriber("will_drop"));
        assert!(manager.has_subscriber("kept"));

        // The surviving subscriber still received the event
        let received = timeout(Duration::from_millis(100), kept.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(received, Event::Message(_)));
    }

    #[tokio::test]
    async fn test_duplicate_subscriber_is_replaced() {
        let mut manager = AsyncNotificationManager::new();

        let _first = manager.subscribe(
            "dup".to_string(),
            EventFilter::BatchOnly,
            "test:first".to_string(),
        );
        let _second = manager.subscribe(
            "dup".to_string(),
            EventFilter::All,
            "test:second".to_string(),
        );

        assert_eq!(manager.subscriber_count(), 1);
        assert!(manager.has_subscriber("dup"));
    }

    #[tokio::test]
    async fn test_statistics_track_queue_size() {
        let mut manager = AsyncNotificationManager::new();

        let mut receiver = manager.subscribe(
            "stats".to_string(),
            EventFilter::MessageOnly,
            "test:stats".to_string(),
        );

        manager.publish(message_event(MessageEventType::Received)).await.unwrap();
        // Filtered out; queue size must not move
        manager.publish(Event::Batch(BatchEvent::new(Vec::new()))).await.unwrap();

        let stats = manager.subscriber_statistics("stats").unwrap();
        assert_eq!(stats.queue_size(), 1);

        let _ = receiver.recv().await.unwrap();
        stats.decrement_queue_size();
        stats.record_message_processed();

        assert_eq!(stats.queue_size(), 0);
        assert_eq!(stats.messages_processed(), 1);
    }

    #[tokio::test]
    async fn test_clear_subscribers() {
        let mut manager = AsyncNotificationManager::new();
        let _receiver = manager.subscribe(
            "transient".to_string(),
            EventFilter::All,
            "test:transient".to_string(),
        );
        assert_eq!(manager.subscriber_count(), 1);

        manager.clear_subscribers();
        assert_eq!(manager.subscriber_count(), 0);
    }
}
