//! Consumer Configuration
//!
//! Options recognised by the engine, loadable from TOML with serde defaults.
//! Durations are configured in milliseconds and exposed as [`Duration`]
//! through accessor methods.

use std::time::Duration;

use serde::Deserialize;

use crate::core::retry::RetryPolicy;

/// Retry policy for the provider fetch stage
///
/// When absent from the configuration the engine keeps the reference
/// behaviour: a single failed fetch halts the poll loop.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first
    pub max_attempts: usize,
    /// Delay between attempts in milliseconds
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 500,
        }
    }
}

impl RetryConfig {
    pub(crate) fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.delay_ms))
    }
}

/// Options recognised by [`QueueConsumer`](crate::queue::consumer::QueueConsumer)
///
/// ```toml
/// batch_size = 10
/// concurrency = 4
/// shutdown_retry_wait_ms = 500
/// shutdown_max_wait_ms = 10000
/// requeue_on_handler_failure = false
///
/// [fetch_retry]
/// max_attempts = 3
/// delay_ms = 500
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConsumerConfig {
    /// Messages requested per fetch; zero is treated as one
    pub batch_size: usize,
    /// Bound on concurrently dispatched messages within a batch; zero means
    /// "match the batch size" (every message in a batch may run at once)
    pub concurrency: usize,
    /// Drain poll interval in milliseconds
    pub shutdown_retry_wait_ms: u64,
    /// Drain timeout in milliseconds
    pub shutdown_max_wait_ms: u64,
    /// Retry policy for failed fetches; `None` halts the loop on first failure
    pub fetch_retry: Option<RetryConfig>,
    /// Skip the delete stage when the handler fails, leaving the message to
    /// the backing queue's redelivery
    pub requeue_on_handler_failure: bool,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            batch_size: 1,
            concurrency: 0,
            shutdown_retry_wait_ms: 500,
            shutdown_max_wait_ms: 10_000,
            fetch_retry: None,
            requeue_on_handler_failure: false,
        }
    }
}

impl ConsumerConfig {
    /// Parse a configuration from a TOML fragment.
    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.max(1)
    }

    pub fn effective_concurrency(&self) -> usize {
        if self.concurrency == 0 {
            self.effective_batch_size()
        } else {
            self.concurrency
        }
    }

    pub fn shutdown_retry_wait(&self) -> Duration {
        Duration::from_millis(self.shutdown_retry_wait_ms)
    }

    pub fn shutdown_max_wait(&self) -> Duration {
        Duration::from_millis(self.shutdown_max_wait_ms)
    }
}
