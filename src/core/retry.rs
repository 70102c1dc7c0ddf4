//! Retry utility for handling transient errors in async operations
//!
//! Provides a configurable retry policy with a fixed delay between attempts.
//! The consumer engine wires this to the provider fetch stage when a retry
//! policy is configured.

use std::time::Duration;
use tokio::time::sleep;

/// Configurable retry policy for async operations
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }
}

/// Execute an async operation, retrying transient failures up to the policy's
/// attempt budget. The last error is returned once attempts are exhausted.
///
/// # Examples
/// ```rust
/// use siphon::core::retry::{retry_async, RetryPolicy};
///
/// # async fn example() -> Result<String, String> {
/// let result = retry_async("queue_fetch", RetryPolicy::default(), || async {
///     Ok::<String, String>("success".to_string())
/// })
/// .await?;
/// # Ok(result)
/// # }
/// ```
pub async fn retry_async<F, T, E, Fut>(
    operation_name: &str,
    policy: RetryPolicy,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let attempts = policy.max_attempts.max(1);
    let mut last_error = None;

    for attempt in 0..attempts {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(error) => {
                last_error = Some(error);
                if attempt < attempts - 1 {
                    log::debug!(
                        "Operation '{}' failed on attempt {}/{}, retrying in {:?}: {}",
                        operation_name,
                        attempt + 1,
                        attempts,
                        policy.delay,
                        last_error.as_ref().unwrap()
                    );
                    sleep(policy.delay).await;
                }
            }
        }
    }

    Err(last_error.unwrap())
}
