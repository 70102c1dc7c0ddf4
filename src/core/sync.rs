//! Synchronisation utilities for robust mutex handling
//!
//! Converts mutex poison errors into application-specific errors so callers
//! can propagate them instead of panicking.

use std::sync::LockResult;

/// Handle poisoned mutex cases with consistent error handling
///
/// Converts a poison error from a lock operation into an application error
/// built by the provided constructor. A mutex becomes poisoned when a thread
/// panics while holding the lock.
///
/// # Examples
/// ```
/// use std::sync::Mutex;
/// use siphon::core::sync::handle_mutex_poison;
/// use siphon::provider::api::ProviderError;
///
/// let mutex = Mutex::new(42);
/// let guard = handle_mutex_poison(mutex.lock(), ProviderError::Backend).unwrap();
/// assert_eq!(*guard, 42);
/// ```
pub fn handle_mutex_poison<T, E>(
    result: LockResult<T>,
    error_constructor: impl FnOnce(String) -> E,
) -> Result<T, E> {
    result.map_err(|poison_err| {
        error_constructor(format!(
            "Internal synchronisation error (mutex poisoned). This indicates a panic occurred while holding a lock. PoisonError: {:?}",
            poison_err
        ))
    })
}
