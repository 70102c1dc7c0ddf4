//! Public API for backing-queue providers
//!
//! External code should import from here rather than from the internal
//! modules.

// Capability interface implemented by backends
pub use crate::provider::traits::QueueProvider;

// Reference backend
pub use crate::provider::memory::InMemoryProvider;

// Error handling
pub use crate::provider::error::{ProviderError, ProviderResult};
