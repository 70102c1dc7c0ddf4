//! Queue Consumer Engine
//!
//! A generic engine that repeatedly pulls batches of messages from a
//! pluggable backing queue, hands each message to an application-supplied
//! handler, deletes (acknowledges) the message after the handler stage, and
//! shuts down gracefully by draining in-flight work. It is a thin
//! orchestration layer over an at-least-once backing queue: it guarantees
//! neither exactly-once delivery nor ordering across messages.
//!
//! # Overview
//!
//! - **Continuous polling**: one fetch/dispatch/barrier cycle at a time;
//!   empty polls keep the loop alive (backends long-poll so this does not
//!   spin).
//! - **Completion protocol**: a message is deleted only after its handler
//!   resolves; the handler's returned `Result` is the completion signal.
//! - **Bounded fan-out**: messages within a batch dispatch concurrently,
//!   capped by the configured concurrency limit.
//! - **Observability**: six typed lifecycle notifications through the
//!   notification system (`notifications` module).
//! - **Graceful shutdown**: stop, drain in-flight work bounded by a timeout,
//!   then terminate the process.

// Internal modules - all access should go through api module
pub(crate) mod config;
pub(crate) mod consumer;
pub(crate) mod error;
pub(crate) mod message;

// Public API module - the only public interface for the engine
pub mod api;

#[cfg(test)]
mod tests;
