//! Message Types for the Queue Consumer Engine
//!
//! A message is the immutable unit of work handed to the application handler.
//! Its `id` is the provider's acknowledgment handle: a single-use token that
//! is consumed by exactly one delete call. It is not a stable identity -
//! redelivery of the same logical message may carry a different handle.

use std::collections::HashMap;

/// Decoded message body
///
/// Providers decode payloads opportunistically: structured bodies become
/// [`Payload::Json`], anything that fails to parse falls back to
/// [`Payload::Text`] verbatim.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(serde_json::Value),
    Text(String),
}

impl Payload {
    /// Decode a raw message body, falling back to text when it is not JSON.
    pub fn parse(raw: &str) -> Self {
        match serde_json::from_str(raw) {
            Ok(value) => Payload::Json(value),
            Err(_) => Payload::Text(raw.to_string()),
        }
    }

    /// The payload as a string slice, when it is textual.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Payload::Text(text) => Some(text),
            Payload::Json(serde_json::Value::String(text)) => Some(text),
            Payload::Json(_) => None,
        }
    }

    /// The payload as a JSON value, when it decoded as one.
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Payload::Json(value) => Some(value),
            Payload::Text(_) => None,
        }
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        Payload::Json(value)
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

/// Immutable unit of work pulled from a backing queue
///
/// # Example
///
/// ```rust
/// use siphon::queue::api::{Message, Payload};
///
/// let message = Message::from_raw("receipt-1", r#"{"job":"resize","width":640}"#);
/// assert!(matches!(message.data, Payload::Json(_)));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Single-use acknowledgment handle assigned by the provider
    pub id: String,
    /// Decoded payload
    pub data: Payload,
    /// Optional provider- or application-defined metadata
    pub meta: Option<HashMap<String, String>>,
}

impl Message {
    pub fn new(id: impl Into<String>, data: Payload) -> Self {
        Self {
            id: id.into(),
            data,
            meta: None,
        }
    }

    pub fn with_meta(id: impl Into<String>, data: Payload, meta: HashMap<String, String>) -> Self {
        Self {
            id: id.into(),
            data,
            meta: Some(meta),
        }
    }

    /// Build a message from a raw body, decoding the payload opportunistically.
    pub fn from_raw(id: impl Into<String>, raw_body: &str) -> Self {
        Self::new(id, Payload::parse(raw_body))
    }
}
