//! Core data structures for pulsecast
//!
//! This module defines the records exchanged with the insight source and
//! the envelope broadcast to live viewers.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Serialized envelope, shared by every recipient of one broadcast
pub type Frame = Arc<str>;

// ============================================================================
// Insight
// ============================================================================

/// One research finding produced by the insight source
///
/// The record is opaque: it is kept as the raw JSON object the source sent
/// and forwarded to viewers unchanged. `title` is only read for logging.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Insight(pub Map<String, Value>);

impl Insight {
    /// Create an insight with just a title
    pub fn new(title: impl Into<String>) -> Self {
        Self::default().with_field("title", title.into())
    }

    /// Attach an extra field
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Headline of the finding, when the source provided a string one
    pub fn title(&self) -> Option<&str> {
        self.0.get("title").and_then(Value::as_str)
    }

    /// Raw field lookup
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

// ============================================================================
// Stats
// ============================================================================

/// Opaque statistics record from the insight source, passed through unmodified
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Stats(pub Value);

// ============================================================================
// Envelope
// ============================================================================

/// Discriminator of an [`Envelope`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeKind {
    /// Connection-level notice (welcome)
    System,
    /// One insight
    Thought,
    /// Scan failure notice
    Error,
}

impl EnvelopeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Thought => "thought",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for EnvelopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tagged message delivered to viewers
///
/// `thought` envelopes carry `data`; `system` and `error` carry `message`.
/// The timestamp is taken when the envelope is built, right before it is
/// published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: EnvelopeKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Insight>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// RFC 3339 / ISO-8601 UTC timestamp
    pub timestamp: String,
}

impl Envelope {
    /// Welcome or other connection-level notice
    pub fn system(message: impl Into<String>) -> Self {
        Self::with_message(EnvelopeKind::System, message.into())
    }

    /// Wrap one insight
    pub fn thought(insight: Insight) -> Self {
        Self {
            kind: EnvelopeKind::Thought,
            data: Some(insight),
            message: None,
            timestamp: now_timestamp(),
        }
    }

    /// Scan failure notice
    pub fn error(message: impl Into<String>) -> Self {
        Self::with_message(EnvelopeKind::Error, message.into())
    }

    fn with_message(kind: EnvelopeKind, message: String) -> Self {
        Self {
            kind,
            data: None,
            message: Some(message),
            timestamp: now_timestamp(),
        }
    }

    /// Serialize into the frame sent over the wire
    pub fn to_frame(&self) -> Result<Frame, serde_json::Error> {
        serde_json::to_string(self).map(Frame::from)
    }
}

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ============================================================================
// Tests
// ============================================================================
