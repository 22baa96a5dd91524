//! Core types for the aggregation engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

/// Stable logical identity of a message entity.
///
/// Repeated emissions carrying the same `MessageId` are updates to one
/// logical entity (e.g. progress messages for a single build) and collapse
/// to a single edge when flattened.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub u64);

impl fmt::Debug for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageId({})", self.0)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque position token assigned at append time.
///
/// Cursors are strictly increasing in append order and are never reused or
/// decremented. `Display` is the stable string form persisted in the layout
/// and used for equality matching against recorded last-read positions.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Cursor(pub u64);

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cursor({})", self.0)
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Cursor {
    pub fn next(self) -> Self {
        Cursor(self.0 + 1)
    }
}

/// Microseconds since Unix epoch.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Current time.
    pub fn now() -> Self {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("Time went backwards");
        Timestamp(duration.as_micros() as i64)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

/// Which logical channel emitted a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageTag {
    /// Bundler process output.
    Metro,
    /// Tooling output, grouped with the bundler in the Process source.
    Expo,
    /// Output attributed to a connected device.
    Device,
    /// Issue entities owned by the issue tracker.
    Issue,
}

impl fmt::Display for MessageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageTag::Metro => write!(f, "metro"),
            MessageTag::Expo => write!(f, "expo"),
            MessageTag::Device => write!(f, "device"),
            MessageTag::Issue => write!(f, "issue"),
        }
    }
}

/// A single message record as appended to the buffer.
///
/// Records are immutable once appended; an update to the same logical entity
/// is a fresh append carrying the same `id`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Stable entity identity.
    pub id: MessageId,

    /// Emitting channel.
    pub tag: MessageTag,

    /// Optional classification. `"global"` routes a record into the Process
    /// source regardless of tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_type: Option<String>,

    /// Device that produced this record (`tag == Device` only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,

    /// Human-readable device name, taken from the first record a device emits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,

    /// Application-defined payload.
    pub payload: serde_json::Value,

    /// When the record was created.
    pub timestamp: Timestamp,
}

impl MessageRecord {
    /// Create a record with the given identity, tag, and payload.
    pub fn new(id: MessageId, tag: MessageTag, payload: serde_json::Value) -> Self {
        Self {
            id,
            tag,
            message_type: None,
            device_id: None,
            device_name: None,
            payload,
            timestamp: Timestamp::now(),
        }
    }

    /// Attach the `"global"`-style classification.
    pub fn with_type(mut self, message_type: impl Into<String>) -> Self {
        self.message_type = Some(message_type.into());
        self
    }

    /// Attribute the record to a device.
    pub fn with_device(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.device_id = Some(id.into());
        self.device_name = Some(name.into());
        self
    }
}

/// The project an aggregation context serves.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub project_dir: PathBuf,
}
