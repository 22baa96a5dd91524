//! Logical sources partitioning the aggregated log.
//!
//! Two fixed sources (issue tracker and bundler process) plus device
//! sources derived from buffer contents. The closed enum keeps source
//! dispatch exhaustive: adding a kind is a compile-time-checked change.

use crate::types::{Cursor, MessageRecord, MessageTag};
use serde::{Deserialize, Serialize};

/// Fixed id of the Issues source.
pub const ISSUES_SOURCE_ID: &str = "Source:issues";

/// Fixed id of the Process (bundler) source.
pub const PROCESS_SOURCE_ID: &str = "Source:metro";

/// A logical channel of events.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "__typename")]
pub enum Source {
    /// The issue tracker. Its edges come from the tracker itself, not the
    /// message buffer.
    Issues,

    /// The bundler process (metro/expo output plus `"global"` records).
    Process,

    /// A dynamically discovered device.
    Device { id: String, name: String },
}

impl Source {
    /// Stable source id, as recorded in layouts.
    pub fn id(&self) -> &str {
        match self {
            Source::Issues => ISSUES_SOURCE_ID,
            Source::Process => PROCESS_SOURCE_ID,
            Source::Device { id, .. } => id,
        }
    }

    /// Display name.
    pub fn name(&self) -> &str {
        match self {
            Source::Issues => "Issues",
            Source::Process => "Metro Bundler",
            Source::Device { name, .. } => name,
        }
    }

    /// Whether a flattened record belongs to this source.
    ///
    /// Issues never match: issue edges bypass the buffer entirely.
    pub fn matches(&self, record: &MessageRecord) -> bool {
        match self {
            Source::Issues => false,
            Source::Process => {
                record.tag == MessageTag::Metro
                    || record.tag == MessageTag::Expo
                    || record.message_type.as_deref() == Some("global")
            }
            Source::Device { id, .. } => {
                record.tag == MessageTag::Device && record.device_id.as_deref() == Some(id.as_str())
            }
        }
    }
}

/// Derive the full source list from buffer contents.
///
/// The two fixed sources come first, followed by one `Device` per distinct
/// `device_id` in first-appearance order. The first record a device emits
/// determines its display name; later records cannot rename it.
pub fn derive_sources(entries: &[(Cursor, MessageRecord)]) -> Vec<Source> {
    let mut sources = vec![Source::Issues, Source::Process];

    for (_, record) in entries {
        if record.tag != MessageTag::Device {
            continue;
        }
        let Some(device_id) = record.device_id.as_deref() else {
            continue;
        };
        let already_known = sources.iter().any(|source| match source {
            Source::Device { id, .. } => id == device_id,
            _ => false,
        });
        if !already_known {
            sources.push(Source::Device {
                id: device_id.to_string(),
                name: record
                    .device_name
                    .clone()
                    .unwrap_or_else(|| device_id.to_string()),
            });
        }
    }

    sources
}
