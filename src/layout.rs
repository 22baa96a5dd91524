//! Read-tracking layout and its persistence boundary.
//!
//! The layout records which sources are arranged for display and, per
//! source, the cursor of the last event the consumer acknowledged. The core
//! only reads and writes through the [`LayoutStore`] trait; durable storage
//! belongs to the collaborator behind it.

use crate::error::Result;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Persisted arrangement and read state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    /// Source ids in display order.
    pub sources: Vec<String>,

    /// Source id → last-acknowledged cursor, in string form.
    #[serde(default)]
    pub source_last_reads: HashMap<String, String>,
}

impl Layout {
    /// Layout showing the given sources with no recorded reads.
    pub fn with_sources(sources: Vec<String>) -> Self {
        Self {
            sources,
            source_last_reads: HashMap::new(),
        }
    }
}

/// Persistence boundary for the layout.
///
/// `set` and `set_last_read` may fail; the core propagates the failure to
/// the caller and does not retry. Retry policy belongs to the implementor.
pub trait LayoutStore: Send + Sync {
    /// Current layout.
    fn get(&self) -> Layout;

    /// Replace the layout wholesale.
    fn set(&self, layout: Layout) -> Result<()>;

    /// Record the last-read cursor for one source.
    fn set_last_read(&self, source_id: &str, cursor: String) -> Result<()>;
}

/// In-memory layout store, the default collaborator for tests and
/// process-lifetime read tracking.
#[derive(Default)]
pub struct MemoryLayoutStore {
    layout: RwLock<Layout>,
}

impl MemoryLayoutStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_layout(layout: Layout) -> Self {
        Self {
            layout: RwLock::new(layout),
        }
    }
}

impl LayoutStore for MemoryLayoutStore {
    fn get(&self) -> Layout {
        self.layout.read().clone()
    }

    fn set(&self, layout: Layout) -> Result<()> {
        *self.layout.write() = layout;
        Ok(())
    }

    fn set_last_read(&self, source_id: &str, cursor: String) -> Result<()> {
        self.layout
            .write()
            .source_last_reads
            .insert(source_id.to_string(), cursor);
        Ok(())
    }
}
