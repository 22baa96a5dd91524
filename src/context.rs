//! Aggregation context: the façade composing buffer, flattener, sources,
//! read-tracking layout, and the live issue feed.

use crate::buffer::{MessageBuffer, MessageIterator};
use crate::connection::{extract_read_info, Connection, PageInfo};
use crate::error::Result;
use crate::flatten::{FlattenCache, FlattenedEdge};
use crate::issues::IssueTracker;
use crate::layout::{Layout, LayoutStore};
use crate::sources::{derive_sources, Source};
use crate::subscriptions::{IssueSubscription, SubscriptionConfig};
use crate::types::{Cursor, ProjectInfo};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// One project's aggregation engine.
///
/// Reads are pure functions of current buffer and layout state; mutations go
/// through the layout store. All internal state is serialized per instance,
/// so a context can be shared across threads behind an `Arc`.
pub struct AggregationContext {
    project_dir: PathBuf,
    buffer: Arc<MessageBuffer>,
    layout: Arc<dyn LayoutStore>,
    issues: Arc<IssueTracker>,

    /// Flattened edges keyed by buffer version. Recomputed lazily on reads
    /// after appends, never on quiescent repeat reads.
    flattened: Mutex<FlattenCache>,

    /// Serializes layout mutations for this context. A layout commit is a
    /// read-merge-write against the store; without this, a concurrent
    /// `set_last_read` landing inside the window would be clobbered by the
    /// merged snapshot.
    layout_write: Mutex<()>,
}

impl AggregationContext {
    pub fn new(
        project_dir: impl Into<PathBuf>,
        buffer: Arc<MessageBuffer>,
        layout: Arc<dyn LayoutStore>,
        issues: Arc<IssueTracker>,
    ) -> Self {
        Self {
            project_dir: project_dir.into(),
            buffer,
            layout,
            issues,
            flattened: Mutex::new(FlattenCache::new()),
            layout_write: Mutex::new(()),
        }
    }

    /// The project this context serves.
    pub fn current_project(&self) -> ProjectInfo {
        ProjectInfo {
            project_dir: self.project_dir.clone(),
        }
    }

    /// The underlying message buffer.
    pub fn buffer(&self) -> &Arc<MessageBuffer> {
        &self.buffer
    }

    /// The issue tracker collaborator.
    pub fn issues(&self) -> &Arc<IssueTracker> {
        &self.issues
    }

    /// Tail iterator over raw buffer entries appended after `cursor`.
    pub fn message_iterator(&self, cursor: Option<Cursor>) -> MessageIterator {
        self.buffer.iter_from(cursor)
    }

    /// Flattened edges for a source, or the full flattened sequence when no
    /// source is given (the global view).
    pub fn message_edges(&self, source: Option<&Source>) -> Vec<FlattenedEdge> {
        match source {
            None => self.flattened().as_ref().clone(),
            Some(Source::Issues) => self.issues.issue_list(),
            Some(source) => self
                .flattened()
                .iter()
                .filter(|edge| source.matches(&edge.node))
                .cloned()
                .collect(),
        }
    }

    /// Read-state-annotated view of a source's edges.
    ///
    /// The global view carries no read state: unread count is zero and no
    /// last-read cursor is surfaced.
    pub fn message_connection(&self, source: Option<&Source>) -> Connection {
        let edges = self.message_edges(source);

        let (unread_count, last_read_cursor) = match source {
            Some(source) => {
                let info = extract_read_info(&self.layout.get(), source.id(), &edges);
                (info.unread_count, info.last_read_cursor)
            }
            None => (0, None),
        };

        Connection {
            count: edges.len(),
            unread_count,
            page_info: PageInfo {
                has_next_page: false,
                last_read_cursor,
                last_cursor: edges.last().map(|edge| edge.cursor.to_string()),
            },
            edges,
        }
    }

    /// All sources: the two fixed ones, then devices discovered in the
    /// buffer in first-appearance order.
    pub fn sources(&self) -> Vec<Source> {
        derive_sources(&self.buffer.all_with_cursor())
    }

    /// Look up a source by id. Unknown ids resolve to `None`, not an error.
    pub fn source_by_id(&self, id: &str) -> Option<Source> {
        self.sources().into_iter().find(|source| source.id() == id)
    }

    pub fn issues_source(&self) -> Source {
        Source::Issues
    }

    pub fn process_source(&self) -> Source {
        Source::Process
    }

    /// Current persisted layout.
    pub fn project_manager_layout(&self) -> Layout {
        self.layout.get()
    }

    /// Replace the layout.
    ///
    /// Arranging a source counts as acknowledging it: every source id in the
    /// new layout is marked read up to its current newest edge (zero-edge
    /// sources keep any prior mark). The implied marks are folded into the
    /// new layout and committed through a single store write, so either the
    /// whole update persists or the caller observes the failure with no
    /// partial state. Layout mutations are serialized per context: a
    /// concurrent `set_last_read` lands either before the merge (and is
    /// carried forward) or after the commit.
    pub fn set_project_manager_layout(&self, new_layout: Layout) -> Result<()> {
        let _guard = self.layout_write.lock();
        let mut merged = new_layout;

        // Carry forward reads the new layout does not supply itself.
        let current = self.layout.get();
        for (source_id, cursor) in current.source_last_reads {
            merged.source_last_reads.entry(source_id).or_insert(cursor);
        }

        for source_id in merged.sources.clone() {
            if let Some(cursor) = self.newest_edge_cursor(&source_id) {
                merged
                    .source_last_reads
                    .insert(source_id, cursor.to_string());
            }
        }

        debug!(sources = merged.sources.len(), "committing layout");
        self.layout.set(merged)
    }

    /// Record the last-read cursor for a source.
    ///
    /// Without an explicit cursor the source's current newest edge is used;
    /// with zero edges there is nothing to acknowledge and any prior mark is
    /// left untouched.
    pub fn set_last_read(&self, source_id: &str, cursor: Option<Cursor>) -> Result<()> {
        let _guard = self.layout_write.lock();
        let cursor = match cursor {
            Some(cursor) => cursor,
            None => match self.newest_edge_cursor(source_id) {
                Some(cursor) => cursor,
                None => return Ok(()),
            },
        };

        self.layout.set_last_read(source_id, cursor.to_string())
    }

    /// Subscribe to the live issue feed.
    pub fn issue_iterator(&self) -> IssueSubscription {
        self.issues.subscribe(SubscriptionConfig::default())
    }

    /// Subscribe with an explicit buffer size.
    pub fn issue_iterator_with(&self, config: SubscriptionConfig) -> IssueSubscription {
        self.issues.subscribe(config)
    }

    fn flattened(&self) -> Arc<Vec<FlattenedEdge>> {
        let version = self.buffer.version();
        self.flattened
            .lock()
            .get_or_compute(version, || self.buffer.all_with_cursor())
    }

    fn newest_edge_cursor(&self, source_id: &str) -> Option<Cursor> {
        let source = self.source_by_id(source_id);
        let edges = self.message_edges(source.as_ref());
        edges.last().map(|edge| edge.cursor)
    }
}
