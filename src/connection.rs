//! Connection views: read-state-annotated edge lists for a source.

use crate::flatten::FlattenedEdge;
use crate::layout::Layout;
use crate::types::MessageRecord;

/// Pagination metadata for a connection.
///
/// `has_next_page` is always `false`: a connection covers the full retained
/// history of its source.
#[derive(Clone, Debug, PartialEq)]
pub struct PageInfo {
    pub has_next_page: bool,
    pub last_read_cursor: Option<String>,
    pub last_cursor: Option<String>,
}

/// Read-only view of one source's events.
#[derive(Clone, Debug, PartialEq)]
pub struct Connection {
    pub count: usize,
    pub unread_count: usize,
    pub edges: Vec<FlattenedEdge>,
    pub page_info: PageInfo,
}

impl Connection {
    /// Lazy projection of edges down to their nodes.
    pub fn nodes(&self) -> impl Iterator<Item = &MessageRecord> {
        self.edges.iter().map(|edge| &edge.node)
    }
}

/// Read state for one source, derived from the layout and its edge list.
#[derive(Clone, Debug, PartialEq)]
pub struct ReadInfo {
    pub unread_count: usize,
    pub last_read_cursor: Option<String>,
}

/// Compute unread count and the surfaced last-read cursor.
///
/// With no recorded cursor everything is unread and the earliest edge's
/// cursor is surfaced as a bootstrapping reference. A recorded cursor is
/// matched by string equality against edge cursors; when it is no longer
/// present (evicted from the buffer) the whole list counts as unread. That
/// fallback is intentional, not an error.
pub fn extract_read_info(layout: &Layout, source_id: &str, edges: &[FlattenedEdge]) -> ReadInfo {
    match layout.source_last_reads.get(source_id) {
        None => ReadInfo {
            unread_count: edges.len(),
            last_read_cursor: edges.first().map(|edge| edge.cursor.to_string()),
        },
        Some(recorded) => {
            let index = edges
                .iter()
                .position(|edge| edge.cursor.to_string() == *recorded);
            let unread_count = match index {
                Some(i) => edges.len() - i - 1,
                None => edges.len(),
            };
            ReadInfo {
                unread_count,
                last_read_cursor: Some(recorded.clone()),
            }
        }
    }
}
