//! In-memory message buffer.
//!
//! The buffer is the sole owner of appended entries. Entries are immutable
//! once stored; a bounded buffer evicts from the front, and readers tolerate
//! the earliest entries disappearing.

use crate::buffer::log::MessageLog;
use crate::error::Result;
use crate::types::{Cursor, MessageRecord};
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::trace;

/// Buffer configuration.
#[derive(Clone, Debug, Default)]
pub struct BufferConfig {
    /// Maximum entries held in memory. `None` means unbounded.
    pub capacity: Option<usize>,

    /// Backing log file. When set, appends are written through to disk and
    /// existing entries are replayed on construction. Eviction applies to
    /// memory only; the file keeps full history.
    pub persist_path: Option<PathBuf>,
}

struct BufferInner {
    /// Entries in append order. Cursors are strictly increasing, so the
    /// deque is always sorted by cursor.
    entries: VecDeque<(Cursor, MessageRecord)>,
    next_cursor: Cursor,
}

/// Append-only store of tagged message records, addressable by cursor.
pub struct MessageBuffer {
    inner: RwLock<BufferInner>,

    /// Bumped on every append; the flatten cache keys off this.
    version: AtomicU64,

    capacity: Option<usize>,
    log: Option<MessageLog>,
}

impl MessageBuffer {
    /// Create an unbounded, in-memory-only buffer.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(BufferInner {
                entries: VecDeque::new(),
                next_cursor: Cursor(1),
            }),
            version: AtomicU64::new(0),
            capacity: None,
            log: None,
        }
    }

    /// Create a buffer from a configuration, replaying the persisted log
    /// when one is configured.
    pub fn with_config(config: BufferConfig) -> Result<Self> {
        let (log, replayed) = match config.persist_path {
            Some(path) => {
                let (log, entries) = MessageLog::open(path)?;
                (Some(log), entries)
            }
            None => (None, Vec::new()),
        };

        let next_cursor = replayed
            .last()
            .map(|(cursor, _)| cursor.next())
            .unwrap_or(Cursor(1));

        let mut entries: VecDeque<_> = replayed.into();
        if let Some(capacity) = config.capacity {
            while entries.len() > capacity {
                entries.pop_front();
            }
        }

        let version = entries.len() as u64;

        Ok(Self {
            inner: RwLock::new(BufferInner {
                entries,
                next_cursor,
            }),
            version: AtomicU64::new(version),
            capacity: config.capacity,
            log,
        })
    }

    /// Append a record, returning its assigned cursor.
    pub fn append(&self, record: MessageRecord) -> Result<Cursor> {
        let mut inner = self.inner.write();
        let cursor = inner.next_cursor;

        // Write through to disk before the entry becomes visible in memory.
        if let Some(ref log) = self.log {
            log.append(cursor, &record)?;
        }

        inner.next_cursor = cursor.next();
        inner.entries.push_back((cursor, record));

        if let Some(capacity) = self.capacity {
            while inner.entries.len() > capacity {
                let evicted = inner.entries.pop_front();
                trace!(cursor = ?evicted.map(|(c, _)| c), "evicted oldest buffer entry");
            }
        }

        self.version.fetch_add(1, Ordering::SeqCst);
        Ok(cursor)
    }

    /// Snapshot of all entries with cursors, oldest first.
    pub fn all_with_cursor(&self) -> Vec<(Cursor, MessageRecord)> {
        self.inner.read().entries.iter().cloned().collect()
    }

    /// Entries appended strictly after `cursor`, oldest first.
    pub fn entries_after(&self, cursor: Cursor) -> Vec<(Cursor, MessageRecord)> {
        let inner = self.inner.read();
        let start = inner.entries.partition_point(|(c, _)| *c <= cursor);
        inner.entries.iter().skip(start).cloned().collect()
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }

    /// Monotonic append counter. Changes whenever the buffer contents change.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    /// Cursor of the newest entry, if any.
    pub fn last_cursor(&self) -> Option<Cursor> {
        self.inner.read().entries.back().map(|(cursor, _)| *cursor)
    }

    /// Lazy, restartable tail iterator over entries appended after `cursor`
    /// (`None` starts from the beginning).
    pub fn iter_from(self: &Arc<Self>, cursor: Option<Cursor>) -> MessageIterator {
        MessageIterator {
            buffer: Arc::clone(self),
            position: cursor.unwrap_or(Cursor(0)),
        }
    }

    /// Flush the persisted log, if one is configured.
    pub fn sync(&self) -> Result<()> {
        if let Some(ref log) = self.log {
            log.sync()?;
        }
        Ok(())
    }
}

impl Default for MessageBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Tail iterator over buffer entries.
///
/// Yields entries with cursors strictly greater than the last yielded
/// position. `next()` returns `None` once caught up, but the iterator is not
/// fused: it resumes yielding after further appends.
pub struct MessageIterator {
    buffer: Arc<MessageBuffer>,
    position: Cursor,
}

impl MessageIterator {
    /// Position of the last yielded entry.
    pub fn position(&self) -> Cursor {
        self.position
    }
}

impl Iterator for MessageIterator {
    type Item = (Cursor, MessageRecord);

    fn next(&mut self) -> Option<Self::Item> {
        let inner = self.buffer.inner.read();
        let start = inner
            .entries
            .partition_point(|(c, _)| *c <= self.position);
        let entry = inner.entries.get(start).cloned()?;
        self.position = entry.0;
        Some(entry)
    }
}
