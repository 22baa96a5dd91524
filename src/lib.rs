//! # devfeed
//!
//! Real-time, multi-source log aggregation and read-tracking engine.
//!
//! ## Core Concepts
//!
//! - **Buffer**: append-only, cursor-addressed store of tagged message records
//! - **Flattening**: one edge per entity identity, first-appearance order,
//!   newest occurrence wins
//! - **Sources**: issue tracker, bundler process, and dynamically discovered
//!   devices partitioning the aggregated log
//! - **Read tracking**: per-source last-read cursors turning edge lists into
//!   unread counts
//! - **Live feed**: ordered subscription to added/updated/deleted issues
//!
//! ## Example
//!
//! ```ignore
//! use devfeed::{
//!     AggregationContext, IssueTracker, MemoryLayoutStore, MessageBuffer,
//!     MessageId, MessageRecord, MessageTag,
//! };
//! use std::sync::Arc;
//!
//! let buffer = Arc::new(MessageBuffer::new());
//! let context = AggregationContext::new(
//!     "./my-app",
//!     Arc::clone(&buffer),
//!     Arc::new(MemoryLayoutStore::new()),
//!     Arc::new(IssueTracker::new()),
//! );
//!
//! buffer.append(MessageRecord::new(
//!     MessageId(1),
//!     MessageTag::Metro,
//!     serde_json::json!({"text": "Bundling 12%"}),
//! ))?;
//!
//! let connection = context.message_connection(Some(&context.process_source()));
//! assert_eq!(connection.unread_count, 1);
//! ```

pub mod buffer;
pub mod connection;
pub mod context;
pub mod error;
pub mod flatten;
pub mod issues;
pub mod layout;
pub mod sources;
pub mod subscriptions;
pub mod types;

// Re-exports
pub use buffer::{BufferConfig, MessageBuffer, MessageIterator, MessageLog};
pub use connection::{extract_read_info, Connection, PageInfo, ReadInfo};
pub use context::AggregationContext;
pub use error::{FeedError, Result};
pub use flatten::{flatten, FlattenCache, FlattenedEdge};
pub use issues::IssueTracker;
pub use layout::{Layout, LayoutStore, MemoryLayoutStore};
pub use sources::{derive_sources, Source, ISSUES_SOURCE_ID, PROCESS_SOURCE_ID};
pub use subscriptions::{
    FeedManager, IssueEvent, IssueEventKind, IssueSubscription, SubscriptionConfig, SubscriptionId,
};
pub use types::{Cursor, MessageId, MessageRecord, MessageTag, ProjectInfo, Timestamp};
