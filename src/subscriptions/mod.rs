//! Live subscription feed for issue events.
//!
//! Discrete add/update/delete notifications from the issue tracker become
//! an ordered, per-subscriber event sequence over bounded channels:
//! - a subscription sees only events emitted after it was created;
//! - one consumer per handle; dropping the handle unregisters it;
//! - a subscriber that stops draining its buffer is dropped, and its
//!   closed channel is the terminal failure the consumer observes.
//!
//! # Example
//!
//! ```ignore
//! let subscription = context.issue_iterator();
//! for event in subscription {
//!     println!("{:?} {:?}", event.kind, event.node.id);
//! }
//! ```

mod manager;
mod types;

pub use manager::{FeedManager, IssueSubscription};
pub use types::{IssueEvent, IssueEventKind, SubscriptionConfig, SubscriptionId};
