//! Subscription types for the live issue feed.

use crate::types::MessageRecord;
use serde::{Deserialize, Serialize};

/// What happened to an issue entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueEventKind {
    Added,
    Updated,
    Deleted,
}

/// One item of the live feed: event kind plus the affected entity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IssueEvent {
    #[serde(rename = "type")]
    pub kind: IssueEventKind,
    pub node: MessageRecord,
}

/// Configuration for a subscription.
#[derive(Clone, Copy, Debug)]
pub struct SubscriptionConfig {
    /// Max buffered events before the subscriber is dropped as too slow.
    /// Default: 1000.
    pub buffer_size: usize,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self { buffer_size: 1000 }
    }
}

/// Unique identifier for a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);
