//! Issue tracker: the event-producing collaborator behind the Issues source.
//!
//! Issues live outside the message buffer. The tracker keeps its own ordered
//! edge list in its own cursor space and pushes every mutation into the live
//! subscription feed.

use crate::flatten::FlattenedEdge;
use crate::subscriptions::{
    FeedManager, IssueEvent, IssueEventKind, IssueSubscription, SubscriptionConfig,
};
use crate::types::{Cursor, MessageId, MessageRecord};
use parking_lot::RwLock;

struct IssueList {
    edges: Vec<FlattenedEdge>,
    next_cursor: Cursor,
}

/// Ordered issue list plus live event emission.
pub struct IssueTracker {
    list: RwLock<IssueList>,
    feed: FeedManager,
}

impl IssueTracker {
    pub fn new() -> Self {
        Self {
            list: RwLock::new(IssueList {
                edges: Vec::new(),
                next_cursor: Cursor(1),
            }),
            feed: FeedManager::new(),
        }
    }

    /// Current issue edges, oldest first.
    pub fn issue_list(&self) -> Vec<FlattenedEdge> {
        self.list.read().edges.clone()
    }

    /// Add a new issue and broadcast `Added`.
    ///
    /// Adding an identity that already exists is treated as an update.
    pub fn add_issue(&self, node: MessageRecord) -> Cursor {
        self.upsert(node)
    }

    /// Replace an issue's node in place, advancing its cursor, and
    /// broadcast `Updated`. Unknown identities are added instead.
    pub fn update_issue(&self, node: MessageRecord) -> Cursor {
        self.upsert(node)
    }

    /// Lookup and mutation under one write lock: concurrent calls for the
    /// same identity cannot both observe it absent, so the first writer
    /// inserts and every later one updates the same edge in place.
    fn upsert(&self, node: MessageRecord) -> Cursor {
        let (cursor, kind) = {
            let mut list = self.list.write();
            let cursor = list.next_cursor;
            list.next_cursor = cursor.next();

            match list.edges.iter().position(|edge| edge.node.id == node.id) {
                Some(index) => {
                    list.edges[index] = FlattenedEdge {
                        cursor,
                        node: node.clone(),
                    };
                    (cursor, IssueEventKind::Updated)
                }
                None => {
                    list.edges.push(FlattenedEdge {
                        cursor,
                        node: node.clone(),
                    });
                    (cursor, IssueEventKind::Added)
                }
            }
        };

        self.feed.broadcast(IssueEvent { kind, node });
        cursor
    }

    /// Remove an issue and broadcast `Deleted`. Unknown identities are a
    /// no-op.
    pub fn delete_issue(&self, id: MessageId) {
        let removed = {
            let mut list = self.list.write();
            match list.edges.iter().position(|edge| edge.node.id == id) {
                Some(index) => Some(list.edges.remove(index)),
                None => None,
            }
        };

        if let Some(edge) = removed {
            self.feed.broadcast(IssueEvent {
                kind: IssueEventKind::Deleted,
                node: edge.node,
            });
        }
    }

    /// Subscribe to future issue events.
    pub fn subscribe(&self, config: SubscriptionConfig) -> IssueSubscription {
        self.feed.subscribe(config)
    }
}

impl Default for IssueTracker {
    fn default() -> Self {
        Self::new()
    }
}
