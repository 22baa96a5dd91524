//! Persisted buffer log: replay across engine restarts.

use devfeed::{
    AggregationContext, BufferConfig, IssueTracker, MemoryLayoutStore, MessageBuffer, MessageId,
    MessageRecord, MessageTag, Source,
};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

fn persisted_buffer(path: PathBuf) -> Arc<MessageBuffer> {
    Arc::new(
        MessageBuffer::with_config(BufferConfig {
            capacity: None,
            persist_path: Some(path),
        })
        .unwrap(),
    )
}

fn context_for(buffer: Arc<MessageBuffer>) -> AggregationContext {
    AggregationContext::new(
        "./my-app",
        buffer,
        Arc::new(MemoryLayoutStore::new()),
        Arc::new(IssueTracker::new()),
    )
}

#[test]
fn test_engine_restart_preserves_log_and_sources() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("messages.log");

    {
        let buffer = persisted_buffer(path.clone());
        buffer
            .append(
                MessageRecord::new(MessageId(1), MessageTag::Device, json!({}))
                    .with_device("A", "Pixel 8"),
            )
            .unwrap();
        buffer
            .append(MessageRecord::new(
                MessageId(2),
                MessageTag::Metro,
                json!({"text": "Bundling"}),
            ))
            .unwrap();
        buffer.sync().unwrap();
    }

    let buffer = persisted_buffer(path);
    let context = context_for(Arc::clone(&buffer));

    let edges = context.message_edges(None);
    assert_eq!(edges.len(), 2);
    assert_eq!(edges[0].cursor.to_string(), "1");

    // Device discovery survives the restart.
    assert!(context.sources().contains(&Source::Device {
        id: "A".into(),
        name: "Pixel 8".into()
    }));

    // And cursor assignment continues past the replayed entries.
    let next = buffer
        .append(MessageRecord::new(
            MessageId(3),
            MessageTag::Metro,
            json!({}),
        ))
        .unwrap();
    assert_eq!(next.to_string(), "3");
}

#[test]
fn test_bounded_memory_keeps_full_file_history() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("messages.log");

    {
        let buffer = Arc::new(
            MessageBuffer::with_config(BufferConfig {
                capacity: Some(2),
                persist_path: Some(path.clone()),
            })
            .unwrap(),
        );
        for id in 1..=4 {
            buffer
                .append(MessageRecord::new(
                    MessageId(id),
                    MessageTag::Metro,
                    json!({ "n": id }),
                ))
                .unwrap();
        }
        buffer.sync().unwrap();
        // Memory holds only the newest two.
        assert_eq!(buffer.len(), 2);
    }

    // An unbounded reopen replays everything the file retained.
    let buffer = persisted_buffer(path);
    assert_eq!(buffer.len(), 4);
}
