//! Message buffer: append-only, cursor-addressed storage.
//!
//! The in-memory buffer is the source of truth for reads; the optional
//! file log provides write-through persistence and replay on startup.

mod log;
mod memory;

pub use log::MessageLog;
pub use memory::{BufferConfig, MessageBuffer, MessageIterator};
