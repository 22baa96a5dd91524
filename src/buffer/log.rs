//! Optional file persistence for the message buffer.
//!
//! The log is append-only: a fixed header followed by length-prefixed,
//! CRC-framed msgpack entries. On open the whole file is replayed to rebuild
//! the in-memory buffer; a torn tail (partial last entry) is truncated away,
//! while a failed checksum inside the stream is reported as corruption.

use crate::error::{FeedError, Result};
use crate::types::{Cursor, MessageRecord};
use fs2::FileExt;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Magic bytes for the buffer log file.
const LOG_MAGIC: &[u8; 4] = b"MSG\0";

/// Current log format version.
const LOG_VERSION: u8 = 1;

/// Header size: magic + version.
const HEADER_SIZE: u64 = 5;

/// Entry frame: payload length + crc32, both little-endian u32.
const FRAME_SIZE: usize = 8;

/// Append-only message log backing a persisted buffer.
#[derive(Debug)]
pub struct MessageLog {
    path: PathBuf,

    /// Write handle. The file is only ever appended to.
    file: Mutex<File>,

    /// Number of appends since the last fsync.
    writes_since_sync: Mutex<u64>,

    /// Sync every N appends (0 is treated as every append).
    sync_interval: u64,
}

impl MessageLog {
    /// Default sync interval, balancing durability against append throughput.
    const DEFAULT_SYNC_INTERVAL: u64 = 100;

    /// Open or create a message log, replaying any existing entries.
    ///
    /// Returns the log and the replayed `(cursor, record)` entries in append
    /// order. Holds an exclusive advisory lock for the lifetime of the log.
    pub fn open(path: impl AsRef<Path>) -> Result<(Self, Vec<(Cursor, MessageRecord)>)> {
        Self::open_with_sync_interval(path, Self::DEFAULT_SYNC_INTERVAL)
    }

    /// Open with a custom sync interval.
    pub fn open_with_sync_interval(
        path: impl AsRef<Path>,
        sync_interval: u64,
    ) -> Result<(Self, Vec<(Cursor, MessageRecord)>)> {
        let path = path.as_ref().to_path_buf();

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;

        file.try_lock_exclusive().map_err(|_| FeedError::Locked)?;

        let len = file.metadata()?.len();
        let entries = if len == 0 {
            file.write_all(LOG_MAGIC)?;
            file.write_all(&[LOG_VERSION])?;
            file.sync_all()?;
            Vec::new()
        } else {
            Self::replay(&mut file, len)?
        };

        debug!(path = %path.display(), entries = entries.len(), "opened message log");

        Ok((
            Self {
                path,
                file: Mutex::new(file),
                writes_since_sync: Mutex::new(0),
                sync_interval: if sync_interval == 0 { 1 } else { sync_interval },
            },
            entries,
        ))
    }

    /// Append one entry to the log.
    pub fn append(&self, cursor: Cursor, record: &MessageRecord) -> Result<()> {
        let payload = rmp_serde::to_vec_named(&(cursor, record))?;
        let checksum = crc32fast::hash(&payload);

        let mut file = self.file.lock();
        file.seek(SeekFrom::End(0))?;
        file.write_all(&(payload.len() as u32).to_le_bytes())?;
        file.write_all(&checksum.to_le_bytes())?;
        file.write_all(&payload)?;

        let mut writes = self.writes_since_sync.lock();
        *writes += 1;
        if *writes >= self.sync_interval {
            file.sync_all()?;
            *writes = 0;
        }

        Ok(())
    }

    /// Force pending writes to disk.
    pub fn sync(&self) -> Result<()> {
        self.file.lock().sync_all()?;
        *self.writes_since_sync.lock() = 0;
        Ok(())
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replay all entries, truncating a torn tail at the last good entry.
    fn replay(file: &mut File, len: u64) -> Result<Vec<(Cursor, MessageRecord)>> {
        file.seek(SeekFrom::Start(0))?;

        let mut magic = [0u8; 4];
        file.read_exact(&mut magic)?;
        if &magic != LOG_MAGIC {
            return Err(FeedError::InvalidFormat("invalid buffer log magic".into()));
        }

        let mut version = [0u8; 1];
        file.read_exact(&mut version)?;
        if version[0] != LOG_VERSION {
            return Err(FeedError::InvalidFormat(format!(
                "unsupported buffer log version: {}",
                version[0]
            )));
        }

        let mut entries = Vec::new();
        let mut good_end = HEADER_SIZE;
        let mut offset = HEADER_SIZE;

        while offset + FRAME_SIZE as u64 <= len {
            let mut frame = [0u8; FRAME_SIZE];
            file.read_exact(&mut frame)?;
            let payload_len = u32::from_le_bytes(frame[0..4].try_into().unwrap()) as u64;
            let expected = u32::from_le_bytes(frame[4..8].try_into().unwrap());

            if offset + FRAME_SIZE as u64 + payload_len > len {
                // Partial last entry, likely a crash mid-append.
                break;
            }

            let mut payload = vec![0u8; payload_len as usize];
            file.read_exact(&mut payload)?;

            let got = crc32fast::hash(&payload);
            if got != expected {
                return Err(FeedError::ChecksumMismatch { expected, got });
            }

            // The checksum held, so a decode failure means the entry was
            // written corrupt rather than damaged in place.
            let entry: (Cursor, MessageRecord) = rmp_serde::from_slice(&payload)
                .map_err(|e| FeedError::Corruption(format!("unreadable log entry: {e}")))?;
            entries.push(entry);

            offset += FRAME_SIZE as u64 + payload_len;
            good_end = offset;
        }

        if good_end < len {
            warn!(
                truncated = len - good_end,
                "truncating torn tail of message log"
            );
            file.set_len(good_end)?;
            file.sync_all()?;
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MessageId, MessageTag};
    use serde_json::json;
    use tempfile::TempDir;

    fn record(id: u64) -> MessageRecord {
        MessageRecord::new(MessageId(id), MessageTag::Metro, json!({"n": id}))
    }

    #[test]
    fn test_append_replay_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("messages.log");

        {
            let (log, entries) = MessageLog::open(&path).unwrap();
            assert!(entries.is_empty());
            log.append(Cursor(1), &record(10)).unwrap();
            log.append(Cursor(2), &record(11)).unwrap();
            log.sync().unwrap();
        }

        let (_log, entries) = MessageLog::open(&path).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, Cursor(1));
        assert_eq!(entries[1].1.id, MessageId(11));
    }

    #[test]
    fn test_torn_tail_is_truncated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("messages.log");

        {
            let (log, _) = MessageLog::open(&path).unwrap();
            log.append(Cursor(1), &record(1)).unwrap();
            log.sync().unwrap();
        }

        // Simulate a crash mid-append: a frame that promises more bytes
        // than the file holds.
        {
            let mut file = OpenOptions::new().append(true).open(&path).unwrap();
            file.write_all(&(64u32).to_le_bytes()).unwrap();
            file.write_all(&(0u32).to_le_bytes()).unwrap();
            file.write_all(b"short").unwrap();
        }

        let (_log, entries) = MessageLog::open(&path).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, Cursor(1));
    }

    #[test]
    fn test_bad_magic_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("messages.log");
        std::fs::write(&path, b"NOPE and then some").unwrap();

        let err = MessageLog::open(&path).unwrap_err();
        assert!(matches!(err, FeedError::InvalidFormat(_)));
    }

    #[test]
    fn test_undecodable_entry_is_corruption() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("messages.log");

        {
            let (_log, _) = MessageLog::open(&path).unwrap();
        }

        // A frame whose checksum is valid but whose payload is not msgpack
        // for a buffer entry (0xc1 is a reserved msgpack byte).
        {
            let mut file = OpenOptions::new().append(true).open(&path).unwrap();
            let payload = [0xc1u8];
            file.write_all(&(payload.len() as u32).to_le_bytes()).unwrap();
            file.write_all(&crc32fast::hash(&payload).to_le_bytes())
                .unwrap();
            file.write_all(&payload).unwrap();
        }

        let err = MessageLog::open(&path).unwrap_err();
        assert!(matches!(err, FeedError::Corruption(_)));
    }

    #[test]
    fn test_checksum_mismatch_detected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("messages.log");

        {
            let (log, _) = MessageLog::open(&path).unwrap();
            log.append(Cursor(1), &record(1)).unwrap();
            log.sync().unwrap();
        }

        // Flip a byte inside the first entry's payload.
        let mut bytes = std::fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        std::fs::write(&path, &bytes).unwrap();

        let err = MessageLog::open(&path).unwrap_err();
        assert!(matches!(err, FeedError::ChecksumMismatch { .. }));
    }
}
