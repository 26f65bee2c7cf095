use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::wal::record::WALRecord;
use crate::wal::SyncPolicy;

/// Writes WAL records to a file on disk.
///
/// Every `put` is appended here before it touches the memtable. On
/// restart, replaying the WAL reconstructs the memtable exactly.
///
/// Two layers of buffering:
///   BufWriter.flush()  → Rust buffer → OS page cache
///   file.sync_all()    → OS page cache → physical disk
///
/// `append` always does the first; the sync policy decides the second.
pub struct WALWriter {
    writer: BufWriter<File>,
    path: PathBuf,
    offset: u64,
    sync_policy: SyncPolicy,
    writes_since_sync: usize,
}

impl WALWriter {
    /// Open (or create) a WAL file for appending.
    pub fn new(path: &Path, sync_policy: SyncPolicy) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(WALWriter {
            writer: BufWriter::new(file),
            path: path.to_path_buf(),
            offset: 0,
            sync_policy,
            writes_since_sync: 0,
        })
    }

    /// Append a record and flush the buffer so the bytes reach the kernel
    /// before the caller is acknowledged. May fsync, per policy.
    pub fn append(&mut self, record: &WALRecord) -> Result<()> {
        let encoded = record.encode();

        self.writer.write_all(&encoded)?;
        self.writer.flush()?;
        self.offset += encoded.len() as u64;
        self.writes_since_sync += 1;

        match self.sync_policy {
            SyncPolicy::Never => {}
            SyncPolicy::EveryWrite => {
                self.writer.get_ref().sync_all()?;
                self.writes_since_sync = 0;
            }
            SyncPolicy::EveryNWrites(n) => {
                if self.writes_since_sync >= n {
                    self.writer.get_ref().sync_all()?;
                    self.writes_since_sync = 0;
                }
            }
        }

        Ok(())
    }

    /// Force fsync to disk. Ensures all buffered writes are durable.
    pub fn sync(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        self.writes_since_sync = 0;
        Ok(())
    }

    /// Current file offset (bytes written through this handle).
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Appends since the last fsync. Observable for tests.
    pub fn writes_since_sync(&self) -> usize {
        self.writes_since_sync
    }

    /// Path of the underlying file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
