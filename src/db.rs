use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{info, warn};

use crate::compaction::NUM_LEVELS;
use crate::error::{Error, Result};
use crate::memtable::MemTable;
use crate::sstable::{SSTable, SSTableBuilder};
use crate::types::{Key, Value};
use crate::wal::{self, replay, SyncPolicy, WALRecord, WALWriter};

/// Engine tunables. The defaults match the durability contract: bytes
/// reach the kernel on every `put`, fsync happens on flush.
#[derive(Debug, Clone, Copy)]
pub struct Options {
    /// When the WAL fsyncs. See [`SyncPolicy`].
    pub sync_policy: SyncPolicy,
    /// Target Bloom filter false-positive rate for new SSTables.
    pub false_positive_rate: f64,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            sync_policy: SyncPolicy::Never,
            false_positive_rate: 0.01,
        }
    }
}

/// Point-in-time engine counters and sizes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stats {
    pub puts: u64,
    pub flushes: u64,
    pub compactions: u64,
    pub memtable_entries: usize,
    pub memtable_bytes: usize,
    pub num_sstables: usize,
}

/// The storage engine: a memtable over a WAL, in front of seven levels
/// of immutable SSTables.
///
/// Single-writer: exactly one `put`/`flush`/`close` in flight at a time,
/// and no writes concurrent with reads. The engine holds every resource
/// exclusively — the WAL handle, and each SSTable's descriptor + map.
pub struct DB {
    pub(crate) dir: PathBuf,
    memtable: MemTable,
    wal: WALWriter,
    /// L0 may overlap (ordered oldest → newest); L1..L6 are disjoint.
    pub(crate) levels: [Vec<SSTable>; NUM_LEVELS],
    pub(crate) opts: Options,
    pub(crate) counters: Stats,
    /// Tie-breaker for SSTable file names minted in the same nanosecond.
    file_seq: u64,
}

impl DB {
    /// Open (creating if necessary) a database in `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<DB> {
        Self::open_with_options(dir, Options::default())
    }

    /// Open with explicit [`Options`].
    ///
    /// 1. Create the directory if missing
    /// 2. Sweep leftover `.tmp` files from an interrupted flush/compaction
    /// 3. Replay the WAL into a fresh memtable
    /// 4. Open the WAL for appending
    /// 5. Load every `*.sst` (name-ascending) into L0 — unreadable files
    ///    are skipped with a warning, and compaction re-levels over time
    pub fn open_with_options(dir: impl AsRef<Path>, opts: Options) -> Result<DB> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        remove_stale_tmp_files(&dir);

        let wal_path = dir.join(wal::WAL_FILE_NAME);
        let mut memtable = MemTable::new();
        for (key, value) in replay(&wal_path)? {
            memtable.put(key, value);
        }
        if !memtable.is_empty() {
            info!(entries = memtable.len(), "replayed WAL into memtable");
        }
        let wal = WALWriter::new(&wal_path, opts.sync_policy)?;

        let mut table_paths: Vec<PathBuf> = fs::read_dir(&dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().map_or(false, |ext| ext == "sst"))
            .collect();
        table_paths.sort();

        let mut levels: [Vec<SSTable>; NUM_LEVELS] = std::array::from_fn(|_| Vec::new());
        for path in table_paths {
            match SSTable::open(&path) {
                Ok(sst) => levels[0].push(sst),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable SSTable")
                }
            }
        }

        Ok(DB {
            dir,
            memtable,
            wal,
            levels,
            opts,
            counters: Stats::default(),
            file_seq: 0,
        })
    }

    /// Write a key-value pair. The WAL accepts it first; the memtable is
    /// untouched if the append fails.
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        if key.is_empty() {
            return Err(Error::InvalidArgument("key cannot be empty".into()));
        }

        self.wal
            .append(&WALRecord::new(key.to_vec(), value.to_vec()))?;
        self.memtable.put(key.to_vec(), value.to_vec());
        self.counters.puts += 1;

        Ok(())
    }

    /// Read a key. Search order is newest data first:
    ///
    /// 1. Memtable
    /// 2. L0, newest table first (tables there may overlap)
    /// 3. L1..L6 — each level is disjoint by key range, so at most one
    ///    table per level can hold the key; a miss there moves straight
    ///    to the next level
    pub fn get(&self, key: &[u8]) -> Result<Value> {
        if let Some(value) = self.memtable.get(key) {
            return Ok(value.to_vec());
        }

        for sst in self.levels[0].iter().rev() {
            if sst.is_empty() {
                continue;
            }
            if let Some(value) = sst.get(key)? {
                return Ok(value);
            }
        }

        for level in 1..NUM_LEVELS {
            let candidate = self.levels[level].iter().find(|sst| {
                match (sst.first_key(), sst.last_key()) {
                    (Some(first), Some(last)) => first <= key && key <= last,
                    _ => false,
                }
            });
            if let Some(sst) = candidate {
                if let Some(value) = sst.get(key)? {
                    return Ok(value);
                }
            }
        }

        Err(Error::NotFound)
    }

    /// Write several pairs in order. Stops at the first failure.
    pub fn put_batch(&mut self, pairs: &[(Key, Value)]) -> Result<()> {
        for (key, value) in pairs {
            self.put(key, value)?;
        }
        Ok(())
    }

    /// Read several keys, one result per key.
    pub fn get_batch(&self, keys: &[Key]) -> Vec<Result<Value>> {
        keys.iter().map(|key| self.get(key)).collect()
    }

    /// Flush the memtable to a new L0 SSTable. No-op when empty.
    ///
    /// The new table is written under a `.tmp` name, fsync'd, and only
    /// then renamed — a crash anywhere before the rename leaves nothing
    /// visible. Once the table is live the WAL is deleted and recreated
    /// empty; its contents are now redundant.
    pub fn flush(&mut self) -> Result<()> {
        if self.memtable.is_empty() {
            return Ok(());
        }

        let final_name = format!("sstable_{}_{:06}.sst", unix_nanos(), self.next_seq());
        let final_path = self.dir.join(&final_name);
        let tmp_path = self.dir.join(format!("{final_name}.tmp"));

        let mut builder = SSTableBuilder::new(
            &tmp_path,
            self.memtable.len(),
            self.opts.false_positive_rate,
        )?;
        for (key, value) in self.memtable.iter() {
            builder.add(key, value)?;
        }
        builder.finish()?;

        fs::rename(&tmp_path, &final_path)?;
        let sst = SSTable::open(&final_path)?;

        // WAL rollover: the data just became durable in the SSTable, so
        // the log can go. Recreate before the old handle drops — appends
        // were flushed per record, nothing is buffered.
        let wal_path = self.dir.join(wal::WAL_FILE_NAME);
        fs::remove_file(&wal_path)?;
        self.wal = WALWriter::new(&wal_path, self.opts.sync_policy)?;

        self.memtable.clear();
        self.levels[0].push(sst);
        self.counters.flushes += 1;
        info!(table = %final_path.display(), "flushed memtable");

        // Compaction failures never fail the flush — the data is safe,
        // the levels are just fatter than policy wants.
        if let Err(e) = self.maybe_compact() {
            warn!(error = %e, "compaction after flush failed");
        }

        Ok(())
    }

    /// Engine counters and sizes right now.
    pub fn stats(&self) -> Stats {
        Stats {
            memtable_entries: self.memtable.len(),
            memtable_bytes: self.memtable.size_bytes(),
            num_sstables: self.levels.iter().map(|l| l.len()).sum(),
            ..self.counters
        }
    }

    /// Shut down: release every SSTable, then the WAL. Every resource is
    /// attempted; the first error is returned.
    pub fn close(mut self) -> Result<()> {
        let mut first_err = None;

        for level in self.levels.iter_mut() {
            for sst in level.drain(..) {
                if let Err(e) = sst.close() {
                    first_err.get_or_insert(e);
                }
            }
        }

        if let Err(e) = self.wal.sync() {
            first_err.get_or_insert(e);
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Database directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub(crate) fn next_seq(&mut self) -> u64 {
        self.file_seq += 1;
        self.file_seq
    }
}

/// Nanoseconds since the epoch, for SSTable file names. Uniqueness comes
/// from the appended sequence number, not from the clock.
pub(crate) fn unix_nanos() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0)
}

/// Best-effort sweep of `.tmp` leftovers from an interrupted flush or
/// compaction. They were never renamed, so they were never visible.
fn remove_stale_tmp_files(dir: &Path) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return,
    };
    for path in entries.filter_map(|e| e.ok().map(|e| e.path())) {
        if path.extension().map_or(false, |ext| ext == "tmp") {
            match fs::remove_file(&path) {
                Ok(()) => info!(path = %path.display(), "removed stale temp file"),
                Err(e) => warn!(path = %path.display(), error = %e, "failed to remove stale temp file"),
            }
        }
    }
}
