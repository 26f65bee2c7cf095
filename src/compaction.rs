//! Leveled compaction: when a level outgrows its policy, merge it wholesale
//! into the next level down.
//!
//! The merge is total — every table in L and every table in L+1 goes into
//! one new table at L+1, with L winning key conflicts (it holds newer
//! data). That keeps the invariant simple: after compacting L, the level
//! is empty and L+1 holds exactly one table covering the union of the
//! merged key ranges. A single sweep per flush is enough; if the merge
//! pushes L+1 over its own cap, the next sweep takes care of it.

use std::collections::BTreeMap;
use std::fs;

use tracing::{info, warn};

use crate::db::{unix_nanos, DB};
use crate::error::Result;
use crate::sstable::{SSTable, SSTableBuilder};
use crate::types::{Key, Value};

/// Number of levels, L0 through L6.
pub const NUM_LEVELS: usize = 7;

const MIB: u64 = 1024 * 1024;
const GIB: u64 = 1024 * MIB;

/// Per-level compaction thresholds. A level is due when it reaches the
/// file-count cap, or the byte cap when one is set (0 = file count only).
#[derive(Debug, Clone, Copy)]
pub struct LevelPolicy {
    pub max_files: usize,
    pub max_bytes: u64,
}

/// L0 compacts on file count alone — its tables come straight from
/// memtable flushes and overlap freely. Deeper levels add a byte cap
/// growing 10x per level.
pub const LEVEL_POLICIES: [LevelPolicy; NUM_LEVELS] = [
    LevelPolicy { max_files: 4, max_bytes: 0 },
    LevelPolicy { max_files: 10, max_bytes: 10 * MIB },
    LevelPolicy { max_files: 10, max_bytes: 100 * MIB },
    LevelPolicy { max_files: 10, max_bytes: GIB },
    LevelPolicy { max_files: 10, max_bytes: 10 * GIB },
    LevelPolicy { max_files: 10, max_bytes: 100 * GIB },
    LevelPolicy { max_files: 10, max_bytes: 1024 * GIB },
];

impl DB {
    /// One pass over L0..L5, compacting any level over policy. Called
    /// after every flush; cascading overflow is picked up by later
    /// passes.
    pub(crate) fn maybe_compact(&mut self) -> Result<()> {
        for level in 0..NUM_LEVELS - 1 {
            if self.needs_compaction(level) {
                self.compact_level(level)?;
            }
        }
        Ok(())
    }

    fn needs_compaction(&self, level: usize) -> bool {
        let policy = LEVEL_POLICIES[level];
        let tables = &self.levels[level];
        if tables.len() >= policy.max_files {
            return true;
        }
        policy.max_bytes > 0
            && tables.iter().map(|t| t.file_size()).sum::<u64>() >= policy.max_bytes
    }

    /// Merge all of `level` and `level + 1` into one new table at
    /// `level + 1`.
    ///
    /// Precedence: within L, later-written tables shadow earlier ones
    /// (plain map overwrite in write order); L shadows L+1 (L+1 keys are
    /// only added where absent). The new table is published with the same
    /// temp + fsync + rename dance as a flush before any input is
    /// deleted.
    fn compact_level(&mut self, level: usize) -> Result<()> {
        let target = level + 1;

        let mut merged: BTreeMap<Key, Value> = BTreeMap::new();
        for sst in &self.levels[level] {
            for (key, value) in sst.entries()? {
                merged.insert(key, value);
            }
        }
        for sst in &self.levels[target] {
            for (key, value) in sst.entries()? {
                merged.entry(key).or_insert(value);
            }
        }

        let final_name = format!(
            "sstable_l{}_{}_{:06}.sst",
            target,
            unix_nanos(),
            self.next_seq()
        );
        let final_path = self.dir.join(&final_name);
        let tmp_path = self.dir.join(format!("{final_name}.tmp"));

        let mut builder =
            SSTableBuilder::new(&tmp_path, merged.len(), self.opts.false_positive_rate)?;
        for (key, value) in &merged {
            builder.add(key, value)?;
        }
        builder.finish()?;

        fs::rename(&tmp_path, &final_path)?;
        let new_sst = SSTable::open(&final_path)?;

        // Retire the inputs. The merged table is live, so failures here
        // only leak files — warn and keep going.
        let mut old: Vec<SSTable> = self.levels[level].drain(..).collect();
        old.extend(self.levels[target].drain(..));
        let input_count = old.len();
        for sst in old {
            let path = sst.path().to_path_buf();
            if let Err(e) = sst.close() {
                warn!(path = %path.display(), error = %e, "failed to close compacted SSTable");
            }
            if let Err(e) = fs::remove_file(&path) {
                warn!(path = %path.display(), error = %e, "failed to remove compacted SSTable");
            }
        }

        self.levels[target].push(new_sst);
        self.counters.compactions += 1;
        info!(
            from_level = level,
            to_level = target,
            inputs = input_count,
            table = %final_path.display(),
            "compacted level"
        );

        Ok(())
    }
}
