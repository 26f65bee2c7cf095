use std::fs::File;
use std::path::{Path, PathBuf};

use memmap2::Mmap;

use crate::bloom::BloomFilter;
use crate::codec;
use crate::error::{Error, Result};
use crate::sstable::footer::{Footer, IndexEntry};
use crate::types::{Key, Value};

/// An opened, immutable SSTable. Supports point lookups and full scans.
///
/// On open:
/// 1. Map the whole file read-only
/// 2. Parse + validate the footer (last 16 bytes)
/// 3. Parse the Bloom filter and the full index into memory
///
/// Lookups then touch the mapped data region directly — no read syscalls,
/// no buffer copies until the value itself is returned.
pub struct SSTable {
    path: PathBuf,
    /// Declared before `file` so drop order unmaps before closing.
    mmap: Mmap,
    /// Keeps the descriptor alive for the lifetime of the map.
    #[allow(dead_code)]
    file: File,
    /// Full index: one entry per data record, ascending by key.
    index: Vec<IndexEntry>,
    filter: BloomFilter,
    file_size: u64,
}

impl SSTable {
    /// Open and parse an SSTable file.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let file_size = file.metadata()?.len();
        if file_size < Footer::SIZE as u64 {
            return Err(Error::Corruption(format!(
                "SSTable too small ({file_size} bytes): {}",
                path.display()
            )));
        }

        // SAFETY: tables are immutable once published (written under a
        // temp name, fsync'd, renamed); nothing writes the file while it
        // is mapped.
        let mmap = unsafe { Mmap::map(&file)? };

        let footer_start = file_size as usize - Footer::SIZE;
        let footer = Footer::decode(&mmap[footer_start..], file_size)?;

        let mut filter_region = &mmap[footer.filter_offset as usize..footer_start];
        let filter = BloomFilter::read_from(&mut filter_region)?;

        // Index entries run from index_offset to the footer. A trailing
        // incomplete entry ends the parse cleanly rather than failing the
        // whole table.
        let mut index_region = &mmap[footer.index_offset as usize..footer_start];
        let mut index = Vec::new();
        loop {
            match IndexEntry::read_from(&mut index_region) {
                Ok(entry) => index.push(entry),
                Err(Error::Eof) | Err(Error::Corruption(_)) => break,
                Err(e) => return Err(e),
            }
        }

        Ok(SSTable {
            path: path.to_path_buf(),
            mmap,
            file,
            index,
            filter,
            file_size,
        })
    }

    /// Point lookup.
    ///
    /// 1. Bloom filter says "definitely not here" → miss, no index probe
    /// 2. Binary-search the index for the exact key → miss if absent
    /// 3. Read the data entry at the index offset from the map; a key
    ///    mismatch there means a lying index — treated as a miss
    pub fn get(&self, key: &[u8]) -> Result<Option<Value>> {
        if !self.filter.may_contain(key) {
            return Ok(None);
        }

        let idx = match self
            .index
            .binary_search_by(|entry| entry.key.as_slice().cmp(key))
        {
            Ok(i) => i,
            Err(_) => return Ok(None),
        };

        let (stored_key, value) = self.read_entry(self.index[idx].offset)?;
        if stored_key != key {
            return Ok(None);
        }
        Ok(Some(value))
    }

    /// Read the `(key, value)` data entry starting at `offset`.
    fn read_entry(&self, offset: i64) -> Result<(Key, Value)> {
        if offset < 0 || offset as u64 >= self.file_size {
            return Err(Error::Corruption(format!(
                "data offset {offset} out of range in {}",
                self.path.display()
            )));
        }
        let mut region = &self.mmap[offset as usize..];
        let key = codec::read_bytes(&mut region)?;
        let value = codec::read_bytes(&mut region)?;
        Ok((key, value))
    }

    /// All `(key, value)` pairs in ascending key order. Compaction reads
    /// whole tables through this.
    pub fn entries(&self) -> Result<Vec<(Key, Value)>> {
        let mut out = Vec::with_capacity(self.index.len());
        for entry in &self.index {
            out.push(self.read_entry(entry.offset)?);
        }
        Ok(out)
    }

    /// Smallest key in the table, if any.
    pub fn first_key(&self) -> Option<&[u8]> {
        self.index.first().map(|e| e.key.as_slice())
    }

    /// Largest key in the table, if any.
    pub fn last_key(&self) -> Option<&[u8]> {
        self.index.last().map(|e| e.key.as_slice())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the table holds no entries.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// On-disk size in bytes.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Path of the underlying file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the table: unmap, then close the descriptor.
    pub fn close(self) -> Result<()> {
        let SSTable { mmap, file, .. } = self;
        drop(mmap);
        drop(file);
        Ok(())
    }
}
