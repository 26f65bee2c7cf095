use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::bloom::BloomFilter;
use crate::codec;
use crate::error::Result;
use crate::sstable::footer::{Footer, IndexEntry};

/// Builds an immutable SSTable file from a sorted stream of key-value
/// pairs.
///
/// Used during:
/// - Memtable flush (sorted memtable → new L0 table)
/// - Compaction (merged levels → one new table at L+1)
///
/// File layout, in write order:
/// ```text
/// ┌──────────────────────────────────────────────┐
/// │ data entries: key_len|key|val_len|val, sorted │
/// │ bloom filter: bitset (len-prefixed), m, k     │
/// │ index: key_len|key|offset, one per entry      │
/// │ footer: index_offset, filter_offset (16B)     │
/// └──────────────────────────────────────────────┘
/// ```
///
/// The entry count must be known up front — the Bloom filter is sized
/// from it before the first key is written.
pub struct SSTableBuilder {
    writer: BufWriter<File>,
    filter: BloomFilter,
    index: Vec<IndexEntry>,
    /// Current write position. Tracked arithmetically so adds never seek.
    offset: i64,
    /// Last key added; adds must be strictly ascending.
    last_key: Option<Vec<u8>>,
}

impl SSTableBuilder {
    /// Create a builder writing to `path` (typically a `.tmp` name the
    /// engine renames after `finish`).
    pub fn new(path: &Path, expected_entries: usize, false_positive_rate: f64) -> Result<Self> {
        let file = File::create(path)?;
        Ok(SSTableBuilder {
            writer: BufWriter::new(file),
            filter: BloomFilter::new(expected_entries, false_positive_rate),
            index: Vec::with_capacity(expected_entries),
            offset: 0,
            last_key: None,
        })
    }

    /// Add a key-value pair. MUST be called in strictly ascending key
    /// order — the index and the binary-search lookup depend on it.
    pub fn add(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        debug_assert!(
            self.last_key.as_deref().map_or(true, |last| key > last),
            "SSTable entries must be added in strictly ascending key order"
        );

        let entry_offset = self.offset;
        codec::write_bytes(&mut self.writer, key)?;
        codec::write_bytes(&mut self.writer, value)?;
        self.offset += (4 + key.len() + 4 + value.len()) as i64;

        self.filter.insert(key);
        self.index.push(IndexEntry {
            key: key.to_vec(),
            offset: entry_offset,
        });
        self.last_key = Some(key.to_vec());

        Ok(())
    }

    /// Finalize: write filter, index, and footer, then flush and fsync.
    ///
    /// After this returns the bytes are durable; the file is still under
    /// whatever (temp) name it was created with — publication by rename
    /// is the engine's job.
    pub fn finish(mut self) -> Result<()> {
        let filter_offset = self.offset;
        self.filter.write_to(&mut self.writer)?;
        self.offset += self.filter.encoded_size() as i64;

        let index_offset = self.offset;
        for entry in &self.index {
            entry.write_to(&mut self.writer)?;
        }

        let footer = Footer {
            index_offset,
            filter_offset,
        };
        self.writer.write_all(&footer.encode())?;

        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;

        Ok(())
    }

    /// Entries added so far.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether nothing has been added yet.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}
