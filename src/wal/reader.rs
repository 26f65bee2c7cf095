use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::warn;

use crate::error::Result;
use crate::types::{Key, Value};
use crate::wal::record::{WALRecord, HEADER_SIZE};

/// Reads WAL records from a file for crash recovery.
///
/// Loads the entire file into memory, then iterates record by record.
/// Two kinds of damage, two different answers:
///
/// - CRC mismatch with intact framing: the record was corrupted in place.
///   Skip it (with a warning) and keep going — everything after it is
///   still framed correctly.
/// - Frame runs past the end of the file: a torn write from a crash.
///   Nothing valid can follow, so iteration stops.
pub struct WALReader {
    data: Vec<u8>,
}

impl WALReader {
    /// Open a WAL file for reading.
    pub fn new(path: &Path) -> Result<Self> {
        let data = fs::read(path)?;
        Ok(WALReader { data })
    }

    /// Create an iterator over all intact records in the WAL.
    pub fn iter(&self) -> WALIterator<'_> {
        WALIterator {
            data: &self.data,
            offset: 0,
        }
    }
}

/// Iterator over WAL records. Skips CRC-damaged records, stops at a torn
/// tail or clean EOF.
pub struct WALIterator<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Iterator for WALIterator<'a> {
    type Item = WALRecord;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let remaining = &self.data[self.offset..];

            // Clean EOF, or a header cut short by a crash.
            if remaining.len() < HEADER_SIZE {
                return None;
            }

            let payload_len =
                u32::from_le_bytes(remaining[0..4].try_into().unwrap()) as usize;
            let total = HEADER_SIZE + payload_len;

            // Torn tail: the frame promises more bytes than the file has.
            if remaining.len() < total {
                return None;
            }

            let stored_crc = u32::from_le_bytes(remaining[4..8].try_into().unwrap());
            let payload = &remaining[HEADER_SIZE..total];
            self.offset += total;

            if crc32fast::hash(payload) != stored_crc {
                warn!(offset = self.offset - total, "CRC mismatch in WAL record, skipping");
                continue;
            }

            match WALRecord::decode_payload(payload) {
                Ok(record) => return Some(record),
                Err(e) => {
                    warn!(offset = self.offset - total, error = %e, "malformed WAL payload, skipping");
                    continue;
                }
            }
        }
    }
}

/// Replay a WAL file into a last-writer-wins map.
///
/// A missing file is a fresh database, not an error.
pub fn replay(path: &Path) -> Result<BTreeMap<Key, Value>> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }

    let reader = WALReader::new(path)?;
    let mut entries = BTreeMap::new();
    for record in reader.iter() {
        entries.insert(record.key, record.value);
    }
    Ok(entries)
}
