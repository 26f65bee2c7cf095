use std::io::{Read, Write};

use crate::codec;
use crate::error::{Error, Result};
use crate::types::Key;

/// An entry in the SSTable's full index — one per data record.
/// Maps a key to the byte offset of its data entry.
///
/// On-disk format: `key_len(4B) | key | offset(8B, signed)`
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub key: Key,
    pub offset: i64,
}

impl IndexEntry {
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        codec::write_bytes(w, &self.key)?;
        codec::write_i64(w, self.offset)
    }

    pub fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        let key = codec::read_bytes(r)?;
        let offset = codec::read_i64(r)?;
        Ok(IndexEntry { key, offset })
    }
}

/// The footer sits at the very end of the SSTable file.
/// It tells the reader where the index and the Bloom filter start.
///
/// ```text
/// ┌──────────────────────────────────────┐
/// │ Index offset  (8B, signed LE)        │
/// │ Filter offset (8B, signed LE)        │
/// └──────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Footer {
    pub index_offset: i64,
    pub filter_offset: i64,
}

impl Footer {
    /// Size of the footer in bytes (fixed).
    pub const SIZE: usize = 16;

    /// Encode footer to bytes: index offset first, then filter offset.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::SIZE);
        buf.extend_from_slice(&self.index_offset.to_le_bytes());
        buf.extend_from_slice(&self.filter_offset.to_le_bytes());
        buf
    }

    /// Decode the footer and validate its offsets against the file size.
    ///
    /// Rejected as corrupt:
    ///   - either offset negative
    ///   - either offset pointing into (or past) the footer itself
    ///   - filter region not strictly before the index region
    pub fn decode(data: &[u8], file_size: u64) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(Error::Corruption("footer too short".into()));
        }
        let index_offset = i64::from_le_bytes(data[0..8].try_into().unwrap());
        let filter_offset = i64::from_le_bytes(data[8..16].try_into().unwrap());

        let footer_offset = file_size as i64 - Self::SIZE as i64;
        if index_offset < 0 || filter_offset < 0 {
            return Err(Error::Corruption(format!(
                "negative footer offset: index={index_offset} filter={filter_offset}"
            )));
        }
        if index_offset > footer_offset || filter_offset > footer_offset {
            return Err(Error::Corruption(format!(
                "footer offset past end of file: index={index_offset} filter={filter_offset} file_size={file_size}"
            )));
        }
        if filter_offset >= index_offset {
            return Err(Error::Corruption(format!(
                "filter offset {filter_offset} not before index offset {index_offset}"
            )));
        }

        Ok(Footer {
            index_offset,
            filter_offset,
        })
    }
}
