use crate::error::{Error, Result};
use crate::types::{Key, Value};

/// A single record in the WAL: one `(key, value)` write.
///
/// On-disk format:
/// ```text
/// ┌──────────┬──────────┬───────────────────────────────────────────┐
/// │ Len (4B) │ CRC (4B) │ payload: key_len(4B) key val_len(4B) val  │
/// └──────────┴──────────┴───────────────────────────────────────────┘
/// ```
///
/// `Len` counts the payload only. The CRC (IEEE polynomial) covers the
/// payload only — not the header. If the CRC doesn't match on read, the
/// record was damaged in place; the framing is still intact, so recovery
/// skips it and keeps going. A record whose frame runs past the end of
/// the file is a partial write from a crash, and recovery stops there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WALRecord {
    pub key: Key,
    pub value: Value,
}

/// Length + CRC prefix.
pub const HEADER_SIZE: usize = 8;

impl WALRecord {
    pub fn new(key: Key, value: Value) -> Self {
        WALRecord { key, value }
    }

    /// Serialize this record to bytes (including the length/CRC header).
    pub fn encode(&self) -> Vec<u8> {
        let payload_len = 4 + self.key.len() + 4 + self.value.len();
        let mut buf = Vec::with_capacity(HEADER_SIZE + payload_len);

        // Length of the payload
        buf.extend_from_slice(&(payload_len as u32).to_le_bytes());

        // Reserve space for CRC (filled once the payload is in place)
        buf.extend_from_slice(&[0u8; 4]);

        // Payload: key_len | key | val_len | value
        buf.extend_from_slice(&(self.key.len() as u32).to_le_bytes());
        buf.extend_from_slice(&self.key);
        buf.extend_from_slice(&(self.value.len() as u32).to_le_bytes());
        buf.extend_from_slice(&self.value);

        let crc = crc32fast::hash(&buf[HEADER_SIZE..]);
        buf[4..HEADER_SIZE].copy_from_slice(&crc.to_le_bytes());

        buf
    }

    /// Deserialize one record from the start of `data`, verifying the CRC.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(Error::Corruption("record too short".into()));
        }

        let payload_len = u32::from_le_bytes(data[0..4].try_into().unwrap()) as usize;
        let stored_crc = u32::from_le_bytes(data[4..8].try_into().unwrap());

        let total = HEADER_SIZE + payload_len;
        if data.len() < total {
            return Err(Error::Corruption("record truncated".into()));
        }

        let payload = &data[HEADER_SIZE..total];
        if crc32fast::hash(payload) != stored_crc {
            return Err(Error::Corruption("CRC mismatch".into()));
        }

        Self::decode_payload(payload)
    }

    /// Parse the CRC-verified payload: `key_len | key | val_len | value`.
    pub fn decode_payload(payload: &[u8]) -> Result<Self> {
        if payload.len() < 4 {
            return Err(Error::Corruption("payload too short for key length".into()));
        }
        let key_len = u32::from_le_bytes(payload[0..4].try_into().unwrap()) as usize;

        let mut offset = 4;
        if payload.len() < offset + key_len + 4 {
            return Err(Error::Corruption("key exceeds payload".into()));
        }
        let key = payload[offset..offset + key_len].to_vec();
        offset += key_len;

        let val_len =
            u32::from_le_bytes(payload[offset..offset + 4].try_into().unwrap()) as usize;
        offset += 4;
        if payload.len() < offset + val_len {
            return Err(Error::Corruption("value exceeds payload".into()));
        }
        let value = payload[offset..offset + val_len].to_vec();

        Ok(WALRecord { key, value })
    }

    /// Size of this record when serialized on disk.
    pub fn encoded_size(&self) -> usize {
        HEADER_SIZE + 4 + self.key.len() + 4 + self.value.len()
    }
}
