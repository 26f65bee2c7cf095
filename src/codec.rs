//! Binary codec helpers shared by the WAL and SSTable formats.
//!
//! Everything on disk is little-endian. Lengths are `u32`; file offsets
//! are `i64` (they originate from signed seek positions).
//!
//! Reads distinguish two failure shapes:
//! - `Error::Eof` — zero bytes available at a record boundary. Callers
//!   iterating a record stream treat this as a clean stop.
//! - `Error::Corruption` — a partial fill. The stream ends mid-record,
//!   so the bytes read so far cannot be trusted.

use std::io::{self, Read, Write};

use crate::error::{Error, Result};

/// Fill `buf` completely. Zero bytes read → `Eof`; a partial fill →
/// `Corruption`.
fn fill<R: Read>(r: &mut R, buf: &mut [u8]) -> Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => {
                if filled == 0 {
                    return Err(Error::Eof);
                }
                return Err(Error::Corruption("short read".into()));
            }
            Ok(n) => filled += n,
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::Io(e)),
        }
    }
    Ok(())
}

pub fn write_u32<W: Write>(w: &mut W, v: u32) -> Result<()> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

pub fn write_u64<W: Write>(w: &mut W, v: u64) -> Result<()> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

pub fn write_i64<W: Write>(w: &mut W, v: i64) -> Result<()> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

pub fn read_u32<R: Read>(r: &mut R) -> Result<u32> {
    let mut buf = [0u8; 4];
    fill(r, &mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

pub fn read_u64<R: Read>(r: &mut R) -> Result<u64> {
    let mut buf = [0u8; 8];
    fill(r, &mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

pub fn read_i64<R: Read>(r: &mut R) -> Result<i64> {
    let mut buf = [0u8; 8];
    fill(r, &mut buf)?;
    Ok(i64::from_le_bytes(buf))
}

/// Write a `u32` length prefix followed by the raw bytes.
pub fn write_bytes<W: Write>(w: &mut W, b: &[u8]) -> Result<()> {
    write_u32(w, b.len() as u32)?;
    w.write_all(b)?;
    Ok(())
}

/// Inverse of [`write_bytes`]. A stream that ends after a complete length
/// prefix but before the payload is corrupt, not a clean EOF.
pub fn read_bytes<R: Read>(r: &mut R) -> Result<Vec<u8>> {
    let len = read_u32(r)? as usize;
    let mut buf = vec![0u8; len];
    match fill(r, &mut buf) {
        Ok(()) => Ok(buf),
        Err(Error::Eof) => Err(Error::Corruption("byte string truncated".into())),
        Err(e) => Err(e),
    }
}
