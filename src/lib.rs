//! # minildb
//!
//! An embedded key-value store using the Log-Structured Merge-Tree design.
//! Single writer, string keys and values, durable from the first `put`.
//!
//! ## Core idea
//! Instead of updating data in place (B-Tree), buffer writes in memory,
//! flush them as sorted files, and merge those files across levels.
//! This turns random writes into sequential writes — 100-1000x faster
//! on real hardware.
//!
//! Write path: WAL append (crash recovery) → memtable insert.
//! Read path: memtable → L0 newest-first → L1..L6 by key range.
//! Flush: sorted memtable → immutable SSTable, then the WAL is recycled.

pub mod bloom;
pub mod codec;
pub mod compaction;
pub mod db;
pub mod error;
pub mod memtable;
pub mod sstable;
pub mod types;
pub mod wal;

// Public re-exports for the top-level API
pub use db::{Options, Stats, DB};
pub use error::{Error, Result};
