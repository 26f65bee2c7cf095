// End-to-end engine tests: the write path, the lookup order, flush
// publication, WAL recovery, and leveled compaction.

use std::path::Path;

use minildb::wal::WALRecord;
use minildb::{Error, DB};

/// Helper: the `.sst` file names currently in `dir`, sorted.
fn sst_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n.ends_with(".sst"))
        .collect();
    names.sort();
    names
}

// =============================================================================
// Test 1: Basic round trip — put, flush, get; absent key is NotFound
// =============================================================================
#[test]
fn basic_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = DB::open(dir.path()).unwrap();

    db.put(b"foo", b"bar").unwrap();
    db.flush().unwrap();

    assert_eq!(db.get(b"foo").unwrap(), b"bar");
    assert!(matches!(db.get(b"baz"), Err(Error::NotFound)));

    db.close().unwrap();
}

// =============================================================================
// Test 2: Overwrite across a flush — memtable beats L0, newer L0 beats
// older L0
// =============================================================================
#[test]
fn overwrite_across_flush() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = DB::open(dir.path()).unwrap();

    db.put(b"k", b"v1").unwrap();
    db.flush().unwrap();
    db.put(b"k", b"v2").unwrap();
    assert_eq!(db.get(b"k").unwrap(), b"v2", "memtable must beat L0");

    db.flush().unwrap();
    assert_eq!(db.get(b"k").unwrap(), b"v2", "newer L0 table must beat older");

    db.close().unwrap();
}

// =============================================================================
// Test 3: WAL replay — drop without flush, reopen, everything is back
// =============================================================================
#[test]
fn wal_replay_after_crash() {
    let dir = tempfile::tempdir().unwrap();

    {
        let mut db = DB::open(dir.path()).unwrap();
        db.put(b"a", b"1").unwrap();
        db.put(b"b", b"2").unwrap();
        db.put(b"a", b"3").unwrap();
        // No flush, no close — the process just dies.
        drop(db);
    }

    let db = DB::open(dir.path()).unwrap();
    assert_eq!(db.get(b"a").unwrap(), b"3", "last write must win on replay");
    assert_eq!(db.get(b"b").unwrap(), b"2");
    db.close().unwrap();
}

// =============================================================================
// Test 4: A CRC-corrupted WAL record is dropped on replay; the rest of
// the log still recovers and reopen does not error
// =============================================================================
#[test]
fn corrupted_wal_record_tolerated() {
    let dir = tempfile::tempdir().unwrap();

    {
        let mut db = DB::open(dir.path()).unwrap();
        db.put(b"a", b"1").unwrap();
        db.put(b"b", b"2").unwrap();
        db.put(b"a", b"3").unwrap();
        drop(db);
    }

    // Flip a payload byte in the second record: put(b, 2)
    let wal_path = dir.path().join("wal.log");
    let mut raw = std::fs::read(&wal_path).unwrap();
    let first_len = WALRecord::new(b"a".to_vec(), b"1".to_vec()).encoded_size();
    raw[first_len + 8] ^= 0xFF; // first payload byte of record 2
    std::fs::write(&wal_path, &raw).unwrap();

    let db = DB::open(dir.path()).unwrap();
    assert_eq!(db.get(b"a").unwrap(), b"3");
    assert!(matches!(db.get(b"b"), Err(Error::NotFound)));
    db.close().unwrap();
}

// =============================================================================
// Test 5: L0 fills to its 4-file cap and compacts into a single L1 table
// holding every key
// =============================================================================
#[test]
fn l0_cap_triggers_compaction_into_l1() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = DB::open(dir.path()).unwrap();

    for batch in 0..4 {
        for i in 0..4 {
            let key = format!("key_{batch}_{i}");
            db.put(key.as_bytes(), b"v").unwrap();
        }
        db.flush().unwrap();
    }

    // The 4th flush pushed L0 to its cap; the sweep merged everything
    // into exactly one table at L1.
    let files = sst_files(dir.path());
    assert_eq!(files.len(), 1, "expected one merged table, got {files:?}");
    assert!(
        files[0].starts_with("sstable_l1_"),
        "merged table should live at L1: {files:?}"
    );
    assert_eq!(db.stats().compactions, 1);

    for batch in 0..4 {
        for i in 0..4 {
            let key = format!("key_{batch}_{i}");
            assert_eq!(db.get(key.as_bytes()).unwrap(), b"v");
        }
    }

    db.close().unwrap();
}

// =============================================================================
// Test 6: Shadowing through compaction — the newest L0 value for a key
// survives the merge
// =============================================================================
#[test]
fn compaction_keeps_newest_value() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = DB::open(dir.path()).unwrap();

    db.put(b"k", b"old").unwrap();
    db.flush().unwrap();
    db.put(b"k", b"new").unwrap();
    db.flush().unwrap();

    // Two more flushes with filler keys to reach the L0 cap
    for batch in 0..2 {
        db.put(format!("filler_{batch}").as_bytes(), b"x").unwrap();
        db.flush().unwrap();
    }

    let files = sst_files(dir.path());
    assert_eq!(files.len(), 1);
    assert!(files[0].starts_with("sstable_l1_"));
    assert_eq!(db.get(b"k").unwrap(), b"new", "newer L0 value must shadow older");

    db.close().unwrap();
}

// =============================================================================
// Test 7: Reopen after flush loads the table and serves reads from disk
// =============================================================================
#[test]
fn reopen_reads_from_sstables() {
    let dir = tempfile::tempdir().unwrap();

    {
        let mut db = DB::open(dir.path()).unwrap();
        for i in 0..20 {
            db.put(format!("key_{i:03}").as_bytes(), format!("val_{i}").as_bytes())
                .unwrap();
        }
        db.flush().unwrap();
        db.close().unwrap();
    }

    let db = DB::open(dir.path()).unwrap();
    for i in 0..20 {
        assert_eq!(
            db.get(format!("key_{i:03}").as_bytes()).unwrap(),
            format!("val_{i}").into_bytes()
        );
    }
    db.close().unwrap();
}

// =============================================================================
// Test 8: Empty keys are rejected; empty values are fine
// =============================================================================
#[test]
fn empty_key_rejected_empty_value_allowed() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = DB::open(dir.path()).unwrap();

    assert!(matches!(
        db.put(b"", b"value"),
        Err(Error::InvalidArgument(_))
    ));

    db.put(b"key", b"").unwrap();
    assert_eq!(db.get(b"key").unwrap(), Vec::<u8>::new());

    db.close().unwrap();
}

// =============================================================================
// Test 9: Flushing an empty memtable is a no-op
// =============================================================================
#[test]
fn flush_empty_memtable_is_noop() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = DB::open(dir.path()).unwrap();

    db.flush().unwrap();

    assert!(sst_files(dir.path()).is_empty());
    assert_eq!(db.stats().flushes, 0);
    db.close().unwrap();
}

// =============================================================================
// Test 10: Flush recycles the WAL — the log starts over, empty
// =============================================================================
#[test]
fn flush_recycles_wal() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = DB::open(dir.path()).unwrap();

    db.put(b"a", b"1").unwrap();
    let wal_path = dir.path().join("wal.log");
    assert!(std::fs::metadata(&wal_path).unwrap().len() > 0);

    db.flush().unwrap();

    assert_eq!(
        std::fs::metadata(&wal_path).unwrap().len(),
        0,
        "WAL must be recreated empty after flush"
    );
    assert_eq!(db.stats().memtable_entries, 0);

    // The flushed value is still durable without the WAL
    assert_eq!(db.get(b"a").unwrap(), b"1");
    db.close().unwrap();
}

// =============================================================================
// Test 11: Batched operations are sequential puts and gets
// =============================================================================
#[test]
fn batch_put_and_get() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = DB::open(dir.path()).unwrap();

    let pairs: Vec<(Vec<u8>, Vec<u8>)> = (0..10)
        .map(|i| (format!("k{i}").into_bytes(), format!("v{i}").into_bytes()))
        .collect();
    db.put_batch(&pairs).unwrap();

    let keys: Vec<Vec<u8>> = (0..11).map(|i| format!("k{i}").into_bytes()).collect();
    let results = db.get_batch(&keys);
    assert_eq!(results.len(), 11);
    for (i, result) in results.iter().take(10).enumerate() {
        assert_eq!(result.as_ref().unwrap(), &format!("v{i}").into_bytes());
    }
    assert!(matches!(results[10], Err(Error::NotFound)));

    db.close().unwrap();
}

// =============================================================================
// Test 12: Stats counters track the work done
// =============================================================================
#[test]
fn stats_track_operations() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = DB::open(dir.path()).unwrap();

    db.put(b"a", b"1").unwrap();
    db.put(b"b", b"2").unwrap();

    let stats = db.stats();
    assert_eq!(stats.puts, 2);
    assert_eq!(stats.memtable_entries, 2);
    assert!(stats.memtable_bytes > 0);
    assert_eq!(stats.num_sstables, 0);

    db.flush().unwrap();

    let stats = db.stats();
    assert_eq!(stats.flushes, 1);
    assert_eq!(stats.memtable_entries, 0);
    assert_eq!(stats.num_sstables, 1);

    db.close().unwrap();
}

// =============================================================================
// Test 13: Stray .tmp files from an interrupted flush are swept at open
// =============================================================================
#[test]
fn stale_tmp_files_removed_at_open() {
    let dir = tempfile::tempdir().unwrap();
    let stray = dir.path().join("sstable_123_000001.sst.tmp");
    std::fs::write(&stray, b"half-written garbage").unwrap();

    let db = DB::open(dir.path()).unwrap();

    assert!(!stray.exists(), "stray temp file must be swept at open");
    db.close().unwrap();
}

// =============================================================================
// Test 14: An unreadable .sst file is skipped at open, not fatal
// =============================================================================
#[test]
fn unreadable_sstable_skipped_at_open() {
    let dir = tempfile::tempdir().unwrap();

    {
        let mut db = DB::open(dir.path()).unwrap();
        db.put(b"good", b"data").unwrap();
        db.flush().unwrap();
        db.close().unwrap();
    }

    // Drop a garbage .sst next to the real one
    std::fs::write(dir.path().join("sstable_000_000000.sst"), b"not a table").unwrap();

    let db = DB::open(dir.path()).unwrap();
    assert_eq!(db.get(b"good").unwrap(), b"data");
    db.close().unwrap();
}
