// Tests for the memtable wrapper around the skip list.

use minildb::memtable::MemTable;

// =============================================================================
// Test 1: Basic put and get
// =============================================================================
#[test]
fn put_then_get_returns_value() {
    let mut mt = MemTable::new();
    mt.put(b"key".to_vec(), b"value".to_vec());

    assert_eq!(mt.get(b"key"), Some(b"value".as_slice()));
}

// =============================================================================
// Test 2: Get non-existent key
// =============================================================================
#[test]
fn get_nonexistent_returns_none() {
    let mt = MemTable::new();
    assert_eq!(mt.get(b"missing"), None);
}

// =============================================================================
// Test 3: Overwrite keeps the latest value
// =============================================================================
#[test]
fn overwrite_returns_latest_value() {
    let mut mt = MemTable::new();
    mt.put(b"key".to_vec(), b"first".to_vec());
    mt.put(b"key".to_vec(), b"second".to_vec());

    assert_eq!(mt.get(b"key"), Some(b"second".as_slice()));
    assert_eq!(mt.len(), 1);
}

// =============================================================================
// Test 4: Empty values are real values
// =============================================================================
#[test]
fn empty_value_is_stored() {
    let mut mt = MemTable::new();
    mt.put(b"key".to_vec(), Vec::new());

    assert_eq!(mt.get(b"key"), Some(b"".as_slice()));
}

// =============================================================================
// Test 5: Iteration is sorted — the flush path relies on it
// =============================================================================
#[test]
fn iter_yields_ascending_keys() {
    let mut mt = MemTable::new();
    mt.put(b"zebra".to_vec(), b"1".to_vec());
    mt.put(b"apple".to_vec(), b"2".to_vec());
    mt.put(b"mango".to_vec(), b"3".to_vec());

    let keys: Vec<&[u8]> = mt.iter().map(|(k, _)| k).collect();
    assert_eq!(
        keys,
        vec![b"apple".as_slice(), b"mango".as_slice(), b"zebra".as_slice()]
    );
}

// =============================================================================
// Test 6: Clear drains everything
// =============================================================================
#[test]
fn clear_empties_the_table() {
    let mut mt = MemTable::new();
    mt.put(b"a".to_vec(), b"1".to_vec());
    mt.put(b"b".to_vec(), b"2".to_vec());
    assert_eq!(mt.len(), 2);
    assert!(mt.size_bytes() > 0);

    mt.clear();

    assert!(mt.is_empty());
    assert_eq!(mt.size_bytes(), 0);
    assert_eq!(mt.get(b"a"), None);
}
