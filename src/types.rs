/// Raw key bytes. Keys are ordered lexicographically everywhere.
pub type Key = Vec<u8>;

/// Raw value bytes. May be empty; keys may not (enforced at `put`).
pub type Value = Vec<u8>;
