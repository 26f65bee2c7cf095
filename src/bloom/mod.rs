use std::io::{Read, Write};

use crate::codec;
use crate::error::{Error, Result};

/// FNV-64a offset basis.
const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
/// FNV-64a prime.
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// FNV-64a over a one-byte seed followed by the key bytes.
///
/// The seed turns one hash function into k: hash i is
/// `fnv1a_64(i, key) mod m`. Cheap, stateless, and fixed by the on-disk
/// format — a filter written by one build must be readable by the next.
fn fnv1a_64(seed: u8, data: &[u8]) -> u64 {
    let mut h = FNV_OFFSET;
    h ^= u64::from(seed);
    h = h.wrapping_mul(FNV_PRIME);
    for &b in data {
        h ^= u64::from(b);
        h = h.wrapping_mul(FNV_PRIME);
    }
    h
}

/// Probabilistic data structure: "is this key in the set?"
///
/// - If any bit is 0 → key is DEFINITELY NOT in the set
/// - If all bits are 1 → key is PROBABLY in the set (false positive possible)
///
/// Used in SSTable reads to skip tables that definitely don't contain
/// the target key. On a miss-heavy workload this avoids most index probes.
///
/// Sizing for n expected keys at false-positive rate p:
///   m = ceil(-n · ln(p) / (ln 2)²) bits
///   k = round((m / n) · ln 2) hash functions
///
///   1% FPR → ~9.6 bits/key, 7 hashes
pub struct BloomFilter {
    bitset: Vec<u8>,
    m: u64,
    k: u64,
}

impl BloomFilter {
    /// Create a filter sized for `expected_items` at the given FPR.
    ///
    /// `expected_items == 0` degenerates to a single-bit, single-hash
    /// filter rather than dividing by zero.
    ///
    /// # Panics
    /// Panics if FPR is not in (0, 1).
    pub fn new(expected_items: usize, false_positive_rate: f64) -> Self {
        assert!(
            false_positive_rate > 0.0 && false_positive_rate < 1.0,
            "FPR must be in (0, 1)"
        );

        let (m, k) = if expected_items == 0 {
            (1, 1)
        } else {
            let n = expected_items as f64;
            let ln2 = std::f64::consts::LN_2;
            let m = (-n * false_positive_rate.ln() / (ln2 * ln2)).ceil() as u64;
            let m = m.max(1);
            let k = ((m as f64 / n) * ln2).round() as u64;
            (m, k.max(1))
        };

        BloomFilter {
            bitset: vec![0u8; ((m + 7) / 8) as usize],
            m,
            k,
        }
    }

    /// Add a key to the filter.
    pub fn insert(&mut self, key: &[u8]) {
        for i in 0..self.k {
            let pos = fnv1a_64(i as u8, key) % self.m;
            self.bitset[(pos / 8) as usize] |= 1 << (pos % 8);
        }
    }

    /// Check if a key MIGHT be in the set.
    /// false → definitely not here. true → probably here.
    pub fn may_contain(&self, key: &[u8]) -> bool {
        for i in 0..self.k {
            let pos = fnv1a_64(i as u8, key) % self.m;
            if self.bitset[(pos / 8) as usize] & (1 << (pos % 8)) == 0 {
                return false;
            }
        }
        true
    }

    /// Number of hash functions used.
    pub fn num_hashes(&self) -> u64 {
        self.k
    }

    /// Total number of bits in the filter.
    pub fn num_bits(&self) -> u64 {
        self.m
    }

    /// Size of the serialized filter: length prefix + bitset + m + k.
    pub fn encoded_size(&self) -> usize {
        4 + self.bitset.len() + 8 + 8
    }

    /// Serialize into an SSTable: length-prefixed bitset, then m, then k.
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        codec::write_bytes(w, &self.bitset)?;
        codec::write_u64(w, self.m)?;
        codec::write_u64(w, self.k)
    }

    /// Inverse of [`write_to`]. Validates that the bitset length matches
    /// what `m` requires.
    pub fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        let bitset = codec::read_bytes(r)?;
        let m = codec::read_u64(r)?;
        let k = codec::read_u64(r)?;

        if m == 0 {
            return Err(Error::Corruption("bloom filter with zero bits".into()));
        }
        if bitset.len() as u64 != (m + 7) / 8 {
            return Err(Error::Corruption(format!(
                "bloom bitset length {} does not match m={}",
                bitset.len(),
                m
            )));
        }

        Ok(BloomFilter { bitset, m, k })
    }
}
