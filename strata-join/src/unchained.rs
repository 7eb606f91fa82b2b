//! Serial unchained hash table.
//!
//! Layout follows the unchained design: one contiguous, slot-sorted entry
//! array (`tuple_storage`) indexed by a directory of `capacity + 1` cells.
//! Each cell packs a 48-bit byte offset into the entry array with a 16-bit
//! bloom tag: `(offset << 16) | tag`. Cell 0 is the underflow cell holding
//! the storage base offset, and slot `s` lives at cell `s + 1`, so a slot's
//! entry range is always `[cell[s] >> 16, cell[s + 1] >> 16)` with no branch
//! for slot zero.

use crate::hash::{compute_tag, could_contain, hash_key};
use crate::ProbeIndex;

/// One build-side tuple: the join key and its row index.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HashEntry {
    pub key: i32,
    pub row_idx: u64,
}

const ENTRY_BYTES: u64 = std::mem::size_of::<HashEntry>() as u64;

/// Bloom-tagged unchained hash table built in one thread.
///
/// Usage is reserve-insert-finalize: [`with_capacity`] sizes the table for
/// the build side, [`insert`] accumulates entries (duplicates expected, no
/// slot computation yet), and [`finalize`] runs the three-phase
/// count / prefix-sum / scatter build. Lookups are valid only after
/// `finalize`.
///
/// [`with_capacity`]: UnchainedHashTable::with_capacity
/// [`insert`]: UnchainedHashTable::insert
/// [`finalize`]: UnchainedHashTable::finalize
pub struct UnchainedHashTable {
    tuple_storage: Vec<HashEntry>,
    directory: Vec<u64>,
    shift: u32,
    capacity: u64,
    len: usize,
    scratch: Vec<HashEntry>,
}

impl UnchainedHashTable {
    /// Size the table for `build_size` entries.
    ///
    /// The slot count is the next power of two of `build_size`, at least
    /// 1024; the directory gets one extra underflow cell.
    pub fn with_capacity(build_size: usize) -> Self {
        let capacity = build_size.next_power_of_two().max(1024);
        Self {
            tuple_storage: vec![HashEntry::default(); build_size],
            directory: vec![0u64; capacity + 1],
            shift: 64 - capacity.trailing_zeros(),
            capacity: capacity as u64,
            len: 0,
            scratch: Vec::with_capacity(build_size),
        }
    }

    /// Accumulate an entry. No deduplication, no slot computation.
    #[inline]
    pub fn insert(&mut self, key: i32, row_idx: u64) {
        self.scratch.push(HashEntry { key, row_idx });
    }

    /// Three-phase build: count per-slot bytes and accumulate bloom tags,
    /// prefix-sum counts into start offsets, then scatter entries into
    /// their slots. Afterwards every cell holds its slot's end offset,
    /// which is the next slot's start.
    pub fn finalize(&mut self) {
        self.len = self.scratch.len();

        for entry in &self.scratch {
            let h = hash_key(entry.key);
            let slot = (h >> self.shift) as usize;
            self.directory[slot + 1] += ENTRY_BYTES << 16;
            self.directory[slot + 1] |= compute_tag(h) as u64;
        }

        let mut cur: u64 = 0;
        for cell in self.directory[1..].iter_mut() {
            let byte_count = *cell >> 16;
            let bloom = *cell & 0xFFFF;
            *cell = (cur << 16) | bloom;
            cur += byte_count;
        }

        for i in 0..self.scratch.len() {
            let entry = self.scratch[i];
            let h = hash_key(entry.key);
            let slot = (h >> self.shift) as usize;
            let offset = self.directory[slot + 1] >> 16;
            self.tuple_storage[(offset / ENTRY_BYTES) as usize] = entry;
            self.directory[slot + 1] += ENTRY_BYTES << 16;
        }

        self.scratch.clear();
    }

    /// All entries in the probed key's slot, or an empty slice when the
    /// slot's bloom tag proves the key absent.
    ///
    /// The returned range is a superset: callers must re-compare
    /// `entry.key` against the probe key.
    pub fn find_range(&self, key: i32) -> &[HashEntry] {
        let h = hash_key(key);
        let slot = (h >> self.shift) as usize;
        let cell = self.directory[slot + 1];
        if !could_contain(cell as u16, h) {
            return &[];
        }
        let start = (self.directory[slot] >> 16) / ENTRY_BYTES;
        let end = (cell >> 16) / ENTRY_BYTES;
        &self.tuple_storage[start as usize..end as usize]
    }

    /// Number of finalized entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Slot count (power of two).
    #[inline]
    pub fn capacity(&self) -> u64 {
        self.capacity
    }
}

impl ProbeIndex for UnchainedHashTable {
    #[inline]
    fn for_each_match<F: FnMut(u64)>(&self, key: i32, mut f: F) {
        for entry in self.find_range(key) {
            if entry.key == key {
                f(entry.row_idx);
            }
        }
    }
}
