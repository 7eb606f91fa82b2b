//! Per-thread tuple collection for the partitioned build.

use crate::alloc::{Block, BumpAllocL2, BumpAllocL3, GlobalAllocator};
use crate::hash::hash_key;

/// Build-side tuple with its hash cached, so post-processing never rehashes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PartitionEntry {
    pub key: i32,
    pub row_idx: u64,
    pub hash: u64,
}

impl PartitionEntry {
    #[inline]
    pub fn new(key: i32, row_idx: u64) -> Self {
        Self {
            key,
            row_idx,
            hash: hash_key(key),
        }
    }
}

/// Radix-partitioning consumer owned by one build thread.
///
/// Owns a level-2 arena, one level-3 cursor per partition, and the
/// per-partition tuple counts. After phase 1 the collector becomes
/// read-only: merge and post-processing only read its blocks.
pub struct TupleCollector<'a> {
    /// log2 of the partition count; partition of a tuple is its hash's top
    /// `shift` bits.
    shift: u32,
    num_partitions: usize,
    level1: &'a GlobalAllocator,
    level2: BumpAllocL2,
    level3: Vec<BumpAllocL3>,
    counts: Vec<usize>,
}

impl<'a> TupleCollector<'a> {
    pub fn new(level1: &'a GlobalAllocator, num_partitions: usize) -> Self {
        assert!(num_partitions.is_power_of_two());
        Self {
            shift: num_partitions.trailing_zeros(),
            num_partitions,
            level1,
            level2: BumpAllocL2::new(),
            level3: (0..num_partitions).map(|_| BumpAllocL3::new()).collect(),
            counts: vec![0; num_partitions],
        }
    }

    /// Hash, partition, and store one build tuple.
    ///
    /// Null keys are the caller's concern; everything passed here lands in
    /// the table. Refills cascade L3 <- L2 <- L1 when the partition's
    /// current chunk is full.
    pub fn consume(&mut self, key: i32, row_idx: u64) {
        let entry = PartitionEntry::new(key, row_idx);
        let part = if self.shift == 0 {
            0
        } else {
            (entry.hash >> (64 - self.shift)) as usize
        };
        if !self.level3[part].has_room() {
            let block = self.level2.allocate_small_chunk(self.level1);
            self.level3[part].push_block(block);
        }
        let block = self.level3[part].current_mut();
        *self.level2.entry_slot_mut(block, block.len) = entry;
        block.len += 1;
        self.counts[part] += 1;
    }

    #[inline]
    pub fn num_partitions(&self) -> usize {
        self.num_partitions
    }

    /// Tuples collected per partition.
    #[inline]
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    /// The partition's blocks in allocation order.
    #[inline]
    pub(crate) fn partition_blocks(&self, partition: usize) -> &[Block] {
        self.level3[partition].blocks()
    }

    /// Filled entries of one block.
    #[inline]
    pub(crate) fn entries(&self, block: &Block) -> &[PartitionEntry] {
        self.level2.entries(block)
    }
}
