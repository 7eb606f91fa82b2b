//! Partition-parallel unchained hash table.
//!
//! The build runs in three stages. Phase 1: each thread radix-partitions its
//! slice of the build side into a [`TupleCollector`]. Merge: the per-thread
//! block lists of every partition are concatenated (collector order, each
//! collector's blocks newest-first) into one list per partition. Phase 2:
//! every partition independently counts, prefix-sums, and scatters its
//! entries into the final table.
//!
//! Phase 2 needs no locks: partition `p` owns the directory slot range
//! `[p * capacity / P, (p + 1) * capacity / P)` and the contiguous span of
//! entry storage starting at the partition's prefix count, because a
//! tuple's partition is the top `log2(P)` bits of the same hash whose top
//! `log2(capacity)` bits pick its slot. The disjoint slices are handed to
//! the workers via `split_at_mut`, so the compiler checks what the design
//! argues.

use crate::alloc::Block;
use crate::collector::{PartitionEntry, TupleCollector};
use crate::hash::{compute_tag, could_contain, hash_key};
use crate::ProbeIndex;

const ENTRY_BYTES: u64 = std::mem::size_of::<PartitionEntry>() as u64;

/// A block of one partition's merged list, with the collector that owns its
/// storage.
#[derive(Clone, Copy, Debug)]
pub struct BlockHandle {
    collector: u32,
    block: Block,
}

/// Concatenate every collector's block list per partition.
///
/// Within the merged list, blocks appear in collector order; a collector's
/// own blocks appear newest-first, matching the head-inserted chunk lists
/// they mirror.
pub fn merge_partitions(
    collectors: &[TupleCollector<'_>],
    num_partitions: usize,
) -> Vec<Vec<BlockHandle>> {
    (0..num_partitions)
        .map(|p| {
            let mut merged = Vec::new();
            for (c, collector) in collectors.iter().enumerate() {
                for block in collector.partition_blocks(p).iter().rev() {
                    merged.push(BlockHandle {
                        collector: c as u32,
                        block: *block,
                    });
                }
            }
            merged
        })
        .collect()
}

/// Per-partition prefix sums of tuple counts across all collectors.
///
/// Returns `num_partitions + 1` values; entry `p` is the number of tuples in
/// partitions before `p`, and the last entry is the total.
pub fn partition_offsets(collectors: &[TupleCollector<'_>], num_partitions: usize) -> Vec<usize> {
    let mut offsets = vec![0usize; num_partitions + 1];
    for p in 0..num_partitions {
        let in_partition: usize = collectors.iter().map(|c| c.counts()[p]).sum();
        offsets[p + 1] = offsets[p] + in_partition;
    }
    offsets
}

/// The partition-parallel unchained hash table.
///
/// Identical directory layout to the serial table (`capacity + 1` cells,
/// cell 0 underflow, `(byte_offset << 16) | tag` packing); only the build
/// differs.
pub struct FinalTable {
    tuple_storage: Vec<PartitionEntry>,
    directory: Vec<u64>,
    shift: u32,
    num_partitions: usize,
    len: usize,
}

impl FinalTable {
    /// Allocate storage for `total_tuples` entries across `num_partitions`
    /// partitions.
    pub fn new(total_tuples: usize, num_partitions: usize) -> Self {
        let capacity = total_tuples.next_power_of_two().max(1024);
        assert!(num_partitions.is_power_of_two());
        assert!(num_partitions <= capacity);
        Self {
            tuple_storage: vec![PartitionEntry::default(); total_tuples],
            directory: vec![0u64; capacity + 1],
            shift: 64 - capacity.trailing_zeros(),
            num_partitions,
            len: total_tuples,
        }
    }

    /// Slot count (power of two).
    #[inline]
    pub fn capacity(&self) -> usize {
        self.directory.len() - 1
    }

    /// Number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Run phase 2 for every partition, in parallel when there is more than
    /// one.
    ///
    /// `partition_blocks` comes from [`merge_partitions`] and
    /// `offsets` from [`partition_offsets`]; both must describe the same
    /// collectors that are passed here.
    pub fn post_process(
        &mut self,
        collectors: &[TupleCollector<'_>],
        partition_blocks: &[Vec<BlockHandle>],
        offsets: &[usize],
    ) {
        debug_assert_eq!(offsets.len(), self.num_partitions + 1);
        debug_assert_eq!(*offsets.last().expect("offsets nonempty"), self.len);

        let capacity = self.capacity();
        let shift = self.shift;
        let parts = self.num_partitions;
        // Cell 0 is the underflow cell: it stays at offset 0, the storage
        // base, and no partition touches it.
        let (_underflow, mut dir_rest) = self.directory.split_at_mut(1);
        let mut tuples_rest = &mut self.tuple_storage[..];

        if parts == 1 {
            post_process_partition(dir_rest, tuples_rest, shift, 0, 0, &partition_blocks[0], collectors);
            return;
        }

        std::thread::scope(|scope| {
            for p in 0..parts {
                let slot_start = p * capacity / parts;
                let slot_end = (p + 1) * capacity / parts;
                let (dir_p, rest) = std::mem::take(&mut dir_rest).split_at_mut(slot_end - slot_start);
                dir_rest = rest;
                let (tup_p, rest) =
                    std::mem::take(&mut tuples_rest).split_at_mut(offsets[p + 1] - offsets[p]);
                tuples_rest = rest;

                let blocks = &partition_blocks[p];
                let prev_count = offsets[p];
                scope.spawn(move || {
                    post_process_partition(
                        dir_p, tup_p, shift, slot_start, prev_count, blocks, collectors,
                    )
                });
            }
        });
    }

    /// All entries in the probed key's slot, or empty when the bloom tag
    /// proves the key absent. Callers re-compare `entry.key`.
    pub fn find_range(&self, key: i32) -> &[PartitionEntry] {
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
}

impl ProbeIndex for FinalTable {
    #[inline]
    fn for_each_match<F: FnMut(u64)>(&self, key: i32, mut f: F) {
        for entry in self.find_range(key) {
            if entry.key == key {
                f(entry.row_idx);
            }
        }
    }
}

/// Count, prefix-sum, and scatter one partition.
///
/// `directory` and `tuples` are the partition's own slices; offsets written
/// into the directory are global byte offsets into the full entry storage,
/// which is why the prefix sum seeds at `prev_count * ENTRY_BYTES` and the
/// scatter subtracts `prev_count` again to index the local slice.
fn post_process_partition(
    directory: &mut [u64],
    tuples: &mut [PartitionEntry],
    shift: u32,
    slot_start: usize,
    prev_count: usize,
    blocks: &[BlockHandle],
    collectors: &[TupleCollector<'_>],
) {
    for handle in blocks {
        for entry in collectors[handle.collector as usize].entries(&handle.block) {
            let slot = (entry.hash >> shift) as usize - slot_start;
            directory[slot] += ENTRY_BYTES << 16;
            directory[slot] |= compute_tag(entry.hash) as u64;
        }
    }

    let mut cur = prev_count as u64 * ENTRY_BYTES;
    for cell in directory.iter_mut() {
        let byte_count = *cell >> 16;
        let bloom = *cell & 0xFFFF;
        *cell = (cur << 16) | bloom;
        cur += byte_count;
    }

    for handle in blocks {
        for entry in collectors[handle.collector as usize].entries(&handle.block) {
            let slot = (entry.hash >> shift) as usize - slot_start;
            let offset = directory[slot] >> 16;
            tuples[(offset / ENTRY_BYTES) as usize - prev_count] = *entry;
            directory[slot] += ENTRY_BYTES << 16;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::GlobalAllocator;

    fn build_partitioned(entries: &[(i32, u64)], num_collectors: usize) -> FinalTable {
        let num_partitions = num_collectors.next_power_of_two();
        let level1 = GlobalAllocator::new();
        let mut collectors: Vec<TupleCollector<'_>> = (0..num_collectors)
            .map(|_| TupleCollector::new(&level1, num_partitions))
            .collect();
        for (i, &(key, row)) in entries.iter().enumerate() {
            collectors[i % num_collectors].consume(key, row);
        }
        let blocks = merge_partitions(&collectors, num_partitions);
        let offsets = partition_offsets(&collectors, num_partitions);
        let mut table = FinalTable::new(*offsets.last().unwrap(), num_partitions);
        table.post_process(&collectors, &blocks, &offsets);
        table
    }

    fn matches_of(table: &FinalTable, key: i32) -> Vec<u64> {
        let mut rows = Vec::new();
        table.for_each_match(key, |r| rows.push(r));
        rows.sort_unstable();
        rows
    }

    #[test]
    fn single_partition_build_finds_all_rows() {
        let entries: Vec<(i32, u64)> = (0..5000).map(|i| (i % 331, i as u64)).collect();
        let table = build_partitioned(&entries, 1);
        assert_eq!(table.len(), entries.len());
        for key in 0..331 {
            let expected: Vec<u64> = entries
                .iter()
                .filter(|(k, _)| *k == key)
                .map(|(_, r)| *r)
                .collect();
            assert_eq!(matches_of(&table, key), expected);
        }
    }

    #[test]
    fn four_partition_build_matches_serial_table() {
        use crate::unchained::UnchainedHashTable;

        let entries: Vec<(i32, u64)> = (0..20_000)
            .map(|i| ((i * 2654435761u64 % 4093) as i32, i))
            .collect();
        let table = build_partitioned(&entries, 4);

        let mut serial = UnchainedHashTable::with_capacity(entries.len());
        for &(key, row) in &entries {
            serial.insert(key, row);
        }
        serial.finalize();

        for key in 0..4093 {
            let mut serial_rows = Vec::new();
            serial.for_each_match(key, |r| serial_rows.push(r));
            serial_rows.sort_unstable();
            assert_eq!(matches_of(&table, key), serial_rows, "key {key}");
        }
    }

    #[test]
    fn empty_build_finds_nothing() {
        let table = build_partitioned(&[], 4);
        assert!(table.is_empty());
        for key in [-1, 0, 7, i32::MAX] {
            assert!(table.find_range(key).is_empty());
        }
    }

    #[test]
    fn directory_ranges_tile_storage_exactly() {
        let entries: Vec<(i32, u64)> = (0..9000).map(|i| (i * 13, i as u64)).collect();
        let table = build_partitioned(&entries, 4);

        let mut prev_end = 0u64;
        for slot in 0..table.capacity() {
            let start = table.directory[slot] >> 16;
            let end = table.directory[slot + 1] >> 16;
            assert_eq!(start, prev_end, "slot {slot}");
            prev_end = end;
        }
        assert_eq!(prev_end, table.len() as u64 * ENTRY_BYTES);
    }

    #[test]
    fn minimum_capacity_is_1024() {
        let table = build_partitioned(&[(1, 0), (2, 1)], 2);
        assert_eq!(table.capacity(), 1024);
        assert_eq!(matches_of(&table, 1), vec![0]);
        assert_eq!(matches_of(&table, 2), vec![1]);
    }
}
