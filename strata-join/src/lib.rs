//! Hash tables for Strata's inner equijoins.
//!
//! Both tables here are *unchained*: the directory slots are offsets into a
//! single contiguous, slot-sorted entry array, so probing a slot is a linear
//! scan over a dense range instead of a pointer chase. Every directory slot
//! additionally carries a 16-bit bloom tag that short-circuits lookups for
//! keys that cannot be present.
//!
//! [`UnchainedHashTable`] builds serially with a three-phase
//! count / prefix-sum / scatter pass and serves small build sides.
//! [`FinalTable`] is the partition-parallel variant: worker threads
//! radix-partition entries into [`TupleCollector`]s backed by a three-level
//! bump allocator, the per-thread partition lists are merged, and each
//! partition then builds its disjoint slice of the directory and entry
//! storage in parallel without locks.
#![forbid(unsafe_code)]

pub mod alloc;
pub mod collector;
pub mod hash;
pub mod partitioned;
pub mod unchained;

pub use alloc::{Block, BumpAllocL2, BumpAllocL3, GlobalAllocator};
pub use collector::{PartitionEntry, TupleCollector};
pub use partitioned::{merge_partitions, partition_offsets, BlockHandle, FinalTable};
pub use unchained::{HashEntry, UnchainedHashTable};

/// Probe surface shared by the serial and partitioned tables.
///
/// `for_each_match` performs the bloom check, the slot range scan, and the
/// key re-comparison that filters bloom false positives, invoking the
/// callback once per entry whose key equals the probe key.
pub trait ProbeIndex: Sync {
    fn for_each_match<F: FnMut(u64)>(&self, key: i32, f: F);
}
