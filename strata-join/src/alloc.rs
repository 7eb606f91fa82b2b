//! Three-level bump allocator backing the partitioned build.
//!
//! Level 1 ([`GlobalAllocator`]) is shared by every build thread and hands
//! out 2 MiB large chunks. Level 2 ([`BumpAllocL2`]) is per-thread: it owns
//! the large chunks it requested and carves them into 64 KiB small chunks.
//! Level 3 ([`BumpAllocL3`]) is per-partition: it bump-allocates entry cells
//! inside small chunks and keeps the partition's chunk list with each
//! chunk's fill position.
//!
//! Chunks are addressed with index handles ([`Block`]: chunk index + entry
//! offset) instead of raw pointers; entry storage is typed as
//! [`PartitionEntry`] slices, which keeps the whole structure safe while
//! preserving the carving hierarchy. L2 frees everything on drop; L3 never
//! frees.

use crate::collector::PartitionEntry;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Size of a level-1 large chunk.
pub const LARGE_CHUNK_BYTES: usize = 2 << 20;
/// Size of a level-2 small chunk.
pub const SMALL_CHUNK_BYTES: usize = 64 << 10;

/// Entries per small chunk.
pub const ENTRIES_PER_SMALL_CHUNK: usize =
    SMALL_CHUNK_BYTES / std::mem::size_of::<PartitionEntry>();

const SMALL_CHUNKS_PER_LARGE: usize = LARGE_CHUNK_BYTES / SMALL_CHUNK_BYTES;
const ENTRIES_PER_LARGE_CHUNK: usize = SMALL_CHUNKS_PER_LARGE * ENTRIES_PER_SMALL_CHUNK;

/// Level 1: the process-wide source of large chunks.
///
/// Shared by reference across all collectors of one build; the only
/// operation is synchronized chunk accounting plus the allocation itself,
/// so an atomic counter suffices.
pub struct GlobalAllocator {
    chunks_handed_out: AtomicUsize,
}

impl GlobalAllocator {
    pub fn new() -> Self {
        Self {
            chunks_handed_out: AtomicUsize::new(0),
        }
    }

    pub(crate) fn allocate_large_chunk(&self) -> LargeChunk {
        self.chunks_handed_out.fetch_add(1, Ordering::Relaxed);
        LargeChunk {
            entries: vec![PartitionEntry::default(); ENTRIES_PER_LARGE_CHUNK].into_boxed_slice(),
            carved: 0,
        }
    }

    /// Total large chunks handed out so far.
    pub fn chunks_handed_out(&self) -> usize {
        self.chunks_handed_out.load(Ordering::Relaxed)
    }
}

impl Default for GlobalAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// One 2 MiB chunk, owned by the requesting thread's L2.
pub(crate) struct LargeChunk {
    entries: Box<[PartitionEntry]>,
    /// Small chunks already carved out of this chunk.
    carved: usize,
}

/// Handle to one small chunk: which large chunk it lives in, the entry
/// offset where it starts, and how many entries are filled.
#[derive(Clone, Copy, Debug)]
pub struct Block {
    pub(crate) chunk: u32,
    pub(crate) start: u32,
    pub(crate) len: u32,
}

/// Level 2: per-thread allocator subdividing large chunks into small ones.
pub struct BumpAllocL2 {
    chunks: Vec<LargeChunk>,
}

impl BumpAllocL2 {
    pub(crate) fn new() -> Self {
        Self { chunks: Vec::new() }
    }

    /// Carve the next 64 KiB small chunk, pulling a fresh large chunk from
    /// level 1 when the current one is exhausted.
    pub(crate) fn allocate_small_chunk(&mut self, level1: &GlobalAllocator) -> Block {
        if self
            .chunks
            .last()
            .is_none_or(|c| c.carved == SMALL_CHUNKS_PER_LARGE)
        {
            self.chunks.push(level1.allocate_large_chunk());
        }
        let chunk_idx = self.chunks.len() - 1;
        let chunk = self.chunks.last_mut().expect("chunk just ensured");
        let start = chunk.carved * ENTRIES_PER_SMALL_CHUNK;
        chunk.carved += 1;
        Block {
            chunk: chunk_idx as u32,
            start: start as u32,
            len: 0,
        }
    }

    #[inline]
    pub(crate) fn entry_slot_mut(&mut self, block: &Block, idx: u32) -> &mut PartitionEntry {
        &mut self.chunks[block.chunk as usize].entries[(block.start + idx) as usize]
    }

    /// Filled entries of a block.
    #[inline]
    pub(crate) fn entries(&self, block: &Block) -> &[PartitionEntry] {
        let start = block.start as usize;
        &self.chunks[block.chunk as usize].entries[start..start + block.len as usize]
    }
}

/// Level 3: per-partition cursor over small chunks.
pub struct BumpAllocL3 {
    blocks: Vec<Block>,
}

impl BumpAllocL3 {
    pub(crate) fn new() -> Self {
        Self { blocks: Vec::new() }
    }

    /// Whether the current block can take another entry.
    #[inline]
    pub(crate) fn has_room(&self) -> bool {
        self.blocks
            .last()
            .is_some_and(|b| (b.len as usize) < ENTRIES_PER_SMALL_CHUNK)
    }

    #[inline]
    pub(crate) fn push_block(&mut self, block: Block) {
        self.blocks.push(block);
    }

    #[inline]
    pub(crate) fn current_mut(&mut self) -> &mut Block {
        self.blocks.last_mut().expect("block pushed before write")
    }

    /// Blocks in allocation order (oldest first).
    #[inline]
    pub(crate) fn blocks(&self) -> &[Block] {
        &self.blocks
    }
}
