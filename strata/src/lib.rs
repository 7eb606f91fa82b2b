//! Strata: a parallel hash-join execution core over a columnar page format.
//!
//! This crate is the single entrypoint over the `strata-*` workspace. Given
//! a physical plan of scans and inner equijoins over persisted columnar
//! tables, [`execute`] runs it bottom-up and returns the root's output as a
//! new [`ColumnarTable`].
//!
//! The engine is built around an *unchained* hash table: directory slots are
//! offsets into one contiguous, slot-sorted entry array, each slot guarded
//! by a 16-bit bloom tag. Small build sides construct it serially with a
//! count / prefix-sum / scatter pass; large ones radix-partition tuples into
//! per-thread arenas and let every partition build its disjoint slice of
//! the table in parallel, without locks. Probing streams the other side in
//! chunks claimed off an atomic counter.
//!
//! Strings never move until the end: scans emit 8-byte references into base
//! pages, joins shuffle those references, and only the root materializer
//! copies string bytes, slicing short strings out of their offset arrays and
//! writing oversized ones as head/continuation page chains.
//!
//! # Crate topology
//!
//! - [`strata_types`]: the 8-byte tagged value and identifiers
//! - [`strata_storage`]: pages, page codec, writers, intermediate columns
//! - [`strata_join`]: serial and partition-parallel unchained hash tables
//! - [`strata_plan`]: the plan DAG and its validation
//! - [`strata_executor`]: scan/join operators and root materialization
//! - [`strata_result`]: the shared error type

pub use strata_executor::{build_context, execute, execute_scan, ExecContext, PROBE_CHUNK_ROWS};
pub use strata_join::{FinalTable, ProbeIndex, UnchainedHashTable};
pub use strata_plan::{JoinNode, NodeKind, Plan, PlanNode, ScanNode};
pub use strata_result::{Error, Result};
pub use strata_storage::{
    Column, ColumnarTable, IntermediateColumn, Int32PageWriter, Page, VarcharPageWriter, PAGE_SIZE,
};
pub use strata_types::{DataType, StringRef, Value};
