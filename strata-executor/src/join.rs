//! Inner-equijoin operator.
//!
//! The smaller input builds the hash table; the other side probes. Builds at
//! or above the partitioned threshold go through the collector / merge /
//! post-process pipeline, smaller ones through the serial unchained table.
//! Probing streams the probe column in chunks claimed off an atomic counter;
//! workers only gather `(build_row, probe_row)` pairs, and a single serial
//! pass afterwards emits them in thread order, so output columns are never
//! written concurrently.

use std::sync::atomic::{AtomicUsize, Ordering};

use strata_join::{
    merge_partitions, partition_offsets, FinalTable, GlobalAllocator, ProbeIndex, TupleCollector,
    UnchainedHashTable,
};
use strata_result::Result;
use strata_storage::IntermediateColumn;
use strata_types::{DataType, Value};

use crate::config::{self, PROBE_CHUNK_ROWS};

/// Destination of join output rows.
///
/// Intermediate joins append into result columns; the root join feeds the
/// page writer. `end_row` is called once per emitted row, after every
/// column's `push`.
pub(crate) trait RowSink {
    fn push(&mut self, out_idx: usize, value: Value) -> Result<()>;
    fn end_row(&mut self) -> Result<()>;
}

/// Sink for non-root joins: plain appends, row accounting implicit.
pub(crate) struct IntermediateSink<'a> {
    pub columns: &'a mut [IntermediateColumn],
}

impl RowSink for IntermediateSink<'_> {
    #[inline]
    fn push(&mut self, out_idx: usize, value: Value) -> Result<()> {
        self.columns[out_idx].push(value);
        Ok(())
    }

    #[inline]
    fn end_row(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Borrowed inputs of one join node.
pub(crate) struct JoinInputs<'a> {
    pub left: &'a [IntermediateColumn],
    pub right: &'a [IntermediateColumn],
    pub left_col: usize,
    pub right_col: usize,
    pub output_attrs: &'a [(usize, DataType)],
}

/// Run the join and emit every match into `sink`.
pub(crate) fn execute_join(inputs: &JoinInputs<'_>, sink: &mut impl RowSink) -> Result<()> {
    let left_keys = &inputs.left[inputs.left_col];
    let right_keys = &inputs.right[inputs.right_col];

    // Build side by actual cardinality; the plan's hint is ignored.
    let build_left = left_keys.len() <= right_keys.len();
    let (build_keys, probe_keys) = if build_left {
        (left_keys, right_keys)
    } else {
        (right_keys, left_keys)
    };
    let build_size = build_keys.len();

    let strategy = config::join_strategy(build_size);
    tracing::debug!(
        build_left,
        build_size,
        probe_rows = probe_keys.len(),
        num_threads = strategy.num_threads,
        partitioned = strategy.use_partitioned,
        "join path selected"
    );

    if strategy.use_partitioned {
        let table = build_partitioned(build_keys, strategy.num_threads);
        probe(&table, probe_keys, strategy.num_threads, build_left, inputs, sink)
    } else {
        let table = build_serial(build_keys);
        probe(&table, probe_keys, strategy.num_threads, build_left, inputs, sink)
    }
}

/// Serial build: accumulate non-null keys, then one three-phase finalize.
fn build_serial(build_keys: &IntermediateColumn) -> UnchainedHashTable {
    let mut table = UnchainedHashTable::with_capacity(build_keys.len());
    for row_idx in 0..build_keys.len() {
        let key = build_keys.get(row_idx);
        if key.is_null_i32() {
            continue;
        }
        table.insert(key.as_i32(), row_idx as u64);
    }
    table.finalize();
    table
}

/// Partitioned build: phase-1 collect over even row slices, merge the
/// per-thread partition lists, then post-process partitions in parallel.
fn build_partitioned(build_keys: &IntermediateColumn, num_threads: usize) -> FinalTable {
    let num_partitions = num_threads;
    let build_size = build_keys.len();
    let level1 = GlobalAllocator::new();
    let mut collectors: Vec<TupleCollector<'_>> = (0..num_threads)
        .map(|_| TupleCollector::new(&level1, num_partitions))
        .collect();

    if num_threads == 1 {
        collect_rows(&mut collectors[0], build_keys, 0, build_size);
    } else {
        let rows_per_thread = build_size.div_ceil(num_threads);
        std::thread::scope(|scope| {
            for (t, collector) in collectors.iter_mut().enumerate() {
                let start = (t * rows_per_thread).min(build_size);
                let end = (start + rows_per_thread).min(build_size);
                scope.spawn(move || collect_rows(collector, build_keys, start, end));
            }
        });
    }

    let blocks = merge_partitions(&collectors, num_partitions);
    let offsets = partition_offsets(&collectors, num_partitions);
    let total_tuples = *offsets.last().expect("offsets nonempty");
    tracing::trace!(
        total_tuples,
        num_partitions,
        large_chunks = level1.chunks_handed_out(),
        "partitioned build collected"
    );

    let mut table = FinalTable::new(total_tuples, num_partitions);
    table.post_process(&collectors, &blocks, &offsets);
    table
}

fn collect_rows(
    collector: &mut TupleCollector<'_>,
    build_keys: &IntermediateColumn,
    start: usize,
    end: usize,
) {
    for row_idx in start..end {
        let key = build_keys.get(row_idx);
        if key.is_null_i32() {
            continue;
        }
        collector.consume(key.as_i32(), row_idx as u64);
    }
}

/// Probe the table and emit matches.
///
/// The parallel path gathers `(build_row, probe_row)` pairs per worker and
/// emits them afterwards in thread-index order; the output order is a
/// function of the chunk schedule, not of when threads finish.
fn probe<T: ProbeIndex>(
    table: &T,
    probe_keys: &IntermediateColumn,
    num_threads: usize,
    build_left: bool,
    inputs: &JoinInputs<'_>,
    sink: &mut impl RowSink,
) -> Result<()> {
    let probe_rows = probe_keys.len();

    if num_threads <= 1 || probe_rows < PROBE_CHUNK_ROWS {
        let mut matches: Vec<u64> = Vec::new();
        for probe_idx in 0..probe_rows {
            let key = probe_keys.get(probe_idx);
            if key.is_null_i32() {
                continue;
            }
            matches.clear();
            table.for_each_match(key.as_i32(), |build_row| matches.push(build_row));
            for &build_row in &matches {
                emit_row(inputs, sink, build_left, build_row as usize, probe_idx)?;
            }
        }
        return Ok(());
    }

    let next_start = AtomicUsize::new(0);
    let next_start = &next_start;
    let mut local_matches: Vec<Vec<(u64, u64)>> = (0..num_threads).map(|_| Vec::new()).collect();

    std::thread::scope(|scope| {
        for local in local_matches.iter_mut() {
            scope.spawn(move || loop {
                let start = next_start.fetch_add(PROBE_CHUNK_ROWS, Ordering::Relaxed);
                if start >= probe_rows {
                    break;
                }
                let end = (start + PROBE_CHUNK_ROWS).min(probe_rows);
                for probe_idx in start..end {
                    let key = probe_keys.get(probe_idx);
                    if key.is_null_i32() {
                        continue;
                    }
                    table.for_each_match(key.as_i32(), |build_row| {
                        local.push((build_row, probe_idx as u64));
                    });
                }
            });
        }
    });

    for local in &local_matches {
        for &(build_row, probe_idx) in local {
            emit_row(inputs, sink, build_left, build_row as usize, probe_idx as usize)?;
        }
    }
    Ok(())
}

#[inline]
fn emit_row(
    inputs: &JoinInputs<'_>,
    sink: &mut impl RowSink,
    build_left: bool,
    build_row: usize,
    probe_row: usize,
) -> Result<()> {
    let (left_idx, right_idx) = if build_left {
        (build_row, probe_row)
    } else {
        (probe_row, build_row)
    };
    for (out_idx, &(col_idx, _)) in inputs.output_attrs.iter().enumerate() {
        let value = if col_idx < inputs.left.len() {
            inputs.left[col_idx].get(left_idx)
        } else {
            inputs.right[col_idx - inputs.left.len()].get(right_idx)
        };
        sink.push(out_idx, value)?;
    }
    sink.end_row()
}
