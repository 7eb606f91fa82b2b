//! Root materializer: turn emitted join rows into output pages.
//!
//! One page writer per output column, addressed through a precomputed map
//! from output index to the writer of its type. VARCHAR values are
//! materialized here, and only here, by resolving their references against
//! the plan's input tables; oversized strings become head/continuation
//! chains. Every emitted logical row bumps the output table's row count
//! exactly once, long-string chains included.

use strata_result::Result;
use strata_storage::codec::materialize_string;
use strata_storage::{Column, ColumnarTable, Int32PageWriter, VarcharPageWriter};
use strata_types::{DataType, Value};

use crate::join::RowSink;

/// Page-writing sink for the root node.
pub(crate) struct RootWriter<'a> {
    inputs: &'a [ColumnarTable],
    output_attrs: &'a [(usize, DataType)],
    out_to_int_idx: Vec<i32>,
    out_to_varchar_idx: Vec<i32>,
    int_writers: Vec<Int32PageWriter>,
    varchar_writers: Vec<VarcharPageWriter>,
    table: ColumnarTable,
}

impl<'a> RootWriter<'a> {
    pub fn new(inputs: &'a [ColumnarTable], output_attrs: &'a [(usize, DataType)]) -> Self {
        let mut out_to_int_idx = vec![-1i32; output_attrs.len()];
        let mut out_to_varchar_idx = vec![-1i32; output_attrs.len()];
        let mut int_writers = Vec::new();
        let mut varchar_writers = Vec::new();
        let mut table = ColumnarTable::new();

        for (out_idx, &(_, dtype)) in output_attrs.iter().enumerate() {
            table.columns.push(Column::new(dtype));
            match dtype {
                DataType::Int32 => {
                    out_to_int_idx[out_idx] = int_writers.len() as i32;
                    int_writers.push(Int32PageWriter::new());
                }
                DataType::Varchar => {
                    out_to_varchar_idx[out_idx] = varchar_writers.len() as i32;
                    varchar_writers.push(VarcharPageWriter::new());
                }
            }
        }

        Self {
            inputs,
            output_attrs,
            out_to_int_idx,
            out_to_varchar_idx,
            int_writers,
            varchar_writers,
            table,
        }
    }

    /// Flush every pending buffer and hand over the finished table.
    pub fn finish(mut self) -> ColumnarTable {
        for (out_idx, &(_, dtype)) in self.output_attrs.iter().enumerate() {
            let column = &mut self.table.columns[out_idx];
            match dtype {
                DataType::Int32 => {
                    self.int_writers[self.out_to_int_idx[out_idx] as usize].finish(column);
                }
                DataType::Varchar => {
                    self.varchar_writers[self.out_to_varchar_idx[out_idx] as usize].finish(column);
                }
            }
        }
        tracing::trace!(
            num_rows = self.table.num_rows,
            pages = self
                .table
                .columns
                .iter()
                .map(|c| c.pages().len())
                .sum::<usize>(),
            "root materialization finished"
        );
        self.table
    }
}

impl RowSink for RootWriter<'_> {
    fn push(&mut self, out_idx: usize, value: Value) -> Result<()> {
        let (_, dtype) = self.output_attrs[out_idx];
        let column = &mut self.table.columns[out_idx];
        match dtype {
            DataType::Int32 => {
                let writer = &mut self.int_writers[self.out_to_int_idx[out_idx] as usize];
                writer.push(
                    column,
                    if value.is_null_i32() {
                        None
                    } else {
                        Some(value.as_i32())
                    },
                );
            }
            DataType::Varchar => {
                let writer = &mut self.varchar_writers[self.out_to_varchar_idx[out_idx] as usize];
                if value.is_null_string() {
                    writer.push(column, None);
                } else {
                    let bytes = materialize_string(self.inputs, value.as_string_ref())?;
                    writer.push(column, Some(&bytes));
                }
            }
        }
        Ok(())
    }

    #[inline]
    fn end_row(&mut self) -> Result<()> {
        self.table.num_rows += 1;
        Ok(())
    }
}
