//! Scan operator: decode selected base-table columns into intermediate
//! columns.
//!
//! Strings are not materialized; VARCHAR cells carry packed references into
//! the base pages so that only the root writer ever copies string bytes.
//! Distinct selections decode in parallel; within a column the page order
//! (and therefore the row order) is preserved, so two scans of the same
//! table are row-aligned.

use rayon::prelude::*;
use strata_result::{Error, Result};
use strata_storage::codec::{decode_int32_page, decode_varchar_page, VarcharPage};
use strata_storage::{ColumnarTable, IntermediateColumn};
use strata_types::{DataType, StringRef, Value};

/// Decode one intermediate column per selected attribute.
pub fn execute_scan(
    table: &ColumnarTable,
    output_attrs: &[(usize, DataType)],
    table_id: u8,
) -> Result<Vec<IntermediateColumn>> {
    output_attrs
        .par_iter()
        .map(|&(col_idx, _)| scan_column(table, col_idx, table_id))
        .collect()
}

fn scan_column(table: &ColumnarTable, col_idx: usize, table_id: u8) -> Result<IntermediateColumn> {
    let column = table.columns.get(col_idx).ok_or_else(|| {
        Error::MalformedPlan(format!(
            "scan selects column {col_idx} of a {}-column table",
            table.columns.len()
        ))
    })?;

    let mut out = IntermediateColumn::new();
    match column.dtype() {
        DataType::Int32 => {
            for page in column.pages() {
                for (present, value) in decode_int32_page(page)? {
                    out.push(if present {
                        Value::from_i32(value)
                    } else {
                        Value::null_i32()
                    });
                }
            }
        }
        DataType::Varchar => {
            for (page_id, page) in column.pages().iter().enumerate() {
                match decode_varchar_page(page)? {
                    // One logical row for the whole chain; continuations are
                    // accounted for by their head.
                    VarcharPage::LongHead { .. } => out.push(Value::from_string_ref(
                        StringRef::new(table_id, col_idx as u8, page_id as u32, 0),
                    )),
                    VarcharPage::LongCont { .. } => {}
                    VarcharPage::Short(short) => {
                        let mut data_idx: u16 = 0;
                        for row in 0..short.num_rows() as usize {
                            if short.present(row) {
                                out.push(Value::from_string_ref(StringRef::new(
                                    table_id,
                                    col_idx as u8,
                                    page_id as u32,
                                    data_idx,
                                )));
                                data_idx += 1;
                            } else {
                                out.push(Value::null_string());
                            }
                        }
                    }
                }
            }
        }
    }
    Ok(out)
}
