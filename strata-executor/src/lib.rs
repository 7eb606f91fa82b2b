//! Query execution for Strata.
//!
//! The executor walks a pre-built plan bottom-up: scans decode base pages
//! into intermediate columns of tagged values, joins build a hash table on
//! their smaller input and probe with the other, and the root node emits
//! output pages through the root materializer. All parallelism lives inside
//! one node: build, post-process, and probe workers are spawned per phase
//! and joined before the next phase starts, so no work ever crosses a join
//! boundary.
//!
//! Every error is fatal; [`execute`] either returns the complete output
//! table or the first error encountered.

pub mod config;
mod join;
mod root;
mod scan;

pub use config::PROBE_CHUNK_ROWS;
pub use scan::execute_scan;

use strata_plan::{NodeKind, Plan};
use strata_result::{Error, Result};
use strata_storage::{ColumnarTable, IntermediateColumn};

use crate::join::{execute_join, IntermediateSink, JoinInputs, RowSink};
use crate::root::RootWriter;

/// Execution context handle.
///
/// Exists for API symmetry with embedding hosts; this core keeps no state
/// in it.
#[derive(Default)]
pub struct ExecContext(());

/// Build an execution context. Dropping it releases nothing because it owns
/// nothing.
pub fn build_context() -> ExecContext {
    ExecContext(())
}

/// Execute a plan and return the root's output table.
pub fn execute(plan: &Plan) -> Result<ColumnarTable> {
    plan.validate()?;
    execute_root(plan, plan.root)
}

/// Run the root node through the page-writing materializer.
///
/// The root is usually a join, but an identity plan whose root is a scan is
/// also materialized, which gives a direct base-table round trip.
fn execute_root(plan: &Plan, node_idx: usize) -> Result<ColumnarTable> {
    let node = &plan.nodes[node_idx];
    let mut writer = RootWriter::new(&plan.inputs, &node.output_attrs);

    match &node.kind {
        NodeKind::Join(join) => {
            let left = execute_node(plan, join.left)?;
            let right = execute_node(plan, join.right)?;
            let inputs = JoinInputs {
                left: &left,
                right: &right,
                left_col: join.left_attr,
                right_col: join.right_attr,
                output_attrs: &node.output_attrs,
            };
            execute_join(&inputs, &mut writer)?;
        }
        NodeKind::Scan(scan) => {
            let table = &plan.inputs[scan.base_table_id];
            let columns =
                execute_scan(table, &node.output_attrs, scan.base_table_id as u8)?;
            for row_idx in 0..table.num_rows {
                for (out_idx, column) in columns.iter().enumerate() {
                    writer.push(out_idx, column.get(row_idx))?;
                }
                writer.end_row()?;
            }
        }
    }

    Ok(writer.finish())
}

/// Execute a non-root node into intermediate columns.
fn execute_node(plan: &Plan, node_idx: usize) -> Result<Vec<IntermediateColumn>> {
    let node = plan
        .nodes
        .get(node_idx)
        .ok_or_else(|| Error::MalformedPlan(format!("node index {node_idx} out of range")))?;

    match &node.kind {
        NodeKind::Scan(scan) => {
            let table = &plan.inputs[scan.base_table_id];
            execute_scan(table, &node.output_attrs, scan.base_table_id as u8)
        }
        NodeKind::Join(join) => {
            let left = execute_node(plan, join.left)?;
            let right = execute_node(plan, join.right)?;
            let mut results: Vec<IntermediateColumn> = node
                .output_attrs
                .iter()
                .map(|_| IntermediateColumn::new())
                .collect();
            let inputs = JoinInputs {
                left: &left,
                right: &right,
                left_col: join.left_attr,
                right_col: join.right_attr,
                output_attrs: &node.output_attrs,
            };
            let mut sink = IntermediateSink {
                columns: &mut results,
            };
            execute_join(&inputs, &mut sink)?;
            Ok(results)
        }
    }
}
