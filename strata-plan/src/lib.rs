//! Physical plan structures for the Strata execution core.
//!
//! Plans arrive pre-built from a planning collaborator: a node list forming
//! a DAG of scans and inner equijoins, a root index, and the catalog of
//! input tables the scans read. The executor walks the nodes bottom-up and
//! never rewrites them.

use strata_result::{Error, Result};
use strata_storage::ColumnarTable;
use strata_types::DataType;

/// Leaf node: read columns of one base table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanNode {
    /// Index into the plan's `inputs` catalog.
    pub base_table_id: usize,
}

/// Inner node: inner equijoin on one attribute of each child.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JoinNode {
    /// Node index of the left child.
    pub left: usize,
    /// Node index of the right child.
    pub right: usize,
    /// Join attribute, an index into the left child's output.
    pub left_attr: usize,
    /// Join attribute, an index into the right child's output.
    pub right_attr: usize,
    /// Planner hint for which side to build.
    ///
    /// The executor recomputes the build side from actual cardinalities and
    /// never consults this field; it is carried only because planners emit
    /// it.
    pub build_left: bool,
}

/// Node payload: scan or join.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Scan(ScanNode),
    Join(JoinNode),
}

/// One plan node: its payload plus the attributes it emits.
///
/// Each output attribute is `(in_col_idx, data_type)`. For a scan,
/// `in_col_idx` indexes the base table's columns; for a join it indexes the
/// concatenation of the left child's outputs followed by the right child's.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlanNode {
    pub kind: NodeKind,
    pub output_attrs: Vec<(usize, DataType)>,
}

impl PlanNode {
    pub fn scan(base_table_id: usize, output_attrs: Vec<(usize, DataType)>) -> Self {
        Self {
            kind: NodeKind::Scan(ScanNode { base_table_id }),
            output_attrs,
        }
    }

    pub fn join(
        left: usize,
        right: usize,
        left_attr: usize,
        right_attr: usize,
        output_attrs: Vec<(usize, DataType)>,
    ) -> Self {
        Self {
            kind: NodeKind::Join(JoinNode {
                left,
                right,
                left_attr,
                right_attr,
                build_left: false,
            }),
            output_attrs,
        }
    }
}

/// A complete physical plan.
pub struct Plan {
    pub nodes: Vec<PlanNode>,
    pub inputs: Vec<ColumnarTable>,
    pub root: usize,
}

impl Plan {
    pub fn new(nodes: Vec<PlanNode>, inputs: Vec<ColumnarTable>, root: usize) -> Self {
        Self {
            nodes,
            inputs,
            root,
        }
    }

    /// Structural validation: every index in range, base table ids small
    /// enough for the string-reference packing, attribute types agreeing
    /// with their sources, and no cycles reachable from the root.
    pub fn validate(&self) -> Result<()> {
        if self.root >= self.nodes.len() {
            return Err(Error::MalformedPlan(format!(
                "root index {} out of {} nodes",
                self.root,
                self.nodes.len()
            )));
        }
        let mut state = vec![VisitState::Unvisited; self.nodes.len()];
        self.validate_node(self.root, &mut state)
    }

    fn validate_node(&self, idx: usize, state: &mut [VisitState]) -> Result<()> {
        match state[idx] {
            VisitState::Done => return Ok(()),
            VisitState::InProgress => {
                return Err(Error::MalformedPlan(format!("cycle through node {idx}")));
            }
            VisitState::Unvisited => {}
        }
        state[idx] = VisitState::InProgress;

        let node = &self.nodes[idx];
        match &node.kind {
            NodeKind::Scan(scan) => {
                let table = self.inputs.get(scan.base_table_id).ok_or_else(|| {
                    Error::MalformedPlan(format!(
                        "node {idx} scans table {} but only {} inputs exist",
                        scan.base_table_id,
                        self.inputs.len()
                    ))
                })?;
                if scan.base_table_id > u8::MAX as usize {
                    return Err(Error::MalformedPlan(format!(
                        "table id {} does not fit the string-reference packing",
                        scan.base_table_id
                    )));
                }
                for &(col_idx, dtype) in &node.output_attrs {
                    if col_idx > u8::MAX as usize {
                        return Err(Error::MalformedPlan(format!(
                            "column id {col_idx} does not fit the string-reference packing"
                        )));
                    }
                    match table.columns.get(col_idx) {
                        None => {
                            return Err(Error::MalformedPlan(format!(
                                "node {idx} selects column {col_idx} of a {}-column table",
                                table.columns.len()
                            )));
                        }
                        Some(column) if column.dtype() != dtype => {
                            return Err(Error::MalformedPlan(format!(
                                "node {idx} declares column {col_idx} as {dtype} but the table stores {}",
                                column.dtype()
                            )));
                        }
                        Some(_) => {}
                    }
                }
            }
            NodeKind::Join(join) => {
                for child in [join.left, join.right] {
                    if child >= self.nodes.len() {
                        return Err(Error::MalformedPlan(format!(
                            "node {idx} references missing child {child}"
                        )));
                    }
                }
                self.validate_node(join.left, state)?;
                self.validate_node(join.right, state)?;

                let left_attrs = &self.nodes[join.left].output_attrs;
                let right_attrs = &self.nodes[join.right].output_attrs;
                if join.left_attr >= left_attrs.len() || join.right_attr >= right_attrs.len() {
                    return Err(Error::MalformedPlan(format!(
                        "node {idx} joins on attributes ({}, {}) beyond child widths ({}, {})",
                        join.left_attr,
                        join.right_attr,
                        left_attrs.len(),
                        right_attrs.len()
                    )));
                }
                let width = left_attrs.len() + right_attrs.len();
                for &(col_idx, dtype) in &node.output_attrs {
                    if col_idx >= width {
                        return Err(Error::MalformedPlan(format!(
                            "node {idx} emits column {col_idx} of a {width}-wide join"
                        )));
                    }
                    let source = if col_idx < left_attrs.len() {
                        left_attrs[col_idx].1
                    } else {
                        right_attrs[col_idx - left_attrs.len()].1
                    };
                    if source != dtype {
                        return Err(Error::MalformedPlan(format!(
                            "node {idx} declares column {col_idx} as {dtype} but the child emits {source}"
                        )));
                    }
                }
            }
        }

        state[idx] = VisitState::Done;
        Ok(())
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Unvisited,
    InProgress,
    Done,
}
