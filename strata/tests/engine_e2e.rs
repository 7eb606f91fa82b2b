//! End-to-end engine tests: whole plans in, output tables out.
//!
//! Small joins run the sequential probe path and have a deterministic row
//! order; larger ones are compared as multisets because the parallel probe
//! interleaves per-thread match batches.

use strata::{
    execute, ColumnarTable, Column, DataType, Int32PageWriter, Plan, PlanNode, VarcharPageWriter,
};
use strata_storage::codec::{decode_int32_page, decode_varchar_page, VarcharPage};

fn int_table(values: &[Option<i32>]) -> ColumnarTable {
    let mut column = Column::new(DataType::Int32);
    let mut writer = Int32PageWriter::new();
    for v in values {
        writer.push(&mut column, *v);
    }
    writer.finish(&mut column);
    ColumnarTable {
        num_rows: values.len(),
        columns: vec![column],
    }
}

fn varchar_table(values: &[Option<Vec<u8>>]) -> ColumnarTable {
    let mut column = Column::new(DataType::Varchar);
    let mut writer = VarcharPageWriter::new();
    for v in values {
        writer.push(&mut column, v.as_deref());
    }
    writer.finish(&mut column);
    ColumnarTable {
        num_rows: values.len(),
        columns: vec![column],
    }
}

/// Decode an INT32 output column back into row values.
fn read_int_column(column: &Column) -> Vec<Option<i32>> {
    let mut out = Vec::new();
    for page in column.pages() {
        for (present, v) in decode_int32_page(page).unwrap() {
            out.push(present.then_some(v));
        }
    }
    out
}

/// Decode a VARCHAR output column back into row values, following
/// long-string chains.
fn read_varchar_column(column: &Column) -> Vec<Option<Vec<u8>>> {
    let mut out = Vec::new();
    let pages = column.pages();
    let mut page_id = 0;
    while page_id < pages.len() {
        match decode_varchar_page(&pages[page_id]).unwrap() {
            VarcharPage::Short(short) => {
                let mut data_idx = 0;
                for row in 0..short.num_rows() as usize {
                    if short.present(row) {
                        out.push(Some(short.string_bytes(data_idx).unwrap().to_vec()));
                        data_idx += 1;
                    } else {
                        out.push(None);
                    }
                }
                page_id += 1;
            }
            VarcharPage::LongHead { payload } => {
                let mut bytes = payload.to_vec();
                page_id += 1;
                while page_id < pages.len() {
                    match decode_varchar_page(&pages[page_id]).unwrap() {
                        VarcharPage::LongCont { payload } => {
                            bytes.extend_from_slice(payload);
                            page_id += 1;
                        }
                        _ => break,
                    }
                }
                out.push(Some(bytes));
            }
            VarcharPage::LongCont { .. } => panic!("continuation page without a head"),
        }
    }
    out
}

fn two_column_join_plan(a: ColumnarTable, b: ColumnarTable) -> Plan {
    Plan::new(
        vec![
            PlanNode::scan(0, vec![(0, DataType::Int32)]),
            PlanNode::scan(1, vec![(0, DataType::Int32)]),
            PlanNode::join(
                0,
                1,
                0,
                0,
                vec![(0, DataType::Int32), (1, DataType::Int32)],
            ),
        ],
        vec![a, b],
        2,
    )
}

fn output_pairs(result: &ColumnarTable) -> Vec<(i32, i32)> {
    let left = read_int_column(&result.columns[0]);
    let right = read_int_column(&result.columns[1]);
    assert_eq!(left.len(), right.len());
    assert_eq!(left.len(), result.num_rows);
    left.into_iter()
        .zip(right)
        .map(|(l, r)| (l.expect("no null keys in output"), r.expect("no null keys")))
        .collect()
}

#[test]
fn trivial_inner_join_on_int32() {
    let plan = two_column_join_plan(
        int_table(&[Some(1), Some(2), Some(3)]),
        int_table(&[Some(2), Some(3), Some(4)]),
    );
    let result = execute(&plan).unwrap();
    // Sequential probe: probe-side row order.
    assert_eq!(output_pairs(&result), vec![(2, 2), (3, 3)]);
}

#[test]
fn null_keys_are_filtered() {
    let plan = two_column_join_plan(
        int_table(&[Some(1), None, Some(3)]),
        int_table(&[None, Some(3), Some(1)]),
    );
    let result = execute(&plan).unwrap();
    let mut pairs = output_pairs(&result);
    pairs.sort_unstable();
    assert_eq!(pairs, vec![(1, 1), (3, 3)]);
}

#[test]
fn duplicate_keys_produce_cross_products() {
    let plan = two_column_join_plan(
        int_table(&[Some(1), Some(1), Some(2)]),
        int_table(&[Some(1), Some(2), Some(2)]),
    );
    let result = execute(&plan).unwrap();
    let mut pairs = output_pairs(&result);
    pairs.sort_unstable();
    assert_eq!(pairs, vec![(1, 1), (1, 1), (2, 2), (2, 2)]);
}

#[test]
fn all_null_build_side_matches_nothing() {
    let plan = two_column_join_plan(
        int_table(&[None, None, None]),
        int_table(&[Some(1), Some(2), Some(3), Some(4)]),
    );
    let result = execute(&plan).unwrap();
    assert_eq!(result.num_rows, 0);
    assert!(result.columns[0].pages().is_empty());
}

#[test]
fn all_null_probe_side_matches_nothing() {
    let plan = two_column_join_plan(
        int_table(&[Some(1), Some(2)]),
        int_table(&[None, None, None]),
    );
    let result = execute(&plan).unwrap();
    assert_eq!(result.num_rows, 0);
}

#[test]
fn empty_inputs_produce_an_empty_table() {
    let plan = two_column_join_plan(int_table(&[]), int_table(&[]));
    let result = execute(&plan).unwrap();
    assert_eq!(result.num_rows, 0);
    assert_eq!(result.columns.len(), 2);
}

#[test]
fn unique_matching_keys_preserve_row_count() {
    let keys: Vec<Option<i32>> = (0..5000).map(|i| Some(i * 3 + 1)).collect();
    let mut shuffled = keys.clone();
    shuffled.reverse();
    let plan = two_column_join_plan(int_table(&keys), int_table(&shuffled));
    let result = execute(&plan).unwrap();
    assert_eq!(result.num_rows, keys.len());
    for (l, r) in output_pairs(&result) {
        assert_eq!(l, r);
    }
}

#[test]
fn int32_identity_scan_roundtrips_through_root() {
    let rows: Vec<Option<i32>> = (0..3000)
        .map(|i| if i % 7 == 0 { None } else { Some(i - 1500) })
        .collect();
    let plan = Plan::new(
        vec![PlanNode::scan(0, vec![(0, DataType::Int32)])],
        vec![int_table(&rows)],
        0,
    );
    let result = execute(&plan).unwrap();
    assert_eq!(result.num_rows, rows.len());
    assert_eq!(read_int_column(&result.columns[0]), rows);
}

#[test]
fn varchar_identity_scan_roundtrips_including_long_chain() {
    let rows: Vec<Option<Vec<u8>>> = vec![
        Some(b"foo".to_vec()),
        Some(vec![b'x'; 10_000]),
        None,
        Some(Vec::new()),
        Some(vec![b'y'; 3 * (strata::PAGE_SIZE - 4)]),
    ];
    let plan = Plan::new(
        vec![PlanNode::scan(0, vec![(0, DataType::Varchar)])],
        vec![varchar_table(&rows)],
        0,
    );
    let result = execute(&plan).unwrap();
    assert_eq!(result.num_rows, rows.len());
    assert_eq!(read_varchar_column(&result.columns[0]), rows);
}

#[test]
fn mixed_type_join_carries_strings_by_reference() {
    // Table A: (key, name); table B: (key). Join emits name and both keys.
    let mut a = int_table(&[Some(1), Some(2), Some(3)]);
    let names = varchar_table(&[
        Some(b"ada".to_vec()),
        None,
        Some(vec![b'z'; 9000]),
    ]);
    a.columns.push(names.columns.into_iter().next().unwrap());
    let b = int_table(&[Some(3), Some(1)]);

    let plan = Plan::new(
        vec![
            PlanNode::scan(0, vec![(0, DataType::Int32), (1, DataType::Varchar)]),
            PlanNode::scan(1, vec![(0, DataType::Int32)]),
            PlanNode::join(
                0,
                1,
                0,
                0,
                vec![
                    (1, DataType::Varchar),
                    (0, DataType::Int32),
                    (2, DataType::Int32),
                ],
            ),
        ],
        vec![a, b],
        2,
    );
    let result = execute(&plan).unwrap();
    assert_eq!(result.num_rows, 2);

    let names = read_varchar_column(&result.columns[0]);
    let keys = read_int_column(&result.columns[1]);
    let probe_keys = read_int_column(&result.columns[2]);
    // B is smaller and builds, so the sequential probe walks A in row order.
    assert_eq!(keys, vec![Some(1), Some(3)]);
    assert_eq!(probe_keys, vec![Some(1), Some(3)]);
    assert_eq!(names[0], Some(b"ada".to_vec()));
    assert_eq!(names[1], Some(vec![b'z'; 9000]));
}

#[test]
fn two_level_join_tree_feeds_intermediate_columns_upward() {
    // (A join B) join C on the same key column.
    let a = int_table(&[Some(1), Some(2), Some(3), Some(4)]);
    let b = int_table(&[Some(2), Some(4), Some(5)]);
    let c = int_table(&[Some(4), Some(2)]);

    let plan = Plan::new(
        vec![
            PlanNode::scan(0, vec![(0, DataType::Int32)]),
            PlanNode::scan(1, vec![(0, DataType::Int32)]),
            PlanNode::join(
                0,
                1,
                0,
                0,
                vec![(0, DataType::Int32), (1, DataType::Int32)],
            ),
            PlanNode::scan(2, vec![(0, DataType::Int32)]),
            PlanNode::join(
                2,
                3,
                0,
                0,
                vec![
                    (0, DataType::Int32),
                    (1, DataType::Int32),
                    (2, DataType::Int32),
                ],
            ),
        ],
        vec![a, b, c],
        4,
    );
    let result = execute(&plan).unwrap();
    assert_eq!(result.num_rows, 2);

    let c0 = read_int_column(&result.columns[0]);
    let c1 = read_int_column(&result.columns[1]);
    let c2 = read_int_column(&result.columns[2]);
    let mut rows: Vec<(i32, i32, i32)> = (0..2)
        .map(|i| (c0[i].unwrap(), c1[i].unwrap(), c2[i].unwrap()))
        .collect();
    rows.sort_unstable();
    assert_eq!(rows, vec![(2, 2, 2), (4, 4, 4)]);
}

#[test]
fn parallel_build_boundary_join_matches_every_row() {
    // 600 000 rows on each side crosses the default partitioned-build
    // threshold; output order is a multiset under the parallel probe.
    let n = 600_000;
    let keys: Vec<Option<i32>> = (0..n).map(|i| Some(i)).collect();
    let plan = two_column_join_plan(int_table(&keys), int_table(&keys));
    let result = execute(&plan).unwrap();
    assert_eq!(result.num_rows, n as usize);

    let pairs = output_pairs(&result);
    let mut seen = vec![false; n as usize];
    for (l, r) in pairs {
        assert_eq!(l, r);
        assert!(!seen[l as usize], "key {l} emitted twice");
        seen[l as usize] = true;
    }
    assert!(seen.iter().all(|s| *s));
}

#[test]
fn bloom_false_positives_are_filtered_by_key_compare() {
    use strata::{ProbeIndex, UnchainedHashTable};

    // Find probe keys whose slot and tag collide with key 7's.
    let mut table = UnchainedHashTable::with_capacity(1);
    table.insert(7, 0);
    table.finalize();

    let mut fp_keys = Vec::new();
    let mut key = 8;
    while fp_keys.len() < 4 && key < 3_000_000 {
        if !table.find_range(key).is_empty() {
            let mut matched = false;
            table.for_each_match(key, |_| matched = true);
            if !matched {
                fp_keys.push(key);
            }
        }
        key += 1;
    }
    assert!(!fp_keys.is_empty(), "no bloom false positives in scan range");

    let mut probe_rows: Vec<Option<i32>> = fp_keys.iter().map(|k| Some(*k)).collect();
    probe_rows.push(Some(7));
    let plan = two_column_join_plan(int_table(&[Some(7)]), int_table(&probe_rows));
    let result = execute(&plan).unwrap();
    assert_eq!(output_pairs(&result), vec![(7, 7)]);
}

#[test]
fn malformed_plans_are_rejected() {
    let plan = Plan::new(
        vec![PlanNode::scan(5, vec![(0, DataType::Int32)])],
        vec![int_table(&[Some(1)])],
        0,
    );
    assert!(execute(&plan).is_err());

    let plan = Plan::new(
        vec![PlanNode::scan(0, vec![(0, DataType::Int32)])],
        vec![int_table(&[Some(1)])],
        3,
    );
    assert!(execute(&plan).is_err());
}
