//! Columnar storage primitives for the Strata query engine.
//!
//! Base tables are lists of fixed-size 8 KiB pages per column. This crate
//! owns the page containers ([`Page`], [`Column`], [`ColumnarTable`]), the
//! page codec (decode and write for INT32 and VARCHAR pages, including
//! multi-page long-string chains), and the paged append-only
//! [`IntermediateColumn`] of tagged values that operators exchange.
//!
//! Strings are decoded lazily: scans emit compact references into base pages
//! and only [`codec::materialize_string`] turns a reference back into bytes.

pub mod codec;
pub mod intermediate;
pub mod page;
pub mod writer;

pub use intermediate::{IntermediateColumn, VALUES_PER_PAGE};
pub use page::{Column, ColumnarTable, Page, PAGE_SIZE};
pub use writer::{Int32PageWriter, VarcharPageWriter};
