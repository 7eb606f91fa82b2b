//! Core value and identifier types for the Strata query engine.
//!
//! This crate hosts the 8-byte tagged value that flows between operators and
//! the identifiers embedded in it, decoupled from the storage crates so that
//! every layer can share them without pulling in page machinery.

mod value;

pub use value::{StringRef, Value};

/// Identifier of a base table inside a plan's input catalog.
///
/// Table ids must fit in 8 bits because they are packed into string
/// references alongside the column, page, and offset coordinates.
pub type TableId = u8;

/// Identifier of a column within a base table.
pub type ColumnId = u8;

/// Identifier of a page within a column.
pub type PageId = u32;

/// Logical type of a column.
///
/// The set is closed: the engine moves 32-bit integers inline and strings by
/// reference, and nothing else.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Signed 32-bit integer; `i32::MIN` is the null sentinel.
    Int32,
    /// UTF-8 string, carried as a packed reference until materialization.
    Varchar,
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataType::Int32 => write!(f, "INT32"),
            DataType::Varchar => write!(f, "VARCHAR"),
        }
    }
}
