//! The 8-byte tagged value exchanged between operators.
//!
//! A [`Value`] is a union of an inline `i32` and a packed [`StringRef`],
//! discriminated externally by the owning column's [`DataType`]. Strings are
//! never materialized while values move through joins; the reference is
//! resolved against the base pages only by the root writer.
//!
//! Bit layout of the string-reference packing (little end first):
//!
//! ```text
//! | table_id | column_id | page_id  | offset_idx |
//! |  8 bits  |  8 bits   | 32 bits  |  16 bits   |
//! ```
//!
//! [`DataType`]: crate::DataType

/// Compact reference to a string stored in a base page.
///
/// `offset_idx` indexes the page's exclusive end-offset array; the string
/// starts where the previous entry ends (or at zero for index 0). For a
/// long-string head page the offset index is always 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StringRef {
    pub table_id: u8,
    pub column_id: u8,
    pub page_id: u32,
    pub offset_idx: u16,
}

impl StringRef {
    pub fn new(table_id: u8, column_id: u8, page_id: u32, offset_idx: u16) -> Self {
        Self {
            table_id,
            column_id,
            page_id,
            offset_idx,
        }
    }
}

/// 8-byte tagged value carried by intermediate columns.
///
/// The default value is the integer 0, matching a zeroed slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(transparent)]
pub struct Value(u64);

/// All-ones packed reference; the null sentinel for strings.
const NULL_STRING_BITS: u64 = u64::MAX;

impl Value {
    /// Wrap an inline integer.
    #[inline]
    pub fn from_i32(v: i32) -> Self {
        Value(v as u32 as u64)
    }

    /// Wrap a string reference.
    #[inline]
    pub fn from_string_ref(r: StringRef) -> Self {
        Value(
            r.table_id as u64
                | (r.column_id as u64) << 8
                | (r.page_id as u64) << 16
                | (r.offset_idx as u64) << 48,
        )
    }

    /// The null integer (`i32::MIN` sentinel).
    #[inline]
    pub fn null_i32() -> Self {
        Value::from_i32(i32::MIN)
    }

    /// The null string (all-ones reference).
    #[inline]
    pub fn null_string() -> Self {
        Value(NULL_STRING_BITS)
    }

    /// Read the inline integer. Only meaningful for INT32 columns.
    #[inline]
    pub fn as_i32(self) -> i32 {
        self.0 as u32 as i32
    }

    /// Unpack the string reference. Only meaningful for VARCHAR columns.
    #[inline]
    pub fn as_string_ref(self) -> StringRef {
        StringRef {
            table_id: self.0 as u8,
            column_id: (self.0 >> 8) as u8,
            page_id: (self.0 >> 16) as u32,
            offset_idx: (self.0 >> 48) as u16,
        }
    }

    #[inline]
    pub fn is_null_i32(self) -> bool {
        self.as_i32() == i32::MIN
    }

    #[inline]
    pub fn is_null_string(self) -> bool {
        self.0 == NULL_STRING_BITS
    }
}
