//! Page, column, and table containers.

use strata_types::DataType;

/// Fixed size of every base page in bytes.
pub const PAGE_SIZE: usize = 8192;

/// One 8 KiB base page.
///
/// The payload is opaque at this level; the codec module interprets it
/// according to the owning column's [`DataType`].
pub struct Page(Box<[u8; PAGE_SIZE]>);

impl Page {
    /// Allocate a zeroed page.
    pub fn zeroed() -> Self {
        Page(Box::new([0u8; PAGE_SIZE]))
    }

    #[inline]
    pub fn data(&self) -> &[u8; PAGE_SIZE] {
        &self.0
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [u8; PAGE_SIZE] {
        &mut self.0
    }
}

/// A column of a base table: a logical type plus an owned list of pages.
pub struct Column {
    dtype: DataType,
    pages: Vec<Page>,
}

impl Column {
    pub fn new(dtype: DataType) -> Self {
        Self {
            dtype,
            pages: Vec::new(),
        }
    }

    #[inline]
    pub fn dtype(&self) -> DataType {
        self.dtype
    }

    #[inline]
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Append a fresh zeroed page and return it for writing.
    pub fn new_page(&mut self) -> &mut Page {
        self.pages.push(Page::zeroed());
        self.pages.last_mut().expect("page just pushed")
    }
}

/// A persisted columnar table: a row count and one paged column per
/// attribute.
pub struct ColumnarTable {
    pub num_rows: usize,
    pub columns: Vec<Column>,
}

impl ColumnarTable {
    pub fn new() -> Self {
        Self {
            num_rows: 0,
            columns: Vec::new(),
        }
    }
}

impl Default for ColumnarTable {
    fn default() -> Self {
        Self::new()
    }
}
