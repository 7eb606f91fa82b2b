//! Paged append-only columns of tagged values.
//!
//! Operators hand these to their parents by move; a column is consumed once
//! and dropped at the end of the consuming operator.

use crate::page::PAGE_SIZE;
use strata_types::Value;

/// Tagged values per intermediate page.
pub const VALUES_PER_PAGE: usize = PAGE_SIZE / std::mem::size_of::<Value>();

/// Append-only paged sequence of 8-byte tagged values.
///
/// Absolute row `i` lives at page `i / VALUES_PER_PAGE`, offset
/// `i % VALUES_PER_PAGE`. Pages are owned exclusively by the column and
/// freed when it drops.
pub struct IntermediateColumn {
    pages: Vec<Box<[Value; VALUES_PER_PAGE]>>,
    len: usize,
}

impl IntermediateColumn {
    pub fn new() -> Self {
        Self {
            pages: Vec::new(),
            len: 0,
        }
    }

    /// Append a value, allocating a fresh page when the last one is full.
    pub fn push(&mut self, value: Value) {
        let page_idx = self.len / VALUES_PER_PAGE;
        if page_idx == self.pages.len() {
            self.pages.push(Box::new([Value::default(); VALUES_PER_PAGE]));
        }
        self.pages[page_idx][self.len % VALUES_PER_PAGE] = value;
        self.len += 1;
    }

    /// Value at absolute row `idx`.
    ///
    /// Panics when `idx >= len()`; row indices always come from the producing
    /// operator's own accounting.
    #[inline]
    pub fn get(&self, idx: usize) -> Value {
        debug_assert!(idx < self.len);
        self.pages[idx / VALUES_PER_PAGE][idx % VALUES_PER_PAGE]
    }

    /// Overwrite the value at an existing row.
    #[inline]
    pub fn set(&mut self, idx: usize, value: Value) {
        debug_assert!(idx < self.len);
        self.pages[idx / VALUES_PER_PAGE][idx % VALUES_PER_PAGE] = value;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for IntermediateColumn {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Index<usize> for IntermediateColumn {
    type Output = Value;

    #[inline]
    fn index(&self, idx: usize) -> &Value {
        &self.pages[idx / VALUES_PER_PAGE][idx % VALUES_PER_PAGE]
    }
}
