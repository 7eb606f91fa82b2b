//! Write side of the columnar page format.
//!
//! The writers buffer one page worth of values and flush whenever appending
//! the next value would overflow the 8 KiB layout. They are shared by the
//! root materializer and by anything that needs to assemble base tables.

use crate::codec::{bitmap_clear, bitmap_set, put_u16_le, LONG_STRING_CONT, LONG_STRING_HEAD};
use crate::page::{Column, PAGE_SIZE};

/// Largest string that still fits in a single short page alongside its
/// header, offset entry, and one bitmap byte. Anything longer is written as
/// a long-string chain.
pub const MAX_INLINE_STRING: usize = PAGE_SIZE - 7;

/// Payload capacity of one long-string page.
pub const LONG_CHUNK_BYTES: usize = PAGE_SIZE - 4;

/// Buffering writer for INT32 pages.
#[derive(Default)]
pub struct Int32PageWriter {
    num_rows: u16,
    data: Vec<i32>,
    bitmap: Vec<u8>,
}

impl Int32PageWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one row, flushing a full page into `column` first if needed.
    pub fn push(&mut self, column: &mut Column, value: Option<i32>) {
        match value {
            Some(v) => {
                if 4 + (self.data.len() + 1) * 4 + (self.num_rows as usize / 8 + 1) > PAGE_SIZE {
                    self.flush(column);
                }
                bitmap_set(&mut self.bitmap, self.num_rows as usize);
                self.data.push(v);
                self.num_rows += 1;
            }
            None => {
                if 4 + self.data.len() * 4 + (self.num_rows as usize / 8 + 1) > PAGE_SIZE {
                    self.flush(column);
                }
                bitmap_clear(&mut self.bitmap, self.num_rows as usize);
                self.num_rows += 1;
            }
        }
    }

    /// Write the buffered rows as one page and reset the buffer.
    pub fn flush(&mut self, column: &mut Column) {
        let page = column.new_page().data_mut();
        put_u16_le(page, 0, self.num_rows);
        put_u16_le(page, 2, self.data.len() as u16);
        for (i, v) in self.data.iter().enumerate() {
            page[4 + i * 4..8 + i * 4].copy_from_slice(&v.to_le_bytes());
        }
        page[PAGE_SIZE - self.bitmap.len()..].copy_from_slice(&self.bitmap);
        self.num_rows = 0;
        self.data.clear();
        self.bitmap.clear();
    }

    /// Flush any pending rows; a no-op on an empty buffer.
    pub fn finish(&mut self, column: &mut Column) {
        if self.num_rows != 0 {
            self.flush(column);
        }
    }
}

/// Buffering writer for VARCHAR pages, including long-string chains.
#[derive(Default)]
pub struct VarcharPageWriter {
    num_rows: u16,
    data: Vec<u8>,
    offsets: Vec<u16>,
    bitmap: Vec<u8>,
}

impl VarcharPageWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one row, flushing a full page into `column` first if needed.
    ///
    /// Strings longer than [`MAX_INLINE_STRING`] flush the pending short
    /// rows and are emitted as a head page plus continuation pages. A chain
    /// counts as one logical row of the column.
    pub fn push(&mut self, column: &mut Column, value: Option<&[u8]>) {
        match value {
            None => {
                if 4 + self.offsets.len() * 2 + self.data.len() + (self.num_rows as usize / 8 + 1)
                    > PAGE_SIZE
                {
                    self.flush(column);
                }
                bitmap_clear(&mut self.bitmap, self.num_rows as usize);
                self.num_rows += 1;
            }
            Some(bytes) if bytes.len() > MAX_INLINE_STRING => {
                if self.num_rows > 0 {
                    self.flush(column);
                }
                write_long_string(column, bytes);
            }
            Some(bytes) => {
                if 4 + (self.offsets.len() + 1) * 2
                    + self.data.len()
                    + bytes.len()
                    + (self.num_rows as usize / 8 + 1)
                    > PAGE_SIZE
                {
                    self.flush(column);
                }
                bitmap_set(&mut self.bitmap, self.num_rows as usize);
                self.data.extend_from_slice(bytes);
                self.offsets.push(self.data.len() as u16);
                self.num_rows += 1;
            }
        }
    }

    /// Write the buffered rows as one page and reset the buffer.
    pub fn flush(&mut self, column: &mut Column) {
        let page = column.new_page().data_mut();
        put_u16_le(page, 0, self.num_rows);
        put_u16_le(page, 2, self.offsets.len() as u16);
        for (i, off) in self.offsets.iter().enumerate() {
            page[4 + i * 2..6 + i * 2].copy_from_slice(&off.to_le_bytes());
        }
        let payload_start = 4 + self.offsets.len() * 2;
        page[payload_start..payload_start + self.data.len()].copy_from_slice(&self.data);
        page[PAGE_SIZE - self.bitmap.len()..].copy_from_slice(&self.bitmap);
        self.num_rows = 0;
        self.data.clear();
        self.offsets.clear();
        self.bitmap.clear();
    }

    /// Flush any pending rows; a no-op on an empty buffer.
    pub fn finish(&mut self, column: &mut Column) {
        if self.num_rows != 0 {
            self.flush(column);
        }
    }
}

/// Emit `bytes` as a head page plus as many continuation pages as needed.
fn write_long_string(column: &mut Column, bytes: &[u8]) {
    let mut offset = 0;
    let mut first_page = true;
    while offset < bytes.len() {
        let page = column.new_page().data_mut();
        let magic = if first_page {
            LONG_STRING_HEAD
        } else {
            LONG_STRING_CONT
        };
        first_page = false;
        let chunk = (bytes.len() - offset).min(LONG_CHUNK_BYTES);
        put_u16_le(page, 0, magic);
        put_u16_le(page, 2, chunk as u16);
        page[4..4 + chunk].copy_from_slice(&bytes[offset..offset + chunk]);
        offset += chunk;
    }
}
