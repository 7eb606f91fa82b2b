//! Read side of the columnar page format.
//!
//! Page layouts (all integers little-endian):
//!
//! ```text
//! INT32 page:
//!   [0..2)  num_rows (u16)
//!   [2..4)  num_values (u16)          values actually present
//!   [4..)   i32[num_values] packed
//!   tail    presence bitmap, last byte at PAGE_SIZE - 1
//!
//! VARCHAR short page:
//!   [0..2)  num_rows (u16), < 0xFFFE
//!   [2..4)  num_values (u16)
//!   [4..)   u16[num_values] exclusive end offsets, then UTF-8 payload
//!   tail    presence bitmap
//!
//! VARCHAR long-string head:          num_rows == 0xFFFF
//! VARCHAR long-string continuation:  num_rows == 0xFFFE
//!   [2..4)  chunk length (u16)
//!   [4..)   chunk payload
//! ```
//!
//! A long string spans its head page plus every immediately following page
//! whose magic is the continuation marker; the chain ends at the first page
//! that is not a continuation. Continuation pages may carry empty payloads.

use crate::page::{ColumnarTable, Page, PAGE_SIZE};
use strata_result::{Error, Result};
use strata_types::StringRef;

/// `num_rows` magic marking the first page of a long string.
pub const LONG_STRING_HEAD: u16 = 0xFFFF;
/// `num_rows` magic marking a continuation page of a long string.
pub const LONG_STRING_CONT: u16 = 0xFFFE;

#[inline]
pub(crate) fn get_u16_le(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

#[inline]
pub(crate) fn put_u16_le(bytes: &mut [u8], offset: usize, v: u16) {
    bytes[offset..offset + 2].copy_from_slice(&v.to_le_bytes());
}

/// Test bit `idx` of a little-endian packed bitmap.
#[inline]
pub fn bitmap_get(bitmap: &[u8], idx: usize) -> bool {
    (bitmap[idx / 8] >> (idx % 8)) & 1 != 0
}

/// Set bit `idx`, extending the bitmap with zero bytes as needed.
#[inline]
pub fn bitmap_set(bitmap: &mut Vec<u8>, idx: usize) {
    while bitmap.len() < idx / 8 + 1 {
        bitmap.push(0);
    }
    bitmap[idx / 8] |= 1 << (idx % 8);
}

/// Clear bit `idx`, extending the bitmap with zero bytes as needed.
#[inline]
pub fn bitmap_clear(bitmap: &mut Vec<u8>, idx: usize) {
    while bitmap.len() < idx / 8 + 1 {
        bitmap.push(0);
    }
    bitmap[idx / 8] &= !(1 << (idx % 8));
}

/// Iterator over the rows of an INT32 page, yielding `(present, value)`.
///
/// Yields exactly `num_rows` items; absent rows report `(false, 0)`.
pub struct Int32PageValues<'a> {
    values: &'a [u8],
    bitmap: &'a [u8],
    num_rows: u16,
    row: u16,
    data_idx: u16,
}

impl Iterator for Int32PageValues<'_> {
    type Item = (bool, i32);

    fn next(&mut self) -> Option<(bool, i32)> {
        if self.row >= self.num_rows {
            return None;
        }
        let present = bitmap_get(self.bitmap, self.row as usize);
        self.row += 1;
        if present {
            let at = self.data_idx as usize * 4;
            let v = i32::from_le_bytes(self.values[at..at + 4].try_into().expect("4-byte slice"));
            self.data_idx += 1;
            Some((true, v))
        } else {
            Some((false, 0))
        }
    }
}

/// Decode an INT32 page into its row iterator.
pub fn decode_int32_page(page: &Page) -> Result<Int32PageValues<'_>> {
    let data = page.data();
    let num_rows = get_u16_le(data, 0);
    let num_values = get_u16_le(data, 2);
    let bitmap_len = (num_rows as usize + 7) / 8;
    if 4 + num_values as usize * 4 + bitmap_len > PAGE_SIZE || num_values > num_rows {
        return Err(Error::CorruptPage(format!(
            "int32 page with num_rows={num_rows} num_values={num_values} cannot fit"
        )));
    }
    Ok(Int32PageValues {
        values: &data[4..4 + num_values as usize * 4],
        bitmap: &data[PAGE_SIZE - bitmap_len..],
        num_rows,
        row: 0,
        data_idx: 0,
    })
}

/// A decoded VARCHAR page, classified by its `num_rows` magic.
pub enum VarcharPage<'a> {
    /// A regular page of short strings.
    Short(ShortStringPage<'a>),
    /// First page of a long string; payload is the first chunk.
    LongHead { payload: &'a [u8] },
    /// Continuation page of a long string.
    LongCont { payload: &'a [u8] },
}

/// Accessor over a short-string VARCHAR page.
pub struct ShortStringPage<'a> {
    num_rows: u16,
    num_values: u16,
    offsets: &'a [u8],
    payload: &'a [u8],
    bitmap: &'a [u8],
}

impl ShortStringPage<'_> {
    #[inline]
    pub fn num_rows(&self) -> u16 {
        self.num_rows
    }

    #[inline]
    pub fn num_values(&self) -> u16 {
        self.num_values
    }

    #[inline]
    pub fn present(&self, row: usize) -> bool {
        bitmap_get(self.bitmap, row)
    }

    /// Exclusive end offset of the string at `offset_idx`.
    #[inline]
    pub fn end_offset(&self, offset_idx: usize) -> u16 {
        get_u16_le(self.offsets, offset_idx * 2)
    }

    /// Payload bytes of the string at `offset_idx`.
    ///
    /// The string starts where its predecessor ends (offset 0 for the first
    /// entry) and ends at its own end offset.
    pub fn string_bytes(&self, offset_idx: usize) -> Result<&[u8]> {
        if offset_idx >= self.num_values as usize {
            return Err(Error::CorruptPage(format!(
                "string offset index {offset_idx} out of {}",
                self.num_values
            )));
        }
        let start = if offset_idx == 0 {
            0
        } else {
            self.end_offset(offset_idx - 1) as usize
        };
        let end = self.end_offset(offset_idx) as usize;
        if start > end || end > self.payload.len() {
            return Err(Error::CorruptPage(format!(
                "string range {start}..{end} exceeds payload of {}",
                self.payload.len()
            )));
        }
        Ok(&self.payload[start..end])
    }
}

/// Decode a VARCHAR page, classifying it without materializing strings.
pub fn decode_varchar_page(page: &Page) -> Result<VarcharPage<'_>> {
    let data = page.data();
    let num_rows = get_u16_le(data, 0);
    if num_rows == LONG_STRING_HEAD || num_rows == LONG_STRING_CONT {
        let length = get_u16_le(data, 2) as usize;
        if 4 + length > PAGE_SIZE {
            return Err(Error::CorruptPage(format!(
                "long-string chunk of {length} bytes cannot fit"
            )));
        }
        let payload = &data[4..4 + length];
        return Ok(if num_rows == LONG_STRING_HEAD {
            VarcharPage::LongHead { payload }
        } else {
            VarcharPage::LongCont { payload }
        });
    }
    let num_values = get_u16_le(data, 2);
    let bitmap_len = (num_rows as usize + 7) / 8;
    let payload_start = 4 + num_values as usize * 2;
    if payload_start + bitmap_len > PAGE_SIZE || num_values > num_rows {
        return Err(Error::CorruptPage(format!(
            "varchar page with num_rows={num_rows} num_values={num_values} cannot fit"
        )));
    }
    Ok(VarcharPage::Short(ShortStringPage {
        num_rows,
        num_values,
        offsets: &data[4..payload_start],
        payload: &data[payload_start..PAGE_SIZE - bitmap_len],
        bitmap: &data[PAGE_SIZE - bitmap_len..],
    }))
}

/// Resolve a string reference against the base tables and return its bytes.
///
/// Short strings are sliced out of their page's offset array. References to
/// long-string pages concatenate the payload of the referenced page and of
/// every immediately following continuation page.
pub fn materialize_string(inputs: &[ColumnarTable], r: StringRef) -> Result<Vec<u8>> {
    let out_of_range = || Error::PageOutOfRange {
        table_id: r.table_id as usize,
        column_id: r.column_id as usize,
        page_id: r.page_id as usize,
    };
    let table = inputs.get(r.table_id as usize).ok_or_else(out_of_range)?;
    let column = table
        .columns
        .get(r.column_id as usize)
        .ok_or_else(out_of_range)?;
    let pages = column.pages();
    let page = pages.get(r.page_id as usize).ok_or_else(out_of_range)?;

    match decode_varchar_page(page)? {
        VarcharPage::Short(short) => Ok(short.string_bytes(r.offset_idx as usize)?.to_vec()),
        VarcharPage::LongHead { payload } | VarcharPage::LongCont { payload } => {
            let mut bytes = payload.to_vec();
            let mut page_id = r.page_id as usize + 1;
            while page_id < pages.len() {
                match decode_varchar_page(&pages[page_id])? {
                    VarcharPage::LongCont { payload } => {
                        bytes.extend_from_slice(payload);
                        page_id += 1;
                    }
                    _ => break,
                }
            }
            Ok(bytes)
        }
    }
}

/// Read the `num_rows` header word of a page.
#[inline]
pub fn page_num_rows(page: &Page) -> u16 {
    get_u16_le(page.data(), 0)
}
