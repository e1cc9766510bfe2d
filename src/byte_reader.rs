//! A bounds-checked, endian-typed cursor over an immutable, reference-counted
//! byte buffer. All multi-byte reads are little-endian; alignment can be
//! enforced per-call.
//!
//! A [`ByteReader`] never copies the backing buffer: [`ByteReader::clone_at`]
//! produces an independent cursor over a sub-range by cloning the `Rc`
//! pointer and recording new slice bounds. Every read that would exceed the
//! cursor's slice leaves the cursor untouched and returns
//! [`Error::EndOfBuffer`] (or the more specific [`Error::UnalignedRead`]).

use std::rc::Rc;

use encoding_rs::Encoding;
use scroll::Pread;

use crate::error::{Error, Result};

/// One field in a composite [`ByteReader::unpack`] read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    U16,
    U32,
    I16,
    I32,
}

impl FieldKind {
    fn size(self) -> usize {
        match self {
            FieldKind::U16 | FieldKind::I16 => 2,
            FieldKind::U32 | FieldKind::I32 => 4,
        }
    }
}

/// The decoded value of one [`FieldKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue {
    U16(u16),
    U32(u32),
    I16(i16),
    I32(i32),
}

impl FieldValue {
    pub fn as_u32(self) -> u32 {
        match self {
            FieldValue::U16(v) => v as u32,
            FieldValue::U32(v) => v,
            FieldValue::I16(v) => v as u32,
            FieldValue::I32(v) => v as u32,
        }
    }
}

#[derive(Clone)]
pub struct ByteReader {
    buffer: Rc<[u8]>,
    slice_begin: usize,
    slice_end: usize,
    cursor: usize,
    encoding: &'static Encoding,
}

impl ByteReader {
    /// Wraps an entire buffer as a reader over `[0, buffer.len())`.
    pub fn new(buffer: Rc<[u8]>, encoding: &'static Encoding) -> Self {
        let len = buffer.len();
        ByteReader {
            buffer,
            slice_begin: 0,
            slice_end: len,
            cursor: 0,
            encoding,
        }
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    /// Absolute offset of the cursor within the backing buffer.
    pub fn absolute_position(&self) -> usize {
        self.cursor
    }

    /// Position of the cursor relative to this reader's own slice start.
    pub fn position(&self) -> usize {
        self.cursor - self.slice_begin
    }

    pub fn remaining(&self) -> usize {
        self.slice_end - self.cursor
    }

    pub fn len(&self) -> usize {
        self.slice_end - self.slice_begin
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sub_slice(&self) -> &[u8] {
        &self.buffer[self.slice_begin..self.slice_end]
    }

    fn check_absolute(&self, start: usize, n: usize) -> Result<usize> {
        let end = start.checked_add(n).ok_or(Error::EndOfBuffer {
            offset: start,
            requested: n,
            len: self.slice_end,
        })?;
        if start < self.slice_begin || end > self.slice_end {
            return Err(Error::EndOfBuffer {
                offset: start,
                requested: n,
                len: self.slice_end.saturating_sub(self.slice_begin),
            });
        }
        Ok(end)
    }

    /// Produces an independent cursor over `[cursor + additional_offset,
    /// cursor + additional_offset + length)` (or to the end of this
    /// reader's own slice, if `length` is `None`). The sub-range must lie
    /// within this reader's own slice.
    pub fn clone_at(&self, additional_offset: usize, length: Option<usize>) -> Result<ByteReader> {
        let start = self.cursor.checked_add(additional_offset).ok_or(Error::EndOfBuffer {
            offset: self.cursor,
            requested: additional_offset,
            len: self.slice_end,
        })?;
        let end = match length {
            Some(l) => self.check_absolute(start, l)?,
            None => {
                if start > self.slice_end {
                    return Err(Error::EndOfBuffer {
                        offset: start,
                        requested: 0,
                        len: self.slice_end,
                    });
                }
                self.slice_end
            }
        };
        if start < self.slice_begin {
            return Err(Error::EndOfBuffer {
                offset: start,
                requested: end - start,
                len: self.slice_end,
            });
        }
        Ok(ByteReader {
            buffer: Rc::clone(&self.buffer),
            slice_begin: start,
            slice_end: end,
            cursor: start,
            encoding: self.encoding,
        })
    }

    fn read_typed(&mut self, kind: FieldKind, unaligned: bool) -> Result<FieldValue> {
        let size = kind.size();
        if !unaligned && self.position() % size != 0 {
            return Err(Error::UnalignedRead {
                offset: self.cursor,
                size,
            });
        }
        let end = self.check_absolute(self.cursor, size)?;
        let rel = self.cursor - self.slice_begin;
        let slice = self.sub_slice();
        let value = match kind {
            FieldKind::U16 => FieldValue::U16(
                slice
                    .pread_with::<u16>(rel, scroll::LE)
                    .expect("bounds already checked"),
            ),
            FieldKind::U32 => FieldValue::U32(
                slice
                    .pread_with::<u32>(rel, scroll::LE)
                    .expect("bounds already checked"),
            ),
            FieldKind::I16 => FieldValue::I16(
                slice
                    .pread_with::<i16>(rel, scroll::LE)
                    .expect("bounds already checked"),
            ),
            FieldKind::I32 => FieldValue::I32(
                slice
                    .pread_with::<i32>(rel, scroll::LE)
                    .expect("bounds already checked"),
            ),
        };
        self.cursor = end;
        Ok(value)
    }

    pub fn read_uint16(&mut self, unaligned: bool) -> Result<u16> {
        match self.read_typed(FieldKind::U16, unaligned)? {
            FieldValue::U16(v) => Ok(v),
            _ => unreachable!(),
        }
    }

    pub fn read_uint32(&mut self, unaligned: bool) -> Result<u32> {
        match self.read_typed(FieldKind::U32, unaligned)? {
            FieldValue::U32(v) => Ok(v),
            _ => unreachable!(),
        }
    }

    pub fn read_int16(&mut self, unaligned: bool) -> Result<i16> {
        match self.read_typed(FieldKind::I16, unaligned)? {
            FieldValue::I16(v) => Ok(v),
            _ => unreachable!(),
        }
    }

    pub fn read_int32(&mut self, unaligned: bool) -> Result<i32> {
        match self.read_typed(FieldKind::I32, unaligned)? {
            FieldValue::I32(v) => Ok(v),
            _ => unreachable!(),
        }
    }

    /// A composite read equivalent to a sequence of primitive reads; all
    /// sub-reads are unaligned (no per-field alignment is enforced), and
    /// the cursor advances by the sum of the field sizes only if every
    /// field could be read.
    pub fn unpack(&mut self, fields: &[FieldKind]) -> Result<Vec<FieldValue>> {
        let total: usize = fields.iter().map(|f| f.size()).sum();
        self.check_absolute(self.cursor, total)?;
        let mut values = Vec::with_capacity(fields.len());
        for &field in fields {
            values.push(self.read_typed(field, true)?);
        }
        Ok(values)
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        let end = self.check_absolute(self.cursor, n)?;
        let rel = self.cursor - self.slice_begin;
        let bytes = self.sub_slice()[rel..rel + n].to_vec();
        self.cursor = end;
        Ok(bytes)
    }

    /// Reads `n` bytes at `off` (relative to this reader's slice start)
    /// without advancing the cursor.
    pub fn read_bytes_at(&self, off: usize, n: usize) -> Result<Vec<u8>> {
        let start = self.slice_begin.checked_add(off).ok_or(Error::EndOfBuffer {
            offset: off,
            requested: n,
            len: self.len(),
        })?;
        self.check_absolute(start, n)?;
        Ok(self.buffer[start..start + n].to_vec())
    }

    /// Reads up to `max` bytes (or the remainder of the slice, if `max` is
    /// `None`), truncating at the first zero byte. The cursor always
    /// advances by the number of bytes actually consumed (`max`, or the
    /// remainder), regardless of where the terminator fell — so a
    /// fixed-size name field is always fully consumed even when its
    /// content is shorter than the field.
    pub fn read_byte_string(&mut self, max: Option<usize>) -> Result<Vec<u8>> {
        let n = max.unwrap_or_else(|| self.remaining());
        let end = self.check_absolute(self.cursor, n)?;
        let rel = self.cursor - self.slice_begin;
        let raw = &self.sub_slice()[rel..rel + n];
        let terminator = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        let result = raw[..terminator].to_vec();
        self.cursor = end;
        Ok(result)
    }

    /// Reads a fixed-size, zero-terminated field and decodes it through
    /// this reader's configured code page.
    pub fn read_string(&mut self, max: usize) -> Result<String> {
        let bytes = self.read_byte_string(Some(max))?;
        let (text, _, had_errors) = self.encoding.decode(&bytes);
        if had_errors {
            return Err(Error::InvalidEncoding(format!("{:?}", bytes)));
        }
        Ok(text.into_owned())
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        let end = self.check_absolute(self.cursor, n)?;
        self.cursor = end;
        Ok(())
    }

    /// CRC-32 of `length` bytes (or the remainder, if `None`) starting at
    /// the cursor, folded to 16 bits by XOR of the high and low halves.
    /// Does not advance the cursor.
    pub fn crc16(&self, length: Option<usize>) -> Result<u16> {
        let n = length.unwrap_or_else(|| self.remaining());
        self.check_absolute(self.cursor, n)?;
        let rel = self.cursor - self.slice_begin;
        let bytes = &self.sub_slice()[rel..rel + n];
        Ok(crate::crc::fold16(crc32fast::hash(bytes)))
    }
}

impl std::fmt::Debug for ByteReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteReader")
            .field("slice_begin", &self.slice_begin)
            .field("slice_end", &self.slice_end)
            .field("cursor", &self.cursor)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(bytes: &[u8]) -> ByteReader {
        ByteReader::new(Rc::from(bytes), encoding_rs::WINDOWS_1252)
    }

    #[test]
    fn reads_little_endian_u16_u32() {
        let mut r = reader(&[0x01, 0x00, 0x02, 0x00, 0x00, 0x00]);
        assert_eq!(r.read_uint16(false).unwrap(), 1);
        assert_eq!(r.read_uint32(true).unwrap(), 2);
    }

    #[test]
    fn unaligned_read_fails_and_leaves_cursor() {
        let mut r = reader(&[0u8, 1, 2, 3, 4]);
        r.skip(1).unwrap();
        let before = r.absolute_position();
        assert!(matches!(
            r.read_uint16(false),
            Err(Error::UnalignedRead { .. })
        ));
        assert_eq!(r.absolute_position(), before);
    }

    #[test]
    fn clone_at_is_bounded_to_parent_slice() {
        let r = reader(&[0u8; 16]);
        let sub = r.clone_at(4, Some(8)).unwrap();
        assert_eq!(sub.len(), 8);
        assert!(r.clone_at(4, Some(100)).is_err());
    }

    #[test]
    fn read_byte_string_truncates_but_advances_full_width() {
        let mut r = reader(b"ab\0cdef");
        let s = r.read_byte_string(Some(5)).unwrap();
        assert_eq!(s, b"ab");
        assert_eq!(r.absolute_position(), 5);
    }

    #[test]
    fn read_byte_string_zero_at_last_position() {
        let mut r = reader(b"abcd\0");
        let s = r.read_byte_string(Some(5)).unwrap();
        assert_eq!(s, b"abcd");
        assert_eq!(r.absolute_position(), 5);
    }

    #[test]
    fn crc16_does_not_advance() {
        let r = reader(b"hello world");
        let before = r.absolute_position();
        let _ = r.crc16(Some(5)).unwrap();
        assert_eq!(r.absolute_position(), before);
    }
}
