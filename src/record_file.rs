//! Loads an entire item file (or the names file) into memory once, then
//! hands out decoded records by offset through a cache shared by every
//! caller that references the same offset.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use encoding_rs::Encoding;

use crate::byte_reader::ByteReader;
use crate::error::{Error, Result};
use crate::options::ParseOptions;
use crate::record::{self, Record, RecordClass, RecordHeader};

struct CacheEntry {
    header: RecordHeader,
    record: Option<Rc<Record>>,
}

pub struct RecordFile {
    root: ByteReader,
    cache: RefCell<HashMap<usize, Rc<CacheEntry>>>,
    options: ParseOptions,
    encoding: &'static Encoding,
}

impl RecordFile {
    pub fn new(bytes: Rc<[u8]>, options: ParseOptions, encoding: &'static Encoding) -> RecordFile {
        RecordFile {
            root: ByteReader::new(bytes, encoding),
            cache: RefCell::new(HashMap::new()),
            options,
            encoding,
        }
    }

    pub fn len(&self) -> usize {
        self.root.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// A non-advancing cursor over the file's first `len` bytes, for
    /// parsing a fixed-layout header that precedes the record stream.
    pub fn raw_header(&self, len: usize) -> Result<ByteReader> {
        self.root.clone_at(0, Some(len))
    }

    fn load(&self, offset: usize) -> Result<Rc<CacheEntry>> {
        if let Some(entry) = self.cache.borrow().get(&offset) {
            return Ok(Rc::clone(entry));
        }
        let mut at = self.root.clone_at(offset, None)?;
        let (header, mut payload) =
            record::header::read_header_and_payload(&mut at, self.options.lenient_crc)?;
        let decoded = record::decode(&header, &mut payload, offset, &self.options, self.encoding)?;
        let entry = Rc::new(CacheEntry {
            header,
            record: decoded.map(Rc::new),
        });
        self.cache.borrow_mut().insert(offset, Rc::clone(&entry));
        Ok(entry)
    }

    /// Parses one record at `offset`, memoizing it by offset. Returns
    /// `None` if the record was skipped under a permissive
    /// [`ParseOptions`] (unrecognized signature or unknown revision
    /// action).
    pub fn read_record(&self, offset: usize) -> Result<Option<Rc<Record>>> {
        Ok(self.load(offset)?.record.clone())
    }

    /// Cache lookup with an optional class check.
    pub fn get_record(&self, offset: usize, expected_class: Option<RecordClass>) -> Result<Rc<Record>> {
        let entry = self.load(offset)?;
        let record = entry.record.clone().ok_or_else(|| {
            Error::Malformed(format!(
                "record at offset {offset:#x} was skipped (unrecognized signature or unknown action)"
            ))
        })?;
        if let Some(expected) = expected_class {
            let actual = record.class();
            if actual != expected {
                return Err(Error::WrongRecordClass {
                    offset,
                    expected: expected.name(),
                    actual: actual.name(),
                });
            }
        }
        Ok(record)
    }

    /// Walks `[begin, end)` (default the whole file) sequentially,
    /// populating the offset cache, and returns the records in file
    /// order. Skipped records do not appear in the result but their
    /// bytes are still consumed when advancing to the next record.
    pub fn read_all_records(&self, begin: usize, end: Option<usize>) -> Result<Vec<(usize, Rc<Record>)>> {
        let stop = end.unwrap_or_else(|| self.len());
        let mut offset = begin;
        let mut out = Vec::new();
        while offset < stop {
            let entry = self.load(offset)?;
            let total_len = 8 + entry.header.length as usize;
            if let Some(record) = &entry.record {
                out.push((offset, Rc::clone(record)));
            }
            offset += total_len;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment_record(text: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(text.len() as u32).to_le_bytes());
        bytes.push(b'M');
        bytes.push(b'C');
        bytes.extend_from_slice(&0xFFFFu16.to_le_bytes());
        bytes.extend_from_slice(text);
        bytes
    }

    #[test]
    fn read_all_records_walks_sequentially_and_caches() {
        let mut bytes = comment_record(b"first\0");
        bytes.extend(comment_record(b"second\0"));
        let file = RecordFile::new(Rc::from(bytes.as_slice()), ParseOptions::default(), encoding_rs::WINDOWS_1252);
        let all = file.read_all_records(0, None).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].1.as_comment().unwrap().text, b"first");
        assert_eq!(all[1].1.as_comment().unwrap().text, b"second");

        let cached = file.get_record(all[1].0, Some(RecordClass::Comment)).unwrap();
        assert!(Rc::ptr_eq(&cached, &all[1].1));
    }

    #[test]
    fn get_record_with_wrong_class_fails() {
        let bytes = comment_record(b"x\0");
        let file = RecordFile::new(Rc::from(bytes.as_slice()), ParseOptions::default(), encoding_rs::WINDOWS_1252);
        assert!(matches!(
            file.get_record(0, Some(RecordClass::Delta)),
            Err(Error::WrongRecordClass { .. })
        ));
    }
}
