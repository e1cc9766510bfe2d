//! Indexed read access to the overflow-names file (`names.dat`): one
//! self-describing name record per overflow entry, looked up by offset.

use std::rc::Rc;

use encoding_rs::Encoding;

use crate::error::Result;
use crate::fullname::VssName;
use crate::options::ParseOptions;
use crate::record::payload::NameKind;
use crate::record::{Record, RecordClass};
use crate::record_file::RecordFile;

pub struct NameFile {
    records: RecordFile,
}

impl NameFile {
    pub fn new(bytes: Rc<[u8]>, options: ParseOptions, encoding: &'static Encoding) -> NameFile {
        NameFile {
            records: RecordFile::new(bytes, options, encoding),
        }
    }

    pub fn get_name_record(&self, offset: usize) -> Result<Rc<Record>> {
        self.records.get_record(offset, Some(RecordClass::Name))
    }

    /// Either the inline short name (when `name_offset == 0`) or the
    /// authoritative long name from the referenced name record, falling
    /// back to the short name if the record lacks a `Long` entry.
    pub fn get_long_name(&self, name: &VssName, encoding: &'static Encoding) -> Result<String> {
        if !name.has_overflow() {
            return name.short_name_string(encoding);
        }
        let record = self.get_name_record(name.name_offset as usize)?;
        let payload = record
            .as_name()
            .expect("get_record checked RecordClass::Name");
        match payload.get(NameKind::Long) {
            Some(text) => Ok(text.to_string()),
            None => name.short_name_string(encoding),
        }
    }
}
