//! Item files: a fixed-layout header followed by the project or file's own
//! record stream (Component H, shared half). [`project`] builds the
//! directory-state half (§4.8); [`file`] drives the delta reconstruction
//! half (§4.9, §4.4).

pub mod file;
pub mod project;

use std::rc::Rc;

use encoding_rs::Encoding;

use crate::byte_reader::ByteReader;
use crate::error::Result;
use crate::fullname::{PhysicalName, SIZEOF_PHYSICAL_NAME};
use crate::options::ParseOptions;
use crate::record::{Record, RecordClass};
use crate::record_file::RecordFile;

/// `{item-type flags, latest revision, data-file extension letter,
/// first/last revision offsets, branch-parent reference, containing-
/// project link, child count, first log offset}` (spec.md §3): project
/// headers only populate the last two, file headers only populate
/// `branch_parent` and `first_project_offset`.
pub const SIZEOF_ITEM_HEADER: usize = 36;

/// Bit flags carried in the item header, mirrored by [`ItemFile`]'s
/// per-kind flag accessors (spec.md §4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemFlags(pub u16);

impl ItemFlags {
    pub const LOCKED: u16 = 0x0001;
    pub const BINARY: u16 = 0x0002;
    pub const LATEST_ONLY: u16 = 0x0004;
    pub const SHARED: u16 = 0x0008;
    pub const CHECKED_OUT: u16 = 0x0010;

    pub fn locked(self) -> bool {
        self.0 & Self::LOCKED != 0
    }
    pub fn binary(self) -> bool {
        self.0 & Self::BINARY != 0
    }
    pub fn latest_only(self) -> bool {
        self.0 & Self::LATEST_ONLY != 0
    }
    pub fn shared(self) -> bool {
        self.0 & Self::SHARED != 0
    }
    pub fn checked_out(self) -> bool {
        self.0 & Self::CHECKED_OUT != 0
    }
}

#[derive(Debug, Clone)]
pub struct ItemHeader {
    pub flags: ItemFlags,
    pub latest_revision: i32,
    /// The letter of the current data (content) file; e.g. `b'A'`.
    pub data_ext: u8,
    pub first_revision_offset: u32,
    pub last_revision_offset: u32,
    /// Files only: zero when the file has no branch parent.
    pub branch_parent: PhysicalName,
    /// Files only: offset of the first project-backlink record in this
    /// file's own record stream (the head of the `prev_project_offset`
    /// linked list), zero when absent.
    pub first_project_offset: u32,
    /// Projects only.
    pub child_count: u32,
    /// Projects only: offset of the first revision record, redundant
    /// with `first_revision_offset` but kept distinct per spec.md §3.
    pub first_log_offset: u32,
}

impl ItemHeader {
    pub fn parse(reader: &mut ByteReader) -> Result<ItemHeader> {
        let flags = ItemFlags(reader.read_uint16(true)?);
        let latest_revision = reader.read_int32(true)?;
        let data_ext = reader.read_bytes(1)?[0];
        let _reserved = reader.read_bytes(1)?;
        let first_revision_offset = reader.read_uint32(true)?;
        let last_revision_offset = reader.read_uint32(true)?;
        let branch_parent = PhysicalName::from_bytes(&reader.read_bytes(SIZEOF_PHYSICAL_NAME)?)?;
        let first_project_offset = reader.read_uint32(true)?;
        let child_count = reader.read_uint32(true)?;
        let first_log_offset = reader.read_uint32(true)?;
        Ok(ItemHeader {
            flags,
            latest_revision,
            data_ext,
            first_revision_offset,
            last_revision_offset,
            branch_parent,
            first_project_offset,
            child_count,
            first_log_offset,
        })
    }

    pub fn has_branch_parent(&self) -> bool {
        !self.branch_parent.is_zero()
    }
}

/// An opened item file: the parsed header plus the loaded record stream
/// that follows it. Shared by [`project::ProjectItem`] and
/// [`file::FileItem`].
pub struct ItemFile {
    pub physical_name: PhysicalName,
    pub header: ItemHeader,
    pub records: RecordFile,
    pub encoding: &'static Encoding,
    pub options: ParseOptions,
}

impl ItemFile {
    pub fn open(
        physical_name: PhysicalName,
        bytes: Rc<[u8]>,
        options: ParseOptions,
        encoding: &'static Encoding,
    ) -> Result<ItemFile> {
        let records = RecordFile::new(bytes, options, encoding);
        let mut header_reader = records.raw_header(SIZEOF_ITEM_HEADER)?;
        let header = ItemHeader::parse(&mut header_reader)?;
        Ok(ItemFile {
            physical_name,
            header,
            records,
            encoding,
            options,
        })
    }

    /// Every revision record in this item file, in file order (which,
    /// per invariant 4, is also strictly increasing revision-number
    /// order).
    pub fn revisions(&self) -> Result<Vec<(usize, Rc<Record>)>> {
        let all = self
            .records
            .read_all_records(SIZEOF_ITEM_HEADER, None)?;
        Ok(all
            .into_iter()
            .filter(|(_, r)| matches!(r.as_ref(), Record::Revision(_)))
            .collect())
    }

    /// Every project-backlink record, walking `prev_project_offset` to
    /// completion (§8 scenario S6). Files only; empty for projects (and
    /// for files with no backlink).
    pub fn project_backlinks(&self) -> Result<Vec<PhysicalName>> {
        let mut out = Vec::new();
        let mut offset = self.header.first_project_offset as usize;
        while offset != 0 {
            let record = self
                .records
                .get_record(offset, Some(RecordClass::Project))?;
            let payload = record.as_project().expect("checked RecordClass::Project");
            out.push(payload.parent_physical_name);
            offset = payload.prev_project_offset as usize;
        }
        Ok(out)
    }

    /// Resolves a comment string at `offset` (0 means absent), per
    /// spec.md §4.3's `comment_offset`/`label_comment_offset` cross-links.
    pub fn resolve_comment(&self, offset: u32) -> Result<Option<String>> {
        if offset == 0 {
            return Ok(None);
        }
        let record = self
            .records
            .get_record(offset as usize, Some(RecordClass::Comment))?;
        let payload = record.as_comment().expect("checked RecordClass::Comment");
        let (text, _, had_errors) = self.encoding.decode(&payload.text);
        if had_errors {
            return Err(crate::error::Error::InvalidEncoding(format!(
                "{:?}",
                payload.text
            )));
        }
        Ok(Some(text.into_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project_record(parent: &str, prev_project_offset: u32) -> Vec<u8> {
        let mut payload = Vec::new();
        payload.extend_from_slice(parent.as_bytes());
        payload.extend_from_slice(&prev_project_offset.to_le_bytes());
        let mut rec = Vec::new();
        rec.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        rec.push(b'F');
        rec.push(b'P');
        let crc = crate::crc::crc16(&payload);
        rec.extend_from_slice(&crc.to_le_bytes());
        rec.extend_from_slice(&payload);
        rec
    }

    fn header_bytes(first_project_offset: u32) -> Vec<u8> {
        let mut h = Vec::new();
        h.extend_from_slice(&0u16.to_le_bytes()); // flags
        h.extend_from_slice(&1i32.to_le_bytes()); // latest_revision
        h.push(b'A'); // data_ext
        h.push(0); // reserved
        h.extend_from_slice(&0u32.to_le_bytes()); // first_revision_offset
        h.extend_from_slice(&0u32.to_le_bytes()); // last_revision_offset
        h.extend_from_slice(&[0u8; 8]); // branch_parent
        h.extend_from_slice(&first_project_offset.to_le_bytes());
        h.extend_from_slice(&0u32.to_le_bytes()); // child_count
        h.extend_from_slice(&0u32.to_le_bytes()); // first_log_offset
        h
    }

    /// Two project-backlink records chained through `prev_project_offset`,
    /// enumerated head-first (spec.md §8 S6: a shared file lists every
    /// containing project, in link-list order).
    #[test]
    fn project_backlinks_walks_the_full_chain() {
        let older = project_record("BBBBBBBB", 0);
        let older_offset = SIZEOF_ITEM_HEADER as u32;
        let newer = project_record("AAAAAAAA", older_offset);
        let newer_offset = older_offset + older.len() as u32;

        let mut bytes = header_bytes(newer_offset);
        bytes.extend_from_slice(&older);
        bytes.extend_from_slice(&newer);

        let item = ItemFile::open(
            PhysicalName::from_str("CCCCCCCC").unwrap(),
            Rc::from(bytes.into_boxed_slice()),
            ParseOptions::default(),
            encoding_rs::WINDOWS_1252,
        )
        .unwrap();

        let backlinks = item.project_backlinks().unwrap();
        let names: Vec<String> = backlinks.iter().map(|p| p.to_string()).collect();
        assert_eq!(names, vec!["AAAAAAAA", "BBBBBBBB"]);
    }
}
