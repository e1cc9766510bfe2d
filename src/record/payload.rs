//! Typed payload decoders for the non-revision record kinds: comment,
//! checkout, project backlink, branch parent, delta, and name-file name
//! records. Revision payloads live in [`crate::record::revision`].

use crate::byte_reader::ByteReader;
use crate::error::{Error, Result};
use crate::fullname::{PhysicalName, SIZEOF_PHYSICAL_NAME};

pub const SIZEOF_PROJECT_PATH: usize = 260;
pub const SIZEOF_USERNAME: usize = 32;
pub const SIZEOF_MACHINE: usize = 32;

/// A zero-terminated comment body. `crc == 0` on the record header for
/// this signature is never validated.
#[derive(Debug, Clone)]
pub struct CommentPayload {
    pub text: Vec<u8>,
}

impl CommentPayload {
    pub fn parse(reader: &mut ByteReader) -> Result<CommentPayload> {
        let text = reader.read_byte_string(None)?;
        Ok(CommentPayload { text })
    }
}

/// A checkout lock: which project path, which user, when, at what revision.
#[derive(Debug, Clone)]
pub struct CheckoutPayload {
    pub project_path: String,
    pub user: String,
    pub timestamp: u32,
    pub revision_num: i32,
    pub machine: String,
    pub comment_file_offset: u32,
    pub flags: u16,
}

impl CheckoutPayload {
    pub fn parse(reader: &mut ByteReader) -> Result<CheckoutPayload> {
        Ok(CheckoutPayload {
            project_path: reader.read_string(SIZEOF_PROJECT_PATH)?,
            user: reader.read_string(SIZEOF_USERNAME)?,
            timestamp: reader.read_uint32(true)?,
            revision_num: reader.read_int32(true)?,
            machine: reader.read_string(SIZEOF_MACHINE)?,
            comment_file_offset: reader.read_uint32(true)?,
            flags: reader.read_uint16(true)?,
        })
    }
}

/// A file's backlink to one containing project. Files may carry several
/// of these, chained through `prev_project_offset`.
#[derive(Debug, Clone)]
pub struct ProjectPayload {
    pub parent_physical_name: PhysicalName,
    pub prev_project_offset: u32,
}

impl ProjectPayload {
    pub fn parse(reader: &mut ByteReader) -> Result<ProjectPayload> {
        let parent = reader.read_bytes(SIZEOF_PHYSICAL_NAME)?;
        Ok(ProjectPayload {
            parent_physical_name: PhysicalName::from_bytes(&parent)?,
            prev_project_offset: reader.read_uint32(true)?,
        })
    }
}

/// A file's link to its branch parent.
#[derive(Debug, Clone)]
pub struct BranchPayload {
    pub parent_physical_name: PhysicalName,
    pub prev_branch_offset: u32,
}

impl BranchPayload {
    pub fn parse(reader: &mut ByteReader) -> Result<BranchPayload> {
        let parent = reader.read_bytes(SIZEOF_PHYSICAL_NAME)?;
        Ok(BranchPayload {
            parent_physical_name: PhysicalName::from_bytes(&parent)?,
            prev_branch_offset: reader.read_uint32(true)?,
        })
    }
}

/// One delta operation: `op_code` selects whether `size` bytes come from
/// the delta record's own inline data (`WriteLog`) or from the later
/// revision's content (`WriteSuccessor`); `Stop` ends the sequence.
///
/// This crate pins the operation-code mapping to `WriteLog = 0`,
/// `WriteSuccessor = 1`, `Stop = 2`; other VSS variants are documented to
/// use a different mapping, which this crate does not attempt to detect
/// or support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaOpCode {
    WriteLog,
    WriteSuccessor,
    Stop,
}

impl DeltaOpCode {
    fn from_code(code: u16) -> Option<DeltaOpCode> {
        match code {
            0 => Some(DeltaOpCode::WriteLog),
            1 => Some(DeltaOpCode::WriteSuccessor),
            2 => Some(DeltaOpCode::Stop),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DeltaOp {
    pub code: DeltaOpCode,
    pub size: u32,
    pub offset: u32,
}

/// A chain of copy operations that, applied to the later revision's
/// content, produce the prior revision's content. `log_data` is the
/// inline byte region `WriteLog` operations copy from.
#[derive(Debug, Clone)]
pub struct DeltaPayload {
    pub ops: Vec<DeltaOp>,
    pub log_data: Vec<u8>,
}

const SIZEOF_DELTA_OP: usize = 2 + 4 + 4;

impl DeltaPayload {
    pub fn parse(reader: &mut ByteReader) -> Result<DeltaPayload> {
        let mut ops = Vec::new();
        loop {
            if reader.remaining() < SIZEOF_DELTA_OP {
                return Err(Error::Malformed(
                    "delta record ended before a Stop operation".into(),
                ));
            }
            let op_code = reader.read_uint16(true)?;
            let size = reader.read_uint32(true)?;
            let offset = reader.read_uint32(true)?;
            let code = DeltaOpCode::from_code(op_code).ok_or_else(|| {
                Error::Malformed(format!("unknown delta op code {op_code}"))
            })?;
            let stop = code == DeltaOpCode::Stop;
            ops.push(DeltaOp { code, size, offset });
            if stop {
                break;
            }
        }
        let log_data = reader.read_bytes(reader.remaining())?;
        Ok(DeltaPayload { ops, log_data })
    }
}

/// One entry in a names-file record: an inline alternate-name string,
/// tagged with a `kind` distinguishing e.g. the "short" vs. "long" variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    Short,
    Long,
    /// Reserved for variants this crate doesn't specifically interpret;
    /// carried through so `NamePayload::get` can still look them up.
    Other(u16),
}

impl NameKind {
    fn from_code(code: u16) -> NameKind {
        match code {
            1 => NameKind::Short,
            2 => NameKind::Long,
            other => NameKind::Other(other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NameEntry {
    pub kind: NameKind,
    pub text: String,
}

/// A self-describing name record in `names.dat`: a small table of
/// `(kind, offset)` pointers into the record's own inline string blob.
#[derive(Debug, Clone)]
pub struct NamePayload {
    pub entries: Vec<NameEntry>,
}

impl NamePayload {
    pub fn parse(reader: &mut ByteReader, encoding: &'static encoding_rs::Encoding) -> Result<NamePayload> {
        let count = reader.read_uint16(true)? as usize;
        let mut pointers = Vec::with_capacity(count);
        for _ in 0..count {
            let kind = reader.read_uint16(true)?;
            let offset = reader.read_uint32(true)?;
            pointers.push((NameKind::from_code(kind), offset as usize));
        }
        let blob = reader.read_bytes(reader.remaining())?;
        let mut entries = Vec::with_capacity(pointers.len());
        for (kind, offset) in pointers {
            if offset > blob.len() {
                return Err(Error::Malformed(format!(
                    "name entry offset {offset} exceeds blob of {} bytes",
                    blob.len()
                )));
            }
            let end = blob[offset..]
                .iter()
                .position(|&b| b == 0)
                .map(|p| offset + p)
                .unwrap_or(blob.len());
            let (text, _, had_errors) = encoding.decode(&blob[offset..end]);
            if had_errors {
                return Err(Error::InvalidEncoding(format!("{:?}", &blob[offset..end])));
            }
            entries.push(NameEntry {
                kind,
                text: text.into_owned(),
            });
        }
        Ok(NamePayload { entries })
    }

    pub fn get(&self, kind: NameKind) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.kind == kind)
            .map(|e| e.text.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn reader(bytes: Vec<u8>) -> ByteReader {
        ByteReader::new(Rc::from(bytes.into_boxed_slice()), encoding_rs::WINDOWS_1252)
    }

    #[test]
    fn comment_reads_to_first_zero() {
        let mut r = reader(b"hello\0garbage".to_vec());
        let c = CommentPayload::parse(&mut r).unwrap();
        assert_eq!(c.text, b"hello");
    }

    #[test]
    fn delta_identity_op_stream() {
        let mut bytes = Vec::new();
        // WriteSuccessor(11, 0)
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&11u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        // Stop
        bytes.extend_from_slice(&2u16.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        let mut r = reader(bytes);
        let delta = DeltaPayload::parse(&mut r).unwrap();
        assert_eq!(delta.ops.len(), 2);
        assert_eq!(delta.ops[0].code, DeltaOpCode::WriteSuccessor);
        assert_eq!(delta.ops[1].code, DeltaOpCode::Stop);
        assert!(delta.log_data.is_empty());
    }

    #[test]
    fn name_payload_falls_back_gracefully_when_kind_missing() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1u16.to_le_bytes()); // count
        bytes.extend_from_slice(&1u16.to_le_bytes()); // kind = Short
        bytes.extend_from_slice(&0u32.to_le_bytes()); // offset
        bytes.extend_from_slice(b"shortname\0");
        let mut r = reader(bytes);
        let payload = NamePayload::parse(&mut r, encoding_rs::WINDOWS_1252).unwrap();
        assert_eq!(payload.get(NameKind::Short), Some("shortname"));
        assert_eq!(payload.get(NameKind::Long), None);
    }
}
