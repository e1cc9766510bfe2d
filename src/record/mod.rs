//! Typed, CRC-validated records sharing an 8-byte header plus a
//! record-specific payload. [`decode`] is the record-class factory: given
//! a header and its payload reader, it picks the payload decoder by
//! signature.

pub mod header;
pub mod payload;
pub mod revision;

use encoding_rs::Encoding;

pub use header::RecordHeader;
use payload::{BranchPayload, CheckoutPayload, CommentPayload, DeltaPayload, NamePayload, ProjectPayload};
use revision::RevisionPayload;

use crate::byte_reader::ByteReader;
use crate::error::{Error, Result};
use crate::options::ParseOptions;

pub const SIG_COMMENT: [u8; 2] = header::COMMENT_SIGNATURE;
pub const SIG_CHECKOUT: [u8; 2] = *b"CO";
pub const SIG_PROJECT: [u8; 2] = *b"PF";
pub const SIG_BRANCH: [u8; 2] = *b"BF";
pub const SIG_DELTA: [u8; 2] = *b"FD";
pub const SIG_REVISION: [u8; 2] = *b"EL";
pub const SIG_NAME: [u8; 2] = *b"NM";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordClass {
    Comment,
    Checkout,
    Project,
    Branch,
    Delta,
    Revision,
    Name,
}

impl RecordClass {
    pub fn name(self) -> &'static str {
        match self {
            RecordClass::Comment => "comment",
            RecordClass::Checkout => "checkout",
            RecordClass::Project => "project",
            RecordClass::Branch => "branch",
            RecordClass::Delta => "delta",
            RecordClass::Revision => "revision",
            RecordClass::Name => "name",
        }
    }
}

/// A fully decoded record: the header's signature determines which
/// variant carries the payload.
#[derive(Debug, Clone)]
pub enum Record {
    Comment(CommentPayload),
    Checkout(CheckoutPayload),
    Project(ProjectPayload),
    Branch(BranchPayload),
    Delta(DeltaPayload),
    Revision(RevisionPayload),
    Name(NamePayload),
}

impl Record {
    pub fn class(&self) -> RecordClass {
        match self {
            Record::Comment(_) => RecordClass::Comment,
            Record::Checkout(_) => RecordClass::Checkout,
            Record::Project(_) => RecordClass::Project,
            Record::Branch(_) => RecordClass::Branch,
            Record::Delta(_) => RecordClass::Delta,
            Record::Revision(_) => RecordClass::Revision,
            Record::Name(_) => RecordClass::Name,
        }
    }

    pub fn as_revision(&self) -> Option<&RevisionPayload> {
        match self {
            Record::Revision(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_delta(&self) -> Option<&DeltaPayload> {
        match self {
            Record::Delta(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_project(&self) -> Option<&ProjectPayload> {
        match self {
            Record::Project(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_branch(&self) -> Option<&BranchPayload> {
        match self {
            Record::Branch(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&NamePayload> {
        match self {
            Record::Name(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_comment(&self) -> Option<&CommentPayload> {
        match self {
            Record::Comment(c) => Some(c),
            _ => None,
        }
    }
}

/// Decodes one record's payload given its already-validated header.
/// Returns `Ok(None)` when the record should be skipped (an unrecognized
/// signature or unknown revision action under a permissive
/// [`ParseOptions`]) rather than treated as an error.
pub fn decode(
    header: &RecordHeader,
    payload: &mut ByteReader,
    offset: usize,
    options: &ParseOptions,
    encoding: &'static Encoding,
) -> Result<Option<Record>> {
    let record = match header.signature {
        SIG_COMMENT => Record::Comment(CommentPayload::parse(payload)?),
        SIG_CHECKOUT => Record::Checkout(CheckoutPayload::parse(payload)?),
        SIG_PROJECT => Record::Project(ProjectPayload::parse(payload)?),
        SIG_BRANCH => Record::Branch(BranchPayload::parse(payload)?),
        SIG_DELTA => Record::Delta(DeltaPayload::parse(payload)?),
        SIG_NAME => Record::Name(NamePayload::parse(payload, encoding)?),
        SIG_REVISION => match RevisionPayload::parse(payload, offset, options)? {
            Some(revision) => Record::Revision(revision),
            None => return Ok(None),
        },
        other => {
            if options.ignore_unknown_records {
                log::warn!("unrecognized record signature {other:?} at offset {offset:#x}, skipping");
                return Ok(None);
            }
            return Err(Error::UnrecognizedRecord {
                offset,
                signature: other,
            });
        }
    };
    Ok(Some(record))
}
