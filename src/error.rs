//! Error kinds for the decoder and reconstruction layers.
//!
//! One variant per failure kind named in the error-handling design
//! (record/byte-reader bounds checks, CRC mismatches, unknown records or
//! actions, dangling offsets), plus the ambient I/O and text-decoding
//! failures that sit below the core decoder.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("file not found: {0}")]
    VssFileNotFound(PathBuf),

    #[error("read of {requested} bytes at offset {offset} exceeds buffer of {len} bytes")]
    EndOfBuffer {
        offset: usize,
        requested: usize,
        len: usize,
    },

    #[error("unaligned read of {size} bytes at offset {offset}")]
    UnalignedRead { offset: usize, size: usize },

    #[error("record at offset {offset:#x}: CRC mismatch (header {header_crc:#06x}, computed {computed_crc:#06x})")]
    RecordCrcMismatch {
        offset: usize,
        header_crc: u16,
        computed_crc: u16,
    },

    #[error("record at offset {offset:#x}: length {length} exceeds remaining file size {remaining}")]
    RecordTruncated {
        offset: usize,
        length: usize,
        remaining: usize,
    },

    #[error("unrecognized record signature {signature:?} at offset {offset:#x}")]
    UnrecognizedRecord { offset: usize, signature: [u8; 2] },

    #[error("unknown revision action code {action} at offset {offset:#x}")]
    UnknownRevisionAction { offset: usize, action: u16 },

    #[error("record at offset {offset:#x} has class {actual}, expected {expected}")]
    WrongRecordClass {
        offset: usize,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("version {version} is out of range (known range {min}..={max})")]
    ArgumentOutOfRange { version: i32, min: i32, max: i32 },

    #[error("delta operation out of bounds: {0}")]
    DeltaOutOfBounds(String),

    #[error("{0} is not valid in the configured code page")]
    InvalidEncoding(String),

    #[error("malformed: {0}")]
    Malformed(String),
}

pub type Result<T> = std::result::Result<T, Error>;
