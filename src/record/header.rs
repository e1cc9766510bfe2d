//! The 8-byte record header shared by every record in an item file or the
//! names file: a payload length, a reversed-byte signature, and a folded
//! CRC-32.

use crate::byte_reader::ByteReader;
use crate::crc;
use crate::error::{Error, Result};

/// Comment records store `crc == 0` and are exempt from CRC validation.
pub const COMMENT_SIGNATURE: [u8; 2] = *b"CM";

#[derive(Debug, Clone, Copy)]
pub struct RecordHeader {
    /// Absolute offset of the first header byte within the item file.
    pub offset: usize,
    pub length: u32,
    /// Signature in its C-literal reading order (already un-reversed from
    /// the on-disk byte order).
    pub signature: [u8; 2],
    pub crc: u16,
}

impl RecordHeader {
    pub fn signature_str(&self) -> String {
        String::from_utf8_lossy(&self.signature).into_owned()
    }
}

/// Reads an 8-byte header from `reader`'s current cursor and clones a
/// payload reader over the following `length` bytes. `reader` must be
/// positioned at the start of the record; on return its cursor sits at
/// the start of the payload (equivalently, the start of the next
/// record's header once the caller skips past the payload).
pub fn read_header_and_payload(
    reader: &mut ByteReader,
    lenient_crc: bool,
) -> Result<(RecordHeader, ByteReader)> {
    let offset = reader.absolute_position();
    let length = reader.read_uint32(true)?;
    let disk_signature = reader.read_bytes(2)?;
    let signature = [disk_signature[1], disk_signature[0]];
    let header_crc = reader.read_uint16(true)?;

    let remaining = reader.remaining();
    if length as usize > remaining {
        return Err(Error::RecordTruncated {
            offset,
            length: length as usize,
            remaining,
        });
    }

    let payload = reader.clone_at(0, Some(length as usize))?;
    reader.skip(length as usize)?;

    let header = RecordHeader {
        offset,
        length,
        signature,
        crc: header_crc,
    };
    validate_crc(&header, &payload, lenient_crc)?;
    Ok((header, payload))
}

/// Validates the header's CRC against the payload, per the comment
/// exemption. When `lenient` is set, a mismatch is logged rather than
/// returned as an error.
pub fn validate_crc(header: &RecordHeader, payload: &ByteReader, lenient: bool) -> Result<()> {
    if header.signature == COMMENT_SIGNATURE {
        return Ok(());
    }
    let computed = crc::crc16(&payload.read_bytes_at(0, payload.len())?);
    if computed != header.crc {
        if lenient {
            log::warn!(
                "record at offset {:#x}: CRC mismatch (header {:#06x}, computed {:#06x}), continuing",
                header.offset,
                header.crc,
                computed
            );
            return Ok(());
        }
        return Err(Error::RecordCrcMismatch {
            offset: header.offset,
            header_crc: header.crc,
            computed_crc: computed,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn header_bytes(signature: [u8; 2], payload: &[u8], crc_override: Option<u16>) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        // disk order is the reverse of the logical signature.
        bytes.push(signature[1]);
        bytes.push(signature[0]);
        let crc = crc_override.unwrap_or_else(|| crc::crc16(payload));
        bytes.extend_from_slice(&crc.to_le_bytes());
        bytes.extend_from_slice(payload);
        bytes
    }

    #[test]
    fn reads_header_and_validates_crc() {
        let bytes = header_bytes(*b"NM", b"hello", None);
        let mut r = ByteReader::new(Rc::from(bytes.as_slice()), encoding_rs::WINDOWS_1252);
        let (header, payload) = read_header_and_payload(&mut r, false).unwrap();
        assert_eq!(header.signature, *b"NM");
        assert_eq!(payload.len(), 5);
    }

    #[test]
    fn comment_crc_is_not_checked() {
        let bytes = header_bytes(COMMENT_SIGNATURE, b"whatever", Some(0xFFFF));
        let mut r = ByteReader::new(Rc::from(bytes.as_slice()), encoding_rs::WINDOWS_1252);
        assert!(read_header_and_payload(&mut r, false).is_ok());
    }

    #[test]
    fn truncated_length_fails() {
        let mut bytes = header_bytes(*b"NM", b"hello", None);
        // Claim one extra byte of payload than actually present.
        let len_field = bytes[0..4].to_vec();
        let mut len = u32::from_le_bytes([len_field[0], len_field[1], len_field[2], len_field[3]]);
        len += 1;
        bytes[0..4].copy_from_slice(&len.to_le_bytes());
        let mut r = ByteReader::new(Rc::from(bytes.as_slice()), encoding_rs::WINDOWS_1252);
        assert!(matches!(
            read_header_and_payload(&mut r, false),
            Err(Error::RecordTruncated { .. })
        ));
    }

    #[test]
    fn crc_mismatch_fails_by_default() {
        let bytes = header_bytes(*b"NM", b"hello", Some(0x0000));
        let mut r = ByteReader::new(Rc::from(bytes.as_slice()), encoding_rs::WINDOWS_1252);
        assert!(matches!(
            read_header_and_payload(&mut r, false),
            Err(Error::RecordCrcMismatch { .. })
        ));
    }
}
