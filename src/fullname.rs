//! Name types shared across the record and item-file layers: the on-disk
//! `PhysicalName` identifier, the compact embedded `VssName`, and the
//! `FullName` triple a project's directory state sorts on.

use std::cmp::Ordering;

use encoding_rs::Encoding;

use crate::error::{Error, Result};

pub const SIZEOF_PHYSICAL_NAME: usize = 8;
pub const SIZEOF_SHORT_NAME: usize = 34;
pub const SIZEOF_VSS_NAME: usize = 2 + SIZEOF_SHORT_NAME + 4;

/// An 8-uppercase-character identifier assigned by VSS to every project and
/// file. Its first character names the single-letter bucket subdirectory
/// beneath the data root.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PhysicalName(pub [u8; SIZEOF_PHYSICAL_NAME]);

impl PhysicalName {
    pub const ROOT: PhysicalName = PhysicalName(*b"AAAAAAAA");

    pub fn from_bytes(bytes: &[u8]) -> Result<PhysicalName> {
        if bytes.len() != SIZEOF_PHYSICAL_NAME {
            return Err(Error::Malformed(format!(
                "physical name must be {SIZEOF_PHYSICAL_NAME} bytes, got {}",
                bytes.len()
            )));
        }
        let mut buf = [0u8; SIZEOF_PHYSICAL_NAME];
        buf.copy_from_slice(bytes);
        Ok(PhysicalName(buf))
    }

    pub fn from_str(name: &str) -> Result<PhysicalName> {
        Self::from_bytes(name.as_bytes())
    }

    /// The bucket subdirectory this name's data file lives under: the
    /// lowercased first character.
    pub fn bucket(&self) -> char {
        (self.0[0] as char).to_ascii_lowercase()
    }

    pub fn as_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; SIZEOF_PHYSICAL_NAME]
    }
}

impl std::fmt::Debug for PhysicalName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PhysicalName({})", self.as_str())
    }
}

impl std::fmt::Display for PhysicalName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl PartialOrd for PhysicalName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PhysicalName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

/// A compact embedded name: a short name inline plus an optional overflow
/// offset into the names file for the authoritative long name.
#[derive(Debug, Clone)]
pub struct VssName {
    pub flags: u16,
    pub short_name: Vec<u8>,
    /// Zero means the short name is authoritative; otherwise the long name
    /// lives in the names file at this offset.
    pub name_offset: u32,
}

impl VssName {
    pub fn parse(reader: &mut crate::byte_reader::ByteReader) -> Result<VssName> {
        let flags = reader.read_uint16(true)?;
        let short_name = reader.read_byte_string(Some(SIZEOF_SHORT_NAME))?;
        let name_offset = reader.read_uint32(true)?;
        Ok(VssName {
            flags,
            short_name,
            name_offset,
        })
    }

    pub fn has_overflow(&self) -> bool {
        self.name_offset != 0
    }

    pub fn short_name_string(&self, encoding: &'static Encoding) -> Result<String> {
        let (text, _, had_errors) = encoding.decode(&self.short_name);
        if had_errors {
            return Err(Error::InvalidEncoding(format!("{:?}", self.short_name)));
        }
        Ok(text.into_owned())
    }
}

/// Lowers `logical_name` into the database's single-byte code page for
/// byte-wise comparison. The lowercasing happens on the encoded BYTES,
/// not on the `&str`: `str::to_lowercase` is a full Unicode case fold,
/// which can map a single byte to multiple codepoints (or pick a
/// mapping the original code page never had) and reorder non-ASCII
/// names relative to what VSS itself produced on disk. Byte-wise
/// lowering keeps the transform confined to the single-byte table the
/// database was actually written in.
pub fn indexing_name(logical_name: &str, encoding: &'static Encoding) -> Vec<u8> {
    let (bytes, _, _) = encoding.encode(logical_name);
    let mut bytes = bytes.into_owned();
    lowercase_codepage_bytes(&mut bytes, encoding);
    bytes
}

/// Lowercases `bytes` in place using the case mapping of `encoding`.
/// ASCII `A`-`Z` always folds to `a`-`z`. For Windows-1252 the upper
/// half of Latin-1 Supplement (`0xC0`-`0xDE`, skipping the `0xD7`
/// multiplication sign) also folds to its lowercase counterpart 0x20
/// bytes higher, matching the code page's own upper/lowercase pairing.
/// Other single-byte code pages fall back to ASCII-only folding.
fn lowercase_codepage_bytes(bytes: &mut [u8], encoding: &'static Encoding) {
    let windows_1252 = encoding == encoding_rs::WINDOWS_1252;
    for b in bytes.iter_mut() {
        match *b {
            b'A'..=b'Z' => *b += 0x20,
            0xC0..=0xDE if windows_1252 && *b != 0xD7 => *b += 0x20,
            _ => {}
        }
    }
}

/// Per-child triple held in a project's directory state: the name a user
/// sees, the on-disk identifier, the sort key derived from the logical
/// name, and the authoritative (possibly overflow) long name.
#[derive(Debug, Clone)]
pub struct FullName {
    pub logical_name: String,
    pub physical_name: PhysicalName,
    pub indexing_name: Vec<u8>,
    pub long_name: String,
}

impl FullName {
    pub fn new(logical_name: String, physical_name: PhysicalName, encoding: &'static Encoding) -> FullName {
        let indexing_name = indexing_name(&logical_name, encoding);
        FullName {
            long_name: logical_name.clone(),
            logical_name,
            physical_name,
            indexing_name,
        }
    }

    /// Sort key used by the directory-state array: `(indexing_name
    /// bytewise, physical_name tie-breaker)`.
    pub fn sort_key(&self) -> (&[u8], &PhysicalName) {
        (&self.indexing_name, &self.physical_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn physical_name_bucket_is_lowercase_first_char() {
        let name = PhysicalName::from_str("XYZWUVAB").unwrap();
        assert_eq!(name.bucket(), 'x');
    }

    #[test]
    fn indexing_name_lowercases_in_codepage() {
        let a = indexing_name("Apple", encoding_rs::WINDOWS_1252);
        let b = indexing_name("apple", encoding_rs::WINDOWS_1252);
        assert_eq!(a, b);
    }

    #[test]
    fn indexing_name_lowercases_codepage_accented_bytes() {
        // 0xC9 'É' -> 0xE9 'é' under the Windows-1252 upper/lowercase
        // pairing, independent of Unicode's own case-folding tables.
        let upper = indexing_name("\u{c9}cole", encoding_rs::WINDOWS_1252);
        let lower = indexing_name("\u{e9}cole", encoding_rs::WINDOWS_1252);
        assert_eq!(upper, lower);
    }

    #[test]
    fn sort_key_orders_by_indexing_name_then_physical_name() {
        let a = FullName::new(
            "apple".into(),
            PhysicalName::from_str("AAAAAAAA").unwrap(),
            encoding_rs::WINDOWS_1252,
        );
        let b = FullName::new(
            "banana".into(),
            PhysicalName::from_str("BBBBBBBB").unwrap(),
            encoding_rs::WINDOWS_1252,
        );
        assert!(a.sort_key() < b.sort_key());
    }
}
