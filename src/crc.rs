//! CRC-32 of a byte range, folded to 16 bits.
//!
//! The on-disk header CRC is not a plain CRC-32: it is the XOR of the
//! high and low 16-bit halves of the standard CRC-32 (IEEE 802.3
//! polynomial) over the record payload.

/// Folds a 32-bit CRC to 16 bits by XOR of its two halves.
pub fn fold16(crc32: u32) -> u16 {
    ((crc32 >> 16) as u16) ^ (crc32 as u16)
}

/// Computes the folded CRC-16 of `bytes`.
pub fn crc16(bytes: &[u8]) -> u16 {
    fold16(crc32fast::hash(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold16_xors_halves() {
        assert_eq!(fold16(0x1234_5678), 0x1234 ^ 0x5678);
    }

    #[test]
    fn crc16_is_deterministic() {
        assert_eq!(crc16(b"hello world"), crc16(b"hello world"));
        assert_ne!(crc16(b"hello world"), crc16(b"hello worlD"));
    }
}
