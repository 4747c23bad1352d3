//! # Additive Checksum
//!
//! Single-byte additive checksum shared by host frames and V2x2 packets.
//!
//! **Algorithm**: wrapping 8-bit sum of every covered byte
//! **Initial Value**: 0x00

/// Calculate the 8-bit additive checksum of `data`
///
/// # Arguments
///
/// * `data` - Bytes covered by the checksum
///
/// # Returns
///
/// * `u8` - Sum of all bytes, truncated to 8 bits
///
/// # Examples
///
/// ```
/// use rc_rf_bridge::checksum::checksum;
///
/// assert_eq!(checksum(&[0x01, 0x02, 0x03]), 0x06);
/// assert_eq!(checksum(&[0xFF, 0x02]), 0x01);
/// ```
pub fn checksum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |sum, &byte| sum.wrapping_add(byte))
}

/// Check that `expected` is the checksum of `data`
pub fn verify(expected: u8, data: &[u8]) -> bool {
    checksum(data) == expected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_empty() {
        assert_eq!(checksum(&[]), 0x00);
    }

    #[test]
    fn test_checksum_wraps() {
        assert_eq!(checksum(&[0x80, 0x80]), 0x00);
        assert_eq!(checksum(&[0xFF; 3]), 0xFD);
    }

    #[test]
    fn test_verify_round_trip() {
        let payloads: [&[u8]; 4] = [
            &[],
            &[0x18],
            &[0x04, 0x04, 0x27, 0x10, 0x00, 0x00],
            &[0xFF; 32],
        ];

        for data in payloads {
            assert!(verify(checksum(data), data), "round trip failed for {:?}", data);
        }
    }

    #[test]
    fn test_single_byte_flip_detected() {
        let data = [0x04, 0x05, 0x01, 0x02, 0x7F, 0x80, 0xAA];
        let sum = checksum(&data);

        for i in 0..data.len() {
            for bit in 0..8 {
                let mut corrupted = data;
                corrupted[i] ^= 1 << bit;
                assert!(
                    !verify(sum, &corrupted),
                    "flipping bit {} of byte {} went undetected",
                    bit,
                    i
                );
            }
        }
    }
}
