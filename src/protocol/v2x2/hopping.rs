//! V2x2 frequency hopping table.
//!
//! The receivers know 32 hopping patterns. Only the first four rows are
//! stored; the rest are the same rows shifted up by a small offset. Both the
//! row and the offset come from the sum of the three TX identity bytes.
//! Channel numbers divisible by 16 are never used and are moved down by 3.

/// Channels per hopping pattern.
pub const HOP_TABLE_LEN: usize = 16;

const FREQ_HOPPING: [[u8; HOP_TABLE_LEN]; 4] = [
    [
        0x27, 0x1B, 0x39, 0x28, 0x24, 0x22, 0x2E, 0x36, 0x19, 0x21, 0x29, 0x14, 0x1E, 0x12, 0x2D,
        0x18,
    ],
    [
        0x2E, 0x33, 0x25, 0x38, 0x19, 0x12, 0x18, 0x16, 0x2A, 0x1C, 0x1F, 0x37, 0x2F, 0x23, 0x34,
        0x10,
    ],
    [
        0x11, 0x1A, 0x35, 0x24, 0x28, 0x18, 0x25, 0x2A, 0x32, 0x2C, 0x14, 0x27, 0x36, 0x34, 0x1C,
        0x17,
    ],
    [
        0x22, 0x27, 0x17, 0x39, 0x34, 0x28, 0x2B, 0x1D, 0x18, 0x2A, 0x21, 0x38, 0x10, 0x26, 0x20,
        0x1F,
    ],
];

/// Hopping pattern for one TX identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HopTable {
    channels: [u8; HOP_TABLE_LEN],
}

impl HopTable {
    /// Derive the pattern for a TX identity.
    pub fn from_tx_id(tx_id: &[u8; 3]) -> Self {
        let sum = tx_id.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
        let row = &FREQ_HOPPING[usize::from(sum & 0x03)];
        let offset = (sum & 0x1E) >> 2;

        let mut channels = [0u8; HOP_TABLE_LEN];
        for (slot, &base) in channels.iter_mut().zip(row.iter()) {
            let value = base + offset;
            *slot = if value & 0x0F != 0 { value } else { value - 3 };
        }

        Self { channels }
    }

    /// Channel at `index`, wrapping at the table length.
    pub fn channel(&self, index: usize) -> u8 {
        self.channels[index % HOP_TABLE_LEN]
    }

    pub fn channels(&self) -> &[u8; HOP_TABLE_LEN] {
        &self.channels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_channel_divisible_by_16() {
        for sum in 0..=255u8 {
            let table = HopTable::from_tx_id(&[sum, 0, 0]);
            for &ch in table.channels() {
                assert_ne!(ch % 16, 0, "sum {} produced channel {:#04x}", sum, ch);
            }
        }
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let id = [0x12, 0x9A, 0x4F];
        assert_eq!(HopTable::from_tx_id(&id), HopTable::from_tx_id(&id));
    }

    #[test]
    fn test_only_byte_sum_matters() {
        assert_eq!(
            HopTable::from_tx_id(&[0x10, 0x20, 0x30]),
            HopTable::from_tx_id(&[0x30, 0x20, 0x10])
        );
        assert_eq!(
            HopTable::from_tx_id(&[0x60, 0x00, 0x00]),
            HopTable::from_tx_id(&[0x20, 0x20, 0x20])
        );
    }

    #[test]
    fn test_base_row_without_offset() {
        // sum 0: row 0, offset 0, nothing to replace
        let table = HopTable::from_tx_id(&[0, 0, 0]);
        assert_eq!(table.channels(), &FREQ_HOPPING[0]);
    }

    #[test]
    fn test_multiple_of_16_moved_down() {
        // sum 1: row 1, offset 0, last entry 0x10 becomes 0x0D
        let table = HopTable::from_tx_id(&[1, 0, 0]);
        assert_eq!(table.channel(0), 0x2E);
        assert_eq!(table.channel(15), 0x0D);
    }

    #[test]
    fn test_offset_from_higher_sum_bits() {
        // sum 0x1C: row 0, offset 7
        let table = HopTable::from_tx_id(&[0x1C, 0, 0]);
        assert_eq!(table.channel(0), 0x27 + 7);
        // 0x39 + 7 = 0x40 is a multiple of 16
        assert_eq!(table.channel(2), 0x3D);
    }

    #[test]
    fn test_channel_index_wraps() {
        let table = HopTable::from_tx_id(&[5, 6, 7]);
        assert_eq!(table.channel(16), table.channel(0));
        assert_eq!(table.channel(31), table.channel(15));
    }
}
