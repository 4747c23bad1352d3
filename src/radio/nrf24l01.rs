//! # nRF24L01 Register Map
//!
//! Register addresses and bit positions used by the nRF24L01-based protocols.

use super::TxStatus;

pub const REG_CONFIG: u8 = 0x00;
pub const REG_EN_AA: u8 = 0x01;
pub const REG_EN_RXADDR: u8 = 0x02;
pub const REG_SETUP_AW: u8 = 0x03;
pub const REG_SETUP_RETR: u8 = 0x04;
pub const REG_RF_CH: u8 = 0x05;
pub const REG_STATUS: u8 = 0x07;
pub const REG_RX_ADDR_P0: u8 = 0x0A;
pub const REG_RX_ADDR_P1: u8 = 0x0B;
pub const REG_RX_ADDR_P2: u8 = 0x0C;
pub const REG_RX_ADDR_P3: u8 = 0x0D;
pub const REG_RX_ADDR_P4: u8 = 0x0E;
pub const REG_RX_ADDR_P5: u8 = 0x0F;
pub const REG_TX_ADDR: u8 = 0x10;
pub const REG_RX_PW_P0: u8 = 0x11;
pub const REG_FIFO_STATUS: u8 = 0x17;

/// CONFIG bits
pub const CONFIG_EN_CRC: u8 = 3;
pub const CONFIG_CRCO: u8 = 2;
pub const CONFIG_PWR_UP: u8 = 1;

/// STATUS bits
pub const STATUS_RX_DR: u8 = 6;
pub const STATUS_TX_DS: u8 = 5;
pub const STATUS_MAX_RT: u8 = 4;

/// Writing this to STATUS clears RX_DR, TX_DS and MAX_RT.
pub const STATUS_CLEAR_IRQS: u8 = 0x70;

/// Bit vector from bit position.
pub const fn bv(bit: u8) -> u8 {
    1 << bit
}

/// Decode the transmit outcome from a STATUS register value.
///
/// Only TX_DS alone counts as acknowledged and only MAX_RT alone as a
/// timeout; any other combination is still pending.
pub fn tx_status(status: u8) -> TxStatus {
    match status & (bv(STATUS_TX_DS) | bv(STATUS_MAX_RT)) {
        s if s == bv(STATUS_TX_DS) => TxStatus::Acked,
        s if s == bv(STATUS_MAX_RT) => TxStatus::Timeout,
        _ => TxStatus::Pending,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tx_status_decoding() {
        assert_eq!(tx_status(0x20), TxStatus::Acked);
        assert_eq!(tx_status(0x10), TxStatus::Timeout);
        assert_eq!(tx_status(0x30), TxStatus::Pending);
        assert_eq!(tx_status(0x00), TxStatus::Pending);
        // RX_DR and pipe bits do not matter
        assert_eq!(tx_status(0x2E | bv(STATUS_RX_DR)), TxStatus::Acked);
    }

    #[test]
    fn test_clear_mask_covers_irq_bits() {
        let irqs = bv(STATUS_RX_DR) | bv(STATUS_TX_DS) | bv(STATUS_MAX_RT);
        assert_eq!(STATUS_CLEAR_IRQS, irqs);
    }
}
