//! # Radio Module
//!
//! Interface to the radio transceiver the RF protocols drive.
//!
//! This module handles:
//! - The synchronous register-level transceiver contract
//! - nRF24L01 register map and status decoding
//! - A simulated transceiver for host-side runs and tests

pub mod nrf24l01;
pub mod simulated;

use serde::Deserialize;

/// Air data rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bitrate {
    Kbps250,
    Mbps1,
    Mbps2,
}

/// Transmit power level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum TxPower {
    #[serde(rename = "1mW")]
    Mw1,
    #[serde(rename = "10mW")]
    Mw10,
    #[serde(rename = "30mW")]
    Mw30,
    #[serde(rename = "100mW")]
    Mw100,
}

impl Default for TxPower {
    fn default() -> Self {
        TxPower::Mw100
    }
}

/// Transceiver direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxRxMode {
    Tx,
    Rx,
    Off,
}

/// Outcome of the last transmitted packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    /// The packet left the radio.
    Acked,
    /// Retransmits were exhausted.
    Timeout,
    /// Still in flight.
    Pending,
}

/// Register-level access to a radio transceiver.
///
/// Every call is synchronous and completes without waiting on the air
/// interface; transmit completion is observed by reading the status register.
#[cfg_attr(test, mockall::automock)]
pub trait RadioTransceiver {
    /// Bring the chip into a known idle configuration.
    fn initialize(&mut self);

    fn write_reg(&mut self, reg: u8, value: u8);

    fn read_reg(&mut self, reg: u8) -> u8;

    /// Write a multi-byte register such as an address.
    fn write_reg_multi(&mut self, reg: u8, data: &[u8]);

    /// Load a packet into the TX FIFO and start transmission.
    fn write_payload(&mut self, data: &[u8]);

    fn flush_tx(&mut self);

    fn set_bitrate(&mut self, bitrate: Bitrate);

    fn set_power(&mut self, power: TxPower);

    fn set_tx_rx_mode(&mut self, mode: TxRxMode);

    /// Reset the chip. Returns `false` if it did not come back.
    fn reset(&mut self) -> bool;
}
