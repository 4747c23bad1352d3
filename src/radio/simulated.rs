//! Simulated nRF24L01 transceiver.
//!
//! Keeps a register file in memory, records every transmitted payload with the
//! RF channel it went out on, and answers STATUS reads from either a scripted
//! sequence or the acknowledgement setting. A [`RadioMonitor`] shares the same
//! state so the traffic can be inspected after the radio has been moved into a
//! protocol.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, trace};

use super::nrf24l01::{
    bv, CONFIG_PWR_UP, REG_CONFIG, REG_RF_CH, REG_STATUS, STATUS_MAX_RT, STATUS_TX_DS,
};
use super::{Bitrate, RadioTransceiver, TxPower, TxRxMode, TxStatus};

const NUM_REGISTERS: usize = 0x20;

/// A payload that went out over the simulated air interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentPacket {
    pub rf_channel: u8,
    pub payload: Vec<u8>,
}

#[derive(Debug)]
struct RadioState {
    registers: [u8; NUM_REGISTERS],
    sent: Vec<SentPacket>,
    scripted_status: VecDeque<TxStatus>,
    ack: bool,
    bitrate: Option<Bitrate>,
    power: Option<TxPower>,
    mode: TxRxMode,
    resets: usize,
}

impl RadioState {
    fn new(ack: bool) -> Self {
        Self {
            registers: [0; NUM_REGISTERS],
            sent: Vec::new(),
            scripted_status: VecDeque::new(),
            ack,
            bitrate: None,
            power: None,
            mode: TxRxMode::Off,
            resets: 0,
        }
    }

    fn status_byte(&mut self) -> u8 {
        let outcome = match self.scripted_status.pop_front() {
            Some(status) => status,
            None if self.ack => TxStatus::Acked,
            None => TxStatus::Timeout,
        };
        let base = self.registers[REG_STATUS as usize] & !(bv(STATUS_TX_DS) | bv(STATUS_MAX_RT));
        match outcome {
            TxStatus::Acked => base | bv(STATUS_TX_DS),
            TxStatus::Timeout => base | bv(STATUS_MAX_RT),
            TxStatus::Pending => base,
        }
    }
}

fn lock(state: &Mutex<RadioState>) -> MutexGuard<'_, RadioState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory transceiver used when no radio hardware is attached.
#[derive(Debug)]
pub struct SimulatedRadio {
    state: Arc<Mutex<RadioState>>,
}

impl SimulatedRadio {
    /// Creates a simulated radio.
    ///
    /// With `ack` set every transmitted packet reports TX_DS; without it every
    /// packet times out.
    pub fn new(ack: bool) -> Self {
        Self {
            state: Arc::new(Mutex::new(RadioState::new(ack))),
        }
    }

    /// Returns a handle that observes this radio's traffic.
    pub fn monitor(&self) -> RadioMonitor {
        RadioMonitor {
            state: Arc::clone(&self.state),
        }
    }
}

impl RadioTransceiver for SimulatedRadio {
    fn initialize(&mut self) {
        let mut state = lock(&self.state);
        state.registers = [0; NUM_REGISTERS];
        state.mode = TxRxMode::Off;
        debug!("Simulated radio initialized");
    }

    fn write_reg(&mut self, reg: u8, value: u8) {
        trace!("W reg 0x{:02X} = 0x{:02X}", reg, value);
        let mut state = lock(&self.state);
        if let Some(slot) = state.registers.get_mut(reg as usize) {
            *slot = value;
        }
    }

    fn read_reg(&mut self, reg: u8) -> u8 {
        let mut state = lock(&self.state);
        if reg == REG_STATUS {
            return state.status_byte();
        }
        state.registers.get(reg as usize).copied().unwrap_or(0)
    }

    fn write_reg_multi(&mut self, reg: u8, data: &[u8]) {
        trace!("W reg 0x{:02X} = {:02X?}", reg, data);
        let mut state = lock(&self.state);
        if let (Some(slot), Some(&first)) = (state.registers.get_mut(reg as usize), data.first()) {
            *slot = first;
        }
    }

    fn write_payload(&mut self, data: &[u8]) {
        let mut state = lock(&self.state);
        let rf_channel = state.registers[REG_RF_CH as usize];
        debug!("TX ch {:#04x}: {:02X?}", rf_channel, data);
        state.sent.push(SentPacket {
            rf_channel,
            payload: data.to_vec(),
        });
    }

    fn flush_tx(&mut self) {
        trace!("Flush TX");
    }

    fn set_bitrate(&mut self, bitrate: Bitrate) {
        lock(&self.state).bitrate = Some(bitrate);
    }

    fn set_power(&mut self, power: TxPower) {
        debug!("Simulated radio power {:?}", power);
        lock(&self.state).power = Some(power);
    }

    fn set_tx_rx_mode(&mut self, mode: TxRxMode) {
        lock(&self.state).mode = mode;
    }

    fn reset(&mut self) -> bool {
        let mut state = lock(&self.state);
        state.registers = [0; NUM_REGISTERS];
        state.mode = TxRxMode::Off;
        state.resets += 1;
        debug!("Simulated radio reset");
        true
    }
}

/// Observer for a [`SimulatedRadio`].
#[derive(Debug, Clone)]
pub struct RadioMonitor {
    state: Arc<Mutex<RadioState>>,
}

impl RadioMonitor {
    /// Every packet transmitted so far.
    pub fn sent_packets(&self) -> Vec<SentPacket> {
        lock(&self.state).sent.clone()
    }

    /// Number of packets transmitted so far.
    pub fn sent_count(&self) -> usize {
        lock(&self.state).sent.len()
    }

    /// Most recently transmitted packet.
    pub fn last_packet(&self) -> Option<SentPacket> {
        lock(&self.state).sent.last().cloned()
    }

    /// Queue STATUS outcomes returned ahead of the acknowledgement setting.
    pub fn script_status(&self, outcomes: &[TxStatus]) {
        lock(&self.state).scripted_status.extend(outcomes.iter().copied());
    }

    /// Change whether unscripted packets are acknowledged.
    pub fn set_ack(&self, ack: bool) {
        lock(&self.state).ack = ack;
    }

    pub fn reset_count(&self) -> usize {
        lock(&self.state).resets
    }

    pub fn is_powered_up(&self) -> bool {
        lock(&self.state).registers[REG_CONFIG as usize] & bv(CONFIG_PWR_UP) != 0
    }

    pub fn mode(&self) -> TxRxMode {
        lock(&self.state).mode
    }

    pub fn power(&self) -> Option<TxPower> {
        lock(&self.state).power
    }

    pub fn bitrate(&self) -> Option<Bitrate> {
        lock(&self.state).bitrate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::radio::nrf24l01::tx_status;

    #[test]
    fn test_payload_recorded_with_channel() {
        let mut radio = SimulatedRadio::new(true);
        let monitor = radio.monitor();

        radio.write_reg(REG_RF_CH, 0x27);
        radio.write_payload(&[1, 2, 3]);

        assert_eq!(
            monitor.sent_packets(),
            vec![SentPacket {
                rf_channel: 0x27,
                payload: vec![1, 2, 3]
            }]
        );
    }

    #[test]
    fn test_status_follows_script_then_ack_setting() {
        let mut radio = SimulatedRadio::new(false);
        let monitor = radio.monitor();
        monitor.script_status(&[TxStatus::Pending, TxStatus::Acked]);

        assert_eq!(tx_status(radio.read_reg(REG_STATUS)), TxStatus::Pending);
        assert_eq!(tx_status(radio.read_reg(REG_STATUS)), TxStatus::Acked);
        assert_eq!(tx_status(radio.read_reg(REG_STATUS)), TxStatus::Timeout);

        monitor.set_ack(true);
        assert_eq!(tx_status(radio.read_reg(REG_STATUS)), TxStatus::Acked);
    }

    #[test]
    fn test_reset_powers_down() {
        let mut radio = SimulatedRadio::new(true);
        let monitor = radio.monitor();

        radio.write_reg(REG_CONFIG, bv(CONFIG_PWR_UP));
        radio.set_tx_rx_mode(TxRxMode::Tx);
        assert!(monitor.is_powered_up());

        assert!(radio.reset());
        assert!(!monitor.is_powered_up());
        assert_eq!(monitor.mode(), TxRxMode::Off);
        assert_eq!(monitor.reset_count(), 1);
    }
}
