//! # V2x2 Protocol
//!
//! nRF24L01-based link used by V202/V222-family quadcopters.
//!
//! ## State Machine
//!
//! ```text
//! Init ──> Bind ──(bind counter hits 0)──> Data
//! InitNoBind ─────────────────────────────> Data
//! ```
//!
//! Every `call_state` either sends one packet and returns the packet period,
//! or finds the previous packet still unacknowledged and returns the short
//! recheck delay without sending. A packet is never re-sent; the next one is
//! built from fresh control values.

pub mod hopping;
pub mod packet;

use std::fmt;

use tracing::{debug, info, trace};

use self::hopping::HopTable;
use self::packet::{
    aux_flags, blink_rate, Sticks, V2x2Packet, BLINK_COUNT, BLINK_COUNT_MAX, BLINK_COUNT_MIN,
    FLAG_BIND, FLAG_LED, PACKET_SIZE,
};
use super::txid::{derive_tx_id, tx_id_bytes};
use super::{LinkSnapshot, ProtocolSelection, RfProtocol};
use crate::controls::{Channel, ChannelInputSource};
use crate::error::LinkError;
use crate::radio::nrf24l01::*;
use crate::radio::{Bitrate, RadioTransceiver, TxPower, TxRxMode, TxStatus};

/// Time between packets.
pub const PACKET_PERIOD_MS: u16 = 4;
/// Delay before re-checking an outstanding packet.
pub const PACKET_CHKTIME_MS: u16 = 1;
/// Delay between `init` and the first `call_state`.
pub const INITIAL_WAIT_MS: u16 = 50;
/// Delay after powering the radio up.
const BOOTSTRAP_DELAY_MS: u16 = 1;
/// Bind packets sent before switching to data.
pub const MAX_BIND_COUNT: u16 = 1000;
/// Control channels carried by the protocol.
pub const NUM_CHANNELS: usize = 8;

const RX_TX_ADDR: [u8; 5] = [0x66, 0x88, 0x68, 0x68, 0x68];
const RX_P1_ADDR: [u8; 5] = [0x88, 0x66, 0x86, 0x86, 0x86];

/// Hop index wraps at 32: each table entry carries two packets.
const HOP_INDEX_MASK: u8 = 0x1F;

/// Session state. The discriminant is the code reported to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum V2x2State {
    Init = 0,
    InitNoBind = 1,
    Bind = 2,
    Data = 3,
}

impl fmt::Display for V2x2State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            V2x2State::Init => "init",
            V2x2State::InitNoBind => "init-no-bind",
            V2x2State::Bind => "bind",
            V2x2State::Data => "data",
        };
        f.write_str(name)
    }
}

/// V2x2 link session. Owns the radio for its lifetime.
#[derive(Debug)]
pub struct V2x2<R: RadioTransceiver> {
    radio: R,
    controller_id: u32,
    options: u8,
    power: TxPower,

    state: V2x2State,
    tx_id: [u8; 3],
    hop_table: HopTable,
    hop_index: u8,
    rf_channel: u8,
    packet_counter: u32,
    bind_counter: u16,
    blink_countdown: u16,
    blink_rate: u16,
    flags: u8,
    packet_sent: bool,
}

impl<R: RadioTransceiver> V2x2<R> {
    pub fn new(radio: R, controller_id: u32, options: u8) -> Self {
        let tx_id = tx_id_bytes(derive_tx_id(controller_id));
        let hop_table = HopTable::from_tx_id(&tx_id);
        Self {
            radio,
            controller_id,
            options,
            power: TxPower::default(),
            state: V2x2State::Init,
            tx_id,
            rf_channel: hop_table.channel(0),
            hop_table,
            hop_index: 0,
            packet_counter: 0,
            bind_counter: MAX_BIND_COUNT,
            blink_countdown: BLINK_COUNT,
            blink_rate: BLINK_COUNT_MAX,
            flags: 0,
            packet_sent: false,
        }
    }

    pub fn into_radio(self) -> R {
        self.radio
    }

    pub fn state(&self) -> V2x2State {
        self.state
    }

    pub fn tx_id(&self) -> [u8; 3] {
        self.tx_id
    }

    pub fn hop_table(&self) -> &HopTable {
        &self.hop_table
    }

    pub fn bind_counter(&self) -> u16 {
        self.bind_counter
    }

    pub fn flags(&self) -> u8 {
        self.flags
    }

    /// Static radio setup: addressing, payload widths, rate and power.
    fn configure_radio(&mut self) {
        let radio = &mut self.radio;
        radio.initialize();

        // 2-byte CRC, powered down
        radio.write_reg(REG_CONFIG, bv(CONFIG_EN_CRC) | bv(CONFIG_CRCO));
        radio.write_reg(REG_EN_AA, 0x00);
        radio.write_reg(REG_EN_RXADDR, 0x3F);
        radio.write_reg(REG_SETUP_AW, 0x03);
        radio.write_reg(REG_SETUP_RETR, 0xFF);
        radio.write_reg(REG_RF_CH, 0x08);
        radio.set_bitrate(Bitrate::Mbps1);
        radio.set_power(self.power);
        radio.write_reg(REG_STATUS, STATUS_CLEAR_IRQS);

        for (pipe, lsb) in [0xC3u8, 0xC4, 0xC5, 0xC6].iter().enumerate() {
            radio.write_reg(REG_RX_ADDR_P2 + pipe as u8, *lsb);
        }
        for pipe in 0..6u8 {
            radio.write_reg(REG_RX_PW_P0 + pipe, PACKET_SIZE as u8);
        }
        radio.write_reg(REG_FIFO_STATUS, 0x00);

        radio.write_reg_multi(REG_RX_ADDR_P0, &RX_TX_ADDR);
        radio.write_reg_multi(REG_RX_ADDR_P1, &RX_P1_ADDR);
        radio.write_reg_multi(REG_TX_ADDR, &RX_TX_ADDR);
    }

    /// Switch the radio into transmit mode and rewind the hop sequence.
    fn power_up(&mut self) {
        self.radio.flush_tx();
        self.radio.set_tx_rx_mode(TxRxMode::Tx);
        self.radio.write_reg(
            REG_CONFIG,
            bv(CONFIG_EN_CRC) | bv(CONFIG_CRCO) | bv(CONFIG_PWR_UP),
        );
        self.hop_index = 0;
        self.packet_sent = false;
    }

    /// The previous packet has been handed to the radio but not confirmed.
    fn transmit_outstanding(&mut self) -> bool {
        self.packet_sent && tx_status(self.radio.read_reg(REG_STATUS)) != TxStatus::Acked
    }

    /// Refresh LED rate and aux flags from the controls and build a data packet.
    fn data_packet(&mut self, controls: &dyn ChannelInputSource) -> V2x2Packet {
        let sticks = Sticks::from_controls(controls);

        let rate = blink_rate(controls.control(Channel::Aux1));
        if rate != self.blink_rate {
            if self.blink_countdown > rate {
                self.blink_countdown = rate;
            }
            self.blink_rate = rate;
        }
        self.flags = aux_flags(controls, self.flags);

        V2x2Packet::data(sticks, self.tx_id, self.flags)
    }

    fn send_packet(&mut self, bind: bool, controls: &dyn ChannelInputSource) {
        let packet = if bind {
            self.flags = FLAG_BIND;
            V2x2Packet::bind(self.tx_id)
        } else {
            self.data_packet(controls)
        };
        let bytes = packet.to_bytes();

        self.packet_sent = false;
        // Each hop channel carries two consecutive packets
        let rf_channel = self.hop_table.channel(usize::from(self.hop_index >> 1));
        self.hop_index = (self.hop_index + 1) & HOP_INDEX_MASK;

        self.rf_channel = rf_channel;
        self.radio.write_reg(REG_RF_CH, rf_channel);
        self.radio.flush_tx();
        self.radio.write_payload(&bytes);
        self.packet_counter = self.packet_counter.wrapping_add(1);
        self.packet_sent = true;

        trace!(
            "V2x2 packet #{} on ch {:#04x}: {:02X?}",
            self.packet_counter,
            rf_channel,
            bytes
        );
    }

    /// Advance the LED blink countdown.
    fn update_led(&mut self) {
        if self.blink_rate > BLINK_COUNT_MAX {
            self.flags |= FLAG_LED;
        } else if self.blink_rate < BLINK_COUNT_MIN {
            self.flags &= !FLAG_LED;
        } else {
            self.blink_countdown = self.blink_countdown.saturating_sub(1);
            if self.blink_countdown == 0 {
                self.blink_countdown = self.blink_rate;
                self.flags ^= FLAG_LED;
            }
        }
    }

    fn enter(&mut self, state: V2x2State) {
        debug!("V2x2 state {} -> {}", self.state, state);
        self.state = state;
    }
}

impl<R: RadioTransceiver> RfProtocol for V2x2<R> {
    fn init(&mut self) -> Result<u16, LinkError> {
        self.packet_counter = 0;
        self.flags = 0;
        self.blink_rate = BLINK_COUNT_MAX;
        self.packet_sent = false;
        self.hop_index = 0;

        self.configure_radio();

        if self.options & ProtocolSelection::OPTION_START_BIND != 0 {
            self.state = V2x2State::Init;
            self.bind_counter = MAX_BIND_COUNT;
        } else {
            self.state = V2x2State::InitNoBind;
            self.blink_countdown = BLINK_COUNT;
        }

        self.tx_id = tx_id_bytes(derive_tx_id(self.controller_id));
        self.hop_table = HopTable::from_tx_id(&self.tx_id);
        self.rf_channel = self.hop_table.channel(0);

        info!(
            "V2x2 init: tx id {:02X}{:02X}{:02X}, state {}, hop table {:02X?}",
            self.tx_id[0],
            self.tx_id[1],
            self.tx_id[2],
            self.state,
            self.hop_table.channels()
        );

        Ok(INITIAL_WAIT_MS)
    }

    fn close(&mut self) -> Result<(), LinkError> {
        self.radio.initialize();
        if self.radio.reset() {
            debug!("V2x2 closed");
            Ok(())
        } else {
            Err(LinkError::RadioReset)
        }
    }

    fn reset(&mut self) -> Result<(), LinkError> {
        self.close()
    }

    fn channel_count(&self) -> usize {
        NUM_CHANNELS
    }

    fn snapshot(&self) -> LinkSnapshot {
        LinkSnapshot {
            state: self.state as u8,
            hop_channel: self.rf_channel,
            packet_counter: self.packet_counter,
        }
    }

    fn test(&mut self, id: i8) {
        debug!("V2x2 test hook {} (no diagnostics defined)", id);
    }

    fn set_power(&mut self, power: TxPower) {
        self.power = power;
        self.radio.set_power(power);
    }

    fn call_state(&mut self, controls: &dyn ChannelInputSource) -> u16 {
        match self.state {
            V2x2State::Init => {
                self.power_up();
                self.enter(V2x2State::Bind);
                return BOOTSTRAP_DELAY_MS;
            }
            V2x2State::InitNoBind => {
                self.power_up();
                self.enter(V2x2State::Data);
                return BOOTSTRAP_DELAY_MS;
            }
            V2x2State::Bind => {
                if self.transmit_outstanding() {
                    return PACKET_CHKTIME_MS;
                }
                self.send_packet(true, controls);
                self.bind_counter = self.bind_counter.saturating_sub(1);
                if self.bind_counter == 0 {
                    self.enter(V2x2State::Data);
                    self.blink_countdown = self.blink_rate;
                    self.flags = 0;
                    info!("V2x2 bind complete after {} packets", self.packet_counter);
                }
            }
            V2x2State::Data => {
                self.update_led();
                if self.transmit_outstanding() {
                    return PACKET_CHKTIME_MS;
                }
                self.send_packet(false, controls);
            }
        }
        PACKET_PERIOD_MS
    }
}
