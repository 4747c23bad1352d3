//! # RF Protocol Module
//!
//! The contract every RF link protocol implements, and the closed set of
//! protocols the engine can run.
//!
//! This module handles:
//! - Lifecycle (`init`, `close`, `reset`) and capability queries
//! - Info fields reported to the host (state, hop channel, packet counter)
//! - Decoding the host's protocol selection word
//! - Tag dispatch over [`LinkProtocol`]

pub mod txid;
pub mod v2x2;

use std::fmt;

use crate::controls::ChannelInputSource;
use crate::error::{CommandError, LinkError};
use crate::radio::{RadioTransceiver, TxPower};

use self::v2x2::V2x2;

/// Info field: current state code (1 byte).
pub const INFO_STATE: u8 = 0;
/// Info field: current hop channel (1 byte).
pub const INFO_CHANNEL: u8 = 1;
/// Info field: packet counter (4 bytes, big-endian).
pub const INFO_PACKET_CTR: u8 = 2;

/// Point-in-time view of a protocol session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkSnapshot {
    pub state: u8,
    pub hop_channel: u8,
    pub packet_counter: u32,
}

/// Write the info field `field_id` of `snapshot` into `out`.
///
/// Returns the number of bytes written, or 0 when the field is unknown or
/// `out` cannot hold it.
pub fn encode_info(field_id: u8, snapshot: &LinkSnapshot, out: &mut [u8]) -> usize {
    let (bytes, len) = match field_id {
        INFO_STATE => ([snapshot.state, 0, 0, 0], 1),
        INFO_CHANNEL => ([snapshot.hop_channel, 0, 0, 0], 1),
        INFO_PACKET_CTR => (snapshot.packet_counter.to_be_bytes(), 4),
        _ => return 0,
    };

    match out.get_mut(..len) {
        Some(dest) => {
            dest.copy_from_slice(&bytes[..len]);
            len
        }
        None => 0,
    }
}

/// Contract shared by all RF link protocols.
///
/// `call_state` is the only scheduled unit of work: it performs one step of
/// the protocol and returns the number of milliseconds until it wants to run
/// again. It never blocks.
pub trait RfProtocol {
    /// Reset session state, program the radio and return the delay before the
    /// first `call_state`. Safe to call again after `close`.
    fn init(&mut self) -> Result<u16, LinkError>;

    /// Power down and reset the radio. Safe from any state.
    fn close(&mut self) -> Result<(), LinkError>;

    /// Close and get ready for a later `init`.
    fn reset(&mut self) -> Result<(), LinkError>;

    /// Number of control channels carried in each packet.
    fn channel_count(&self) -> usize;

    fn snapshot(&self) -> LinkSnapshot;

    /// Diagnostic hook.
    fn test(&mut self, id: i8);

    fn set_power(&mut self, power: TxPower);

    fn call_state(&mut self, controls: &dyn ChannelInputSource) -> u16;

    /// Write info field `field_id` into `out`, returning the byte count.
    fn info(&self, field_id: u8, out: &mut [u8]) -> usize {
        encode_info(field_id, &self.snapshot(), out)
    }
}

/// Radio module fitted to the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Module {
    Nrf24l01 = 0,
}

/// Protocols the engine can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolKind {
    V2x2,
}

impl fmt::Display for ProtocolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolKind::V2x2 => write!(f, "V2x2"),
        }
    }
}

/// Protocol selection sent with `SET_RF_PROTOCOL`.
///
/// Packed on the wire as `module << 16 | protocol << 8 | options`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolSelection {
    pub module: u8,
    pub protocol: u8,
    pub options: u8,
}

impl ProtocolSelection {
    /// Option bit: run the bind handshake before sending data.
    pub const OPTION_START_BIND: u8 = 0x01;

    pub fn from_u32(value: u32) -> Self {
        Self {
            module: (value >> 16) as u8,
            protocol: (value >> 8) as u8,
            options: value as u8,
        }
    }

    pub fn to_u32(self) -> u32 {
        u32::from(self.module) << 16 | u32::from(self.protocol) << 8 | u32::from(self.options)
    }

    pub fn start_bind(self) -> bool {
        self.options & Self::OPTION_START_BIND != 0
    }

    /// Resolve the selection to a protocol this build can run.
    pub fn kind(self) -> Result<ProtocolKind, CommandError> {
        match (self.module, self.protocol) {
            (m, 0) if m == Module::Nrf24l01 as u8 => Ok(ProtocolKind::V2x2),
            (module, protocol) => Err(CommandError::UnsupportedProtocol { module, protocol }),
        }
    }
}

/// The active protocol, tagged by kind.
#[derive(Debug)]
pub enum LinkProtocol<R: RadioTransceiver> {
    V2x2(V2x2<R>),
}

impl<R: RadioTransceiver> LinkProtocol<R> {
    /// Build the protocol for `kind`, moving the radio into it.
    pub fn new(kind: ProtocolKind, radio: R, controller_id: u32, options: u8) -> Self {
        match kind {
            ProtocolKind::V2x2 => LinkProtocol::V2x2(V2x2::new(radio, controller_id, options)),
        }
    }

    pub fn kind(&self) -> ProtocolKind {
        match self {
            LinkProtocol::V2x2(_) => ProtocolKind::V2x2,
        }
    }

    /// Give the radio back once the session is over.
    pub fn into_radio(self) -> R {
        match self {
            LinkProtocol::V2x2(p) => p.into_radio(),
        }
    }
}

impl<R: RadioTransceiver> RfProtocol for LinkProtocol<R> {
    fn init(&mut self) -> Result<u16, LinkError> {
        match self {
            LinkProtocol::V2x2(p) => p.init(),
        }
    }

    fn close(&mut self) -> Result<(), LinkError> {
        match self {
            LinkProtocol::V2x2(p) => p.close(),
        }
    }

    fn reset(&mut self) -> Result<(), LinkError> {
        match self {
            LinkProtocol::V2x2(p) => p.reset(),
        }
    }

    fn channel_count(&self) -> usize {
        match self {
            LinkProtocol::V2x2(p) => p.channel_count(),
        }
    }

    fn snapshot(&self) -> LinkSnapshot {
        match self {
            LinkProtocol::V2x2(p) => p.snapshot(),
        }
    }

    fn test(&mut self, id: i8) {
        match self {
            LinkProtocol::V2x2(p) => p.test(id),
        }
    }

    fn set_power(&mut self, power: TxPower) {
        match self {
            LinkProtocol::V2x2(p) => p.set_power(power),
        }
    }

    fn call_state(&mut self, controls: &dyn ChannelInputSource) -> u16 {
        match self {
            LinkProtocol::V2x2(p) => p.call_state(controls),
        }
    }
}
