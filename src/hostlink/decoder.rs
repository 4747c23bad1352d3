//! # Host Link Frame Decoder
//!
//! Incremental request decoder fed one byte at a time, plus a whole-frame
//! response decoder for the host side.

use tracing::{trace, warn};

use super::protocol::*;
use crate::checksum::{checksum, verify};
use crate::error::{BridgeError, Result};

/// A request that passed the checksum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub opcode: u8,
    len: usize,
    payload: [u8; MAX_RX_BUF],
}

impl Frame {
    pub fn payload(&self) -> &[u8] {
        &self.payload[..self.len]
    }
}

/// Outcome of a byte that completed a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameEvent {
    Frame(Frame),
    ChecksumMismatch { opcode: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecoderState {
    Idle,
    HeaderStart,
    HeaderM,
    HeaderArrow,
    HeaderSize,
    HeaderCmd,
}

/// Request decoder.
#[derive(Debug, Clone)]
pub struct FrameDecoder {
    state: DecoderState,
    size: usize,
    opcode: u8,
    pos: usize,
    crc: u8,
    buffer: [u8; MAX_RX_BUF],
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: DecoderState::Idle,
            size: 0,
            opcode: 0,
            pos: 0,
            crc: 0,
            buffer: [0u8; MAX_RX_BUF],
        }
    }

    /// Drop any partial frame.
    pub fn reset(&mut self) {
        self.state = DecoderState::Idle;
        self.pos = 0;
    }

    /// True while no frame is in progress.
    pub fn is_idle(&self) -> bool {
        self.state == DecoderState::Idle
    }

    /// Feed a byte to the decoder.
    ///
    /// Returns `Some` when the byte completed a frame, whether or not its
    /// checksum matched.
    pub fn push_byte(&mut self, byte: u8) -> Option<FrameEvent> {
        match self.state {
            DecoderState::Idle => {
                if byte == FRAME_START {
                    self.state = DecoderState::HeaderStart;
                }
            }
            DecoderState::HeaderStart => self.expect(byte, FRAME_SYNC, DecoderState::HeaderM),
            DecoderState::HeaderM => self.expect(byte, DIR_REQUEST, DecoderState::HeaderArrow),
            DecoderState::HeaderArrow => {
                let size = usize::from(byte);
                if size > MAX_RX_BUF {
                    warn!("Rejected frame with payload size {} (max {})", size, MAX_RX_BUF);
                    self.reset();
                } else {
                    self.size = size;
                    self.pos = 0;
                    self.crc = byte;
                    self.state = DecoderState::HeaderSize;
                }
            }
            DecoderState::HeaderSize => {
                self.opcode = byte;
                self.crc = self.crc.wrapping_add(byte);
                self.state = DecoderState::HeaderCmd;
            }
            DecoderState::HeaderCmd => {
                if self.pos < self.size {
                    self.buffer[self.pos] = byte;
                    self.pos += 1;
                    self.crc = self.crc.wrapping_add(byte);
                } else {
                    return Some(self.finish(byte));
                }
            }
        }
        None
    }

    fn expect(&mut self, byte: u8, wanted: u8, next: DecoderState) {
        if byte == wanted {
            self.state = next;
        } else {
            trace!("Header mismatch on {:#04x}, resynchronising", byte);
            self.reset();
            if byte == FRAME_START {
                self.state = DecoderState::HeaderStart;
            }
        }
    }

    fn finish(&mut self, received: u8) -> FrameEvent {
        let opcode = self.opcode;
        let calculated = self.crc;
        self.reset();

        if calculated != received {
            return FrameEvent::ChecksumMismatch { opcode };
        }

        FrameEvent::Frame(Frame {
            opcode,
            len: self.size,
            payload: self.buffer,
        })
    }
}

/// A decoded response frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub ok: bool,
    pub opcode: u8,
    pub payload: Vec<u8>,
}

/// Decode a complete response frame
///
/// # Arguments
///
/// * `frame` - Complete frame bytes (preamble, size, opcode, payload, checksum)
///
/// # Errors
///
/// Returns error if:
/// - Frame is too short or its length disagrees with the size field
/// - Preamble is not `$M>` or `$M!`
/// - Checksum check fails
pub fn decode_response(frame: &[u8]) -> Result<Response> {
    if frame.len() < FRAME_OVERHEAD {
        return Err(BridgeError::HostLink(format!(
            "Frame too short: {} bytes",
            frame.len()
        )));
    }

    if frame[0] != FRAME_START || frame[1] != FRAME_SYNC {
        return Err(BridgeError::HostLink(format!(
            "Invalid preamble: {:02X?}",
            &frame[..2]
        )));
    }

    let ok = match frame[2] {
        DIR_ACK => true,
        DIR_NAK => false,
        other => {
            return Err(BridgeError::HostLink(format!(
                "Invalid direction byte: 0x{:02X}",
                other
            )))
        }
    };

    let size = usize::from(frame[3]);
    if frame.len() != FRAME_OVERHEAD + size {
        return Err(BridgeError::HostLink(format!(
            "Frame length {} does not match size field {}",
            frame.len(),
            size
        )));
    }

    let received = frame[frame.len() - 1];
    let body = &frame[3..frame.len() - 1];
    if !verify(received, body) {
        return Err(BridgeError::HostLink(format!(
            "Checksum mismatch: expected 0x{:02X}, got 0x{:02X}",
            checksum(body),
            received
        )));
    }

    Ok(Response {
        ok,
        opcode: frame[4],
        payload: frame[5..5 + size].to_vec(),
    })
}
