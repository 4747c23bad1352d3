//! # Host Link Dispatch
//!
//! Ties the request decoder to a command handler and frames the answers.

use bytes::Bytes;
use tracing::{debug, warn};

use super::decoder::{FrameDecoder, FrameEvent};
use super::encoder::encode_response;
use crate::error::CommandError;

/// Largest reply payload a handler can return.
pub const MAX_REPLY_LEN: usize = 4;

/// Payload of a positive acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Reply {
    buf: [u8; MAX_REPLY_LEN],
    len: usize,
}

impl Reply {
    /// Acknowledgement without payload.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Copy up to [`MAX_REPLY_LEN`] bytes of `data`.
    pub fn from_slice(data: &[u8]) -> Self {
        let len = data.len().min(MAX_REPLY_LEN);
        let mut buf = [0u8; MAX_REPLY_LEN];
        buf[..len].copy_from_slice(&data[..len]);
        Self { buf, len }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

/// Receives every request that passed framing and checksum.
pub trait CommandHandler {
    /// Execute `opcode` with `payload`. `Ok` is answered with an
    /// acknowledgement carrying the reply, `Err` with a negative one.
    fn handle(&mut self, opcode: u8, payload: &[u8]) -> Result<Reply, CommandError>;
}

/// Frame counters kept by [`HostLink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LinkStats {
    pub acked: u64,
    pub rejected: u64,
    pub checksum_errors: u64,
}

/// Host side of the serial link: decoder plus command handler.
#[derive(Debug)]
pub struct HostLink<H: CommandHandler> {
    decoder: FrameDecoder,
    handler: H,
    stats: LinkStats,
}

impl<H: CommandHandler> HostLink<H> {
    pub fn new(handler: H) -> Self {
        Self {
            decoder: FrameDecoder::new(),
            handler,
            stats: LinkStats::default(),
        }
    }

    /// Feed one received byte. Returns the response frame to send back when
    /// the byte completed a request.
    pub fn feed(&mut self, byte: u8) -> Option<Bytes> {
        match self.decoder.push_byte(byte)? {
            FrameEvent::Frame(frame) => {
                let response = match self.handler.handle(frame.opcode, frame.payload()) {
                    Ok(reply) => {
                        debug!("Opcode {} acked ({} byte reply)", frame.opcode, reply.as_slice().len());
                        self.stats.acked += 1;
                        encode_response(true, frame.opcode, reply.as_slice())
                    }
                    Err(e) => {
                        warn!("Opcode {} rejected: {}", frame.opcode, e);
                        self.stats.rejected += 1;
                        encode_response(false, frame.opcode, &[])
                    }
                };
                Some(response)
            }
            FrameEvent::ChecksumMismatch { opcode } => {
                warn!("Checksum mismatch on opcode {}, frame discarded", opcode);
                self.stats.checksum_errors += 1;
                Some(encode_response(false, opcode, &[]))
            }
        }
    }

    /// Feed a chunk of bytes, collecting every response produced.
    pub fn feed_all(&mut self, bytes: &[u8]) -> Vec<Bytes> {
        bytes.iter().filter_map(|&b| self.feed(b)).collect()
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn stats(&self) -> LinkStats {
        self.stats
    }
}
