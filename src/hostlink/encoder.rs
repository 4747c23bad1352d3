//! # Host Link Frame Encoder
//!
//! Builds request and response frames.

use bytes::{BufMut, Bytes, BytesMut};

use super::protocol::*;
use crate::checksum::checksum;

/// Encode a complete frame
///
/// # Arguments
///
/// * `direction` - Direction byte (`<`, `>` or `!`)
/// * `opcode` - Opcode byte
/// * `payload` - Payload bytes (at most 255)
///
/// # Returns
///
/// * `Bytes` - `'$' 'M' DIR SIZE OPCODE PAYLOAD CHECKSUM`
fn encode_frame(direction: u8, opcode: u8, payload: &[u8]) -> Bytes {
    let size = payload.len().min(usize::from(u8::MAX));
    let payload = &payload[..size];

    let mut frame = BytesMut::with_capacity(FRAME_OVERHEAD + size);
    frame.put_u8(FRAME_START);
    frame.put_u8(FRAME_SYNC);
    frame.put_u8(direction);
    frame.put_u8(size as u8);
    frame.put_u8(opcode);
    frame.put_slice(payload);

    // Checksum over SIZE + OPCODE + PAYLOAD
    let crc = checksum(&frame[3..]);
    frame.put_u8(crc);

    frame.freeze()
}

/// Encode a host request, as the host would send it
///
/// # Examples
///
/// ```
/// use rc_rf_bridge::hostlink::encoder::encode_request;
///
/// let frame = encode_request(2, &[]);
/// assert_eq!(&frame[..], b"$M<\x00\x02\x02");
/// ```
pub fn encode_request(opcode: u8, payload: &[u8]) -> Bytes {
    encode_frame(DIR_REQUEST, opcode, payload)
}

/// Encode a response to the request carrying `opcode`
///
/// `ok` selects between the acknowledge and negative acknowledge direction.
pub fn encode_response(ok: bool, opcode: u8, payload: &[u8]) -> Bytes {
    let direction = if ok { DIR_ACK } else { DIR_NAK };
    encode_frame(direction, opcode, payload)
}
