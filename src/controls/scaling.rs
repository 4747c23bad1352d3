//! # Channel Scaling
//!
//! Converts control values (`CHAN_MIN_VALUE..=CHAN_MAX_VALUE`) into the 8-bit
//! encodings the RF packets carry.
//!
//! ## Value Ranges
//!
//! - Control input: -10000..=10000
//! - Linear byte: 0..=255, centre 128
//! - Sign/magnitude byte: 0x00..=0x7F one direction, 0x80..=0xFF the other

use super::{clamp_control, CHAN_MAX_VALUE};

/// Midpoint of the linear byte scale.
pub const BYTE_CENTER: u8 = 0x80;

/// Scale a control value linearly onto `0..=255`.
///
/// Values outside the channel range are clamped first, so the output at any
/// out-of-range input equals the output at the nearest bound.
///
/// # Examples
///
/// ```
/// use rc_rf_bridge::controls::scaling::scale_to_byte;
/// use rc_rf_bridge::controls::{CHAN_MAX_VALUE, CHAN_MIN_VALUE};
///
/// assert_eq!(scale_to_byte(CHAN_MIN_VALUE), 0x00);
/// assert_eq!(scale_to_byte(0), 0x80);
/// assert_eq!(scale_to_byte(CHAN_MAX_VALUE), 0xFF);
/// ```
pub fn scale_to_byte(value: i32) -> u8 {
    let value = clamp_control(value);
    (((value * 0xFF / CHAN_MAX_VALUE) + 0x100) >> 1) as u8
}

/// Fold a linear byte into sign/magnitude form.
///
/// Values below the midpoint are mirrored (`0x7F - value`) so that the
/// magnitude grows away from centre in both directions; values at or above the
/// midpoint pass through unchanged.
pub fn to_sign_magnitude(linear: u8) -> u8 {
    if linear < BYTE_CENTER {
        0x7F - linear
    } else {
        linear
    }
}

/// Scale a control value to a sign/magnitude byte.
pub fn scale_to_sign_magnitude(value: i32) -> u8 {
    to_sign_magnitude(scale_to_byte(value))
}
