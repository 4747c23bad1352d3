//! # V2x2 Packet Layout
//!
//! | Byte | Field |
//! |------|-------|
//! | 0 | Throttle (0x00-0xFF) |
//! | 1 | Rudder (sign/magnitude) |
//! | 2 | Elevator (sign/magnitude) |
//! | 3 | Aileron (sign/magnitude) |
//! | 4 | Yaw trim (centre 0x40) |
//! | 5 | Pitch trim (centre 0x40) |
//! | 6 | Roll trim (centre 0x40) |
//! | 7-9 | TX identity |
//! | 10-13 | Unused (zero) |
//! | 14 | Flags |
//! | 15 | Checksum (sum of bytes 0-14) |

use crate::checksum::checksum;
use crate::controls::scaling::{scale_to_byte, scale_to_sign_magnitude};
use crate::controls::{clamp_control, Channel, ChannelInputSource, CHAN_MAX_VALUE, CHAN_MIN_VALUE};

/// Size of every V2x2 packet on air.
pub const PACKET_SIZE: usize = 16;

/// Trim value meaning "no trim".
pub const TRIM_CENTER: u8 = 0x40;

pub const FLAG_CAMERA: u8 = 0x01;
pub const FLAG_VIDEO: u8 = 0x02;
pub const FLAG_FLIP: u8 = 0x04;
pub const FLAG_LED: u8 = 0x10;
pub const FLAG_BIND: u8 = 0xC0;

/// Blink countdown loaded when the LED is not driven by a channel.
pub const BLINK_COUNT: u16 = 250;
/// Fastest blinking (4ms * 2 * 64 ~ 0.5s period).
pub const BLINK_COUNT_MIN: u16 = 64;
/// Slowest blinking (4ms * 2 * 256 ~ 2s period).
pub const BLINK_COUNT_MAX: u16 = 256;

/// One V2x2 packet before serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct V2x2Packet {
    pub throttle: u8,
    pub rudder: u8,
    pub elevator: u8,
    pub aileron: u8,
    pub yaw_trim: u8,
    pub pitch_trim: u8,
    pub roll_trim: u8,
    pub tx_id: [u8; 3],
    pub flags: u8,
}

/// Stick bytes in wire encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sticks {
    pub throttle: u8,
    pub rudder: u8,
    pub elevator: u8,
    pub aileron: u8,
}

impl Sticks {
    /// Read and encode the four stick channels.
    pub fn from_controls(controls: &dyn ChannelInputSource) -> Self {
        Self {
            throttle: scale_to_byte(controls.control(Channel::Throttle)),
            rudder: scale_to_sign_magnitude(controls.control(Channel::Rudder)),
            elevator: scale_to_sign_magnitude(controls.control(Channel::Elevator)),
            aileron: scale_to_sign_magnitude(controls.control(Channel::Aileron)),
        }
    }
}

impl V2x2Packet {
    /// Bind packet: zero sticks and trims, bind flags.
    pub fn bind(tx_id: [u8; 3]) -> Self {
        Self {
            tx_id,
            flags: FLAG_BIND,
            ..Self::default()
        }
    }

    /// Data packet carrying stick positions and flags, trims centred.
    pub fn data(sticks: Sticks, tx_id: [u8; 3], flags: u8) -> Self {
        Self {
            throttle: sticks.throttle,
            rudder: sticks.rudder,
            elevator: sticks.elevator,
            aileron: sticks.aileron,
            yaw_trim: TRIM_CENTER,
            pitch_trim: TRIM_CENTER,
            roll_trim: TRIM_CENTER,
            tx_id,
            flags,
        }
    }

    /// Serialize, writing the checksum last.
    pub fn to_bytes(&self) -> [u8; PACKET_SIZE] {
        let mut buf = [0u8; PACKET_SIZE];
        buf[0] = self.throttle;
        buf[1] = self.rudder;
        buf[2] = self.elevator;
        buf[3] = self.aileron;
        buf[4] = self.yaw_trim;
        buf[5] = self.pitch_trim;
        buf[6] = self.roll_trim;
        buf[7] = self.tx_id[0];
        buf[8] = self.tx_id[1];
        buf[9] = self.tx_id[2];
        buf[14] = self.flags;
        buf[PACKET_SIZE - 1] = checksum(&buf[..PACKET_SIZE - 1]);
        buf
    }
}

/// Map the LED channel to a blink countdown.
///
/// Full low forces the LED on (`BLINK_COUNT_MAX + 1`), full high forces it
/// off (`BLINK_COUNT_MIN - 1`); in between the rate is interpolated, faster
/// towards the high end.
pub fn blink_rate(value: i32) -> u16 {
    let value = clamp_control(value);
    if value == CHAN_MIN_VALUE {
        BLINK_COUNT_MAX + 1
    } else if value == CHAN_MAX_VALUE {
        BLINK_COUNT_MIN - 1
    } else {
        let mid = i32::from(BLINK_COUNT_MAX + BLINK_COUNT_MIN) / 2;
        let span = i32::from(BLINK_COUNT_MAX - BLINK_COUNT_MIN);
        (mid - value * span / (2 * CHAN_MAX_VALUE)) as u16
    }
}

/// Update the flip, camera and video bits from their channels.
///
/// Other bits in `flags` are preserved.
pub fn aux_flags(controls: &dyn ChannelInputSource, flags: u8) -> u8 {
    [
        (Channel::Aux2, FLAG_FLIP),
        (Channel::Aux3, FLAG_CAMERA),
        (Channel::Aux4, FLAG_VIDEO),
    ]
    .iter()
    .fold(flags, |flags, &(channel, bit)| {
        if controls.control(channel) > 0 {
            flags | bit
        } else {
            flags & !bit
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::verify;
    use crate::controls::ControlState;

    const TX_ID: [u8; 3] = [0x12, 0x34, 0x56];

    #[test]
    fn test_bind_packet_layout() {
        let bytes = V2x2Packet::bind(TX_ID).to_bytes();

        assert_eq!(&bytes[0..7], &[0; 7]);
        assert_eq!(&bytes[7..10], &TX_ID);
        assert_eq!(&bytes[10..14], &[0; 4]);
        assert_eq!(bytes[14], FLAG_BIND);
        // 0x12 + 0x34 + 0x56 + 0xC0 = 0x15C
        assert_eq!(bytes[15], 0x5C);
    }

    #[test]
    fn test_data_packet_layout() {
        let sticks = Sticks {
            throttle: 0xFF,
            rudder: 0x80,
            elevator: 0x7F,
            aileron: 0x00,
        };
        let bytes = V2x2Packet::data(sticks, TX_ID, FLAG_LED | FLAG_FLIP).to_bytes();

        assert_eq!(&bytes[0..4], &[0xFF, 0x80, 0x7F, 0x00]);
        assert_eq!(&bytes[4..7], &[TRIM_CENTER; 3]);
        assert_eq!(&bytes[7..10], &TX_ID);
        assert_eq!(bytes[14], FLAG_LED | FLAG_FLIP);
        assert!(verify(bytes[15], &bytes[..15]));
    }

    #[test]
    fn test_checksum_covers_every_field() {
        let base = V2x2Packet::data(
            Sticks {
                throttle: 1,
                rudder: 2,
                elevator: 3,
                aileron: 4,
            },
            TX_ID,
            0,
        );
        let reference = base.to_bytes()[15];

        let mut changed = base;
        changed.flags = FLAG_VIDEO;
        assert_ne!(changed.to_bytes()[15], reference);

        let mut changed = base;
        changed.tx_id[2] ^= 0x01;
        assert_ne!(changed.to_bytes()[15], reference);
    }

    #[test]
    fn test_sticks_from_controls() {
        let mut controls = ControlState::new();
        controls.set(Channel::Throttle, CHAN_MAX_VALUE);
        controls.set(Channel::Rudder, CHAN_MIN_VALUE);
        controls.set(Channel::Elevator, 0);
        controls.set(Channel::Aileron, CHAN_MAX_VALUE);

        let sticks = Sticks::from_controls(&controls);
        assert_eq!(sticks.throttle, 0xFF);
        assert_eq!(sticks.rudder, 0x7F);
        assert_eq!(sticks.elevator, 0x80);
        assert_eq!(sticks.aileron, 0xFF);

        controls.set(Channel::Throttle, CHAN_MIN_VALUE);
        assert_eq!(Sticks::from_controls(&controls).throttle, 0x00);
    }

    #[test]
    fn test_blink_rate_saturation() {
        assert_eq!(blink_rate(CHAN_MIN_VALUE), BLINK_COUNT_MAX + 1);
        assert_eq!(blink_rate(CHAN_MAX_VALUE), BLINK_COUNT_MIN - 1);
        assert_eq!(blink_rate(CHAN_MIN_VALUE - 100), BLINK_COUNT_MAX + 1);
        assert_eq!(blink_rate(CHAN_MAX_VALUE + 100), BLINK_COUNT_MIN - 1);
    }

    #[test]
    fn test_blink_rate_interpolation() {
        assert_eq!(blink_rate(0), 160);
        // Just inside the bounds the rate stays within MIN..=MAX
        assert_eq!(blink_rate(CHAN_MIN_VALUE + 1), 255);
        assert_eq!(blink_rate(CHAN_MAX_VALUE - 1), 65);
        assert!(blink_rate(5000) < blink_rate(-5000));
    }

    #[test]
    fn test_aux_flags_thresholds() {
        let mut controls = ControlState::new();
        controls.set(Channel::Aux2, 1);
        controls.set(Channel::Aux3, 0);
        controls.set(Channel::Aux4, CHAN_MAX_VALUE);

        let flags = aux_flags(&controls, FLAG_LED | FLAG_CAMERA);
        assert_eq!(flags, FLAG_LED | FLAG_FLIP | FLAG_VIDEO);

        controls.set(Channel::Aux2, -1);
        controls.set(Channel::Aux4, 0);
        assert_eq!(aux_flags(&controls, flags), FLAG_LED);
    }
}
