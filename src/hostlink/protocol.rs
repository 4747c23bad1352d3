//! # Host Link Constants and Commands
//!
//! Frame layout shared by requests and responses:
//!
//! ```text
//! '$' 'M' DIR SIZE OPCODE PAYLOAD[SIZE] CHECKSUM
//! ```
//!
//! `DIR` is `<` for requests, `>` for a positive and `!` for a negative
//! acknowledgement. The checksum is the wrapping sum of SIZE, OPCODE and
//! every payload byte.

use crate::controls::NUM_CONTROLS;
use crate::error::CommandError;
use crate::protocol::ProtocolSelection;

/// Frame start byte
pub const FRAME_START: u8 = b'$';

/// Second preamble byte
pub const FRAME_SYNC: u8 = b'M';

/// Direction byte of host requests
pub const DIR_REQUEST: u8 = b'<';

/// Direction byte of positive acknowledgements
pub const DIR_ACK: u8 = b'>';

/// Direction byte of negative acknowledgements
pub const DIR_NAK: u8 = b'!';

/// Largest request payload accepted
pub const MAX_RX_BUF: usize = 32;

/// Bytes around the payload: preamble(3) + size(1) + opcode(1) + checksum(1)
pub const FRAME_OVERHEAD: usize = 6;

/// Request opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    Ready = 0,
    SetRfProtocol = 1,
    StartRf = 2,
    StopRf = 3,
    InjectControls = 4,
    GetInfo = 5,
    Test = 110,
}

impl TryFrom<u8> for Opcode {
    type Error = CommandError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Opcode::Ready),
            1 => Ok(Opcode::SetRfProtocol),
            2 => Ok(Opcode::StartRf),
            3 => Ok(Opcode::StopRf),
            4 => Ok(Opcode::InjectControls),
            5 => Ok(Opcode::GetInfo),
            110 => Ok(Opcode::Test),
            other => Err(CommandError::UnknownOpcode(other)),
        }
    }
}

/// A validated host command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Liveness probe, answered with the control count
    Ready,

    /// Select the RF protocol to run
    SetRfProtocol(ProtocolSelection),

    StartRf,
    StopRf,

    /// Replace all control values
    InjectControls([i16; NUM_CONTROLS]),

    /// Read one info field of the running protocol
    GetInfo(u8),

    /// Protocol diagnostic hook
    Test(i8),
}

impl Command {
    /// Parse a decoded frame into a command
    ///
    /// # Arguments
    ///
    /// * `opcode` - Opcode byte from the frame
    /// * `payload` - Frame payload
    ///
    /// # Errors
    ///
    /// Returns error if the opcode is unknown or the payload has the wrong
    /// length for it.
    pub fn parse(opcode: u8, payload: &[u8]) -> Result<Self, CommandError> {
        let command = match Opcode::try_from(opcode)? {
            Opcode::Ready => Command::Ready,
            Opcode::SetRfProtocol => {
                let bytes = fixed::<4>(opcode, payload)?;
                Command::SetRfProtocol(ProtocolSelection::from_u32(u32::from_be_bytes(bytes)))
            }
            Opcode::StartRf => Command::StartRf,
            Opcode::StopRf => Command::StopRf,
            Opcode::InjectControls => {
                let bytes = fixed::<{ NUM_CONTROLS * 2 }>(opcode, payload)?;
                let mut values = [0i16; NUM_CONTROLS];
                for (value, pair) in values.iter_mut().zip(bytes.chunks_exact(2)) {
                    *value = i16::from_be_bytes([pair[0], pair[1]]);
                }
                Command::InjectControls(values)
            }
            Opcode::GetInfo => Command::GetInfo(fixed::<1>(opcode, payload)?[0]),
            Opcode::Test => match payload {
                [] => Command::Test(0),
                [id] => Command::Test(*id as i8),
                _ => {
                    return Err(CommandError::InvalidPayload {
                        opcode,
                        expected: 1,
                        actual: payload.len(),
                    })
                }
            },
        };
        Ok(command)
    }

    pub fn opcode(&self) -> Opcode {
        match self {
            Command::Ready => Opcode::Ready,
            Command::SetRfProtocol(_) => Opcode::SetRfProtocol,
            Command::StartRf => Opcode::StartRf,
            Command::StopRf => Opcode::StopRf,
            Command::InjectControls(_) => Opcode::InjectControls,
            Command::GetInfo(_) => Opcode::GetInfo,
            Command::Test(_) => Opcode::Test,
        }
    }
}

fn fixed<const N: usize>(opcode: u8, payload: &[u8]) -> Result<[u8; N], CommandError> {
    payload
        .try_into()
        .map_err(|_| CommandError::InvalidPayload {
            opcode,
            expected: N,
            actual: payload.len(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_values() {
        assert_eq!(Opcode::Ready as u8, 0);
        assert_eq!(Opcode::InjectControls as u8, 4);
        assert_eq!(Opcode::Test as u8, 110);
        assert_eq!(Opcode::try_from(5), Ok(Opcode::GetInfo));
        assert_eq!(Opcode::try_from(6), Err(CommandError::UnknownOpcode(6)));
    }

    #[test]
    fn test_parse_set_rf_protocol() {
        let command = Command::parse(1, &[0x00, 0x00, 0x00, 0x01]).unwrap();
        assert_eq!(
            command,
            Command::SetRfProtocol(ProtocolSelection {
                module: 0,
                protocol: 0,
                options: 1
            })
        );
        assert_eq!(command.opcode(), Opcode::SetRfProtocol);
    }

    #[test]
    fn test_parse_inject_controls_big_endian() {
        let mut payload = [0u8; 24];
        payload[0..2].copy_from_slice(&10_000i16.to_be_bytes());
        payload[2..4].copy_from_slice(&(-10_000i16).to_be_bytes());
        payload[22..24].copy_from_slice(&0x0102i16.to_be_bytes());

        let Command::InjectControls(values) = Command::parse(4, &payload).unwrap() else {
            panic!("expected InjectControls");
        };
        assert_eq!(values[0], 10_000);
        assert_eq!(values[1], -10_000);
        assert_eq!(values[11], 0x0102);
    }

    #[test]
    fn test_parse_rejects_wrong_lengths() {
        assert_eq!(
            Command::parse(4, &[0u8; 23]),
            Err(CommandError::InvalidPayload {
                opcode: 4,
                expected: 24,
                actual: 23
            })
        );
        assert!(Command::parse(1, &[0, 1]).is_err());
        assert!(Command::parse(5, &[]).is_err());
        assert!(Command::parse(110, &[1, 2]).is_err());
    }

    #[test]
    fn test_parse_test_default_and_signed() {
        assert_eq!(Command::parse(110, &[]), Ok(Command::Test(0)));
        assert_eq!(Command::parse(110, &[0xFF]), Ok(Command::Test(-1)));
    }

    #[test]
    fn test_parse_unknown_opcode() {
        assert_eq!(Command::parse(42, &[]), Err(CommandError::UnknownOpcode(42)));
    }
}
