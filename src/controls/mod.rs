//! # Controls Module
//!
//! Logical control channels and the store the host writes them into.
//!
//! This module handles:
//! - Channel identifiers (throttle, rudder, elevator, aileron, aux1..aux8)
//! - Clamping injected values to the symmetric channel range
//! - Scaling channel values to 8-bit wire encodings

pub mod scaling;

use tracing::debug;

/// Lowest value a control channel can take.
pub const CHAN_MIN_VALUE: i32 = -10_000;

/// Highest value a control channel can take.
pub const CHAN_MAX_VALUE: i32 = 10_000;

/// Number of control channels the host can inject.
pub const NUM_CONTROLS: usize = 12;

/// Logical control channel.
///
/// The discriminant is the channel's position in an `INJECT_CONTROLS` payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Channel {
    Throttle = 0,
    Rudder,
    Elevator,
    Aileron,
    Aux1,
    Aux2,
    Aux3,
    Aux4,
    Aux5,
    Aux6,
    Aux7,
    Aux8,
}

impl Channel {
    /// All channels in injection order.
    pub const ALL: [Channel; NUM_CONTROLS] = [
        Channel::Throttle,
        Channel::Rudder,
        Channel::Elevator,
        Channel::Aileron,
        Channel::Aux1,
        Channel::Aux2,
        Channel::Aux3,
        Channel::Aux4,
        Channel::Aux5,
        Channel::Aux6,
        Channel::Aux7,
        Channel::Aux8,
    ];

    /// Index of the channel in the control vector.
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Source of the current control channel values read by RF protocols.
pub trait ChannelInputSource {
    /// Current value of `channel`, within `[CHAN_MIN_VALUE, CHAN_MAX_VALUE]`.
    fn control(&self, channel: Channel) -> i32;
}

/// Clamp a raw channel value to `[CHAN_MIN_VALUE, CHAN_MAX_VALUE]`.
pub fn clamp_control(value: i32) -> i32 {
    value.clamp(CHAN_MIN_VALUE, CHAN_MAX_VALUE)
}

/// Control values injected by the host.
///
/// Throttle starts low and every other channel starts centred, so a link
/// started before the first injection transmits a safe command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlState {
    values: [i32; NUM_CONTROLS],
}

impl Default for ControlState {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlState {
    /// Creates a control store holding the initial (safe) values.
    #[must_use]
    pub fn new() -> Self {
        let mut values = [0; NUM_CONTROLS];
        values[Channel::Throttle.index()] = CHAN_MIN_VALUE;
        Self { values }
    }

    /// Replace every channel, clamping each value into range.
    pub fn set_all(&mut self, values: &[i16; NUM_CONTROLS]) {
        for (slot, &value) in self.values.iter_mut().zip(values.iter()) {
            *slot = clamp_control(i32::from(value));
        }
        debug!(
            "Controls updated: T={} R={} E={} A={}",
            self.values[0], self.values[1], self.values[2], self.values[3]
        );
    }

    /// Set a single channel, clamping into range.
    pub fn set(&mut self, channel: Channel, value: i32) {
        self.values[channel.index()] = clamp_control(value);
    }

    /// Restore the initial values.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// All channel values in injection order.
    pub fn values(&self) -> &[i32; NUM_CONTROLS] {
        &self.values
    }
}

impl ChannelInputSource for ControlState {
    fn control(&self, channel: Channel) -> i32 {
        self.values[channel.index()]
    }
}
