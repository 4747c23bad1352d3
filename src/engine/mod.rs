//! # Engine Module
//!
//! Control surface the host commands act on.
//!
//! This module handles:
//! - Selecting, starting and stopping the RF protocol
//! - Moving the radio into the active protocol and back out again
//! - Holding injected control values and the stale-controls failsafe
//! - Driving the protocol from the single-slot [`Scheduler`]
//!
//! ## Usage
//!
//! ```
//! use rc_rf_bridge::engine::Engine;
//! use rc_rf_bridge::protocol::ProtocolSelection;
//! use rc_rf_bridge::radio::simulated::SimulatedRadio;
//!
//! let mut engine = Engine::new(SimulatedRadio::new(true), 0x1234_5678);
//! engine.select(ProtocolSelection::from_u32(0x0000_0001)).unwrap();
//! engine.start().unwrap();
//!
//! let mut now = 0;
//! while let Some(deadline) = engine.poll(now) {
//!     if now > 100 {
//!         break;
//!     }
//!     now = deadline;
//! }
//! assert!(engine.is_running());
//! ```

pub mod scheduler;

use tracing::{debug, info, warn};

use crate::controls::{ControlState, NUM_CONTROLS};
use crate::error::CommandError;
use crate::hostlink::dispatch::{CommandHandler, Reply};
use crate::hostlink::protocol::Command;
use crate::protocol::{LinkProtocol, LinkSnapshot, ProtocolKind, ProtocolSelection, RfProtocol};
use crate::radio::{RadioTransceiver, TxPower};

use self::scheduler::Scheduler;

/// Engine state as reported to telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineStatus {
    pub selection: Option<ProtocolSelection>,
    pub protocol: Option<ProtocolKind>,
    pub channel_count: usize,
    pub link: Option<LinkSnapshot>,
}

impl EngineStatus {
    pub fn running(&self) -> bool {
        self.link.is_some()
    }
}

/// Owns the radio, the selected protocol and the scheduler.
///
/// The radio lives in `radio` while idle and inside `protocol` while a link
/// runs; it is never in both.
#[derive(Debug)]
pub struct Engine<R: RadioTransceiver> {
    radio: Option<R>,
    protocol: Option<LinkProtocol<R>>,
    selection: Option<ProtocolSelection>,
    controls: ControlState,
    scheduler: Scheduler,
    controller_id: u32,
    power: TxPower,
    controls_timeout_ms: u64,
    last_controls_ms: u64,
    controls_stale: bool,
}

impl<R: RadioTransceiver> Engine<R> {
    pub fn new(radio: R, controller_id: u32) -> Self {
        Self {
            radio: Some(radio),
            protocol: None,
            selection: None,
            controls: ControlState::new(),
            scheduler: Scheduler::new(),
            controller_id,
            power: TxPower::default(),
            controls_timeout_ms: 0,
            last_controls_ms: 0,
            controls_stale: false,
        }
    }

    /// Transmit power applied to every protocol started from now on.
    #[must_use]
    pub fn with_power(mut self, power: TxPower) -> Self {
        self.power = power;
        self
    }

    /// Reset the controls when none arrived for `timeout_ms` while running.
    /// Zero disables the failsafe.
    #[must_use]
    pub fn with_controls_timeout(mut self, timeout_ms: u64) -> Self {
        self.controls_timeout_ms = timeout_ms;
        self
    }

    /// Remember the protocol to run, stopping any running link first.
    pub fn select(&mut self, selection: ProtocolSelection) -> Result<(), CommandError> {
        let kind = selection.kind()?;
        self.stop()?;
        self.selection = Some(selection);
        info!(
            "Selected {} (module {}, options {:#04x})",
            kind, selection.module, selection.options
        );
        Ok(())
    }

    /// Start (or restart) the selected protocol.
    pub fn start(&mut self) -> Result<(), CommandError> {
        let selection = self.selection.ok_or(CommandError::NoProtocolSelected)?;
        let kind = selection.kind()?;
        self.stop()?;

        // stop() has returned the radio if a link was running
        let radio = self.radio.take().ok_or(CommandError::NotRunning)?;
        let mut protocol = LinkProtocol::new(kind, radio, self.controller_id, selection.options);

        match protocol.init() {
            Ok(delay) => {
                protocol.set_power(self.power);
                self.scheduler.arm_after(delay);
                self.last_controls_ms = self.scheduler.now();
                self.controls_stale = false;
                self.protocol = Some(protocol);
                info!("Started {} (first call in {} ms)", kind, delay);
                Ok(())
            }
            Err(e) => {
                self.radio = Some(protocol.into_radio());
                Err(e.into())
            }
        }
    }

    /// Stop the running protocol, leaving the radio reset. Safe when idle.
    pub fn stop(&mut self) -> Result<(), CommandError> {
        self.scheduler.cancel();
        let Some(mut protocol) = self.protocol.take() else {
            return Ok(());
        };

        let kind = protocol.kind();
        let packets = protocol.snapshot().packet_counter;
        let closed = protocol.close();
        self.radio = Some(protocol.into_radio());
        info!("Stopped {} after {} packets", kind, packets);

        closed.map_err(CommandError::from)
    }

    pub fn inject_controls(&mut self, values: &[i16; NUM_CONTROLS]) {
        self.controls.set_all(values);
        self.last_controls_ms = self.scheduler.now();
        self.controls_stale = false;
    }

    /// Info field of the running protocol.
    pub fn info(&self, field_id: u8) -> Result<Reply, CommandError> {
        let protocol = self.protocol.as_ref().ok_or(CommandError::NotRunning)?;
        let mut buf = [0u8; 4];
        match protocol.info(field_id, &mut buf) {
            0 => Err(CommandError::UnsupportedInfoField(field_id)),
            len => Ok(Reply::from_slice(&buf[..len])),
        }
    }

    pub fn test(&mut self, id: i8) -> Result<(), CommandError> {
        let protocol = self.protocol.as_mut().ok_or(CommandError::NotRunning)?;
        protocol.test(id);
        Ok(())
    }

    /// Update the clock without running the protocol.
    pub fn sync_clock(&mut self, now_ms: u64) {
        self.scheduler.advance_to(now_ms);
    }

    /// Advance the clock to `now_ms`, run the protocol if its deadline has
    /// passed, and return the next deadline.
    pub fn poll(&mut self, now_ms: u64) -> Option<u64> {
        self.scheduler.advance_to(now_ms);
        self.check_controls_timeout();

        if self.scheduler.take_due() {
            if let Some(protocol) = self.protocol.as_mut() {
                let delay = protocol.call_state(&self.controls);
                self.scheduler.arm_after(delay);
            }
        }

        self.scheduler.deadline()
    }

    fn check_controls_timeout(&mut self) {
        if self.controls_timeout_ms == 0 || self.controls_stale || self.protocol.is_none() {
            return;
        }
        let silent_for = self.scheduler.now().saturating_sub(self.last_controls_ms);
        if silent_for >= self.controls_timeout_ms {
            warn!("No controls for {} ms, returning to safe values", silent_for);
            self.controls.reset();
            self.controls_stale = true;
        }
    }

    pub fn next_deadline(&self) -> Option<u64> {
        self.scheduler.deadline()
    }

    pub fn is_running(&self) -> bool {
        self.protocol.is_some()
    }

    pub fn controls(&self) -> &ControlState {
        &self.controls
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            selection: self.selection,
            protocol: self.protocol.as_ref().map(LinkProtocol::kind),
            channel_count: self
                .protocol
                .as_ref()
                .map_or(0, |protocol| protocol.channel_count()),
            link: self.protocol.as_ref().map(|protocol| protocol.snapshot()),
        }
    }
}

impl<R: RadioTransceiver> CommandHandler for Engine<R> {
    fn handle(&mut self, opcode: u8, payload: &[u8]) -> Result<Reply, CommandError> {
        let command = Command::parse(opcode, payload)?;
        debug!("Dispatching {:?}", command);

        match command {
            Command::Ready => Ok(Reply::from_slice(&[NUM_CONTROLS as u8])),
            Command::SetRfProtocol(selection) => self.select(selection).map(|_| Reply::empty()),
            Command::StartRf => self.start().map(|_| Reply::empty()),
            Command::StopRf => self.stop().map(|_| Reply::empty()),
            Command::InjectControls(values) => {
                self.inject_controls(&values);
                Ok(Reply::empty())
            }
            Command::GetInfo(field_id) => self.info(field_id),
            Command::Test(id) => self.test(id).map(|_| Reply::empty()),
        }
    }
}
