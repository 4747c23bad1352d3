//! # RC RF Bridge Library
//!
//! Drive toy-grade RC vehicles from a host computer through a 2.4GHz radio.
//!
//! The host sends framed commands over a serial line ([`hostlink`]); the
//! [`engine`] runs the selected RF [`protocol`] on a cooperative scheduler,
//! turning injected [`controls`] into packets for the [`radio`] transceiver.

pub mod checksum;
pub mod config;
pub mod controls;
pub mod engine;
pub mod error;
pub mod hostlink;
pub mod protocol;
pub mod radio;
pub mod serial;
pub mod telemetry;
