//! # Host Link Module
//!
//! Framed command protocol spoken with the host computer over the serial line.
//!
//! This module handles:
//! - Request framing (`$M<`, size, opcode, payload, additive checksum)
//! - Byte-at-a-time decoding with resynchronisation on garbage
//! - Command parsing and dispatch to a [`dispatch::CommandHandler`]
//! - Acknowledge (`$M>`) and negative acknowledge (`$M!`) responses

pub mod protocol;
pub mod encoder;
pub mod decoder;
pub mod dispatch;

pub use self::dispatch::{CommandHandler, HostLink, Reply};
