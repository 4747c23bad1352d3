//! # Telemetry Module
//!
//! Periodic link status logging to JSONL files with rotation.
//!
//! This module handles:
//! - Sampling engine and host link state into records
//! - Formatting as JSONL (JSON Lines)
//! - Managing file rotation (max N records per file)
//! - Retaining only last M files
//! - Writing on a blocking thread, off the protocol loop

pub mod logger;
pub mod types;
pub mod writer;

pub use self::logger::TelemetryLogger;
pub use self::types::LinkStatusRecord;
pub use self::writer::TelemetryWriter;
