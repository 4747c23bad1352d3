//! Telemetry record types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::engine::EngineStatus;
use crate::hostlink::dispatch::LinkStats;

/// One line of the telemetry log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkStatusRecord {
    pub timestamp: DateTime<Utc>,

    /// Selected protocol name, if any
    pub protocol: Option<String>,

    pub running: bool,

    /// Protocol state code (only while running)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<u8>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub hop_channel: Option<u8>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub packet_counter: Option<u32>,

    /// Host commands acknowledged so far
    pub commands_acked: u64,

    /// Host commands rejected so far (including checksum errors)
    pub commands_rejected: u64,
}

impl LinkStatusRecord {
    pub fn new(timestamp: DateTime<Utc>, status: &EngineStatus, stats: LinkStats) -> Self {
        let protocol = status
            .protocol
            .or_else(|| status.selection.and_then(|selection| selection.kind().ok()))
            .map(|kind| kind.to_string());

        Self {
            timestamp,
            protocol,
            running: status.running(),
            state: status.link.map(|link| link.state),
            hop_channel: status.link.map(|link| link.hop_channel),
            packet_counter: status.link.map(|link| link.packet_counter),
            commands_acked: stats.acked,
            commands_rejected: stats.rejected + stats.checksum_errors,
        }
    }

    /// Sample with the current time.
    pub fn now(status: &EngineStatus, stats: LinkStats) -> Self {
        Self::new(Utc::now(), status, stats)
    }
}
