//! # Background Telemetry Writer
//!
//! Moves [`TelemetryLogger`] file I/O onto a blocking thread so the
//! protocol loop only ever enqueues records.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::logger::TelemetryLogger;
use super::types::LinkStatusRecord;

/// Records queued before new ones are dropped
pub const QUEUE_CAPACITY: usize = 64;

/// Handle to the writer thread.
#[derive(Debug)]
pub struct TelemetryWriter {
    tx: mpsc::Sender<LinkStatusRecord>,
    handle: JoinHandle<TelemetryLogger>,
    dropped: u64,
}

impl TelemetryWriter {
    /// Start writing records through `logger` on the blocking pool
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(mut logger: TelemetryLogger) -> Self {
        let (tx, mut rx) = mpsc::channel::<LinkStatusRecord>(QUEUE_CAPACITY);

        let handle = tokio::task::spawn_blocking(move || {
            while let Some(record) = rx.blocking_recv() {
                if let Err(e) = logger.log(&record) {
                    warn!("Telemetry write failed: {}", e);
                }
            }
            debug!("Telemetry writer finished");
            logger
        });

        Self {
            tx,
            handle,
            dropped: 0,
        }
    }

    /// Queue a record without waiting
    ///
    /// Returns `false` and counts the record as dropped when the queue is full.
    pub fn submit(&mut self, record: LinkStatusRecord) -> bool {
        match self.tx.try_send(record) {
            Ok(()) => true,
            Err(_) => {
                self.dropped += 1;
                warn!("Telemetry queue full, {} records dropped", self.dropped);
                false
            }
        }
    }

    /// Records dropped because the writer fell behind
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Drain the queue and wait for the writer thread
    pub async fn shutdown(self) -> Option<TelemetryLogger> {
        drop(self.tx);
        match self.handle.await {
            Ok(logger) => Some(logger),
            Err(e) => {
                warn!("Telemetry writer panicked: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::logger::log_files;
    use chrono::Utc;
    use std::fs;
    use tempfile::TempDir;

    fn record(acked: u64) -> LinkStatusRecord {
        LinkStatusRecord {
            timestamp: Utc::now(),
            protocol: Some("V2x2".to_string()),
            running: true,
            state: Some(3),
            hop_channel: Some(0x21),
            packet_counter: Some(acked as u32),
            commands_acked: acked,
            commands_rejected: 0,
        }
    }

    #[tokio::test]
    async fn test_records_written_off_loop() {
        let dir = TempDir::new().unwrap();
        let logger = TelemetryLogger::new(dir.path(), 100, 5).unwrap();
        let mut writer = TelemetryWriter::spawn(logger);

        for i in 0..10 {
            assert!(writer.submit(record(i)));
        }
        let logger = writer.shutdown().await.unwrap();

        let path = logger.current_path().unwrap().to_path_buf();
        let contents = fs::read_to_string(path).unwrap();
        assert_eq!(contents.lines().count(), 10);
        assert_eq!(log_files(dir.path()).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_without_records() {
        let dir = TempDir::new().unwrap();
        let logger = TelemetryLogger::new(dir.path(), 100, 5).unwrap();
        let writer = TelemetryWriter::spawn(logger);
        assert_eq!(writer.dropped(), 0);

        let logger = writer.shutdown().await.unwrap();
        assert!(logger.current_path().is_none());
    }
}
