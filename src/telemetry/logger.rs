//! # Telemetry Logger
//!
//! Writes [`LinkStatusRecord`]s as JSON Lines.
//!
//! A new file is started every `max_records_per_file` records; only the
//! newest `max_files_to_keep` files are kept in the log directory.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info, warn};

use super::types::LinkStatusRecord;
use crate::config::TelemetryConfig;
use crate::error::{BridgeError, Result};

const FILE_PREFIX: &str = "telemetry_";
const FILE_EXTENSION: &str = "jsonl";

/// Rotating JSONL writer.
#[derive(Debug)]
pub struct TelemetryLogger {
    dir: PathBuf,
    max_records_per_file: usize,
    max_files_to_keep: usize,
    writer: Option<BufWriter<File>>,
    current_path: Option<PathBuf>,
    records_in_file: usize,
    sequence: u32,
}

impl TelemetryLogger {
    /// Create the logger, creating the log directory if needed
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created or a limit is zero
    pub fn new<P: AsRef<Path>>(
        dir: P,
        max_records_per_file: usize,
        max_files_to_keep: usize,
    ) -> Result<Self> {
        if max_records_per_file == 0 || max_files_to_keep == 0 {
            return Err(BridgeError::Telemetry(
                "file limits must be greater than 0".to_string(),
            ));
        }

        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        info!("Telemetry logging to {}", dir.display());

        Ok(Self {
            dir,
            max_records_per_file,
            max_files_to_keep,
            writer: None,
            current_path: None,
            records_in_file: 0,
            sequence: 0,
        })
    }

    pub fn from_config(config: &TelemetryConfig) -> Result<Self> {
        Self::new(
            &config.log_dir,
            config.max_records_per_file,
            config.max_files_to_keep,
        )
    }

    /// Append one record, rotating first if the current file is full
    pub fn log(&mut self, record: &LinkStatusRecord) -> Result<()> {
        if self.writer.is_none() || self.records_in_file >= self.max_records_per_file {
            self.rotate()?;
        }

        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| BridgeError::Telemetry("no open telemetry file".to_string()))?;

        serde_json::to_writer(&mut *writer, record)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        self.records_in_file += 1;

        Ok(())
    }

    /// Path of the file currently written to
    pub fn current_path(&self) -> Option<&Path> {
        self.current_path.as_deref()
    }

    fn rotate(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }

        let name = format!(
            "{}{}_{:04}.{}",
            FILE_PREFIX,
            Utc::now().format("%Y%m%d_%H%M%S"),
            self.sequence,
            FILE_EXTENSION
        );
        self.sequence = self.sequence.wrapping_add(1);

        let path = self.dir.join(name);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        debug!("Opened telemetry file {}", path.display());

        self.writer = Some(BufWriter::new(file));
        self.current_path = Some(path);
        self.records_in_file = 0;

        self.prune()
    }

    /// Delete the oldest files beyond `max_files_to_keep`
    fn prune(&self) -> Result<()> {
        let mut files = log_files(&self.dir)?;
        if files.len() <= self.max_files_to_keep {
            return Ok(());
        }

        files.sort();
        let excess = files.len() - self.max_files_to_keep;
        for path in files.into_iter().take(excess) {
            match fs::remove_file(&path) {
                Ok(()) => debug!("Removed old telemetry file {}", path.display()),
                Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
            }
        }
        Ok(())
    }
}

/// Telemetry files in `dir`, unsorted
pub fn log_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_log = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with(FILE_PREFIX))
            && path.extension().and_then(|ext| ext.to_str()) == Some(FILE_EXTENSION);
        if is_log {
            files.push(path);
        }
    }
    Ok(files)
}
