//! # Telemetry Module
//!
//! Logs routed axis values to JSONL files with rotation.
//!
//! This module handles:
//! - Throttling to at most one batch per `log_interval_ms`
//! - Formatting each axis write as one JSON line
//! - Rotating to a new file after `max_records_per_file` records
//! - Retaining only the newest `max_files_to_keep` files
//!
//! ```text
//! {"timestamp":"2026-10-17T09:12:44.120Z","axis":"left_x","value":0.4737}
//! ```

use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::TelemetryConfig;
use crate::error::Result;
use crate::mapping::router::AxisWrite;

const FILE_PREFIX: &str = "axes_";
const FILE_EXTENSION: &str = "jsonl";

/// One line of the telemetry log.
#[derive(Debug, Serialize)]
struct AxisRecord {
    timestamp: DateTime<Utc>,
    axis: String,
    value: f64,
}

/// Rotating JSONL writer for axis values.
#[derive(Debug)]
pub struct AxisLogger {
    dir: PathBuf,
    max_records_per_file: usize,
    max_files_to_keep: usize,
    interval: Duration,
    last_logged: Option<Instant>,
    writer: Option<BufWriter<File>>,
    records_in_file: usize,
    files: VecDeque<PathBuf>,
    sequence: u64,
}

impl AxisLogger {
    /// Opens a logger in `dir`, creating the directory if needed.
    ///
    /// Existing log files in `dir` count toward `max_files_to_keep`.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the directory cannot be created or listed.
    pub fn new<P: AsRef<Path>>(
        dir: P,
        max_records_per_file: usize,
        max_files_to_keep: usize,
        interval: Duration,
    ) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let mut existing: Vec<PathBuf> = fs::read_dir(&dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_log_file(path))
            .collect();
        existing.sort();

        info!("Telemetry logging to {}", dir.display());

        Ok(Self {
            dir,
            max_records_per_file: max_records_per_file.max(1),
            max_files_to_keep: max_files_to_keep.max(1),
            interval,
            last_logged: None,
            writer: None,
            records_in_file: 0,
            files: existing.into(),
            sequence: 0,
        })
    }

    /// Builds a logger from the `[telemetry]` section.
    ///
    /// # Errors
    ///
    /// See [`AxisLogger::new`].
    pub fn from_config(config: &TelemetryConfig) -> Result<Self> {
        Self::new(
            &config.log_dir,
            config.max_records_per_file,
            config.max_files_to_keep,
            Duration::from_millis(config.log_interval_ms),
        )
    }

    /// Logs a batch of writes unless the previous batch was less than one
    /// interval ago. Returns whether the batch was written.
    ///
    /// # Errors
    ///
    /// Returns `Io` or `Protocol` on write or encoding failure.
    pub fn record(&mut self, writes: &[AxisWrite]) -> Result<bool> {
        if writes.is_empty() {
            return Ok(false);
        }
        let now = Instant::now();
        if let Some(last) = self.last_logged {
            if now.duration_since(last) < self.interval {
                return Ok(false);
            }
        }
        self.last_logged = Some(now);

        let timestamp = Utc::now();
        for write in writes {
            let record = AxisRecord {
                timestamp,
                axis: write.axis.to_string(),
                value: write.value,
            };
            self.write_record(&record)?;
        }
        Ok(true)
    }

    /// Flushes buffered records to disk.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the flush fails.
    pub fn flush(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }

    /// Paths of the retained log files, oldest first.
    #[must_use]
    pub fn files(&self) -> Vec<PathBuf> {
        self.files.iter().cloned().collect()
    }

    fn write_record(&mut self, record: &AxisRecord) -> Result<()> {
        if self.writer.is_none() || self.records_in_file >= self.max_records_per_file {
            self.rotate()?;
        }
        let line = serde_json::to_string(record)?;
        if let Some(writer) = self.writer.as_mut() {
            writeln!(writer, "{}", line)?;
        }
        self.records_in_file += 1;
        Ok(())
    }

    fn rotate(&mut self) -> Result<()> {
        self.flush()?;

        self.sequence += 1;
        let name = format!(
            "{}{}_{:06}.{}",
            FILE_PREFIX,
            Utc::now().format("%Y%m%d_%H%M%S_%3f"),
            self.sequence,
            FILE_EXTENSION
        );
        let path = self.dir.join(name);
        let file = File::create(&path)?;
        debug!("Telemetry file {}", path.display());

        self.writer = Some(BufWriter::new(file));
        self.records_in_file = 0;
        self.files.push_back(path);

        while self.files.len() > self.max_files_to_keep {
            if let Some(old) = self.files.pop_front() {
                if let Err(e) = fs::remove_file(&old) {
                    warn!("Failed to remove old telemetry file {}: {}", old.display(), e);
                }
            }
        }
        Ok(())
    }
}

impl Drop for AxisLogger {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!("Failed to flush telemetry log: {}", e);
        }
    }
}

fn is_log_file(path: &Path) -> bool {
    let name_matches = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with(FILE_PREFIX))
        .unwrap_or(false);
    name_matches && path.extension().and_then(|e| e.to_str()) == Some(FILE_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::axis::{AxisId, GamepadAxis};
    use tempfile::tempdir;

    fn write(value: f64) -> AxisWrite {
        AxisWrite {
            axis: AxisId::Gamepad(GamepadAxis::LeftX),
            value,
        }
    }

    fn read_lines(path: &Path) -> Vec<serde_json::Value> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_records_are_jsonl() {
        let dir = tempdir().unwrap();
        let mut logger = AxisLogger::new(dir.path(), 100, 5, Duration::ZERO).unwrap();

        assert!(logger
            .record(&[
                write(0.25),
                AxisWrite {
                    axis: AxisId::Custom(3),
                    value: -1.0
                }
            ])
            .unwrap());
        logger.flush().unwrap();

        let files = logger.files();
        assert_eq!(files.len(), 1);
        let lines = read_lines(&files[0]);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["axis"], "left_x");
        assert_eq!(lines[0]["value"], 0.25);
        assert_eq!(lines[1]["axis"], "axis3");
        assert!(lines[0]["timestamp"].is_string());
    }

    #[test]
    fn test_throttled_by_interval() {
        let dir = tempdir().unwrap();
        let mut logger = AxisLogger::new(dir.path(), 100, 5, Duration::from_secs(3600)).unwrap();

        assert!(logger.record(&[write(0.1)]).unwrap());
        assert!(!logger.record(&[write(0.2)]).unwrap());
        logger.flush().unwrap();

        assert_eq!(read_lines(&logger.files()[0]).len(), 1);
    }

    #[test]
    fn test_empty_batch_is_ignored() {
        let dir = tempdir().unwrap();
        let mut logger = AxisLogger::new(dir.path(), 100, 5, Duration::ZERO).unwrap();
        assert!(!logger.record(&[]).unwrap());
        assert!(logger.files().is_empty());
    }

    #[test]
    fn test_rotation_and_retention() {
        let dir = tempdir().unwrap();
        let mut logger = AxisLogger::new(dir.path(), 2, 3, Duration::ZERO).unwrap();

        for i in 0..9 {
            logger.record(&[write(f64::from(i) / 10.0)]).unwrap();
        }
        logger.flush().unwrap();

        // 9 records at 2 per file = 5 files, newest 3 kept
        let files = logger.files();
        assert_eq!(files.len(), 3);
        let on_disk = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(on_disk, 3);

        let last = read_lines(files.last().unwrap());
        assert_eq!(last.len(), 1);
        assert_eq!(last[0]["value"], 0.8);
    }

    #[test]
    fn test_existing_files_count_toward_retention() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("axes_20000101_000000_000_000001.jsonl"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "keep me").unwrap();

        let mut logger = AxisLogger::new(dir.path(), 1, 1, Duration::ZERO).unwrap();
        logger.record(&[write(0.5)]).unwrap();

        assert!(!dir.path().join("axes_20000101_000000_000_000001.jsonl").exists());
        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn test_from_config_creates_directory() {
        let dir = tempdir().unwrap();
        let log_dir = dir.path().join("nested").join("logs");
        let config = TelemetryConfig {
            enabled: true,
            log_dir: log_dir.to_string_lossy().into_owned(),
            max_records_per_file: 10,
            max_files_to_keep: 2,
            log_interval_ms: 100,
        };

        let logger = AxisLogger::from_config(&config).unwrap();
        assert!(log_dir.is_dir());
        assert!(logger.files().is_empty());
    }
}
