use crate::core::rate::{Rate, RateSnapshot};
use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// On-disk mirror of the last successfully fetched rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BackupRecord {
    pub rate: f64,
    /// Seconds since the Unix epoch, fractional.
    pub timestamp: f64,
}

impl BackupRecord {
    pub fn from_snapshot(snapshot: &RateSnapshot) -> Self {
        Self {
            rate: snapshot.rate.value(),
            timestamp: snapshot.fetched_at.timestamp_millis() as f64 / 1000.0,
        }
    }

    /// Returns `None` if the record holds an invalid rate or timestamp.
    pub fn to_snapshot(&self) -> Option<RateSnapshot> {
        let rate = Rate::new(self.rate)?;
        if !self.timestamp.is_finite() {
            return None;
        }
        let fetched_at: DateTime<Utc> = Utc
            .timestamp_millis_opt((self.timestamp * 1000.0).round() as i64)
            .single()?;
        Some(RateSnapshot::new(rate, fetched_at))
    }
}

/// Single-record JSON file. Writes go through a sibling temp file and a
/// rename so readers never see a partially written record.
#[derive(Debug, Clone)]
pub struct BackupFile {
    path: PathBuf,
}

impl BackupFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the record. Missing or corrupt files read as `None`.
    pub async fn read(&self) -> Option<BackupRecord> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "No backup rate available");
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "Ignoring corrupt backup rate");
                None
            }
        }
    }

    pub async fn write(&self, record: &BackupRecord) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let tmp_path = self.tmp_path();
        let contents = serde_json::to_vec(record)?;
        tokio::fs::write(&tmp_path, contents)
            .await
            .with_context(|| format!("Failed to write backup to {}", tmp_path.display()))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .with_context(|| format!("Failed to replace backup at {}", self.path.display()))?;

        debug!(path = %self.path.display(), rate = record.rate, "Backup rate written");
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "last_rate.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
