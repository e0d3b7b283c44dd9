use crate::core::rate::{Rate, RateSnapshot};
use crate::store::backup::{BackupFile, BackupRecord};
use chrono::{DateTime, Utc};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Holds the last good rate in memory and mirrors it to a backup file.
///
/// The in-memory snapshot is an `Arc` swapped whole under a lock that is only
/// held long enough to clone or replace the pointer, so a reader never sees a
/// rate paired with another fetch's timestamp.
pub struct RateCache {
    current: RwLock<Option<Arc<RateSnapshot>>>,
    backup: BackupFile,
}

impl RateCache {
    pub fn new(backup: BackupFile) -> Self {
        Self {
            current: RwLock::new(None),
            backup,
        }
    }

    pub fn snapshot(&self) -> Option<Arc<RateSnapshot>> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn current(&self) -> Option<Rate> {
        self.snapshot().map(|s| s.rate)
    }

    pub fn is_fresh(&self, max_age: Duration) -> bool {
        self.is_fresh_at(max_age, Utc::now())
    }

    pub fn is_fresh_at(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        self.snapshot()
            .is_some_and(|s| s.is_fresh_at(max_age, now))
    }

    /// Replaces the in-memory snapshot, then persists it. A failed backup
    /// write is logged and otherwise ignored.
    pub async fn store(&self, snapshot: RateSnapshot) {
        let record = BackupRecord::from_snapshot(&snapshot);
        self.swap(snapshot);

        if let Err(e) = self.backup.write(&record).await {
            warn!(
                path = %self.backup.path().display(),
                error = %e,
                "Failed to persist backup rate"
            );
        }
    }

    /// Reads the backup rate if it is younger than `max_age`.
    pub async fn load_backup(&self, max_age: Duration) -> Option<Rate> {
        self.load_backup_at(max_age, Utc::now()).await
    }

    pub async fn load_backup_at(&self, max_age: Duration, now: DateTime<Utc>) -> Option<Rate> {
        self.fresh_backup(max_age, now).await.map(|s| s.rate)
    }

    /// Seeds the in-memory snapshot from the backup, keeping the backup's
    /// original timestamp, if it is younger than `max_age`.
    pub async fn restore(&self, max_age: Duration) -> Option<Rate> {
        let snapshot = self.fresh_backup(max_age, Utc::now()).await?;
        let rate = snapshot.rate;
        info!(%rate, fetched_at = %snapshot.fetched_at, "Restored rate from backup");
        self.swap(snapshot);
        Some(rate)
    }

    async fn fresh_backup(&self, max_age: Duration, now: DateTime<Utc>) -> Option<RateSnapshot> {
        let snapshot = self.backup.read().await?.to_snapshot()?;
        if snapshot.is_fresh_at(max_age, now) {
            Some(snapshot)
        } else {
            debug!(fetched_at = %snapshot.fetched_at, "Backup rate is stale");
            None
        }
    }

    fn swap(&self, snapshot: RateSnapshot) {
        let snapshot = Arc::new(snapshot);
        match self.current.write() {
            Ok(mut guard) => *guard = Some(snapshot),
            Err(poisoned) => *poisoned.into_inner() = Some(snapshot),
        }
    }
}
