//! Exchange rate orchestration: freshness checks, retries, fallbacks and the
//! background refresh task.

use crate::core::cache::RateCache;
use crate::core::rate::{FetchError, Rate, RateError, RateSnapshot, RateSource};
use crate::providers::util::with_backoff;
use chrono::Utc;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Tunables for fetching and reusing rates.
#[derive(Debug, Clone, PartialEq)]
pub struct RatePolicy {
    /// Total fetch attempts per refresh.
    pub max_attempts: u32,
    /// Wait after the first failed attempt; doubles after each further failure.
    pub backoff_unit: Duration,
    /// How long a fetched rate is served without refetching.
    pub freshness: Duration,
    /// How old a backup rate may be and still be used when fetching fails.
    pub backup_max_age: Duration,
    /// Period of the background refresh.
    pub refresh_interval: Duration,
    /// Served when fetching fails and no usable backup exists. `None` fails instead.
    pub fallback_rate: Option<Rate>,
}

impl Default for RatePolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_unit: Duration::from_secs(1),
            freshness: Duration::from_secs(3600),
            backup_max_age: Duration::from_secs(86400),
            refresh_interval: Duration::from_secs(3600),
            fallback_rate: None,
        }
    }
}

struct Flight {
    generation: u64,
    outcome: Option<Result<Rate, RateError>>,
}

pub struct RateManager {
    source: Arc<dyn RateSource>,
    cache: RateCache,
    policy: RatePolicy,
    flight: Mutex<Flight>,
    completed: AtomicU64,
}

impl RateManager {
    pub fn new(source: Arc<dyn RateSource>, cache: RateCache, policy: RatePolicy) -> Self {
        Self {
            source,
            cache,
            policy,
            flight: Mutex::new(Flight {
                generation: 0,
                outcome: None,
            }),
            completed: AtomicU64::new(0),
        }
    }

    pub fn cache(&self) -> &RateCache {
        &self.cache
    }

    pub fn policy(&self) -> &RatePolicy {
        &self.policy
    }

    /// Returns the cached rate while it is fresh, otherwise refreshes.
    pub async fn get_rate(&self) -> Result<Rate, RateError> {
        if let Some(snapshot) = self.cache.snapshot()
            && snapshot.is_fresh_at(self.policy.freshness, Utc::now())
        {
            debug!(rate = %snapshot.rate, "Rate cache HIT");
            return Ok(snapshot.rate);
        }
        debug!("Rate cache MISS");
        self.refresh().await
    }

    /// Fetches a new rate, falling back to the backup or the configured
    /// fallback rate when every attempt fails.
    ///
    /// Only one refresh runs at a time. Callers that arrive while one is in
    /// flight wait for it and receive its outcome.
    pub async fn refresh(&self) -> Result<Rate, RateError> {
        let seen = self.completed.load(Ordering::Acquire);
        let mut flight = self.flight.lock().await;
        if flight.generation != seen
            && let Some(outcome) = &flight.outcome
        {
            debug!("Joined in-flight rate refresh");
            return outcome.clone();
        }

        let outcome = self.fetch_with_fallback().await;
        flight.generation += 1;
        flight.outcome = Some(outcome.clone());
        self.completed.store(flight.generation, Ordering::Release);
        outcome
    }

    async fn fetch_with_fallback(&self) -> Result<Rate, RateError> {
        let mut attempts = 0;
        let result = with_backoff(
            |attempt| {
                attempts = attempt + 1;
                self.source.fetch()
            },
            self.policy.max_attempts,
            self.policy.backoff_unit,
        )
        .await;

        match result {
            Ok(rate) => {
                self.cache.store(RateSnapshot::now(rate)).await;
                info!(%rate, attempts, "Exchange rate updated");
                Ok(rate)
            }
            Err(e) => self.fallback(attempts, e).await,
        }
    }

    async fn fallback(&self, attempts: u32, last_error: FetchError) -> Result<Rate, RateError> {
        if let Some(rate) = self.cache.load_backup(self.policy.backup_max_age).await {
            warn!(%rate, attempts, "All attempts failed, using backup rate");
            return Ok(rate);
        }
        if let Some(rate) = self.policy.fallback_rate {
            warn!(%rate, attempts, "All attempts failed and no usable backup, using fallback rate");
            return Ok(rate);
        }

        error!(attempts, error = %last_error, "Exchange rate unavailable");
        Err(RateError::Unavailable {
            attempts,
            last_error: last_error.to_string(),
        })
    }

    /// Loads a fresh backup into memory, or fetches once if there is none.
    /// Failures are logged, never returned.
    pub async fn warm_up(&self) -> Option<Rate> {
        if let Some(rate) = self.cache.restore(self.policy.freshness).await {
            return Some(rate);
        }
        match self.refresh().await {
            Ok(rate) => Some(rate),
            Err(e) => {
                error!(error = %e, "Failed to get initial exchange rate");
                None
            }
        }
    }

    /// Refreshes the rate every `refresh_interval`, starting one interval from
    /// now. Each refresh runs in its own task so a slow fetch never delays
    /// later ticks.
    pub fn spawn_refresher(self: &Arc<Self>) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        let period = manager.policy.refresh_interval.max(Duration::from_millis(1));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let manager = Arc::clone(&manager);
                tokio::spawn(async move {
                    debug!("Scheduled rate refresh starting");
                    match manager.refresh().await {
                        Ok(rate) => info!(%rate, "Scheduled rate refresh complete"),
                        Err(e) => error!(error = %e, "Scheduled rate refresh failed"),
                    }
                });
            }
        })
    }
}
