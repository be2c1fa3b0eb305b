//! Pipeline activity counters.
//!
//! Counts what the pipeline has done (readings accepted and rejected,
//! forecasts served, alerts raised) without keeping any reading content.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters for the current session, optionally persisted across runs.
#[derive(Debug)]
pub struct PipelineStats {
    /// Readings that entered the buffer
    readings_accepted: AtomicU64,
    /// Readings rejected as incomplete
    readings_rejected: AtomicU64,
    /// Forecast summaries returned
    forecasts_served: AtomicU64,
    /// Forecast requests answered with insufficient data
    insufficient_data: AtomicU64,
    /// Forecast requests that failed for any other reason
    forecasts_failed: AtomicU64,
    /// Alerts raised by the alert checks
    alerts_raised: AtomicU64,
    /// Session start time
    session_start: DateTime<Utc>,
    /// Path for persisting stats
    persist_path: Option<PathBuf>,
}

impl PipelineStats {
    /// Create empty counters.
    pub fn new() -> Self {
        Self {
            readings_accepted: AtomicU64::new(0),
            readings_rejected: AtomicU64::new(0),
            forecasts_served: AtomicU64::new(0),
            insufficient_data: AtomicU64::new(0),
            forecasts_failed: AtomicU64::new(0),
            alerts_raised: AtomicU64::new(0),
            session_start: Utc::now(),
            persist_path: None,
        }
    }

    /// Create counters persisted at `path`, resuming any saved totals.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut stats = Self::new();
        stats.persist_path = Some(path);

        if let Err(e) = stats.load() {
            tracing::warn!("could not load previous pipeline stats: {e}");
        }

        stats
    }

    pub fn record_reading_accepted(&self) {
        self.readings_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reading_rejected(&self) {
        self.readings_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_forecast_served(&self) {
        self.forecasts_served.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_insufficient_data(&self) {
        self.insufficient_data.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_forecast_failed(&self) {
        self.forecasts_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a batch of raised alerts.
    pub fn record_alerts(&self, count: u64) {
        self.alerts_raised.fetch_add(count, Ordering::Relaxed);
    }

    /// Get the current counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            readings_accepted: self.readings_accepted.load(Ordering::Relaxed),
            readings_rejected: self.readings_rejected.load(Ordering::Relaxed),
            forecasts_served: self.forecasts_served.load(Ordering::Relaxed),
            insufficient_data: self.insufficient_data.load(Ordering::Relaxed),
            forecasts_failed: self.forecasts_failed.load(Ordering::Relaxed),
            alerts_raised: self.alerts_raised.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.snapshot();
        format!(
            "Pipeline Statistics:\n\
             - Readings accepted: {}\n\
             - Readings rejected: {}\n\
             - Forecasts served: {}\n\
             - Insufficient-data responses: {}\n\
             - Failed forecasts: {}\n\
             - Alerts raised: {}\n\
             - Session duration: {} seconds",
            stats.readings_accepted,
            stats.readings_rejected,
            stats.forecasts_served,
            stats.insufficient_data,
            stats.forecasts_failed,
            stats.alerts_raised,
            stats.session_duration_secs
        )
    }

    /// Save counters to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let stats = self.snapshot();
            let persisted = PersistedStats {
                readings_accepted: stats.readings_accepted,
                readings_rejected: stats.readings_rejected,
                forecasts_served: stats.forecasts_served,
                insufficient_data: stats.insufficient_data,
                forecasts_failed: stats.forecasts_failed,
                alerts_raised: stats.alerts_raised,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;

            std::fs::write(path, json)?;
        }
        Ok(())
    }

    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let persisted: PersistedStats =
                    serde_json::from_str(&content).map_err(std::io::Error::other)?;

                self.readings_accepted
                    .store(persisted.readings_accepted, Ordering::Relaxed);
                self.readings_rejected
                    .store(persisted.readings_rejected, Ordering::Relaxed);
                self.forecasts_served
                    .store(persisted.forecasts_served, Ordering::Relaxed);
                self.insufficient_data
                    .store(persisted.insufficient_data, Ordering::Relaxed);
                self.forecasts_failed
                    .store(persisted.forecasts_failed, Ordering::Relaxed);
                self.alerts_raised
                    .store(persisted.alerts_raised, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    /// Reset all counters.
    pub fn reset(&self) {
        self.readings_accepted.store(0, Ordering::Relaxed);
        self.readings_rejected.store(0, Ordering::Relaxed);
        self.forecasts_served.store(0, Ordering::Relaxed);
        self.insufficient_data.store(0, Ordering::Relaxed);
        self.forecasts_failed.store(0, Ordering::Relaxed);
        self.alerts_raised.store(0, Ordering::Relaxed);
    }
}

impl Default for PipelineStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub readings_accepted: u64,
    pub readings_rejected: u64,
    pub forecasts_served: u64,
    pub insufficient_data: u64,
    pub forecasts_failed: u64,
    pub alerts_raised: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedStats {
    #[serde(default)]
    readings_accepted: u64,
    #[serde(default)]
    readings_rejected: u64,
    #[serde(default)]
    forecasts_served: u64,
    #[serde(default)]
    insufficient_data: u64,
    #[serde(default)]
    forecasts_failed: u64,
    #[serde(default)]
    alerts_raised: u64,
    last_updated: DateTime<Utc>,
}

/// Counters shared between the ingestion loop and request handlers.
pub type SharedPipelineStats = Arc<PipelineStats>;
