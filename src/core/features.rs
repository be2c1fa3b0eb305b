//! Time-series feature engineering over a window of readings.
//!
//! Every column of the output is described by a [`ColumnKind`], and the
//! ordered list of kinds forms a [`FeatureSchema`]. Column order is therefore
//! fixed when the schema is built, not when values are computed.
//!
//! Rolling statistics are causal (current and past values only) and use
//! whatever samples are available at the start of the series, so they never
//! produce missing values. Lags and trends do, and any row with a missing
//! value is dropped. With the default offsets the first ten rows of a window
//! are always dropped.

use crate::collector::types::Reading;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::HashMap;
use std::sync::Arc;

/// A per-reading input series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Temperature,
    Humidity,
    Gas,
    Light,
    Sound,
    Occupancy,
    HighEngagement,
    LowEngagement,
}

impl Signal {
    /// All signals in raw-column order.
    pub const ALL: [Signal; 8] = [
        Signal::Temperature,
        Signal::Humidity,
        Signal::Gas,
        Signal::Light,
        Signal::Sound,
        Signal::Occupancy,
        Signal::HighEngagement,
        Signal::LowEngagement,
    ];

    /// Column name of the raw signal.
    pub fn name(&self) -> &'static str {
        match self {
            Signal::Temperature => "temperature",
            Signal::Humidity => "humidity",
            Signal::Gas => "gas",
            Signal::Light => "light",
            Signal::Sound => "sound",
            Signal::Occupancy => "occupancy",
            Signal::HighEngagement => "high_engagement",
            Signal::LowEngagement => "low_engagement",
        }
    }

    /// Look up a signal by column name.
    pub fn from_name(name: &str) -> Option<Signal> {
        Signal::ALL.iter().copied().find(|s| s.name() == name)
    }

    /// Parse a comma-separated list of signal names, skipping unknown entries.
    pub fn list_from_csv(s: &str) -> Vec<Signal> {
        s.split(',')
            .filter_map(|name| Signal::from_name(&name.trim().to_lowercase()))
            .collect()
    }

    /// The signal's value in a reading.
    pub fn value(&self, reading: &Reading) -> f64 {
        match self {
            Signal::Temperature => reading.temperature,
            Signal::Humidity => reading.humidity,
            Signal::Gas => reading.gas,
            Signal::Light => reading.light,
            Signal::Sound => reading.sound,
            Signal::Occupancy => reading.occupancy as f64,
            Signal::HighEngagement => reading.high_engagement as f64,
            Signal::LowEngagement => reading.low_engagement as f64,
        }
    }
}

/// How a single output column is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    Raw(Signal),
    RollingMean(Signal, usize),
    RollingStd(Signal, usize),
    RollingMin(Signal, usize),
    RollingMax(Signal, usize),
    Lag(Signal, usize),
    /// Value minus the value `n` steps earlier
    Trend(Signal, usize),
    /// `high_engagement / (low_engagement + 1)`
    EngagementRatio,
    /// `occupancy * high_engagement`
    OccupancyEngagement,
    Hour,
    Minute,
}

impl ColumnKind {
    /// Column name as stored in the feature-column artifact.
    pub fn name(&self) -> String {
        match self {
            ColumnKind::Raw(s) => s.name().to_string(),
            ColumnKind::RollingMean(s, w) => format!("{}_roll_mean_{w}", s.name()),
            ColumnKind::RollingStd(s, w) => format!("{}_roll_std_{w}", s.name()),
            ColumnKind::RollingMin(s, w) => format!("{}_roll_min_{w}", s.name()),
            ColumnKind::RollingMax(s, w) => format!("{}_roll_max_{w}", s.name()),
            ColumnKind::Lag(s, n) => format!("{}_lag_{n}", s.name()),
            ColumnKind::Trend(s, n) => format!("{}_trend_{n}", s.name()),
            ColumnKind::EngagementRatio => "engagement_ratio".to_string(),
            ColumnKind::OccupancyEngagement => "occupancy_engagement".to_string(),
            ColumnKind::Hour => "hour".to_string(),
            ColumnKind::Minute => "minute".to_string(),
        }
    }

    /// Number of earlier rows this column needs before it has a value.
    pub fn lookback(&self) -> usize {
        match self {
            ColumnKind::Lag(_, n) | ColumnKind::Trend(_, n) => *n,
            _ => 0,
        }
    }
}

/// Which signals get which features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Signals that are forecast (full rolling stats, lags and trends)
    pub environmental: Vec<Signal>,
    /// Signals that only inform the forecast (reduced feature set)
    pub complementing: Vec<Signal>,
    pub environmental_windows: Vec<usize>,
    pub complementing_windows: Vec<usize>,
    pub environmental_lags: Vec<usize>,
    pub complementing_lags: Vec<usize>,
    pub trend_offsets: Vec<usize>,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            environmental: vec![
                Signal::Temperature,
                Signal::Humidity,
                Signal::Gas,
                Signal::Light,
                Signal::Sound,
            ],
            complementing: vec![
                Signal::Occupancy,
                Signal::HighEngagement,
                Signal::LowEngagement,
            ],
            environmental_windows: vec![5, 10, 15, 20],
            complementing_windows: vec![5, 10, 15],
            environmental_lags: vec![1, 2, 3, 5, 10],
            complementing_lags: vec![1, 2, 5],
            trend_offsets: vec![5, 10],
        }
    }
}

/// Ordered list of output columns with a name index.
#[derive(Debug, Clone)]
pub struct FeatureSchema {
    columns: Vec<ColumnKind>,
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl FeatureSchema {
    /// Build the canonical column order for a configuration.
    ///
    /// Raw signals first, then per environmental signal its rolling
    /// mean/std/min/max for each window, lags and trends, then per
    /// complementing signal its rolling mean/std and lags, then the
    /// interaction and time columns. A column that would repeat an earlier
    /// name is skipped.
    pub fn from_config(config: &FeatureConfig) -> Self {
        let mut kinds = Vec::new();

        kinds.extend(Signal::ALL.iter().map(|&s| ColumnKind::Raw(s)));

        for &signal in &config.environmental {
            for &w in &config.environmental_windows {
                kinds.push(ColumnKind::RollingMean(signal, w));
                kinds.push(ColumnKind::RollingStd(signal, w));
                kinds.push(ColumnKind::RollingMin(signal, w));
                kinds.push(ColumnKind::RollingMax(signal, w));
            }
            for &lag in &config.environmental_lags {
                kinds.push(ColumnKind::Lag(signal, lag));
            }
            for &offset in &config.trend_offsets {
                kinds.push(ColumnKind::Trend(signal, offset));
            }
        }

        for &signal in &config.complementing {
            for &w in &config.complementing_windows {
                kinds.push(ColumnKind::RollingMean(signal, w));
                kinds.push(ColumnKind::RollingStd(signal, w));
            }
            for &lag in &config.complementing_lags {
                kinds.push(ColumnKind::Lag(signal, lag));
            }
        }

        kinds.push(ColumnKind::EngagementRatio);
        kinds.push(ColumnKind::OccupancyEngagement);
        kinds.push(ColumnKind::Hour);
        kinds.push(ColumnKind::Minute);

        let mut schema = Self {
            columns: Vec::with_capacity(kinds.len()),
            names: Vec::with_capacity(kinds.len()),
            index: HashMap::with_capacity(kinds.len()),
        };
        for kind in kinds {
            let name = kind.name();
            if schema.index.contains_key(&name) {
                continue;
            }
            schema.index.insert(name.clone(), schema.columns.len());
            schema.names.push(name);
            schema.columns.push(kind);
        }
        schema
    }

    /// Column names in order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Column kinds in order.
    pub fn columns(&self) -> &[ColumnKind] {
        &self.columns
    }

    /// Position of a named column.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if the schema has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Largest lookback of any column.
    pub fn max_lookback(&self) -> usize {
        self.columns.iter().map(ColumnKind::lookback).max().unwrap_or(0)
    }
}

/// One complete feature row.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    /// Position of the source reading in the input window
    pub source_index: usize,
    pub values: Vec<f64>,
}

/// Output of the feature engineer: rows that have every column.
#[derive(Debug, Clone)]
pub struct FeatureTable {
    schema: Arc<FeatureSchema>,
    rows: Vec<FeatureRow>,
}

impl FeatureTable {
    /// Build a table from rows that follow `schema`.
    pub fn new(schema: Arc<FeatureSchema>, rows: Vec<FeatureRow>) -> Self {
        Self { schema, rows }
    }

    /// The table's schema.
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// All rows, oldest first.
    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// An empty table means "not enough data yet".
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The most recent row.
    pub fn latest(&self) -> Option<FeatureView<'_>> {
        self.rows.last().map(|row| FeatureView {
            schema: &self.schema,
            row,
        })
    }
}

/// A feature row together with its column names.
#[derive(Debug, Clone, Copy)]
pub struct FeatureView<'a> {
    schema: &'a FeatureSchema,
    row: &'a FeatureRow,
}

impl<'a> FeatureView<'a> {
    /// Build a view over a row that follows `schema`.
    pub fn new(schema: &'a FeatureSchema, row: &'a FeatureRow) -> Self {
        Self { schema, row }
    }

    /// Value of a named column.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.schema
            .position(name)
            .and_then(|i| self.row.values.get(i).copied())
    }

    /// Column names in order.
    pub fn names(&self) -> &'a [String] {
        self.schema.names()
    }

    /// Values in column order.
    pub fn values(&self) -> &'a [f64] {
        &self.row.values
    }

    /// Position of the source reading in the input window.
    pub fn source_index(&self) -> usize {
        self.row.source_index
    }
}

/// Turns a window of readings into a feature table.
#[derive(Debug, Clone)]
pub struct FeatureEngineer {
    config: FeatureConfig,
    schema: Arc<FeatureSchema>,
}

impl FeatureEngineer {
    /// Create an engineer for a configuration.
    pub fn new(config: FeatureConfig) -> Self {
        let schema = Arc::new(FeatureSchema::from_config(&config));
        Self { config, schema }
    }

    /// The configuration in use.
    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// The output schema.
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Minimum number of readings needed for one complete row.
    pub fn min_rows(&self) -> usize {
        self.schema.max_lookback() + 1
    }

    /// Compute the feature table for `readings` (oldest first).
    ///
    /// Rows lacking any value are dropped, so fewer than
    /// [`min_rows`](Self::min_rows) readings yield an empty table.
    pub fn engineer(&self, readings: &[Reading]) -> FeatureTable {
        let series: HashMap<Signal, Vec<f64>> = Signal::ALL
            .iter()
            .map(|&s| (s, readings.iter().map(|r| s.value(r)).collect()))
            .collect();

        let mut rows = Vec::new();
        'rows: for (i, reading) in readings.iter().enumerate() {
            let mut values = Vec::with_capacity(self.schema.len());
            for kind in self.schema.columns() {
                match compute_column(*kind, &series, reading, i) {
                    Some(v) if v.is_finite() => values.push(v),
                    _ => continue 'rows,
                }
            }
            rows.push(FeatureRow {
                source_index: i,
                values,
            });
        }

        FeatureTable::new(self.schema.clone(), rows)
    }
}

impl Default for FeatureEngineer {
    fn default() -> Self {
        Self::new(FeatureConfig::default())
    }
}

/// Compute one column at row `i`, or `None` if the value is missing.
fn compute_column(
    kind: ColumnKind,
    series: &HashMap<Signal, Vec<f64>>,
    reading: &Reading,
    i: usize,
) -> Option<f64> {
    let values = |s: Signal| series.get(&s).map(Vec::as_slice).unwrap_or(&[]);

    match kind {
        ColumnKind::Raw(s) => values(s).get(i).copied(),
        ColumnKind::RollingMean(s, w) => trailing(values(s), i, w).map(|win| win.iter().mean()),
        ColumnKind::RollingStd(s, w) => trailing(values(s), i, w).map(rolling_std),
        ColumnKind::RollingMin(s, w) => {
            trailing(values(s), i, w).map(|win| Statistics::min(win.iter()))
        }
        ColumnKind::RollingMax(s, w) => {
            trailing(values(s), i, w).map(|win| Statistics::max(win.iter()))
        }
        ColumnKind::Lag(s, n) => i.checked_sub(n).and_then(|j| values(s).get(j).copied()),
        ColumnKind::Trend(s, n) => {
            let v = values(s);
            let past = i.checked_sub(n).and_then(|j| v.get(j))?;
            v.get(i).map(|current| current - past)
        }
        ColumnKind::EngagementRatio => {
            Some(reading.high_engagement as f64 / (reading.low_engagement as f64 + 1.0))
        }
        ColumnKind::OccupancyEngagement => {
            Some(reading.occupancy as f64 * reading.high_engagement as f64)
        }
        ColumnKind::Hour => Some(reading.hour as f64),
        ColumnKind::Minute => Some(reading.minute as f64),
    }
}

/// Up to `window` values ending at `i` (inclusive).
fn trailing(values: &[f64], i: usize, window: usize) -> Option<&[f64]> {
    if window == 0 || i >= values.len() {
        return None;
    }
    let start = (i + 1).saturating_sub(window);
    Some(&values[start..=i])
}

/// Sample standard deviation, 0 when fewer than two samples.
fn rolling_std(window: &[f64]) -> f64 {
    if window.len() < 2 {
        0.0
    } else {
        window.iter().std_dev()
    }
}
