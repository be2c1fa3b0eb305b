//! Core functionality for classroom comfort monitoring.
//!
//! This module contains:
//! - The reading buffer that holds recent telemetry
//! - Feature engineering over a window of readings
//! - The rule-based comfort scorer
//! - Checks and scoring of the current measured reading
//! - Recommendation and alert rules

pub mod alerts;
pub mod buffer;
pub mod comfort;
pub mod environment;
pub mod features;
pub mod recommend;

// Re-export commonly used types
pub use alerts::{check_alerts, Alert, AlertThresholds};
pub use buffer::{BufferStatus, ReadingBuffer, SharedReadingBuffer, DEFAULT_BUFFER_CAPACITY};
pub use comfort::{comfort_score, level_for_score, score_comfort, ComfortLevel};
pub use environment::{
    environmental_score, sensor_alerts, Band, CurrentConditions, SensorRanges, SensorThresholds,
};
pub use features::{
    ColumnKind, FeatureConfig, FeatureEngineer, FeatureRow, FeatureSchema, FeatureTable,
    FeatureView, Signal,
};
pub use recommend::{
    low_engagement_percent, recommend, Priority, Recommendation, RecommendationThresholds,
    Severity,
};
