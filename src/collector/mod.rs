//! Telemetry collection for the classroom monitor.
//!
//! This module turns the sensor board's line protocol and the camera's
//! emotion counts into [`RawReading`]s, delivered over a channel.

pub mod line;
pub mod parser;
pub mod types;

// Re-export commonly used types
pub use line::{CollectorConfig, CollectorError, EngagementHandle, LineCollector};
pub use parser::{is_delimiter, parse_sensor_line, ReadingAssembler};
pub use types::{
    EmotionCounts, Engagement, EnvironmentalValues, RawReading, Reading, Sensor,
};
