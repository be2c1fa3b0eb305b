//! Classroom Comfort - environmental forecasting and comfort classification.
//!
//! This library turns a short history of classroom sensor readings
//! (temperature, humidity, gas, light, sound) and camera engagement counts
//! into a next-interval forecast, a comfort level with per-class
//! probabilities, and a list of recommendations.
//!
//! # Guarantees
//!
//! - **Complete readings only**: partial readings are rejected before they reach the buffer
//! - **Fixed column order**: feature columns come from a typed schema and are selected by name
//! - **No fabricated output**: missing data and missing models are errors, never defaults
//! - **Degraded mode**: the rule-based scorer works without any trained model
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        Classroom Comfort                          │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐              │
//! │  │  Collector  │──▶│   Reading   │──▶│   Feature   │              │
//! │  │ (lines/API) │   │   Buffer    │   │  Engineer   │              │
//! │  └─────────────┘   └─────────────┘   └─────────────┘              │
//! │                           │                 │                      │
//! │                           ▼                 ▼                      │
//! │                    ┌─────────────┐   ┌─────────────┐              │
//! │                    │ Rule-based  │   │ Forecaster  │              │
//! │                    │   Scorer    │   └─────────────┘              │
//! │                    └─────────────┘          │                      │
//! │                                             ▼                      │
//! │                    ┌─────────────┐   ┌─────────────┐              │
//! │                    │Recommender /│◀──│   Comfort   │              │
//! │                    │   Alerts    │   │ Classifier  │              │
//! │                    └─────────────┘   └─────────────┘              │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use classroom_comfort::{Config, PredictionService, RawReading};
//!
//! let config = Config::load().unwrap_or_default();
//! let service = PredictionService::from_config(&config);
//!
//! let raw: RawReading = serde_json::from_str(
//!     r#"{"temperature": 23.1, "humidity": 45, "gas": 610, "light": 210, "sound": 44,
//!         "occupancy": 20, "high_engagement": 15, "low_engagement": 3}"#,
//! ).unwrap();
//! service.submit_reading(raw).unwrap();
//!
//! match service.get_forecast_summary() {
//!     Ok(summary) => println!("{}", summary.comfort.level),
//!     Err(e) if e.is_recoverable() => println!("waiting for data: {e}"),
//!     Err(e) => eprintln!("forecast failed: {e}"),
//! }
//! ```

pub mod collector;
pub mod config;
pub mod core;
pub mod error;
pub mod model;
pub mod prediction;
pub mod stats;

#[cfg(feature = "server")]
pub mod server;

// Re-export key types at crate root for convenience
pub use collector::{
    EmotionCounts, Engagement, EngagementHandle, EnvironmentalValues, LineCollector, RawReading,
    Reading, Sensor,
};
pub use config::{Config, ConfigError};
pub use core::{
    check_alerts, recommend, score_comfort, Alert, ComfortLevel, FeatureConfig, FeatureEngineer,
    Recommendation, SharedReadingBuffer,
};
pub use error::{PredictionError, PredictionResult};
pub use model::{ArtifactError, ModelBundle};
pub use prediction::{
    ComfortClassifier, ForecastSummary, Forecaster, PredictionModels, PredictionService,
    PredictionStatus,
};
pub use stats::{PipelineStats, SharedPipelineStats};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Comfort scale shown by the CLI.
pub const COMFORT_SCALE: &str = r#"
╔══════════════════════════════════════════════════════════════════╗
║                  CLASSROOM COMFORT - LEVEL SCALE                 ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  3  Optimal     every sensor inside its optimal band             ║
║  2  Acceptable  most sensors optimal, a few tolerable            ║
║  1  Poor        several sensors outside their optimal band       ║
║  0  Critical    conditions need immediate action                 ║
║                                                                  ║
║  Optimal bands:                                                  ║
║    temperature 22-24 °C     humidity 30-50 %                     ║
║    gas below 800            light 150-250 lux                    ║
║    sound 35-60                                                   ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝
"#;
