//! Configuration for the classroom comfort pipeline.

use crate::core::alerts::AlertThresholds;
use crate::core::buffer::DEFAULT_BUFFER_CAPACITY;
use crate::core::environment::{SensorRanges, SensorThresholds};
use crate::core::features::{FeatureConfig, Signal};
use crate::core::recommend::RecommendationThresholds;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the four model artifacts
    pub model_dir: PathBuf,

    /// Path for storing state and statistics
    pub data_path: PathBuf,

    /// Timezone used to derive hour and minute of readings
    #[serde(with = "tz_serde")]
    pub timezone: Tz,

    /// Maximum number of readings retained in memory
    pub buffer_capacity: usize,

    /// Number of recent readings handed to the feature engineer
    pub history_window: usize,

    /// Feature engineering layout (must match the trained models)
    pub features: FeatureConfig,

    /// Thresholds for forecast recommendations
    pub recommendations: RecommendationThresholds,

    /// Thresholds for the alert checks
    pub alerts: AlertThresholds,

    /// Limits for alerts and scoring on measured readings
    pub sensors: SensorThresholds,

    /// Calibration ranges for 0-100 normalisation
    pub sensor_ranges: SensorRanges,

    /// Port for the HTTP API
    pub server_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("classroom-comfort");

        Self {
            model_dir: data_dir.join("models"),
            data_path: data_dir,
            timezone: chrono_tz::UTC,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            history_window: 30,
            features: FeatureConfig::default(),
            recommendations: RecommendationThresholds::default(),
            alerts: AlertThresholds::default(),
            sensors: SensorThresholds::default(),
            sensor_ranges: SensorRanges::default(),
            server_port: 5000,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(&config_path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("classroom-comfort")
            .join("config.json")
    }

    /// Path of the persisted pipeline statistics.
    pub fn stats_path(&self) -> PathBuf {
        self.data_path.join("stats.json")
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.data_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }

    /// Override the forecast and complementing signal lists from CSV strings.
    pub fn with_signals(mut self, environmental: Option<&str>, complementing: Option<&str>) -> Self {
        if let Some(list) = environmental {
            self.features.environmental = Signal::list_from_csv(list);
        }
        if let Some(list) = complementing {
            self.features.complementing = Signal::list_from_csv(list);
        }
        self
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Serde support for timezones as IANA names.
mod tz_serde {
    use chrono_tz::Tz;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(tz: &Tz, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(tz.name())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Tz, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        name.parse::<Tz>()
            .map_err(|_| D::Error::custom(format!("unknown timezone: {name}")))
    }
}
