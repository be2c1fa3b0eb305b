//! Reading types shared by the collector, the buffer and the prediction pipeline.
//!
//! A [`RawReading`] is what arrives from the outside world (serial lines, the
//! HTTP API, a JSON file). Every field is optional. A [`Reading`] is the
//! validated form: all five environmental values and all three engagement
//! values are present and finite.

use crate::error::{PredictionError, PredictionResult};
use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// The five environmental sensors, in the canonical forecast order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sensor {
    Temperature,
    Humidity,
    Gas,
    Light,
    Sound,
}

impl Sensor {
    /// All sensors in forecast output order.
    pub const ALL: [Sensor; 5] = [
        Sensor::Temperature,
        Sensor::Humidity,
        Sensor::Gas,
        Sensor::Light,
        Sensor::Sound,
    ];

    /// Column name used in feature tables and model artifacts.
    pub fn name(&self) -> &'static str {
        match self {
            Sensor::Temperature => "temperature",
            Sensor::Humidity => "humidity",
            Sensor::Gas => "gas",
            Sensor::Light => "light",
            Sensor::Sound => "sound",
        }
    }

    /// Display unit.
    pub fn unit(&self) -> &'static str {
        match self {
            Sensor::Temperature => "°C",
            Sensor::Humidity => "%",
            Sensor::Light => "lux",
            Sensor::Gas | Sensor::Sound => "raw",
        }
    }
}

/// One value per environmental sensor.
///
/// Used both for current conditions and for forecasts.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EnvironmentalValues {
    pub temperature: f64,
    pub humidity: f64,
    pub gas: f64,
    pub light: f64,
    pub sound: f64,
}

impl EnvironmentalValues {
    /// Build from a slice in forecast order (temperature, humidity, gas, light, sound).
    pub fn from_slice(values: &[f64]) -> Option<Self> {
        match values {
            [temperature, humidity, gas, light, sound] => Some(Self {
                temperature: *temperature,
                humidity: *humidity,
                gas: *gas,
                light: *light,
                sound: *sound,
            }),
            _ => None,
        }
    }

    /// Get the value for one sensor.
    pub fn get(&self, sensor: Sensor) -> f64 {
        match sensor {
            Sensor::Temperature => self.temperature,
            Sensor::Humidity => self.humidity,
            Sensor::Gas => self.gas,
            Sensor::Light => self.light,
            Sensor::Sound => self.sound,
        }
    }

    /// Values in forecast order.
    pub fn to_array(&self) -> [f64; 5] {
        [
            self.temperature,
            self.humidity,
            self.gas,
            self.light,
            self.sound,
        ]
    }

    /// Element-wise `self - other`.
    pub fn delta(&self, other: &EnvironmentalValues) -> EnvironmentalValues {
        EnvironmentalValues {
            temperature: self.temperature - other.temperature,
            humidity: self.humidity - other.humidity,
            gas: self.gas - other.gas,
            light: self.light - other.light,
            sound: self.sound - other.sound,
        }
    }
}

/// Face counts per detected emotion for one camera frame.
///
/// Produced by the external emotion-recognition collaborator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmotionCounts {
    #[serde(default)]
    pub happy: u32,
    #[serde(default)]
    pub surprise: u32,
    #[serde(default)]
    pub neutral: u32,
    #[serde(default)]
    pub sad: u32,
    #[serde(default)]
    pub angry: u32,
    #[serde(default)]
    pub disgust: u32,
    #[serde(default)]
    pub fear: u32,
}

impl EmotionCounts {
    /// Total number of faces.
    pub fn total(&self) -> u32 {
        self.high().saturating_add(self.low())
    }

    fn high(&self) -> u32 {
        self.happy
            .saturating_add(self.surprise)
            .saturating_add(self.neutral)
    }

    fn low(&self) -> u32 {
        self.sad
            .saturating_add(self.angry)
            .saturating_add(self.disgust)
            .saturating_add(self.fear)
    }

    /// Collapse emotion counts into occupancy and engagement buckets.
    pub fn engagement(&self) -> Engagement {
        Engagement {
            occupancy: self.total(),
            high_engagement: self.high(),
            low_engagement: self.low(),
        }
    }
}

/// Occupancy and engagement counts for one reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engagement {
    pub occupancy: u32,
    pub high_engagement: u32,
    pub low_engagement: u32,
}

/// A validated, timestamped snapshot of environment and engagement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub timestamp: DateTime<Utc>,
    pub temperature: f64,
    pub humidity: f64,
    pub gas: f64,
    pub light: f64,
    pub sound: f64,
    pub occupancy: u32,
    pub high_engagement: u32,
    pub low_engagement: u32,
    /// Local hour of `timestamp` (0-23)
    pub hour: u32,
    /// Local minute of `timestamp` (0-59)
    pub minute: u32,
}

impl Reading {
    /// Create a reading, deriving hour and minute in the given timezone.
    pub fn new(
        timestamp: DateTime<Utc>,
        environment: EnvironmentalValues,
        engagement: Engagement,
        tz: Tz,
    ) -> Self {
        let local = timestamp.with_timezone(&tz);
        Self {
            timestamp,
            temperature: environment.temperature,
            humidity: environment.humidity,
            gas: environment.gas,
            light: environment.light,
            sound: environment.sound,
            occupancy: engagement.occupancy,
            high_engagement: engagement.high_engagement,
            low_engagement: engagement.low_engagement,
            hour: local.hour(),
            minute: local.minute(),
        }
    }

    /// The five environmental values.
    pub fn environment(&self) -> EnvironmentalValues {
        EnvironmentalValues {
            temperature: self.temperature,
            humidity: self.humidity,
            gas: self.gas,
            light: self.light,
            sound: self.sound,
        }
    }

    /// The three engagement values.
    pub fn engagement(&self) -> Engagement {
        Engagement {
            occupancy: self.occupancy,
            high_engagement: self.high_engagement,
            low_engagement: self.low_engagement,
        }
    }
}

/// A reading as received, before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawReading {
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub gas: Option<f64>,
    #[serde(default)]
    pub light: Option<f64>,
    #[serde(default)]
    pub sound: Option<f64>,
    #[serde(default)]
    pub occupancy: Option<u32>,
    #[serde(default)]
    pub high_engagement: Option<u32>,
    #[serde(default)]
    pub low_engagement: Option<u32>,
}

impl RawReading {
    /// Build a complete raw reading from typed parts.
    pub fn complete(
        timestamp: DateTime<Utc>,
        environment: EnvironmentalValues,
        engagement: Engagement,
    ) -> Self {
        Self::from_environment(timestamp, environment).with_engagement_defaults(engagement)
    }

    /// A raw reading with sensor values only; engagement fields stay empty.
    pub fn from_environment(timestamp: DateTime<Utc>, environment: EnvironmentalValues) -> Self {
        Self {
            timestamp: Some(timestamp),
            temperature: Some(environment.temperature),
            humidity: Some(environment.humidity),
            gas: Some(environment.gas),
            light: Some(environment.light),
            sound: Some(environment.sound),
            ..Self::default()
        }
    }

    /// Fill absent engagement fields from the latest camera counts.
    pub fn with_engagement_defaults(mut self, engagement: Engagement) -> Self {
        self.occupancy.get_or_insert(engagement.occupancy);
        self.high_engagement.get_or_insert(engagement.high_engagement);
        self.low_engagement.get_or_insert(engagement.low_engagement);
        self
    }

    /// Names of required fields that are absent or non-finite.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        let env = [
            ("temperature", self.temperature),
            ("humidity", self.humidity),
            ("gas", self.gas),
            ("light", self.light),
            ("sound", self.sound),
        ];
        for (name, value) in env {
            if !value.is_some_and(f64::is_finite) {
                missing.push(name);
            }
        }
        if self.occupancy.is_none() {
            missing.push("occupancy");
        }
        if self.high_engagement.is_none() {
            missing.push("high_engagement");
        }
        if self.low_engagement.is_none() {
            missing.push("low_engagement");
        }
        missing
    }

    /// Validate into a [`Reading`].
    ///
    /// A missing timestamp is stamped with the current time; every sensor and
    /// engagement field is required.
    pub fn validate(self, tz: Tz) -> PredictionResult<Reading> {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            return Err(PredictionError::IncompleteReading { missing });
        }

        match (
            self.temperature,
            self.humidity,
            self.gas,
            self.light,
            self.sound,
            self.occupancy,
            self.high_engagement,
            self.low_engagement,
        ) {
            (
                Some(temperature),
                Some(humidity),
                Some(gas),
                Some(light),
                Some(sound),
                Some(occupancy),
                Some(high_engagement),
                Some(low_engagement),
            ) => Ok(Reading::new(
                self.timestamp.unwrap_or_else(Utc::now),
                EnvironmentalValues {
                    temperature,
                    humidity,
                    gas,
                    light,
                    sound,
                },
                Engagement {
                    occupancy,
                    high_engagement,
                    low_engagement,
                },
                tz,
            )),
            _ => Err(PredictionError::IncompleteReading {
                missing: self.missing_fields(),
            }),
        }
    }
}
