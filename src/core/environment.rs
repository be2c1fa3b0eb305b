//! Current-reading sensor checks.
//!
//! These look at the latest measured values rather than the forecast: a
//! 0-100 environmental quality score, per-sensor normalisation for display,
//! and threshold alerts in the sensor board's own units.

use crate::collector::types::{EnvironmentalValues, Reading, Sensor};
use crate::core::alerts::Alert;
use crate::core::recommend::{Priority, Severity};
use serde::{Deserialize, Serialize};

/// Closed range `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub min: f64,
    pub max: f64,
}

impl Band {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Distance to the nearest edge, 0 inside the band.
    pub fn distance(&self, value: f64) -> f64 {
        if value < self.min {
            self.min - value
        } else if value > self.max {
            value - self.max
        } else {
            0.0
        }
    }
}

/// Acceptable and optimal bands for measured values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorThresholds {
    pub temperature: Band,
    pub temperature_optimal: Band,
    pub humidity: Band,
    pub humidity_optimal: Band,
    pub light: Band,
    pub light_optimal: Band,
    /// Raw ADC units
    pub sound_max: f64,
    /// Raw ADC units
    pub gas_max: f64,
}

impl Default for SensorThresholds {
    fn default() -> Self {
        Self {
            temperature: Band::new(18.0, 28.0),
            temperature_optimal: Band::new(20.0, 25.0),
            humidity: Band::new(40.0, 60.0),
            humidity_optimal: Band::new(45.0, 55.0),
            light: Band::new(300.0, 700.0),
            light_optimal: Band::new(400.0, 600.0),
            sound_max: 2500.0,
            gas_max: 1500.0,
        }
    }
}

/// Calibration ranges used to normalise each sensor to 0-100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorRanges {
    pub temperature: Band,
    pub humidity: Band,
    pub light: Band,
    pub sound: Band,
    pub gas: Band,
}

impl Default for SensorRanges {
    fn default() -> Self {
        Self {
            temperature: Band::new(15.0, 35.0),
            humidity: Band::new(30.0, 70.0),
            light: Band::new(0.0, 1000.0),
            sound: Band::new(0.0, 4095.0),
            gas: Band::new(0.0, 4095.0),
        }
    }
}

impl SensorRanges {
    pub fn range(&self, sensor: Sensor) -> Band {
        match sensor {
            Sensor::Temperature => self.temperature,
            Sensor::Humidity => self.humidity,
            Sensor::Light => self.light,
            Sensor::Sound => self.sound,
            Sensor::Gas => self.gas,
        }
    }

    /// Clamp `value` to the sensor's range and map it onto 0-100, two decimals.
    ///
    /// A degenerate range maps everything to 0.
    pub fn normalize(&self, sensor: Sensor, value: f64) -> f64 {
        let band = self.range(sensor);
        let span = band.max - band.min;
        if span <= 0.0 {
            return 0.0;
        }
        let clamped = value.clamp(band.min, band.max);
        round2((clamped - band.min) / span * 100.0)
    }

    /// Normalise all five values.
    pub fn normalize_all(&self, values: &EnvironmentalValues) -> EnvironmentalValues {
        EnvironmentalValues {
            temperature: self.normalize(Sensor::Temperature, values.temperature),
            humidity: self.normalize(Sensor::Humidity, values.humidity),
            gas: self.normalize(Sensor::Gas, values.gas),
            light: self.normalize(Sensor::Light, values.light),
            sound: self.normalize(Sensor::Sound, values.sound),
        }
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Environmental quality score in `[0, 100]`, two decimals.
///
/// Each sensor scores 100 inside its optimal band (or under its maximum for
/// sound and gas) and loses points linearly with distance: 10 per °C, 2 per
/// humidity percent, 1 per 4 lux, 1 per 20 raw units of sound or gas. The
/// result is the mean of the five.
pub fn environmental_score(values: &EnvironmentalValues, thresholds: &SensorThresholds) -> f64 {
    let decay = |distance: f64, rate: f64| (100.0 - distance * rate).max(0.0);

    let scores = [
        decay(thresholds.temperature_optimal.distance(values.temperature), 10.0),
        decay(thresholds.humidity_optimal.distance(values.humidity), 2.0),
        decay(thresholds.light_optimal.distance(values.light), 0.25),
        decay((values.sound - thresholds.sound_max).max(0.0), 0.05),
        decay((values.gas - thresholds.gas_max).max(0.0), 0.05),
    ];
    round2(scores.iter().sum::<f64>() / scores.len() as f64)
}

/// Threshold alerts on a measured reading.
pub fn sensor_alerts(reading: &Reading, thresholds: &SensorThresholds) -> Vec<Alert> {
    let mut alerts = Vec::new();

    let t = reading.temperature;
    if t < thresholds.temperature.min {
        alerts.push(Alert::new(
            "sensor_temperature_low",
            Severity::Warning,
            Priority::Medium,
            "Temperature Too Low",
            format!("Temperature too low: {t}°C"),
        ));
    } else if t > thresholds.temperature.max {
        alerts.push(Alert::new(
            "sensor_temperature_high",
            Severity::Warning,
            Priority::Medium,
            "Temperature Too High",
            format!("Temperature too high: {t}°C"),
        ));
    }

    let h = reading.humidity;
    if h < thresholds.humidity.min {
        alerts.push(Alert::new(
            "sensor_humidity_low",
            Severity::Warning,
            Priority::Medium,
            "Humidity Too Low",
            format!("Humidity too low: {h}%"),
        ));
    } else if h > thresholds.humidity.max {
        alerts.push(Alert::new(
            "sensor_humidity_high",
            Severity::Warning,
            Priority::Medium,
            "Humidity Too High",
            format!("Humidity too high: {h}%"),
        ));
    }

    let l = reading.light;
    if l < thresholds.light.min {
        alerts.push(Alert::new(
            "sensor_light_low",
            Severity::Info,
            Priority::Low,
            "Lighting Too Dim",
            format!("Lighting too dim: {l} lux"),
        ));
    } else if l > thresholds.light.max {
        alerts.push(Alert::new(
            "sensor_light_high",
            Severity::Info,
            Priority::Low,
            "Lighting Too Bright",
            format!("Lighting too bright: {l} lux"),
        ));
    }

    if reading.sound > thresholds.sound_max {
        alerts.push(Alert::new(
            "sensor_sound_high",
            Severity::Warning,
            Priority::Medium,
            "Classroom Too Noisy",
            format!("Classroom too noisy: {}", reading.sound),
        ));
    }

    if reading.gas > thresholds.gas_max {
        alerts.push(Alert::new(
            "sensor_gas_high",
            Severity::Alert,
            Priority::High,
            "Poor Air Quality",
            format!("Poor air quality detected: {}", reading.gas),
        ));
    }

    alerts
}

/// Score, normalised values and alerts for one measured reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub environmental_score: f64,
    pub normalized: EnvironmentalValues,
    pub alerts: Vec<Alert>,
}

impl CurrentConditions {
    pub fn assess(reading: &Reading, thresholds: &SensorThresholds, ranges: &SensorRanges) -> Self {
        let values = reading.environment();
        Self {
            environmental_score: environmental_score(&values, thresholds),
            normalized: ranges.normalize_all(&values),
            alerts: sensor_alerts(reading, thresholds),
        }
    }
}
