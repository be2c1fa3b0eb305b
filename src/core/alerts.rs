//! Alert checks for dashboards.
//!
//! Separate from the recommendation rules: alerts carry a stable `id`, use
//! their own thresholds and include sound, which recommendations ignore.

use crate::collector::types::{Engagement, EnvironmentalValues};
use crate::core::comfort::ComfortLevel;
use crate::core::recommend::{low_engagement_percent, Priority, Severity};
use serde::{Deserialize, Serialize};

/// A single alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub severity: Severity,
    pub priority: Priority,
    pub title: String,
    pub message: String,
}

impl Alert {
    pub(crate) fn new(
        id: &str,
        severity: Severity,
        priority: Priority,
        title: &str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: id.to_string(),
            severity,
            priority,
            title: title.to_string(),
            message: message.into(),
        }
    }
}

/// Thresholds for the alert checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertThresholds {
    pub temperature_high: f64,
    pub temperature_low: f64,
    pub gas_critical: f64,
    pub gas_warning: f64,
    pub humidity_low: f64,
    pub humidity_high: f64,
    pub light_low: f64,
    /// Baseline noisy level in raw sensor units
    pub sound_high: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            temperature_high: 26.0,
            temperature_low: 20.0,
            gas_critical: 1000.0,
            gas_warning: 800.0,
            humidity_low: 30.0,
            humidity_high: 50.0,
            light_low: 100.0,
            sound_high: 2500.0,
        }
    }
}

/// Evaluate alerts for a forecast and its predicted comfort level.
pub fn check_alerts(
    engagement: &Engagement,
    forecast: &EnvironmentalValues,
    level: ComfortLevel,
    thresholds: &AlertThresholds,
) -> Vec<Alert> {
    let mut alerts = Vec::new();

    match level {
        ComfortLevel::Critical => alerts.push(Alert::new(
            "comfort_critical",
            Severity::Error,
            Priority::High,
            "Critical Environment Conditions",
            "Classroom environment is predicted to be critical. Immediate action required.",
        )),
        ComfortLevel::Poor => alerts.push(Alert::new(
            "comfort_poor",
            Severity::Warning,
            Priority::Medium,
            "Poor Environment Conditions",
            "Classroom environment is below optimal. Consider adjustments.",
        )),
        ComfortLevel::Acceptable | ComfortLevel::Optimal => {}
    }

    if forecast.temperature > thresholds.temperature_high {
        alerts.push(Alert::new(
            "temp_high",
            Severity::Warning,
            Priority::Medium,
            "High Temperature Alert",
            format!(
                "Temperature predicted to reach {:.1}°C. Consider cooling.",
                forecast.temperature
            ),
        ));
    } else if forecast.temperature < thresholds.temperature_low {
        alerts.push(Alert::new(
            "temp_low",
            Severity::Warning,
            Priority::Low,
            "Low Temperature Alert",
            format!(
                "Temperature predicted to drop to {:.1}°C. Reduce cooling.",
                forecast.temperature
            ),
        ));
    }

    if forecast.gas > thresholds.gas_critical {
        alerts.push(Alert::new(
            "co2_critical",
            Severity::Error,
            Priority::High,
            "High CO₂ Levels",
            format!(
                "CO₂ levels predicted to reach {:.0} ppm. Ventilation urgently needed.",
                forecast.gas.trunc()
            ),
        ));
    } else if forecast.gas > thresholds.gas_warning {
        alerts.push(Alert::new(
            "co2_warning",
            Severity::Warning,
            Priority::Medium,
            "Rising CO₂ Levels",
            format!(
                "CO₂ levels predicted to reach {:.0} ppm. Consider ventilation.",
                forecast.gas.trunc()
            ),
        ));
    }

    if forecast.humidity < thresholds.humidity_low {
        alerts.push(Alert::new(
            "humidity_low",
            Severity::Info,
            Priority::Low,
            "Low Humidity",
            format!(
                "Humidity predicted to drop to {:.1}%. Consider humidifier.",
                forecast.humidity
            ),
        ));
    } else if forecast.humidity > thresholds.humidity_high {
        alerts.push(Alert::new(
            "humidity_high",
            Severity::Warning,
            Priority::Medium,
            "High Humidity",
            format!(
                "Humidity predicted to reach {:.1}%. Ventilation recommended.",
                forecast.humidity
            ),
        ));
    }

    if forecast.light < thresholds.light_low {
        alerts.push(Alert::new(
            "light_low",
            Severity::Info,
            Priority::Low,
            "Low Lighting",
            format!(
                "Light level predicted at {:.0} lux. Increase lighting.",
                forecast.light.trunc()
            ),
        ));
    }

    if forecast.sound > thresholds.sound_high {
        alerts.push(Alert::new(
            "sound_high",
            Severity::Warning,
            Priority::Medium,
            "High Noise Level",
            format!(
                "Sound level predicted at {:.0}. Consider a quieter activity.",
                forecast.sound.trunc()
            ),
        ));
    }

    if engagement.low_engagement > engagement.high_engagement && engagement.occupancy > 0 {
        alerts.push(Alert::new(
            "engagement_low",
            Severity::Warning,
            Priority::Medium,
            "Low Student Engagement",
            format!(
                "{:.0}% of students showing low engagement. Consider intervention.",
                low_engagement_percent(engagement)
            ),
        ));
    }

    alerts
}
