//! Recommendation rules applied to a forecast.
//!
//! Every rule is evaluated independently and all matches are kept, in rule
//! order. When nothing fires the result is a single "all conditions optimal"
//! entry.

use crate::collector::types::{Engagement, EnvironmentalValues};
use crate::core::comfort::ComfortLevel;
use serde::{Deserialize, Serialize};

/// Tag attached to a recommendation or alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Info,
    Warning,
    Alert,
    Error,
}

/// Display priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// A human-readable suggestion derived from a forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub severity: Severity,
    pub priority: Priority,
    pub title: String,
    pub message: String,
}

impl Recommendation {
    fn new(severity: Severity, priority: Priority, title: &str, message: impl Into<String>) -> Self {
        Self {
            severity,
            priority,
            title: title.to_string(),
            message: message.into(),
        }
    }
}

/// Thresholds for the recommendation rules.
///
/// Temperature and light bounds are strict: a value equal to a bound is in
/// the neutral band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationThresholds {
    pub temperature_high: f64,
    pub temperature_low: f64,
    pub gas_urgent: f64,
    pub gas_warning: f64,
    pub humidity_low: f64,
    pub humidity_high: f64,
    pub light_low: f64,
    pub light_high: f64,
}

impl Default for RecommendationThresholds {
    fn default() -> Self {
        Self {
            temperature_high: 24.0,
            temperature_low: 22.0,
            gas_urgent: 1000.0,
            gas_warning: 800.0,
            humidity_low: 30.0,
            humidity_high: 50.0,
            light_low: 150.0,
            light_high: 250.0,
        }
    }
}

/// Share of low-engagement faces as a percentage, `low / (high + low + 1) * 100`.
pub fn low_engagement_percent(engagement: &Engagement) -> f64 {
    let high = engagement.high_engagement as f64;
    let low = engagement.low_engagement as f64;
    low / (high + low + 1.0) * 100.0
}

/// Build the recommendation list for a forecast.
pub fn recommend(
    engagement: &Engagement,
    forecast: &EnvironmentalValues,
    level: ComfortLevel,
    thresholds: &RecommendationThresholds,
) -> Vec<Recommendation> {
    let mut recs = Vec::new();

    if forecast.temperature > thresholds.temperature_high {
        recs.push(Recommendation::new(
            Severity::Warning,
            Priority::Medium,
            "Temperature Rising",
            format!(
                "Temperature rising to {:.1}°C - Consider cooling",
                forecast.temperature
            ),
        ));
    } else if forecast.temperature < thresholds.temperature_low {
        recs.push(Recommendation::new(
            Severity::Warning,
            Priority::Low,
            "Temperature Dropping",
            format!(
                "Temperature dropping to {:.1}°C - Reduce cooling",
                forecast.temperature
            ),
        ));
    }

    if forecast.gas > thresholds.gas_urgent {
        recs.push(Recommendation::new(
            Severity::Alert,
            Priority::High,
            "CO₂ Critical",
            "CO₂ urgently needs ventilation - Open windows now",
        ));
    } else if forecast.gas > thresholds.gas_warning {
        recs.push(Recommendation::new(
            Severity::Warning,
            Priority::Medium,
            "CO₂ Rising",
            "CO₂ rising - Consider ventilation",
        ));
    }

    if forecast.humidity < thresholds.humidity_low {
        recs.push(Recommendation::new(
            Severity::Info,
            Priority::Low,
            "Low Humidity",
            "Low humidity - Consider humidifier",
        ));
    } else if forecast.humidity > thresholds.humidity_high {
        recs.push(Recommendation::new(
            Severity::Warning,
            Priority::Medium,
            "High Humidity",
            "Humidity high - Ventilation needed",
        ));
    }

    if forecast.light < thresholds.light_low {
        recs.push(Recommendation::new(
            Severity::Info,
            Priority::Low,
            "Low Light",
            "Low light - Increase lighting",
        ));
    } else if forecast.light > thresholds.light_high {
        recs.push(Recommendation::new(
            Severity::Info,
            Priority::Low,
            "Bright Light",
            "Bright light - Consider dimming",
        ));
    }

    if engagement.low_engagement > engagement.high_engagement {
        recs.push(Recommendation::new(
            Severity::Warning,
            Priority::Medium,
            "Low Engagement",
            format!(
                "Low engagement detected - {:.0}% of students",
                low_engagement_percent(engagement)
            ),
        ));
    }

    match level {
        ComfortLevel::Critical => recs.push(Recommendation::new(
            Severity::Error,
            Priority::High,
            "Critical Conditions Predicted",
            "ALERT: Uncomfortable conditions predicted - Immediate action required",
        )),
        ComfortLevel::Poor => recs.push(Recommendation::new(
            Severity::Warning,
            Priority::Medium,
            "Poor Conditions Predicted",
            "ALERT: Uncomfortable conditions predicted",
        )),
        ComfortLevel::Acceptable | ComfortLevel::Optimal => {}
    }

    if recs.is_empty() {
        recs.push(Recommendation::new(
            Severity::Success,
            Priority::Low,
            "All Good",
            "All conditions optimal",
        ));
    }

    recs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forecast(temperature: f64, humidity: f64, gas: f64, light: f64) -> EnvironmentalValues {
        EnvironmentalValues {
            temperature,
            humidity,
            gas,
            light,
            sound: 45.0,
        }
    }

    fn engaged() -> Engagement {
        Engagement {
            occupancy: 20,
            high_engagement: 15,
            low_engagement: 3,
        }
    }

    fn titles(recs: &[Recommendation]) -> Vec<&str> {
        recs.iter().map(|r| r.title.as_str()).collect()
    }

    #[test]
    fn test_all_optimal_when_nothing_fires() {
        let recs = recommend(
            &engaged(),
            &forecast(23.0, 40.0, 600.0, 200.0),
            ComfortLevel::Optimal,
            &RecommendationThresholds::default(),
        );
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].severity, Severity::Success);
        assert_eq!(recs[0].message, "All conditions optimal");
    }

    #[test]
    fn test_strict_temperature_bounds() {
        let thresholds = RecommendationThresholds::default();
        for temp in [22.0, 24.0] {
            let recs = recommend(
                &engaged(),
                &forecast(temp, 40.0, 600.0, 200.0),
                ComfortLevel::Optimal,
                &thresholds,
            );
            assert_eq!(titles(&recs), vec!["All Good"]);
        }

        let recs = recommend(
            &engaged(),
            &forecast(24.01, 40.0, 600.0, 200.0),
            ComfortLevel::Optimal,
            &thresholds,
        );
        assert_eq!(titles(&recs), vec!["Temperature Rising"]);
    }

    #[test]
    fn test_every_rule_fires_in_order() {
        let engagement = Engagement {
            occupancy: 10,
            high_engagement: 2,
            low_engagement: 7,
        };
        let recs = recommend(
            &engagement,
            &forecast(19.0, 70.0, 1200.0, 50.0),
            ComfortLevel::Critical,
            &RecommendationThresholds::default(),
        );
        assert_eq!(
            titles(&recs),
            vec![
                "Temperature Dropping",
                "CO₂ Critical",
                "High Humidity",
                "Low Light",
                "Low Engagement",
                "Critical Conditions Predicted",
            ]
        );
        assert_eq!(recs[1].severity, Severity::Alert);
        assert_eq!(recs[5].severity, Severity::Error);
        assert_eq!(recs[5].priority, Priority::High);
        // 7 / (2 + 7 + 1) = 70%
        assert!(recs[4].message.contains("70%"));
    }

    #[test]
    fn test_poor_comfort_appends_alert_last() {
        let recs = recommend(
            &engaged(),
            &forecast(25.0, 40.0, 900.0, 200.0),
            ComfortLevel::Poor,
            &RecommendationThresholds::default(),
        );
        assert_eq!(
            titles(&recs),
            vec!["Temperature Rising", "CO₂ Rising", "Poor Conditions Predicted"]
        );
        let last = recs.last().unwrap();
        assert_eq!(last.severity, Severity::Warning);
        assert_eq!(last.priority, Priority::Medium);
    }

    #[test]
    fn test_humidity_high_threshold() {
        let thresholds = RecommendationThresholds::default();
        let at_edge = recommend(
            &engaged(),
            &forecast(23.0, 50.0, 600.0, 200.0),
            ComfortLevel::Optimal,
            &thresholds,
        );
        assert_eq!(titles(&at_edge), vec!["All Good"]);

        let above = recommend(
            &engaged(),
            &forecast(23.0, 50.5, 600.0, 200.0),
            ComfortLevel::Optimal,
            &thresholds,
        );
        assert_eq!(titles(&above), vec!["High Humidity"]);
    }
}
