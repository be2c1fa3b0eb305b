//! Comfort levels and the rule-based comfort scorer.
//!
//! The scorer needs no trained model. Each of the five environmental checks
//! contributes 1.0 inside its optimal band, 0.5 inside its tolerable band and
//! 0 otherwise; the total maps onto the four comfort levels.

use crate::collector::types::EnvironmentalValues;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrete comfort class. The numeric codes are fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ComfortLevel {
    Critical = 0,
    Poor = 1,
    Acceptable = 2,
    Optimal = 3,
}

impl ComfortLevel {
    /// All levels by ascending code.
    pub const ALL: [ComfortLevel; 4] = [
        ComfortLevel::Critical,
        ComfortLevel::Poor,
        ComfortLevel::Acceptable,
        ComfortLevel::Optimal,
    ];

    /// Numeric class code (0-3).
    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// Look up a level by class code.
    pub fn from_code(code: i64) -> Option<ComfortLevel> {
        match code {
            0 => Some(ComfortLevel::Critical),
            1 => Some(ComfortLevel::Poor),
            2 => Some(ComfortLevel::Acceptable),
            3 => Some(ComfortLevel::Optimal),
            _ => None,
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            ComfortLevel::Critical => "Critical",
            ComfortLevel::Poor => "Poor",
            ComfortLevel::Acceptable => "Acceptable",
            ComfortLevel::Optimal => "Optimal",
        }
    }

    /// Poor or Critical.
    pub fn is_uncomfortable(&self) -> bool {
        *self <= ComfortLevel::Poor
    }
}

impl fmt::Display for ComfortLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn band(value: f64, optimal: bool, tolerable: bool) -> f64 {
    if value.is_nan() {
        0.0
    } else if optimal {
        1.0
    } else if tolerable {
        0.5
    } else {
        0.0
    }
}

/// Sum of the five band checks, in `[0, 5]` with 0.5 steps.
pub fn comfort_score(values: &EnvironmentalValues) -> f64 {
    let t = values.temperature;
    let h = values.humidity;
    let g = values.gas;
    let l = values.light;
    let s = values.sound;

    band(t, (22.0..=24.0).contains(&t), (21.0..=25.0).contains(&t))
        + band(h, (30.0..=50.0).contains(&h), (25.0..=55.0).contains(&h))
        + band(g, g < 800.0, g < 1000.0)
        + band(l, (150.0..=250.0).contains(&l), (100.0..=300.0).contains(&l))
        + band(s, (35.0..=60.0).contains(&s), s <= 70.0)
}

/// Map a total score onto a comfort level.
pub fn level_for_score(score: f64) -> ComfortLevel {
    if score >= 4.5 {
        ComfortLevel::Optimal
    } else if score >= 3.0 {
        ComfortLevel::Acceptable
    } else if score >= 1.5 {
        ComfortLevel::Poor
    } else {
        ComfortLevel::Critical
    }
}

/// Rule-based comfort level for raw environmental values.
pub fn score_comfort(values: &EnvironmentalValues) -> ComfortLevel {
    level_for_score(comfort_score(values))
}
