//! Comfort classification from current conditions and a forecast.

use crate::collector::types::{EnvironmentalValues, Reading};
use crate::core::comfort::ComfortLevel;
use crate::error::{PredictionError, PredictionResult};
use crate::model::classifier::Classifier;
use std::collections::BTreeMap;

/// Classifier input columns in training order.
pub const CLASSIFIER_COLUMNS: [&str; 15] = [
    "temperature",
    "humidity",
    "gas",
    "light",
    "sound",
    "occupancy",
    "high_engagement",
    "low_engagement",
    "predicted_temperature",
    "predicted_humidity",
    "predicted_gas",
    "predicted_light",
    "predicted_sound",
    "hour",
    "minute",
];

/// Build the classifier row for a reading and its forecast.
pub fn classifier_row(current: &Reading, forecast: &EnvironmentalValues) -> [f64; 15] {
    [
        current.temperature,
        current.humidity,
        current.gas,
        current.light,
        current.sound,
        current.occupancy as f64,
        current.high_engagement as f64,
        current.low_engagement as f64,
        forecast.temperature,
        forecast.humidity,
        forecast.gas,
        forecast.light,
        forecast.sound,
        current.hour as f64,
        current.minute as f64,
    ]
}

/// Predicted level with its probability distribution.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierOutput {
    pub level: ComfortLevel,
    /// Probability per level the model knows, summing to 1
    pub probabilities: BTreeMap<ComfortLevel, f64>,
    /// Probability of `level`
    pub confidence: f64,
}

/// Wraps a fitted comfort classifier.
#[derive(Debug)]
pub struct ComfortClassifier {
    model: Box<dyn Classifier>,
    levels: Vec<ComfortLevel>,
}

impl ComfortClassifier {
    /// Wrap a classifier, checking its width and class labels.
    pub fn new(model: Box<dyn Classifier>) -> PredictionResult<Self> {
        if model.n_inputs() != CLASSIFIER_COLUMNS.len() {
            return Err(PredictionError::ArtifactMismatch(format!(
                "classifier expects {} inputs, expected {}",
                model.n_inputs(),
                CLASSIFIER_COLUMNS.len()
            )));
        }
        let levels = model
            .classes()
            .iter()
            .map(|&c| {
                ComfortLevel::from_code(c).ok_or_else(|| {
                    PredictionError::ArtifactMismatch(format!(
                        "class label {c} is not a comfort level"
                    ))
                })
            })
            .collect::<PredictionResult<Vec<_>>>()?;
        if levels.is_empty() {
            return Err(PredictionError::ArtifactMismatch(
                "classifier has no classes".to_string(),
            ));
        }
        Ok(Self { model, levels })
    }

    /// Levels the model can predict, in its class order.
    pub fn levels(&self) -> &[ComfortLevel] {
        &self.levels
    }

    /// Classify current conditions plus forecast.
    pub fn classify(
        &self,
        current: &Reading,
        forecast: &EnvironmentalValues,
    ) -> PredictionResult<ClassifierOutput> {
        let row = classifier_row(current, forecast);
        let proba = self.model.predict_proba(&row)?;

        if proba.len() != self.levels.len() {
            return Err(PredictionError::InvalidModelOutput(format!(
                "{} probabilities for {} classes",
                proba.len(),
                self.levels.len()
            )));
        }
        if proba.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(PredictionError::InvalidModelOutput(
                "probabilities must be finite and non-negative".to_string(),
            ));
        }
        let total: f64 = proba.iter().sum();
        if total <= 0.0 {
            return Err(PredictionError::InvalidModelOutput(
                "probabilities sum to zero".to_string(),
            ));
        }

        // First maximum wins on ties
        let mut best = 0;
        for (i, p) in proba.iter().enumerate() {
            if *p > proba[best] {
                best = i;
            }
        }
        let level = self.levels[best];

        let probabilities: BTreeMap<ComfortLevel, f64> = self
            .levels
            .iter()
            .zip(&proba)
            .map(|(l, p)| (*l, p / total))
            .collect();
        let confidence = probabilities.get(&level).copied().unwrap_or(0.0);

        Ok(ClassifierOutput {
            level,
            probabilities,
            confidence,
        })
    }
}
