//! Multi-output regression models.

use crate::error::{PredictionError, PredictionResult};
use crate::model::tree::DecisionTree;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// A fitted model mapping one scaled feature row to several outputs.
pub trait Regressor: Send + Sync + Debug {
    /// Expected input width.
    fn n_inputs(&self) -> usize;

    /// Number of predicted values.
    fn n_outputs(&self) -> usize;

    /// Predict all outputs for one row.
    fn predict(&self, x: &[f64]) -> PredictionResult<Vec<f64>>;
}

fn check_width(expected: usize, x: &[f64]) -> PredictionResult<()> {
    if x.len() == expected {
        Ok(())
    } else {
        Err(PredictionError::ArtifactMismatch(format!(
            "regressor expects {expected} inputs, got {}",
            x.len()
        )))
    }
}

/// One boosted ensemble per output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostedOutput {
    /// Initial prediction (the training mean for squared loss)
    pub init: f64,
    pub trees: Vec<DecisionTree>,
}

/// Gradient boosted trees, `init + learning_rate * Σ tree(x)` per output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostingRegressor {
    pub n_features: usize,
    pub learning_rate: f64,
    pub outputs: Vec<BoostedOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub training_run: Option<String>,
}

impl GradientBoostingRegressor {
    /// Check every tree against the input width.
    pub fn validate(&self) -> Result<(), String> {
        if !self.learning_rate.is_finite() {
            return Err("learning_rate is not finite".to_string());
        }
        for (o, output) in self.outputs.iter().enumerate() {
            if !output.init.is_finite() {
                return Err(format!("output {o} has a non-finite init"));
            }
            for (t, tree) in output.trees.iter().enumerate() {
                tree.validate(self.n_features, 1)
                    .map_err(|e| format!("output {o} tree {t}: {e}"))?;
            }
        }
        Ok(())
    }
}

impl Regressor for GradientBoostingRegressor {
    fn n_inputs(&self) -> usize {
        self.n_features
    }

    fn n_outputs(&self) -> usize {
        self.outputs.len()
    }

    fn predict(&self, x: &[f64]) -> PredictionResult<Vec<f64>> {
        check_width(self.n_features, x)?;
        self.outputs
            .iter()
            .map(|output| {
                let mut sum = 0.0;
                for tree in &output.trees {
                    let leaf = tree.leaf_value(x).ok_or_else(|| {
                        PredictionError::InvalidModelOutput("tree traversal failed".to_string())
                    })?;
                    sum += leaf.first().copied().unwrap_or(0.0);
                }
                Ok(output.init + self.learning_rate * sum)
            })
            .collect()
    }
}

/// Ordinary linear model, one coefficient row per output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearRegressor {
    pub coefficients: Vec<Vec<f64>>,
    pub intercepts: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub training_run: Option<String>,
}

impl LinearRegressor {
    /// Check the coefficient matrix is rectangular and matches the intercepts.
    pub fn validate(&self) -> Result<(), String> {
        if self.coefficients.len() != self.intercepts.len() {
            return Err(format!(
                "{} coefficient rows but {} intercepts",
                self.coefficients.len(),
                self.intercepts.len()
            ));
        }
        let width = self.n_inputs();
        if self.coefficients.iter().any(|row| row.len() != width) {
            return Err("coefficient rows differ in width".to_string());
        }
        let all_finite = self
            .coefficients
            .iter()
            .flatten()
            .chain(&self.intercepts)
            .all(|v| v.is_finite());
        if !all_finite {
            return Err("non-finite coefficient".to_string());
        }
        Ok(())
    }
}

impl Regressor for LinearRegressor {
    fn n_inputs(&self) -> usize {
        self.coefficients.first().map(Vec::len).unwrap_or(0)
    }

    fn n_outputs(&self) -> usize {
        self.intercepts.len()
    }

    fn predict(&self, x: &[f64]) -> PredictionResult<Vec<f64>> {
        check_width(self.n_inputs(), x)?;
        Ok(self
            .coefficients
            .iter()
            .zip(&self.intercepts)
            .map(|(row, b)| b + row.iter().zip(x).map(|(w, v)| w * v).sum::<f64>())
            .collect())
    }
}

/// Regressor as stored in `regressor.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegressorModel {
    GradientBoosting(GradientBoostingRegressor),
    Linear(LinearRegressor),
}

impl RegressorModel {
    /// Structural validation.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            RegressorModel::GradientBoosting(m) => m.validate(),
            RegressorModel::Linear(m) => m.validate(),
        }
    }

    /// Training run identifier, if recorded.
    pub fn training_run(&self) -> Option<&str> {
        match self {
            RegressorModel::GradientBoosting(m) => m.training_run.as_deref(),
            RegressorModel::Linear(m) => m.training_run.as_deref(),
        }
    }
}

impl Regressor for RegressorModel {
    fn n_inputs(&self) -> usize {
        match self {
            RegressorModel::GradientBoosting(m) => m.n_inputs(),
            RegressorModel::Linear(m) => m.n_inputs(),
        }
    }

    fn n_outputs(&self) -> usize {
        match self {
            RegressorModel::GradientBoosting(m) => m.n_outputs(),
            RegressorModel::Linear(m) => m.n_outputs(),
        }
    }

    fn predict(&self, x: &[f64]) -> PredictionResult<Vec<f64>> {
        match self {
            RegressorModel::GradientBoosting(m) => m.predict(x),
            RegressorModel::Linear(m) => m.predict(x),
        }
    }
}
