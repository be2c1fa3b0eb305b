//! Multi-class probabilistic classifiers.

use crate::error::{PredictionError, PredictionResult};
use crate::model::tree::DecisionTree;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// A fitted classifier with an explicit class list.
///
/// `predict_proba` returns one probability per entry of `classes`, in the
/// same order.
pub trait Classifier: Send + Sync + Debug {
    /// Expected input width.
    fn n_inputs(&self) -> usize;

    /// Class labels known to the model.
    fn classes(&self) -> &[i64];

    /// Class probabilities for one row.
    fn predict_proba(&self, x: &[f64]) -> PredictionResult<Vec<f64>>;
}

fn check_width(expected: usize, x: &[f64]) -> PredictionResult<()> {
    if x.len() == expected {
        Ok(())
    } else {
        Err(PredictionError::ArtifactMismatch(format!(
            "classifier expects {expected} inputs, got {}",
            x.len()
        )))
    }
}

fn validate_classes(classes: &[i64]) -> Result<(), String> {
    if classes.is_empty() {
        return Err("no classes".to_string());
    }
    let mut sorted = classes.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    if sorted.len() != classes.len() {
        return Err("duplicate class labels".to_string());
    }
    Ok(())
}

/// Random forest: the mean of each tree's normalised leaf distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestClassifier {
    pub n_features: usize,
    pub classes: Vec<i64>,
    pub trees: Vec<DecisionTree>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub training_run: Option<String>,
}

impl RandomForestClassifier {
    /// Check classes and every tree.
    pub fn validate(&self) -> Result<(), String> {
        validate_classes(&self.classes)?;
        if self.trees.is_empty() {
            return Err("forest has no trees".to_string());
        }
        for (t, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features, self.classes.len())
                .map_err(|e| format!("tree {t}: {e}"))?;
        }
        Ok(())
    }
}

impl Classifier for RandomForestClassifier {
    fn n_inputs(&self) -> usize {
        self.n_features
    }

    fn classes(&self) -> &[i64] {
        &self.classes
    }

    fn predict_proba(&self, x: &[f64]) -> PredictionResult<Vec<f64>> {
        check_width(self.n_features, x)?;
        if self.trees.is_empty() {
            return Err(PredictionError::InvalidModelOutput(
                "forest has no trees".to_string(),
            ));
        }

        let mut proba = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            let leaf = tree.leaf_value(x).ok_or_else(|| {
                PredictionError::InvalidModelOutput("tree traversal failed".to_string())
            })?;
            let total: f64 = leaf.iter().sum();
            if total <= 0.0 {
                continue;
            }
            for (p, v) in proba.iter_mut().zip(leaf) {
                *p += v / total;
            }
        }

        let n = self.trees.len() as f64;
        Ok(proba.into_iter().map(|p| p / n).collect())
    }
}

/// Multinomial logistic regression.
///
/// With two classes and a single coefficient row it behaves as a binary
/// model whose row scores the second class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticClassifier {
    pub classes: Vec<i64>,
    pub coefficients: Vec<Vec<f64>>,
    pub intercepts: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub training_run: Option<String>,
}

impl LogisticClassifier {
    fn is_binary(&self) -> bool {
        self.classes.len() == 2 && self.coefficients.len() == 1
    }

    /// Check classes and coefficient shapes.
    pub fn validate(&self) -> Result<(), String> {
        validate_classes(&self.classes)?;
        if !self.is_binary() && self.coefficients.len() != self.classes.len() {
            return Err(format!(
                "{} coefficient rows for {} classes",
                self.coefficients.len(),
                self.classes.len()
            ));
        }
        if self.intercepts.len() != self.coefficients.len() {
            return Err("intercept count differs from coefficient rows".to_string());
        }
        let width = self.n_inputs();
        if self.coefficients.iter().any(|row| row.len() != width) {
            return Err("coefficient rows differ in width".to_string());
        }
        Ok(())
    }
}

impl Classifier for LogisticClassifier {
    fn n_inputs(&self) -> usize {
        self.coefficients.first().map(Vec::len).unwrap_or(0)
    }

    fn classes(&self) -> &[i64] {
        &self.classes
    }

    fn predict_proba(&self, x: &[f64]) -> PredictionResult<Vec<f64>> {
        check_width(self.n_inputs(), x)?;
        let scores: Vec<f64> = self
            .coefficients
            .iter()
            .zip(&self.intercepts)
            .map(|(row, b)| b + row.iter().zip(x).map(|(w, v)| w * v).sum::<f64>())
            .collect();

        if self.is_binary() {
            let p = 1.0 / (1.0 + (-scores[0]).exp());
            return Ok(vec![1.0 - p, p]);
        }

        let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let exp: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
        let total: f64 = exp.iter().sum();
        Ok(exp.into_iter().map(|e| e / total).collect())
    }
}

/// Classifier as stored in `classifier.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierModel {
    RandomForest(RandomForestClassifier),
    Logistic(LogisticClassifier),
}

impl ClassifierModel {
    /// Structural validation.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            ClassifierModel::RandomForest(m) => m.validate(),
            ClassifierModel::Logistic(m) => m.validate(),
        }
    }

    /// Training run identifier, if recorded.
    pub fn training_run(&self) -> Option<&str> {
        match self {
            ClassifierModel::RandomForest(m) => m.training_run.as_deref(),
            ClassifierModel::Logistic(m) => m.training_run.as_deref(),
        }
    }
}

impl Classifier for ClassifierModel {
    fn n_inputs(&self) -> usize {
        match self {
            ClassifierModel::RandomForest(m) => m.n_inputs(),
            ClassifierModel::Logistic(m) => m.n_inputs(),
        }
    }

    fn classes(&self) -> &[i64] {
        match self {
            ClassifierModel::RandomForest(m) => m.classes(),
            ClassifierModel::Logistic(m) => m.classes(),
        }
    }

    fn predict_proba(&self, x: &[f64]) -> PredictionResult<Vec<f64>> {
        match self {
            ClassifierModel::RandomForest(m) => m.predict_proba(x),
            ClassifierModel::Logistic(m) => m.predict_proba(x),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forest_averages_normalised_leaves() {
        let forest = RandomForestClassifier {
            n_features: 1,
            classes: vec![1, 2, 3],
            trees: vec![
                DecisionTree::stump(0, 0.0, vec![4.0, 0.0, 0.0], vec![0.0, 1.0, 3.0]),
                DecisionTree::leaf(vec![0.0, 0.0, 10.0]),
            ],
            training_run: None,
        };
        assert!(forest.validate().is_ok());

        let p = forest.predict_proba(&[1.0]).unwrap();
        assert!((p[0] - 0.0).abs() < 1e-12);
        assert!((p[1] - 0.125).abs() < 1e-12);
        assert!((p[2] - 0.875).abs() < 1e-12);
    }

    #[test]
    fn test_logistic_softmax_sums_to_one() {
        let model = LogisticClassifier {
            classes: vec![0, 1, 2, 3],
            coefficients: vec![vec![1.0], vec![0.5], vec![-0.5], vec![0.0]],
            intercepts: vec![0.0, 0.1, 0.2, 0.3],
            training_run: None,
        };
        assert!(model.validate().is_ok());
        let p = model.predict_proba(&[2.0]).unwrap();
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(p[0] > p[3]);
    }

    #[test]
    fn test_binary_logistic() {
        let model = LogisticClassifier {
            classes: vec![2, 3],
            coefficients: vec![vec![1.0]],
            intercepts: vec![0.0],
            training_run: None,
        };
        assert!(model.validate().is_ok());
        let p = model.predict_proba(&[0.0]).unwrap();
        assert_eq!(p, vec![0.5, 0.5]);
    }

    #[test]
    fn test_duplicate_classes_rejected() {
        let forest = RandomForestClassifier {
            n_features: 1,
            classes: vec![1, 1],
            trees: vec![DecisionTree::leaf(vec![1.0, 1.0])],
            training_run: None,
        };
        assert!(forest.validate().is_err());
    }
}
