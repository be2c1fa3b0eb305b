//! Loading the four model artifacts as one versioned set.
//!
//! A model directory holds:
//!
//! - `scaler.json`: `{ "mean": [...], "scale": [...] }`
//! - `regressor.json`: `{ "kind": "gradient_boosting" | "linear", ... }`
//! - `classifier.json`: `{ "kind": "random_forest" | "logistic", ... }`
//! - `feature_columns.json`: `{ "columns": [...] }`
//!
//! Any artifact may record a `training_run`. The set is rejected at load
//! time if recorded runs differ or if the widths do not line up.

use crate::collector::types::Sensor;
use crate::core::comfort::ComfortLevel;
use crate::model::classifier::{Classifier, ClassifierModel};
use crate::model::regressor::{Regressor, RegressorModel};
use crate::model::scaler::StandardScaler;
use crate::prediction::classifier::CLASSIFIER_COLUMNS;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const SCALER_FILE: &str = "scaler.json";
pub const REGRESSOR_FILE: &str = "regressor.json";
pub const CLASSIFIER_FILE: &str = "classifier.json";
pub const FEATURE_COLUMNS_FILE: &str = "feature_columns.json";

/// Errors loading or validating model artifacts.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid {artifact}: {reason}")]
    Invalid {
        artifact: &'static str,
        reason: String,
    },

    #[error("artifacts do not belong together: {0}")]
    Mismatch(String),
}

/// Ordered feature-column names the regressor was fit with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureColumns {
    pub columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub training_run: Option<String>,
}

/// The complete, validated artifact set.
#[derive(Debug, Clone)]
pub struct ModelBundle {
    pub scaler: StandardScaler,
    pub regressor: RegressorModel,
    pub classifier: ClassifierModel,
    pub feature_columns: FeatureColumns,
}

impl ModelBundle {
    /// Load and validate all four artifacts from `dir`.
    pub fn load(dir: &Path) -> Result<Self, ArtifactError> {
        let bundle = Self {
            scaler: read_json(&dir.join(SCALER_FILE))?,
            regressor: read_json(&dir.join(REGRESSOR_FILE))?,
            classifier: read_json(&dir.join(CLASSIFIER_FILE))?,
            feature_columns: read_json(&dir.join(FEATURE_COLUMNS_FILE))?,
        };
        bundle.validate()?;

        tracing::info!(
            dir = %dir.display(),
            columns = bundle.feature_columns.columns.len(),
            classes = ?bundle.classifier.classes(),
            training_run = bundle.training_run().unwrap_or("-"),
            "model artifacts loaded"
        );
        Ok(bundle)
    }

    /// Write all four artifacts to `dir`, creating it if needed.
    pub fn save(&self, dir: &Path) -> Result<(), ArtifactError> {
        std::fs::create_dir_all(dir).map_err(|source| ArtifactError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        write_json(&dir.join(SCALER_FILE), &self.scaler)?;
        write_json(&dir.join(REGRESSOR_FILE), &self.regressor)?;
        write_json(&dir.join(CLASSIFIER_FILE), &self.classifier)?;
        write_json(&dir.join(FEATURE_COLUMNS_FILE), &self.feature_columns)?;
        Ok(())
    }

    /// The training run shared by the artifacts that record one.
    pub fn training_run(&self) -> Option<&str> {
        self.runs().into_iter().flatten().next()
    }

    fn runs(&self) -> [Option<&str>; 4] {
        [
            self.scaler.training_run.as_deref(),
            self.regressor.training_run(),
            self.classifier.training_run(),
            self.feature_columns.training_run.as_deref(),
        ]
    }

    /// Check each artifact and their agreement with each other.
    pub fn validate(&self) -> Result<(), ArtifactError> {
        self.scaler.validate().map_err(|reason| ArtifactError::Invalid {
            artifact: SCALER_FILE,
            reason,
        })?;
        self.regressor
            .validate()
            .map_err(|reason| ArtifactError::Invalid {
                artifact: REGRESSOR_FILE,
                reason,
            })?;
        self.classifier
            .validate()
            .map_err(|reason| ArtifactError::Invalid {
                artifact: CLASSIFIER_FILE,
                reason,
            })?;

        let columns = &self.feature_columns.columns;
        if columns.is_empty() {
            return Err(ArtifactError::Invalid {
                artifact: FEATURE_COLUMNS_FILE,
                reason: "no columns".to_string(),
            });
        }

        let mut runs: Vec<&str> = self.runs().into_iter().flatten().collect();
        runs.sort_unstable();
        runs.dedup();
        if runs.len() > 1 {
            return Err(ArtifactError::Mismatch(format!(
                "training runs differ: {}",
                runs.join(", ")
            )));
        }

        if self.scaler.width() != columns.len() {
            return Err(ArtifactError::Mismatch(format!(
                "scaler width {} but {} feature columns",
                self.scaler.width(),
                columns.len()
            )));
        }
        if self.regressor.n_inputs() != columns.len() {
            return Err(ArtifactError::Mismatch(format!(
                "regressor expects {} inputs but {} feature columns",
                self.regressor.n_inputs(),
                columns.len()
            )));
        }
        if self.regressor.n_outputs() != Sensor::ALL.len() {
            return Err(ArtifactError::Mismatch(format!(
                "regressor has {} outputs, expected {}",
                self.regressor.n_outputs(),
                Sensor::ALL.len()
            )));
        }
        if self.classifier.n_inputs() != CLASSIFIER_COLUMNS.len() {
            return Err(ArtifactError::Mismatch(format!(
                "classifier expects {} inputs, expected {}",
                self.classifier.n_inputs(),
                CLASSIFIER_COLUMNS.len()
            )));
        }
        if let Some(bad) = self
            .classifier
            .classes()
            .iter()
            .find(|c| ComfortLevel::from_code(**c).is_none())
        {
            return Err(ArtifactError::Invalid {
                artifact: CLASSIFIER_FILE,
                reason: format!("class label {bad} is not a comfort level"),
            });
        }
        Ok(())
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let content = std::fs::read_to_string(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ArtifactError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ArtifactError> {
    let json = serde_json::to_string_pretty(value).map_err(|source| ArtifactError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, json).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::classifier::RandomForestClassifier;
    use crate::model::regressor::LinearRegressor;
    use crate::model::tree::DecisionTree;
    use tempfile::TempDir;

    fn bundle(width: usize) -> ModelBundle {
        ModelBundle {
            scaler: StandardScaler::identity(width),
            regressor: RegressorModel::Linear(LinearRegressor {
                coefficients: vec![vec![0.0; width]; 5],
                intercepts: vec![23.0, 45.0, 600.0, 200.0, 45.0],
                training_run: Some("2024-03-01".to_string()),
            }),
            classifier: ClassifierModel::RandomForest(RandomForestClassifier {
                n_features: CLASSIFIER_COLUMNS.len(),
                classes: vec![1, 2, 3],
                trees: vec![DecisionTree::leaf(vec![0.0, 1.0, 3.0])],
                training_run: None,
            }),
            feature_columns: FeatureColumns {
                columns: (0..width).map(|i| format!("c{i}")).collect(),
                training_run: None,
            },
        }
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        bundle(3).save(dir.path()).unwrap();

        let loaded = ModelBundle::load(dir.path()).unwrap();
        assert_eq!(loaded.feature_columns.columns, vec!["c0", "c1", "c2"]);
        assert_eq!(loaded.training_run(), Some("2024-03-01"));
        assert_eq!(loaded.classifier.classes(), &[1, 2, 3]);
    }

    #[test]
    fn test_missing_artifact() {
        let dir = TempDir::new().unwrap();
        let err = ModelBundle::load(dir.path()).unwrap_err();
        assert!(matches!(err, ArtifactError::Io { .. }));
    }

    #[test]
    fn test_corrupt_artifact() {
        let dir = TempDir::new().unwrap();
        bundle(2).save(dir.path()).unwrap();
        std::fs::write(dir.path().join(SCALER_FILE), "{not json").unwrap();
        assert!(matches!(
            ModelBundle::load(dir.path()),
            Err(ArtifactError::Parse { .. })
        ));
    }

    #[test]
    fn test_width_mismatch_fails_fast() {
        let mut b = bundle(3);
        b.feature_columns.columns.pop();
        assert!(matches!(b.validate(), Err(ArtifactError::Mismatch(_))));
    }

    #[test]
    fn test_mixed_training_runs_rejected() {
        let mut b = bundle(2);
        b.scaler.training_run = Some("2024-04-01".to_string());
        let err = b.validate().unwrap_err();
        assert!(err.to_string().contains("training runs differ"));
    }

    #[test]
    fn test_unknown_class_label_rejected() {
        let mut b = bundle(2);
        b.classifier = ClassifierModel::RandomForest(RandomForestClassifier {
            n_features: CLASSIFIER_COLUMNS.len(),
            classes: vec![2, 7],
            trees: vec![DecisionTree::leaf(vec![1.0, 1.0])],
            training_run: None,
        });
        assert!(matches!(b.validate(), Err(ArtifactError::Invalid { .. })));
    }
}
