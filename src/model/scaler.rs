//! Standard scaling of feature rows.

use crate::error::{PredictionError, PredictionResult};
use serde::{Deserialize, Serialize};

/// Per-column `(x - mean) / scale` transform fitted at training time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub training_run: Option<String>,
}

impl StandardScaler {
    /// Create a scaler from fitted parameters.
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Self {
        Self {
            mean,
            scale,
            training_run: None,
        }
    }

    /// An identity scaler of the given width.
    pub fn identity(width: usize) -> Self {
        Self::new(vec![0.0; width], vec![1.0; width])
    }

    /// Number of input columns.
    pub fn width(&self) -> usize {
        self.mean.len()
    }

    /// Check the parameters are usable.
    pub fn validate(&self) -> Result<(), String> {
        if self.mean.len() != self.scale.len() {
            return Err(format!(
                "mean has {} entries but scale has {}",
                self.mean.len(),
                self.scale.len()
            ));
        }
        if let Some(i) = self.mean.iter().position(|m| !m.is_finite()) {
            return Err(format!("mean[{i}] is not finite"));
        }
        if let Some(i) = self
            .scale
            .iter()
            .position(|s| !s.is_finite() || *s == 0.0)
        {
            return Err(format!("scale[{i}] must be finite and non-zero"));
        }
        Ok(())
    }

    /// Scale one row.
    pub fn transform(&self, row: &[f64]) -> PredictionResult<Vec<f64>> {
        if row.len() != self.width() {
            return Err(PredictionError::ArtifactMismatch(format!(
                "scaler expects {} columns, got {}",
                self.width(),
                row.len()
            )));
        }
        Ok(row
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (mean, scale))| (x - mean) / scale)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform() {
        let scaler = StandardScaler::new(vec![10.0, 0.0], vec![2.0, 0.5]);
        assert_eq!(scaler.transform(&[14.0, 1.0]).unwrap(), vec![2.0, 2.0]);
    }

    #[test]
    fn test_width_mismatch_is_error() {
        let scaler = StandardScaler::identity(3);
        assert!(matches!(
            scaler.transform(&[1.0, 2.0]),
            Err(PredictionError::ArtifactMismatch(_))
        ));
    }

    #[test]
    fn test_validate() {
        assert!(StandardScaler::identity(4).validate().is_ok());
        assert!(StandardScaler::new(vec![0.0], vec![0.0]).validate().is_err());
        assert!(StandardScaler::new(vec![0.0, 1.0], vec![1.0]).validate().is_err());
    }
}
