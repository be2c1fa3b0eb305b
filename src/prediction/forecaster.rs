//! Next-interval forecast of the five environmental signals.

use crate::collector::types::{EnvironmentalValues, Sensor};
use crate::core::features::FeatureView;
use crate::error::{PredictionError, PredictionResult};
use crate::model::regressor::Regressor;
use crate::model::scaler::StandardScaler;

/// Wraps a fitted regressor with its scaler and training column order.
#[derive(Debug)]
pub struct Forecaster {
    columns: Vec<String>,
    scaler: StandardScaler,
    model: Box<dyn Regressor>,
}

impl Forecaster {
    /// Create a forecaster, checking that the three parts agree on width.
    pub fn new(
        columns: Vec<String>,
        scaler: StandardScaler,
        model: Box<dyn Regressor>,
    ) -> PredictionResult<Self> {
        if scaler.width() != columns.len() || model.n_inputs() != columns.len() {
            return Err(PredictionError::ArtifactMismatch(format!(
                "{} feature columns, scaler width {}, regressor width {}",
                columns.len(),
                scaler.width(),
                model.n_inputs()
            )));
        }
        if model.n_outputs() != Sensor::ALL.len() {
            return Err(PredictionError::ArtifactMismatch(format!(
                "regressor has {} outputs, expected {}",
                model.n_outputs(),
                Sensor::ALL.len()
            )));
        }
        Ok(Self {
            columns,
            scaler,
            model,
        })
    }

    /// Feature columns in training order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Select the training columns from a feature row, by name.
    ///
    /// Every missing column is reported; nothing is filled in.
    pub fn select(&self, row: &FeatureView<'_>) -> PredictionResult<Vec<f64>> {
        let mut values = Vec::with_capacity(self.columns.len());
        let mut missing = Vec::new();
        for name in &self.columns {
            match row.get(name) {
                Some(v) => values.push(v),
                None => missing.push(name.clone()),
            }
        }
        if missing.is_empty() {
            Ok(values)
        } else {
            Err(PredictionError::FeatureMismatch {
                missing,
                expected: self.columns.len(),
            })
        }
    }

    /// Forecast from the latest feature row.
    ///
    /// Output is in original units and is not clamped.
    pub fn forecast(&self, row: &FeatureView<'_>) -> PredictionResult<EnvironmentalValues> {
        let selected = self.select(row)?;
        let scaled = self.scaler.transform(&selected)?;
        let output = self.model.predict(&scaled)?;

        if let Some(i) = output.iter().position(|v| !v.is_finite()) {
            return Err(PredictionError::InvalidModelOutput(format!(
                "forecast for {} is not finite",
                Sensor::ALL.get(i).map(Sensor::name).unwrap_or("?")
            )));
        }
        EnvironmentalValues::from_slice(&output).ok_or_else(|| {
            PredictionError::InvalidModelOutput(format!(
                "regressor returned {} values, expected {}",
                output.len(),
                Sensor::ALL.len()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::features::{FeatureRow, FeatureSchema, FeatureConfig};
    use crate::model::regressor::LinearRegressor;

    fn linear(width: usize) -> Box<dyn Regressor> {
        let mut coefficients = vec![vec![0.0; width]; 5];
        coefficients[0][0] = 1.0;
        Box::new(LinearRegressor {
            coefficients,
            intercepts: vec![0.0, -5.0, 600.0, 200.0, 45.0],
            training_run: None,
        })
    }

    #[test]
    fn test_forecast_selects_by_name() {
        let schema = FeatureSchema::from_config(&FeatureConfig::default());
        let mut values = vec![0.0; schema.len()];
        let pos = schema.position("temperature_lag_1").unwrap();
        values[pos] = 24.5;
        let row = FeatureRow {
            source_index: 0,
            values,
        };
        let view = FeatureView::new(&schema, &row);

        let forecaster = Forecaster::new(
            vec!["temperature_lag_1".to_string(), "hour".to_string()],
            StandardScaler::identity(2),
            linear(2),
        )
        .unwrap();

        let forecast = forecaster.forecast(&view).unwrap();
        assert_eq!(forecast.temperature, 24.5);
        // Negative humidity is passed through unchanged
        assert_eq!(forecast.humidity, -5.0);
    }

    #[test]
    fn test_missing_column_is_feature_mismatch() {
        let schema = FeatureSchema::from_config(&FeatureConfig::default());
        let row = FeatureRow {
            source_index: 0,
            values: vec![1.0; schema.len()],
        };
        let view = FeatureView::new(&schema, &row);

        let forecaster = Forecaster::new(
            vec!["temperature".to_string(), "co2_roll_mean_5".to_string()],
            StandardScaler::identity(2),
            linear(2),
        )
        .unwrap();

        assert_eq!(
            forecaster.forecast(&view).unwrap_err(),
            PredictionError::FeatureMismatch {
                missing: vec!["co2_roll_mean_5".to_string()],
                expected: 2,
            }
        );
    }

    #[test]
    fn test_width_disagreement_rejected() {
        let err = Forecaster::new(
            vec!["temperature".to_string()],
            StandardScaler::identity(2),
            linear(2),
        )
        .unwrap_err();
        assert!(matches!(err, PredictionError::ArtifactMismatch(_)));
    }
}
