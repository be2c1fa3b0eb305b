//! The prediction service: buffer, feature engineer and models in one handle.
//!
//! A service is constructed once at startup and shared with request
//! handlers. If the model artifacts cannot be loaded the service still runs
//! in degraded mode: readings are accepted and the rule-based scorer works,
//! but forecasts fail with [`PredictionError::ModelNotLoaded`].

use crate::collector::types::{EnvironmentalValues, RawReading, Reading};
use crate::config::Config;
use crate::core::alerts::{self, Alert, AlertThresholds};
use crate::core::buffer::{BufferStatus, ReadingBuffer, SharedReadingBuffer};
use crate::core::comfort::{score_comfort, ComfortLevel};
use crate::core::environment::{sensor_alerts, CurrentConditions, SensorRanges, SensorThresholds};
use crate::core::features::FeatureEngineer;
use crate::core::recommend::{recommend, Recommendation, RecommendationThresholds};
use crate::error::{PredictionError, PredictionResult};
use crate::model::artifacts::{ArtifactError, ModelBundle};
use crate::prediction::classifier::{ClassifierOutput, ComfortClassifier};
use crate::prediction::forecaster::Forecaster;
use crate::stats::{PipelineStats, SharedPipelineStats};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

/// The fitted forecaster and classifier.
#[derive(Debug)]
pub struct PredictionModels {
    pub forecaster: Forecaster,
    pub classifier: ComfortClassifier,
}

impl PredictionModels {
    /// Build both models from a loaded artifact set.
    pub fn from_bundle(bundle: ModelBundle) -> PredictionResult<Self> {
        let forecaster = Forecaster::new(
            bundle.feature_columns.columns,
            bundle.scaler,
            Box::new(bundle.regressor),
        )?;
        let classifier = ComfortClassifier::new(Box::new(bundle.classifier))?;
        Ok(Self {
            forecaster,
            classifier,
        })
    }
}

/// Comfort part of a forecast summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComfortSummary {
    /// Level label, e.g. "Acceptable"
    pub level: String,
    pub level_code: u8,
    /// Probability of the predicted level, in percent, one decimal
    pub confidence: f64,
    /// Probability per known level label, in percent
    pub probabilities: BTreeMap<String, f64>,
}

impl From<&ClassifierOutput> for ComfortSummary {
    fn from(output: &ClassifierOutput) -> Self {
        Self {
            level: output.level.label().to_string(),
            level_code: output.level.code(),
            confidence: (output.confidence * 1000.0).round() / 10.0,
            probabilities: output
                .probabilities
                .iter()
                .map(|(level, p)| (level.label().to_string(), p * 100.0))
                .collect(),
        }
    }
}

/// Result bundle of one full pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSummary {
    pub forecast_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub current: Reading,
    pub predicted: EnvironmentalValues,
    /// `predicted - current`
    pub deltas: EnvironmentalValues,
    pub comfort: ComfortSummary,
    pub recommendations: Vec<Recommendation>,
    pub data_points_used: usize,
}

/// Readiness of the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionStatus {
    pub models_loaded: bool,
    pub instance_id: Uuid,
    pub memory_buffer: BufferStatus,
    pub ready: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degraded_reason: Option<String>,
    /// Checks on the most recent reading, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_conditions: Option<CurrentConditions>,
}

/// Intermediate result shared by the forecast and alert paths.
struct PipelineOutput {
    current: Reading,
    forecast: EnvironmentalValues,
    classification: ClassifierOutput,
    data_points: usize,
}

/// Owns the reading buffer and the loaded models.
#[derive(Debug)]
pub struct PredictionService {
    instance_id: Uuid,
    buffer: SharedReadingBuffer,
    engineer: FeatureEngineer,
    models: Result<PredictionModels, String>,
    history_window: usize,
    recommendations: RecommendationThresholds,
    alerts: AlertThresholds,
    sensors: SensorThresholds,
    sensor_ranges: SensorRanges,
    stats: SharedPipelineStats,
}

impl PredictionService {
    /// Create a service from already constructed models.
    ///
    /// Passing `Err(reason)` starts the service in degraded mode.
    pub fn new(config: &Config, models: Result<PredictionModels, String>) -> Self {
        let engineer = FeatureEngineer::new(config.features.clone());
        let models = models.and_then(|m| check_columns(&engineer, m));
        if let Err(reason) = &models {
            tracing::warn!("prediction models unavailable, running rule-based only: {reason}");
        }

        let capacity = config.buffer_capacity.max(engineer.min_rows());
        if capacity != config.buffer_capacity {
            tracing::warn!(
                configured = config.buffer_capacity,
                required = capacity,
                "buffer capacity too small for a forecast, raising it"
            );
        }

        Self {
            instance_id: Uuid::new_v4(),
            buffer: SharedReadingBuffer::new(ReadingBuffer::new(capacity, config.timezone)),
            engineer,
            models,
            history_window: config.history_window,
            recommendations: config.recommendations.clone(),
            alerts: config.alerts.clone(),
            sensors: config.sensors.clone(),
            sensor_ranges: config.sensor_ranges.clone(),
            stats: Arc::new(PipelineStats::new()),
        }
    }

    /// Load models from `config.model_dir`, degrading if they are unusable.
    pub fn from_config(config: &Config) -> Self {
        let models = ModelBundle::load(&config.model_dir)
            .map_err(|e| e.to_string())
            .and_then(|bundle| PredictionModels::from_bundle(bundle).map_err(|e| e.to_string()));
        Self::new(config, models)
    }

    /// Load models from `config.model_dir`, failing if they are unusable.
    pub fn from_config_strict(config: &Config) -> Result<Self, ArtifactError> {
        let bundle = ModelBundle::load(&config.model_dir)?;
        let models = PredictionModels::from_bundle(bundle)
            .map_err(|e| ArtifactError::Mismatch(e.to_string()))?;
        let engineer = FeatureEngineer::new(config.features.clone());
        let models = check_columns(&engineer, models).map_err(ArtifactError::Mismatch)?;
        Ok(Self::new(config, Ok(models)))
    }

    /// Replace the statistics sink, e.g. with a persisted one.
    pub fn with_stats(mut self, stats: SharedPipelineStats) -> Self {
        self.stats = stats;
        self
    }

    /// The shared reading buffer.
    pub fn buffer(&self) -> &SharedReadingBuffer {
        &self.buffer
    }

    /// Pipeline statistics.
    pub fn stats(&self) -> &SharedPipelineStats {
        &self.stats
    }

    /// Whether forecasting is available.
    pub fn models_loaded(&self) -> bool {
        self.models.is_ok()
    }

    /// Minimum number of buffered readings for a forecast.
    pub fn readings_needed(&self) -> usize {
        self.engineer.min_rows()
    }

    /// Validate and buffer a reading.
    pub fn submit_reading(&self, raw: RawReading) -> PredictionResult<Reading> {
        match self.buffer.add(raw) {
            Ok(reading) => {
                self.stats.record_reading_accepted();
                Ok(reading)
            }
            Err(e) => {
                self.stats.record_reading_rejected();
                tracing::debug!("rejected reading: {e}");
                Err(e)
            }
        }
    }

    /// Run the full pipeline on the current buffer.
    pub fn get_forecast_summary(&self) -> PredictionResult<ForecastSummary> {
        let output = self.record_outcome(self.run_pipeline())?;

        let recommendations = recommend(
            &output.current.engagement(),
            &output.forecast,
            output.classification.level,
            &self.recommendations,
        );

        tracing::info!(
            level = %output.classification.level,
            confidence = output.classification.confidence,
            recommendations = recommendations.len(),
            "forecast served"
        );

        Ok(ForecastSummary {
            forecast_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            deltas: output.forecast.delta(&output.current.environment()),
            predicted: output.forecast,
            comfort: ComfortSummary::from(&output.classification),
            current: output.current,
            recommendations,
            data_points_used: output.data_points,
        })
    }

    /// Run the pipeline and evaluate the alert checks.
    ///
    /// Forecast alerts come first, followed by limit checks on the current
    /// measured reading.
    pub fn check_alerts(&self) -> PredictionResult<Vec<Alert>> {
        let output = self.record_outcome(self.run_pipeline())?;
        let mut raised = alerts::check_alerts(
            &output.current.engagement(),
            &output.forecast,
            output.classification.level,
            &self.alerts,
        );
        raised.extend(sensor_alerts(&output.current, &self.sensors));
        self.stats.record_alerts(raised.len() as u64);
        Ok(raised)
    }

    /// Environmental score, normalised values and limit alerts for the most
    /// recent reading. Works without models.
    pub fn current_conditions(&self) -> Option<CurrentConditions> {
        self.buffer
            .latest()
            .map(|reading| CurrentConditions::assess(&reading, &self.sensors, &self.sensor_ranges))
    }

    /// Rule-based comfort level, available without models.
    pub fn score_current_comfort(&self, values: &EnvironmentalValues) -> ComfortLevel {
        score_comfort(values)
    }

    /// Rule-based comfort level of the most recent buffered reading.
    pub fn score_latest(&self) -> Option<ComfortLevel> {
        self.buffer
            .latest()
            .map(|reading| score_comfort(&reading.environment()))
    }

    /// Readiness report.
    pub fn status(&self) -> PredictionStatus {
        let memory_buffer = self.buffer.status(self.readings_needed());
        PredictionStatus {
            models_loaded: self.models_loaded(),
            instance_id: self.instance_id,
            ready: self.models_loaded() && memory_buffer.ready_for_forecast,
            memory_buffer,
            degraded_reason: self.models.as_ref().err().cloned(),
            current_conditions: self.current_conditions(),
        }
    }

    fn run_pipeline(&self) -> PredictionResult<PipelineOutput> {
        let models = self
            .models
            .as_ref()
            .map_err(|reason| PredictionError::ModelNotLoaded {
                reason: reason.clone(),
            })?;

        let required = self.readings_needed();
        let window = self.buffer.recent(self.history_window.max(required));
        let insufficient = PredictionError::InsufficientData {
            available: window.len(),
            required,
        };

        let current = match window.last() {
            Some(reading) if window.len() >= required => reading.clone(),
            _ => return Err(insufficient),
        };

        let table = self.engineer.engineer(&window);
        let latest = table.latest().ok_or(insufficient)?;

        let forecast = models.forecaster.forecast(&latest)?;
        let classification = models.classifier.classify(&current, &forecast)?;

        Ok(PipelineOutput {
            current,
            forecast,
            classification,
            data_points: window.len(),
        })
    }

    fn record_outcome(
        &self,
        result: PredictionResult<PipelineOutput>,
    ) -> PredictionResult<PipelineOutput> {
        match &result {
            Ok(_) => self.stats.record_forecast_served(),
            Err(e @ PredictionError::InsufficientData { .. }) => {
                self.stats.record_insufficient_data();
                tracing::debug!("{e}");
            }
            Err(e @ PredictionError::FeatureMismatch { .. }) => {
                self.stats.record_forecast_failed();
                tracing::error!("feature engineering and model disagree: {e}");
            }
            Err(e) => {
                self.stats.record_forecast_failed();
                tracing::warn!("forecast failed: {e}");
            }
        }
        result
    }
}

/// Reject models whose training columns the feature engineer cannot produce.
fn check_columns(
    engineer: &FeatureEngineer,
    models: PredictionModels,
) -> Result<PredictionModels, String> {
    let schema = engineer.schema();
    let missing: Vec<&str> = models
        .forecaster
        .columns()
        .iter()
        .filter(|c| schema.position(c).is_none())
        .map(String::as_str)
        .collect();
    if missing.is_empty() {
        Ok(models)
    } else {
        Err(format!(
            "{} of {} model feature columns are not produced (first: {})",
            missing.len(),
            models.forecaster.columns().len(),
            missing[0]
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::types::Engagement;
    use crate::model::classifier::Classifier;
    use crate::model::regressor::LinearRegressor;
    use crate::model::scaler::StandardScaler;
    use crate::prediction::classifier::CLASSIFIER_COLUMNS;
    use chrono::{Duration, TimeZone};

    #[derive(Debug)]
    struct AlwaysAcceptable;

    impl Classifier for AlwaysAcceptable {
        fn n_inputs(&self) -> usize {
            CLASSIFIER_COLUMNS.len()
        }
        fn classes(&self) -> &[i64] {
            &[1, 2, 3]
        }
        fn predict_proba(&self, _x: &[f64]) -> PredictionResult<Vec<f64>> {
            Ok(vec![0.1, 0.6, 0.3])
        }
    }

    /// Predicts the last observed values unchanged.
    fn persistence_models() -> PredictionModels {
        let columns: Vec<String> = ["temperature", "humidity", "gas", "light", "sound"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut coefficients = vec![vec![0.0; 5]; 5];
        for (i, row) in coefficients.iter_mut().enumerate() {
            row[i] = 1.0;
        }
        PredictionModels {
            forecaster: Forecaster::new(
                columns,
                StandardScaler::identity(5),
                Box::new(LinearRegressor {
                    coefficients,
                    intercepts: vec![0.0; 5],
                    training_run: None,
                }),
            )
            .unwrap(),
            classifier: ComfortClassifier::new(Box::new(AlwaysAcceptable)).unwrap(),
        }
    }

    fn raw(i: i64) -> RawReading {
        RawReading::complete(
            Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap() + Duration::minutes(i),
            EnvironmentalValues {
                temperature: 23.0,
                humidity: 45.0,
                gas: 600.0,
                light: 200.0,
                sound: 45.0,
            },
            Engagement {
                occupancy: 20,
                high_engagement: 15,
                low_engagement: 3,
            },
        )
    }

    #[test]
    fn test_degraded_mode() {
        let service = PredictionService::new(&Config::default(), Err("no artifacts".to_string()));
        for i in 0..15 {
            service.submit_reading(raw(i)).unwrap();
        }

        let err = service.get_forecast_summary().unwrap_err();
        assert!(matches!(err, PredictionError::ModelNotLoaded { .. }));
        assert_eq!(service.score_latest(), Some(ComfortLevel::Optimal));

        let status = service.status();
        assert!(!status.models_loaded);
        assert!(!status.ready);
        assert!(status.memory_buffer.ready_for_forecast);
        assert_eq!(status.degraded_reason.as_deref(), Some("no artifacts"));
    }

    #[test]
    fn test_insufficient_data() {
        let service = PredictionService::new(&Config::default(), Ok(persistence_models()));
        for i in 0..5 {
            service.submit_reading(raw(i)).unwrap();
        }
        assert_eq!(
            service.get_forecast_summary().unwrap_err(),
            PredictionError::InsufficientData {
                available: 5,
                required: 11
            }
        );
        assert_eq!(service.stats().snapshot().insufficient_data, 1);
    }

    #[test]
    fn test_summary_from_full_pipeline() {
        let service = PredictionService::new(&Config::default(), Ok(persistence_models()));
        for i in 0..40 {
            service.submit_reading(raw(i)).unwrap();
        }

        let summary = service.get_forecast_summary().unwrap();
        assert_eq!(summary.data_points_used, 30);
        assert_eq!(summary.predicted.temperature, 23.0);
        assert_eq!(summary.deltas.gas, 0.0);
        assert_eq!(summary.comfort.level, "Acceptable");
        assert_eq!(summary.comfort.level_code, 2);
        assert_eq!(summary.comfort.confidence, 60.0);
        assert_eq!(summary.comfort.probabilities.len(), 3);
        assert_eq!(summary.recommendations.len(), 1);
        assert_eq!(summary.recommendations[0].message, "All conditions optimal");

        let status = service.status();
        assert!(status.ready);
        assert_eq!(status.memory_buffer.buffer_size, 40);
    }

    #[test]
    fn test_incomplete_reading_counted() {
        let service = PredictionService::new(&Config::default(), Ok(persistence_models()));
        let mut partial = raw(0);
        partial.temperature = None;
        assert!(service.submit_reading(partial).is_err());
        assert_eq!(service.stats().snapshot().readings_rejected, 1);
        assert!(service.buffer().is_empty());
    }

    #[test]
    fn test_unknown_model_columns_degrade() {
        let mut config = Config::default();
        config.features.environmental.retain(|s| s.name() != "sound");
        // Raw columns are always present, so use an engineered one
        let mut models = persistence_models();
        models.forecaster = Forecaster::new(
            vec![
                "temperature".to_string(),
                "humidity".to_string(),
                "gas".to_string(),
                "light".to_string(),
                "sound_lag_1".to_string(),
            ],
            StandardScaler::identity(5),
            Box::new(LinearRegressor {
                coefficients: vec![vec![0.0; 5]; 5],
                intercepts: vec![0.0; 5],
                training_run: None,
            }),
        )
        .unwrap();

        let service = PredictionService::new(&config, Ok(models));
        assert!(!service.models_loaded());
        assert!(service
            .status()
            .degraded_reason
            .unwrap()
            .contains("sound_lag_1"));
    }

    #[test]
    fn test_small_buffer_raised_to_forecast_minimum() {
        let config = Config {
            buffer_capacity: 5,
            ..Config::default()
        };
        let service = PredictionService::new(&config, Ok(persistence_models()));
        for i in 0..20 {
            service.submit_reading(raw(i)).unwrap();
        }

        let status = service.status();
        assert_eq!(status.memory_buffer.max_size, 11);
        assert_eq!(status.memory_buffer.buffer_size, 11);
        assert!(status.ready);
        assert_eq!(service.get_forecast_summary().unwrap().data_points_used, 11);
    }

    #[test]
    fn test_current_conditions_without_models() {
        let service = PredictionService::new(&Config::default(), Err("no artifacts".to_string()));
        assert!(service.current_conditions().is_none());

        service.submit_reading(raw(0)).unwrap();
        let conditions = service.status().current_conditions.unwrap();
        // Light 200 lux is under the 300 lux limit and 200 below the optimal band
        let ids: Vec<&str> = conditions.alerts.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["sensor_light_low"]);
        assert_eq!(conditions.environmental_score, 90.0);
        assert_eq!(conditions.normalized.temperature, 40.0);
    }

    #[test]
    fn test_alerts_include_current_limits() {
        let service = PredictionService::new(&Config::default(), Ok(persistence_models()));
        for i in 0..15 {
            service.submit_reading(raw(i)).unwrap();
        }
        let alerts = service.check_alerts().unwrap();
        let ids: Vec<&str> = alerts.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["sensor_light_low"]);
        assert_eq!(service.stats().snapshot().alerts_raised, 1);
    }
}
