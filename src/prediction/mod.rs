//! Forecasting and comfort classification on top of the feature engineer.

pub mod classifier;
pub mod forecaster;
pub mod service;

pub use classifier::{classifier_row, ClassifierOutput, ComfortClassifier, CLASSIFIER_COLUMNS};
pub use forecaster::Forecaster;
pub use service::{
    ComfortSummary, ForecastSummary, PredictionModels, PredictionService, PredictionStatus,
};
