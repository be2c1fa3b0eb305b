//! Inference-only model implementations and artifact loading.

pub mod artifacts;
pub mod classifier;
pub mod regressor;
pub mod scaler;
pub mod tree;

pub use artifacts::{ArtifactError, FeatureColumns, ModelBundle};
pub use classifier::{Classifier, ClassifierModel, LogisticClassifier, RandomForestClassifier};
pub use regressor::{
    BoostedOutput, GradientBoostingRegressor, LinearRegressor, Regressor, RegressorModel,
};
pub use scaler::StandardScaler;
pub use tree::{DecisionTree, Node};
