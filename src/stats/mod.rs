//! Activity statistics for the prediction pipeline.

pub mod log;

// Re-export commonly used types
pub use log::{PipelineStats, SharedPipelineStats, StatsSnapshot};
