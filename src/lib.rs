pub mod combine;
pub mod config;
pub mod convert;
pub mod dispute;
pub mod model;
pub mod report;
pub mod traits;

// Re-export common types for convenience
pub use combine::{CombinePipeline, CombineStats, PipelineError};
pub use config::CombineConfig;
pub use dispute::CveList;
pub use model::*;
pub use report::Reporter;
pub use traits::*;
