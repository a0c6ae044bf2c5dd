//! Combine module - NVD records + advisory parts → OSV records.
//!
//! Stages, in order:
//! - **Ingest**: [`load_source_vulnerabilities`], [`load_fragments`]
//! - **Merge**: [`combine`], with tracker references from [`TrackedEcosystem`]
//! - **Emit**: [`write_records`]
//! - **Pipeline**: [`pipeline::CombinePipeline`] runs all of them

pub mod ecosystem;
pub mod emit;
pub mod ingest;
pub mod merge;
pub mod pipeline;

pub use ecosystem::TrackedEcosystem;
pub use emit::write_records;
pub use ingest::{load_fragments, load_source_vulnerabilities, FragmentIndex};
pub use merge::combine;
pub use pipeline::{CombinePipeline, CombineStats, PipelineError};
