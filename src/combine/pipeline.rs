//! Combine pipeline executor.
//!
//! [`CombinePipeline`] runs the stages of one combine run in order:
//! ingest NVD batches → ingest advisory parts → merge → emit.
//! Each stage borrows the run's [`Reporter`]; fatal problems surface as a
//! [`PipelineError`], recoverable ones as reporter warnings.

use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::combine::emit::write_records;
use crate::combine::ingest::{load_fragments, load_source_vulnerabilities};
use crate::combine::merge::combine;
use crate::config::CombineConfig;
use crate::dispute::CveList;
use crate::report::Reporter;
use crate::traits::DisputeLookup;

// ============================================================================
// Pipeline Errors
// ============================================================================

/// Errors that abort a combine run.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    /// A required input or output directory could not be created
    #[error("Can't create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An input directory could not be listed
    #[error("Failed to read dir {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An input file could not be opened
    #[error("Failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An input file does not match its batch schema
    #[error("Failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// An output file could not be created or written
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A combined record could not be encoded
    #[error("Failed to encode {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

// ============================================================================
// Pipeline Types
// ============================================================================

/// Counters collected over one run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CombineStats {
    /// Distinct NVD records loaded
    pub source_records: usize,

    /// Part files read across all ecosystem directories
    pub fragment_files: usize,

    /// Advisory parts read
    pub fragments: usize,

    /// Records produced by the merge
    pub combined: usize,

    /// Combined records marked withdrawn
    pub withdrawn: usize,

    /// Files written to the output directory
    pub written: usize,

    /// Recoverable problems logged during the run
    pub warnings: usize,

    /// Wall time of the whole run (milliseconds)
    pub total_duration_ms: u64,
}

// ============================================================================
// Pipeline Executor
// ============================================================================

/// One combine run over the directories named by a [`CombineConfig`].
///
/// # Example
///
/// ```ignore
/// use combine_to_osv::{CombineConfig, CombinePipeline, Reporter};
///
/// let reporter = Reporter::stderr("combine-to-osv");
/// let config = CombineConfig::default().with_cve_list_path("cvelistV5");
/// let stats = CombinePipeline::new(config).execute(&reporter)?;
/// println!("wrote {} OSV records", stats.written);
/// ```
pub struct CombinePipeline {
    config: CombineConfig,
}

impl CombinePipeline {
    pub fn new(config: CombineConfig) -> Self {
        Self { config }
    }

    /// Runs every stage once.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if a directory cannot be created or read,
    /// an input file fails to decode, or an output file cannot be written.
    pub fn execute(&self, reporter: &Reporter) -> Result<CombineStats, PipelineError> {
        let _entered = reporter.span().enter();
        let start = Instant::now();
        let mut stats = CombineStats::default();

        for dir in [
            &self.config.cve_path,
            &self.config.parts_path,
            &self.config.output_path,
        ] {
            create_dir(dir)?;
        }

        let sources = load_source_vulnerabilities(&self.config.cve_path, reporter)?;
        stats.source_records = sources.len();

        let fragments = load_fragments(&self.config.parts_path, reporter)?;
        stats.fragment_files = fragments.files;
        stats.fragments = fragments.parts.values().map(Vec::len).sum();

        let cve_list = self.config.cve_list_path.clone().map(CveList::new);
        let disputes = cve_list.as_ref().map(|list| list as &dyn DisputeLookup);

        let combined = combine(&sources, &fragments, disputes, reporter);
        stats.combined = combined.len();
        stats.withdrawn = combined.values().filter(|v| !v.withdrawn.is_empty()).count();

        stats.written = write_records(&combined, &self.config.output_path, reporter)?;
        stats.warnings = reporter.warnings();
        stats.total_duration_ms = start.elapsed().as_millis() as u64;

        reporter.info(format_args!(
            "Combined {} records from {} NVD records and {} parts in {}ms",
            stats.written, stats.source_records, stats.fragments, stats.total_duration_ms
        ));
        Ok(stats)
    }
}

fn create_dir(path: &Path) -> Result<(), PipelineError> {
    std::fs::create_dir_all(path).map_err(|source| PipelineError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}
