//! Loading of NVD batches and advisory parts into memory.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;

use crate::combine::pipeline::PipelineError;
use crate::model::{NvdBatch, PackageInfo, SourceVulnerability, VulnId};
use crate::report::Reporter;

/// Advisory parts grouped by identifier.
#[derive(Debug, Default)]
pub struct FragmentIndex {
    /// Parts per identifier, in ecosystem-directory then file-name order
    pub parts: HashMap<VulnId, Vec<PackageInfo>>,

    /// Latest part-file modification time per identifier
    pub modified: HashMap<VulnId, DateTime<Utc>>,

    /// Number of part files read
    pub files: usize,
}

/// Loads every NVD batch (`*.json`) in `dir`.
///
/// Files are read in name order; a later file wins on duplicate ids.
pub fn load_source_vulnerabilities(
    dir: &Path,
    reporter: &Reporter,
) -> Result<HashMap<VulnId, SourceVulnerability>, PipelineError> {
    let mut result = HashMap::new();

    for path in sorted_entries(dir)? {
        if !is_json_file(&path) {
            continue;
        }
        let batch: NvdBatch = decode_file(&path)?;
        for item in batch.vulnerabilities {
            result.insert(item.cve.id.clone(), item);
        }
        reporter.info(format_args!("Loaded CVE: {}", display_name(&path)));
    }

    Ok(result)
}

/// Loads advisory parts laid out as `<dir>/<ecosystem>/<ID>.<anything>.json`.
///
/// Non-directory entries directly under `dir` are skipped with a warning.
pub fn load_fragments(dir: &Path, reporter: &Reporter) -> Result<FragmentIndex, PipelineError> {
    let mut index = FragmentIndex::default();

    for path in sorted_entries(dir)? {
        if !path.is_dir() {
            reporter.warn(format_args!(
                "Unexpected file entry {:?} in {}",
                display_name(&path),
                dir.display()
            ));
            continue;
        }
        load_ecosystem_parts(&path, &mut index, reporter)?;
    }

    Ok(index)
}

fn load_ecosystem_parts(
    dir: &Path,
    index: &mut FragmentIndex,
    reporter: &Reporter,
) -> Result<(), PipelineError> {
    for path in sorted_entries(dir)? {
        if !is_json_file(&path) {
            continue;
        }
        let parts: Vec<PackageInfo> = decode_file(&path)?;
        let name = display_name(&path);

        // CVE-2022-12345.alpine.json -> CVE-2022-12345
        let id: VulnId = name.split('.').next().unwrap_or_default().to_string();
        index.parts.entry(id.clone()).or_default().extend(parts);
        index.files += 1;
        reporter.info(format_args!("Loaded Item: {name}"));

        record_modified(&mut index.modified, id, &path, modified_time(&path), reporter);
    }

    Ok(())
}

/// Folds one part file's mtime into the identifier's latest time. A failed
/// stat is a warning and contributes nothing.
fn record_modified(
    latest: &mut HashMap<VulnId, DateTime<Utc>>,
    id: VulnId,
    path: &Path,
    modified: std::io::Result<DateTime<Utc>>,
    reporter: &Reporter,
) {
    let modified = match modified {
        Ok(modified) => modified,
        Err(e) => {
            reporter.warn(format_args!(
                "Failed to get modified time of {}: {}",
                path.display(),
                e
            ));
            return;
        }
    };
    latest
        .entry(id)
        .and_modify(|current| {
            if modified > *current {
                *current = modified;
            }
        })
        .or_insert(modified);
}

fn modified_time(path: &Path) -> std::io::Result<DateTime<Utc>> {
    Ok(std::fs::metadata(path)?.modified()?.into())
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    let read_dir_err = |source: std::io::Error| PipelineError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut paths = std::fs::read_dir(dir)
        .map_err(read_dir_err)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(read_dir_err)?;
    paths.sort();
    Ok(paths)
}

fn is_json_file(path: &Path) -> bool {
    path.is_file() && path.extension().is_some_and(|ext| ext == "json")
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn decode_file<T: DeserializeOwned>(path: &Path) -> Result<T, PipelineError> {
    let file = File::open(path).map_err(|source| PipelineError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| PipelineError::Decode {
        path: path.to_path_buf(),
        source,
    })
}
