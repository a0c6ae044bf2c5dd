//! Dispute lookups against a local clone of the CVE list (cvelistV5).

use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use crate::convert::{format_timestamp, parse_timestamp};
use crate::model::Vulnerability;
use crate::traits::{DisputeError, DisputeLookup};

const DISPUTED_TAG: &str = "disputed";

/// A checkout of `https://github.com/CVEProject/cvelistV5`.
#[derive(Debug, Clone)]
pub struct CveList {
    root: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Cve5Record {
    cve_metadata: Cve5Metadata,
    #[serde(default)]
    containers: Cve5Containers,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Cve5Metadata {
    #[serde(default)]
    date_updated: String,
}

#[derive(Debug, Default, Deserialize)]
struct Cve5Containers {
    #[serde(default)]
    cna: Cve5Cna,
}

#[derive(Debug, Default, Deserialize)]
struct Cve5Cna {
    #[serde(default)]
    tags: Vec<String>,
}

impl CveList {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `CVE-2023-12345` lives at `cves/2023/12xxx/CVE-2023-12345.json`.
    pub fn record_path(&self, id: &str) -> Result<PathBuf, DisputeError> {
        let malformed = || DisputeError::MalformedId(id.to_string());

        let mut parts = id.split('-');
        let (Some("CVE"), Some(year), Some(number), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(malformed());
        };
        let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
        if year.len() != 4 || !all_digits(year) || number.len() < 4 || !all_digits(number) {
            return Err(malformed());
        }

        let bucket = format!("{}xxx", &number[..number.len() - 3]);
        Ok(self
            .root
            .join("cves")
            .join(year)
            .join(bucket)
            .join(format!("{id}.json")))
    }
}

impl DisputeLookup for CveList {
    fn withdrawn_at(&self, record: &Vulnerability) -> Result<Option<String>, DisputeError> {
        if !record.id.starts_with("CVE-") {
            return Ok(None);
        }

        let path = self.record_path(&record.id)?;
        let file = File::open(&path).map_err(|source| DisputeError::Io {
            path: path.clone(),
            source,
        })?;
        let cve: Cve5Record = serde_json::from_reader(BufReader::new(file))
            .map_err(|source| DisputeError::Decode { path, source })?;

        if !cve.containers.cna.tags.iter().any(|t| t == DISPUTED_TAG) {
            return Ok(None);
        }

        let updated = &cve.cve_metadata.date_updated;
        parse_timestamp(updated)
            .map(|ts| Some(format_timestamp(ts)))
            .ok_or_else(|| DisputeError::Timestamp(updated.clone()))
    }
}
