use crate::model::Vulnerability;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DisputeError {
    #[error("Malformed CVE identifier: {0}")]
    MalformedId(String),
    #[error("Failed to read CVE list record {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to decode CVE list record {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Unparseable dateUpdated {0:?}")]
    Timestamp(String),
}

/// Source of authoritative dispute information for a combined record.
pub trait DisputeLookup {
    /// Returns the withdrawal timestamp (RFC3339) when the record is
    /// disputed, `None` when it is not.
    fn withdrawn_at(&self, record: &Vulnerability) -> Result<Option<String>, DisputeError>;
}
