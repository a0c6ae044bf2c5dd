//! Writing combined records, one `<ID>.json` per record.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::combine::pipeline::PipelineError;
use crate::model::{VulnId, Vulnerability};
use crate::report::Reporter;

/// Writes every record to `<dir>/<id>.json` as two-space indented JSON
/// followed by a newline. Existing files are truncated.
///
/// Returns the number of files written.
pub fn write_records(
    records: &BTreeMap<VulnId, Vulnerability>,
    dir: &Path,
    reporter: &Reporter,
) -> Result<usize, PipelineError> {
    for (id, record) in records {
        write_record(record, &dir.join(format!("{id}.json")))?;
    }

    reporter.info(format_args!("Successfully written {} OSV files", records.len()));
    Ok(records.len())
}

fn write_record(record: &Vulnerability, path: &Path) -> Result<(), PipelineError> {
    let write_err = |source: std::io::Error| PipelineError::Write {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(write_err)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, record).map_err(|source| PipelineError::Encode {
        path: path.to_path_buf(),
        source,
    })?;
    writer.write_all(b"\n").map_err(write_err)?;
    writer.flush().map_err(write_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Reference, ReferenceKind};

    fn record(id: &str) -> Vulnerability {
        Vulnerability {
            id: id.into(),
            modified: "2024-02-01T00:00:00Z".into(),
            references: vec![Reference {
                kind: ReferenceKind::Advisory,
                url: format!("https://security-tracker.debian.org/tracker/{id}"),
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_write_records_pretty_prints() {
        let dir = tempfile::tempdir().unwrap();
        let mut records = BTreeMap::new();
        records.insert("CVE-X".to_string(), record("CVE-X"));

        let reporter = Reporter::new("test");
        let written = write_records(&records, dir.path(), &reporter).unwrap();
        assert_eq!(written, 1);

        let content = std::fs::read_to_string(dir.path().join("CVE-X.json")).unwrap();
        let expected = r#"{
  "id": "CVE-X",
  "modified": "2024-02-01T00:00:00Z",
  "references": [
    {
      "type": "ADVISORY",
      "url": "https://security-tracker.debian.org/tracker/CVE-X"
    }
  ]
}
"#;
        assert_eq!(content, expected);
    }

    #[test]
    fn test_existing_file_is_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("CVE-X.json");
        std::fs::write(&path, "x".repeat(4096)).unwrap();

        let mut records = BTreeMap::new();
        records.insert("CVE-X".to_string(), record("CVE-X"));
        let reporter = Reporter::new("test");
        write_records(&records, dir.path(), &reporter).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: Vulnerability = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed, record("CVE-X"));
    }

    #[test]
    fn test_unwritable_output_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut records = BTreeMap::new();
        records.insert("CVE-X".to_string(), record("CVE-X"));

        let reporter = Reporter::new("test");
        let result = write_records(&records, &dir.path().join("missing"), &reporter);
        assert!(matches!(result, Err(PipelineError::Write { .. })));
    }
}
