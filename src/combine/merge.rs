//! Merging NVD records with advisory parts into OSV records.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::combine::ecosystem::TrackedEcosystem;
use crate::combine::ingest::FragmentIndex;
use crate::convert::format_timestamp;
use crate::model::{
    PackageInfo, Reference, ReferenceKind, SourceVulnerability, VulnId, Vulnerability,
};
use crate::report::Reporter;
use crate::traits::DisputeLookup;

/// Builds one OSV record for every identifier that has both an NVD record
/// and at least one advisory part.
///
/// Nothing here aborts the run: a failed dispute lookup or an unparseable
/// `modified` field only leaves that record un-enriched.
pub fn combine(
    sources: &HashMap<VulnId, SourceVulnerability>,
    fragments: &FragmentIndex,
    disputes: Option<&dyn DisputeLookup>,
    reporter: &Reporter,
) -> BTreeMap<VulnId, Vulnerability> {
    reporter.info(format_args!(
        "Begin writing OSV files from {} parts",
        fragments.parts.len()
    ));

    let mut combined = BTreeMap::new();
    for (id, source) in sources {
        let parts = match fragments.parts.get(id) {
            Some(parts) if !parts.is_empty() => parts,
            _ => continue,
        };

        let mut record = Vulnerability::from_cve(id, &source.cve);
        if let Some(disputes) = disputes {
            mark_withdrawn(&mut record, disputes, reporter);
        }
        fold_parts(&mut record, parts, reporter);
        if let Some(latest) = fragments.modified.get(id) {
            bump_modified(&mut record, *latest);
        }

        combined.insert(id.clone(), record);
    }

    reporter.info(format_args!("Ended writing {} OSV files", combined.len()));
    combined
}

/// Best-effort: only an authoritative "disputed" answer sets `withdrawn`.
fn mark_withdrawn(record: &mut Vulnerability, disputes: &dyn DisputeLookup, reporter: &Reporter) {
    match disputes.withdrawn_at(record) {
        Ok(Some(withdrawn)) => record.withdrawn = withdrawn,
        Ok(None) => {}
        Err(e) => reporter.warn(format_args!(
            "Unable to determine CVE dispute status of {}: {}",
            record.id, e
        )),
    }
}

/// Appends each part, plus one tracker reference per tracked ecosystem
/// (first part of that ecosystem wins).
fn fold_parts(record: &mut Vulnerability, parts: &[PackageInfo], reporter: &Reporter) {
    let mut referenced: HashSet<TrackedEcosystem> = HashSet::new();

    for part in parts {
        record.add_package_info(part);

        let Some(tracked) = TrackedEcosystem::classify(&part.ecosystem) else {
            continue;
        };
        if !referenced.insert(tracked) {
            continue;
        }
        match tracked.advisory_url(&record.id) {
            Ok(url) => record.references.push(Reference {
                kind: ReferenceKind::Advisory,
                url,
            }),
            Err(e) => reporter.warn(format_args!(
                "Unable to build {} tracker URL for {}: {}",
                tracked.prefix(),
                record.id,
                e
            )),
        }
    }
}

/// Moves `modified` forward to `latest` when it is strictly later. A
/// `modified` that is not RFC3339 is left as is.
fn bump_modified(record: &mut Vulnerability, latest: DateTime<Utc>) {
    let Ok(current) = DateTime::parse_from_rfc3339(&record.modified) else {
        return;
    };
    let current = current.with_timezone(&Utc);
    if latest > current {
        record.modified = format_timestamp(latest);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NvdCve;
    use crate::traits::DisputeError;
    use chrono::TimeZone;

    fn source(id: &str, modified: &str) -> SourceVulnerability {
        SourceVulnerability {
            cve: NvdCve {
                id: id.into(),
                published: "2023-12-01T00:00:00Z".into(),
                last_modified: modified.into(),
                vuln_status: None,
                descriptions: vec![],
                references: vec![],
                metrics: None,
            },
        }
    }

    fn part(ecosystem: &str, name: &str) -> PackageInfo {
        PackageInfo {
            pkg_name: name.into(),
            ecosystem: ecosystem.into(),
            ..Default::default()
        }
    }

    fn ts(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn sources(entries: &[(&str, &str)]) -> HashMap<VulnId, SourceVulnerability> {
        entries
            .iter()
            .map(|(id, modified)| (id.to_string(), source(id, modified)))
            .collect()
    }

    struct Fixed(Result<Option<String>, ()>);

    impl DisputeLookup for Fixed {
        fn withdrawn_at(&self, record: &Vulnerability) -> Result<Option<String>, DisputeError> {
            self.0
                .clone()
                .map_err(|_| DisputeError::MalformedId(record.id.clone()))
        }
    }

    #[test]
    fn test_only_joined_ids_are_combined() {
        let sources = sources(&[
            ("CVE-X", "2024-01-01T00:00:00Z"),
            ("CVE-Y", "2024-01-01T00:00:00Z"),
        ]);
        let mut index = FragmentIndex::default();
        index.parts.insert("CVE-X".into(), vec![part("Debian", "a")]);
        index.parts.insert("CVE-W".into(), vec![part("Debian", "b")]);
        index.parts.insert("CVE-Y".into(), vec![]);

        let reporter = Reporter::new("test");
        let combined = combine(&sources, &index, None, &reporter);

        assert_eq!(combined.keys().collect::<Vec<_>>(), vec!["CVE-X"]);
    }

    #[test]
    fn test_scenario_two_ecosystems() {
        let sources = sources(&[("CVE-X", "2024-01-01T00:00:00Z")]);
        let mut index = FragmentIndex::default();
        index
            .parts
            .insert("CVE-X".into(), vec![part("Debian", "pkg"), part("Alpine", "pkg")]);
        index.modified.insert("CVE-X".into(), ts(2024, 2, 1));

        let reporter = Reporter::new("test");
        let combined = combine(&sources, &index, None, &reporter);
        let record = &combined["CVE-X"];

        assert_eq!(record.affected.len(), 2);
        let urls: Vec<_> = record.references.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://security-tracker.debian.org/tracker/CVE-X",
                "https://security.alpinelinux.org/vuln/CVE-X",
            ]
        );
        assert!(record.references.iter().all(|r| r.kind == ReferenceKind::Advisory));
        assert_eq!(record.modified, "2024-02-01T00:00:00Z");
    }

    #[test]
    fn test_tracker_reference_deduplicated() {
        let sources = sources(&[("CVE-Z", "2024-01-01T00:00:00Z")]);
        let mut index = FragmentIndex::default();
        index.parts.insert(
            "CVE-Z".into(),
            vec![
                part("Debian:11", "pkg"),
                part("debian:12", "pkg"),
                part("Ubuntu:22.04", "pkg"),
                part("Debian:13", "pkg"),
            ],
        );

        let reporter = Reporter::new("test");
        let combined = combine(&sources, &index, None, &reporter);
        let record = &combined["CVE-Z"];

        assert_eq!(record.affected.len(), 4);
        assert_eq!(record.references.len(), 1);
        assert_eq!(
            record.references[0].url,
            "https://security-tracker.debian.org/tracker/CVE-Z"
        );
    }

    #[test]
    fn test_modified_never_moves_backwards() {
        let sources = sources(&[("CVE-X", "2024-03-01T00:00:00Z")]);
        let mut index = FragmentIndex::default();
        index.parts.insert("CVE-X".into(), vec![part("Alpine", "pkg")]);
        index.modified.insert("CVE-X".into(), ts(2024, 2, 1));

        let reporter = Reporter::new("test");
        let combined = combine(&sources, &index, None, &reporter);
        assert_eq!(combined["CVE-X"].modified, "2024-03-01T00:00:00Z");
    }

    #[test]
    fn test_unparseable_modified_is_left_untouched() {
        let sources = sources(&[("CVE-X", "sometime in March")]);
        let mut index = FragmentIndex::default();
        index.parts.insert("CVE-X".into(), vec![part("Alpine", "pkg")]);
        index.modified.insert("CVE-X".into(), ts(2024, 2, 1));

        let reporter = Reporter::new("test");
        let combined = combine(&sources, &index, None, &reporter);
        assert_eq!(combined["CVE-X"].modified, "sometime in March");
        assert_eq!(reporter.warnings(), 0);
    }

    #[test]
    fn test_disputed_record_is_withdrawn() {
        let sources = sources(&[("CVE-X", "2024-01-01T00:00:00Z")]);
        let mut index = FragmentIndex::default();
        index.parts.insert("CVE-X".into(), vec![part("Debian", "pkg")]);

        let lookup = Fixed(Ok(Some("2024-01-15T00:00:00Z".into())));
        let reporter = Reporter::new("test");
        let combined = combine(&sources, &index, Some(&lookup as &dyn DisputeLookup), &reporter);
        assert_eq!(combined["CVE-X"].withdrawn, "2024-01-15T00:00:00Z");
    }

    #[test]
    fn test_dispute_lookup_failure_is_a_warning() {
        let sources = sources(&[("CVE-X", "2024-01-01T00:00:00Z")]);
        let mut index = FragmentIndex::default();
        index.parts.insert("CVE-X".into(), vec![part("Debian", "pkg")]);

        let lookup = Fixed(Err(()));
        let reporter = Reporter::new("test");
        let combined = combine(&sources, &index, Some(&lookup as &dyn DisputeLookup), &reporter);

        assert!(combined["CVE-X"].withdrawn.is_empty());
        assert_eq!(combined["CVE-X"].affected.len(), 1);
        assert_eq!(reporter.warnings(), 1);
    }
}
