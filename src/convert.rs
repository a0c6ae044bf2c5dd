//! Translation of NVD records and advisory parts into OSV structures.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

use crate::model::{
    Affected, AffectedPackage, AffectedRange, Event, NvdCve, NvdReference, PackageInfo,
    RangeKind, Reference, ReferenceKind, Severity, SeverityKind, VulnId, Vulnerability,
};

/// Parses an RFC3339 timestamp, falling back to the zone-less form NVD and
/// the CVE list emit (`2024-01-01T00:00:00.000`), read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Formats a timestamp the way OSV records carry it: seconds precision, `Z`.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn normalize_timestamp(raw: &str) -> String {
    parse_timestamp(raw)
        .map(format_timestamp)
        .unwrap_or_else(|| raw.to_string())
}

impl Vulnerability {
    /// Builds the OSV skeleton for an NVD record: no affected packages and
    /// no tracker references yet.
    pub fn from_cve(id: &VulnId, cve: &NvdCve) -> Self {
        let details = cve
            .descriptions
            .iter()
            .find(|d| d.lang == "en")
            .map(|d| d.value.clone())
            .unwrap_or_default();

        Self {
            id: id.clone(),
            modified: normalize_timestamp(&cve.last_modified),
            published: normalize_timestamp(&cve.published),
            aliases: ghsa_aliases(&cve.references),
            details,
            severity: cvss_v3_severity(cve.metrics.as_ref()),
            references: classify_references(&cve.references),
            ..Default::default()
        }
    }

    /// Appends one `affected` entry built from an advisory part.
    pub fn add_package_info(&mut self, info: &PackageInfo) {
        let mut ranges = git_ranges(info);
        if let Some(range) = ecosystem_range(info) {
            ranges.push(range);
        }

        self.affected.push(Affected {
            package: AffectedPackage {
                ecosystem: info.ecosystem.clone(),
                name: info.pkg_name.clone(),
                purl: info.purl.clone(),
            },
            ranges,
            ecosystem_specific: info
                .ecosystem_specific
                .clone()
                .filter(|specific| !specific.is_empty()),
        });
    }
}

/// One GIT range per repository, in the order repositories first appear.
fn git_ranges(info: &PackageInfo) -> Vec<AffectedRange> {
    let mut ranges: Vec<AffectedRange> = Vec::new();

    for commit in &info.version_info.affected_commits {
        let index = match ranges.iter().position(|r| r.repo == commit.repo) {
            Some(index) => index,
            None => {
                let mut events = Vec::new();
                if commit.introduced.is_empty() {
                    events.push(Event::Introduced("0".to_string()));
                }
                ranges.push(AffectedRange {
                    kind: RangeKind::Git,
                    repo: commit.repo.clone(),
                    events,
                });
                ranges.len() - 1
            }
        };

        let events = &mut ranges[index].events;
        if !commit.introduced.is_empty() {
            events.push(Event::Introduced(commit.introduced.clone()));
        }
        if !commit.fixed.is_empty() {
            events.push(Event::Fixed(commit.fixed.clone()));
        }
        if !commit.last_affected.is_empty() {
            events.push(Event::LastAffected(commit.last_affected.clone()));
        }
        if !commit.limit.is_empty() {
            events.push(Event::Limit(commit.limit.clone()));
        }
    }

    ranges
}

fn ecosystem_range(info: &PackageInfo) -> Option<AffectedRange> {
    let versions = &info.version_info.affected_versions;
    if versions.is_empty() {
        return None;
    }

    let mut events = Vec::new();
    if versions.iter().all(|v| v.introduced.is_empty()) {
        events.push(Event::Introduced("0".to_string()));
    }
    for version in versions {
        if !version.introduced.is_empty() {
            events.push(Event::Introduced(version.introduced.clone()));
        }
        if !version.fixed.is_empty() {
            events.push(Event::Fixed(version.fixed.clone()));
        } else if !version.last_affected.is_empty() {
            events.push(Event::LastAffected(version.last_affected.clone()));
        }
    }

    Some(AffectedRange {
        kind: RangeKind::Ecosystem,
        repo: String::new(),
        events,
    })
}

fn reference_kind(tags: &[String]) -> ReferenceKind {
    for tag in tags {
        let kind = match tag.as_str() {
            "Patch" => ReferenceKind::Fix,
            "Exploit" => ReferenceKind::Evidence,
            "Mailing List" => ReferenceKind::Article,
            "Issue Tracking" => ReferenceKind::Report,
            "Vendor Advisory" | "Third Party Advisory" | "VDB Entry" => ReferenceKind::Advisory,
            _ => continue,
        };
        return kind;
    }
    ReferenceKind::Web
}

fn classify_references(references: &[NvdReference]) -> Vec<Reference> {
    let mut out: Vec<Reference> = Vec::with_capacity(references.len());
    for reference in references {
        if out.iter().any(|r| r.url == reference.url) {
            continue;
        }
        out.push(Reference {
            kind: reference_kind(&reference.tags),
            url: reference.url.clone(),
        });
    }
    out
}

/// GHSA identifiers mentioned in reference URLs (e.g. GitHub advisory pages).
fn ghsa_aliases(references: &[NvdReference]) -> Vec<String> {
    let mut aliases: Vec<String> = Vec::new();
    for reference in references {
        let Some(segment) = reference
            .url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
        else {
            continue;
        };
        if is_ghsa_id(segment) && !aliases.iter().any(|a| a == segment) {
            aliases.push(segment.to_string());
        }
    }
    aliases
}

// GHSA-xxxx-xxxx-xxxx
fn is_ghsa_id(candidate: &str) -> bool {
    let Some(rest) = candidate.strip_prefix("GHSA-") else {
        return false;
    };
    let groups: Vec<&str> = rest.split('-').collect();
    groups.len() == 3
        && groups
            .iter()
            .all(|g| g.len() == 4 && g.chars().all(|c| c.is_ascii_alphanumeric()))
}

fn cvss_v3_severity(metrics: Option<&serde_json::Value>) -> Vec<Severity> {
    let Some(metrics) = metrics else {
        return Vec::new();
    };

    ["cvssMetricV31", "cvssMetricV30"]
        .iter()
        .find_map(|key| {
            metrics
                .get(key)?
                .as_array()?
                .iter()
                .find_map(|m| m.pointer("/cvssData/vectorString")?.as_str())
        })
        .map(|vector| {
            vec![Severity {
                kind: SeverityKind::CvssV3,
                score: vector.to_string(),
            }]
        })
        .unwrap_or_default()
}
