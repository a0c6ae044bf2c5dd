//! Distributions with a public per-identifier security tracker page.

use url::Url;

/// Tracked ecosystems. Adding one means adding a variant and a row to
/// [`TrackedEcosystem::ALL`] / [`TrackedEcosystem::tracker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackedEcosystem {
    Debian,
    Alpine,
}

impl TrackedEcosystem {
    pub const ALL: [TrackedEcosystem; 2] = [TrackedEcosystem::Debian, TrackedEcosystem::Alpine];

    /// `(ecosystem name prefix, security tracker base URL)`
    const fn tracker(self) -> (&'static str, &'static str) {
        match self {
            TrackedEcosystem::Debian => ("Debian", "https://security-tracker.debian.org/tracker"),
            TrackedEcosystem::Alpine => ("Alpine", "https://security.alpinelinux.org/vuln"),
        }
    }

    pub fn prefix(self) -> &'static str {
        self.tracker().0
    }

    pub fn tracker_base(self) -> &'static str {
        self.tracker().1
    }

    /// Matches an OSV ecosystem string (`"Debian:12"`, `"alpine:v3.19"`)
    /// by case-insensitive prefix.
    pub fn classify(ecosystem: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tracked| {
            let prefix = tracked.prefix();
            ecosystem
                .get(..prefix.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
        })
    }

    /// Tracker page for `id`, with `id` appended as one path segment.
    pub fn advisory_url(self, id: &str) -> Result<String, url::ParseError> {
        let mut url = Url::parse(self.tracker_base())?;
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .push(id);
        Ok(url.into())
    }
}
