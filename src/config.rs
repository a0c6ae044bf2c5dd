use std::path::PathBuf;

pub const DEFAULT_CVE_PATH: &str = "cve_jsons";
pub const DEFAULT_PARTS_PATH: &str = "parts";
pub const DEFAULT_OSV_OUTPUT_PATH: &str = "osv_output";

/// Input and output locations for one combine run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombineConfig {
    /// Directory of NVD CVE API 2.0 batch files
    pub cve_path: PathBuf,

    /// Directory of per-ecosystem part subdirectories
    pub parts_path: PathBuf,

    /// Directory receiving one `<ID>.json` per combined record
    pub output_path: PathBuf,

    /// Local cvelistV5 clone; `None` disables dispute checking
    pub cve_list_path: Option<PathBuf>,
}

impl Default for CombineConfig {
    fn default() -> Self {
        Self {
            cve_path: PathBuf::from(DEFAULT_CVE_PATH),
            parts_path: PathBuf::from(DEFAULT_PARTS_PATH),
            output_path: PathBuf::from(DEFAULT_OSV_OUTPUT_PATH),
            cve_list_path: None,
        }
    }
}

impl CombineConfig {
    pub fn with_cve_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cve_path = path.into();
        self
    }

    pub fn with_parts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.parts_path = path.into();
        self
    }

    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    /// An empty path disables dispute checking.
    pub fn with_cve_list_path(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        self.cve_list_path = (!path.as_os_str().is_empty()).then_some(path);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CombineConfig::default();
        assert_eq!(config.cve_path, PathBuf::from("cve_jsons"));
        assert_eq!(config.parts_path, PathBuf::from("parts"));
        assert_eq!(config.output_path, PathBuf::from("osv_output"));
        assert!(config.cve_list_path.is_none());
    }

    #[test]
    fn test_empty_cve_list_path_disables_disputes() {
        let config = CombineConfig::default().with_cve_list_path("");
        assert!(config.cve_list_path.is_none());

        let config = CombineConfig::default().with_cve_list_path("cvelistV5");
        assert_eq!(config.cve_list_path, Some(PathBuf::from("cvelistV5")));
    }
}
