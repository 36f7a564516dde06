use crate::publish::UploadPolicy;
use crate::render::RenderOptions;
use crate::{ReportError, ReportResult};
use bundle_reader::ReaderConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings for one report run, loadable from a TOML file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Name of the check run
    pub title: String,
    pub show_passed_tests: bool,
    pub show_code_coverage: bool,
    pub annotate_non_failures: bool,
    pub upload_bundles: UploadPolicy,
    pub xcrun: PathBuf,
    /// Timeout for each `xcrun` invocation
    pub timeout_secs: u64,
    pub workspace_root: Option<PathBuf>,
    /// Where several input bundles are merged to
    pub merged_bundle_path: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: "Xcode test results".to_string(),
            show_passed_tests: true,
            show_code_coverage: true,
            annotate_non_failures: false,
            upload_bundles: UploadPolicy::Never,
            xcrun: PathBuf::from("xcrun"),
            timeout_secs: 120,
            workspace_root: None,
            merged_bundle_path: std::env::temp_dir().join("Merged.xcresult"),
        }
    }
}

impl ReportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml_str(text: &str) -> ReportResult<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> ReportResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_upload_bundles(mut self, policy: UploadPolicy) -> Self {
        self.upload_bundles = policy;
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("Title cannot be empty".to_string());
        }

        if self.timeout_secs == 0 {
            return Err("Timeout must be greater than 0".to_string());
        }

        self.reader_config().validate()?;

        if self.merged_bundle_path.as_os_str().is_empty() {
            return Err("Merged bundle path cannot be empty".to_string());
        }

        Ok(())
    }

    /// Like [`validate`](Self::validate), as a report error
    pub fn check(&self) -> ReportResult<()> {
        self.validate()
            .map_err(|message| ReportError::InvalidConfig { message })
    }

    pub fn reader_config(&self) -> ReaderConfig {
        ReaderConfig::new()
            .with_xcrun(self.xcrun.clone())
            .with_timeout(Duration::from_secs(self.timeout_secs))
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            show_passed_tests: self.show_passed_tests,
            show_code_coverage: self.show_code_coverage,
            annotate_non_failures: self.annotate_non_failures,
            workspace_root: self.workspace_root.clone(),
        }
    }
}
