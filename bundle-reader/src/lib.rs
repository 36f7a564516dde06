//! Bundle reader for xcresult test-result bundles
//!
//! This crate is the only place that touches the bundle on disk. It shells
//! out to `xcrun` (`xcresulttool` and `xccov`) to export the bundle's test
//! tree and coverage report as JSON and decodes them into the raw graph types
//! in [`raw`]. Nothing here interprets the records; that is the job of the
//! model crate.

pub mod inspector;
pub mod raw;
pub mod xcrun;

use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub use inspector::{BundleInspector, JsonDump};
pub use raw::{
    RawConfiguration, RawCoverageFile, RawCoverageGraph, RawCoverageTarget, RawDevice,
    RawNodeType, RawTestGraph, RawTestNode,
};
pub use xcrun::Xcrun;

/// Errors raised while reading a bundle
#[derive(Error, Debug)]
pub enum ReaderError {
    /// The bundle path does not exist
    #[error("Result bundle not found: {}", .path.display())]
    NotFound { path: PathBuf },

    /// The path exists but is not an xcresult bundle
    #[error("Not a valid result bundle '{}': {reason}", .path.display())]
    InvalidBundle { path: PathBuf, reason: String },

    /// The inspection tool could not be started
    #[error("Failed to run `{command}`: {reason}")]
    Spawn { command: String, reason: String },

    /// The inspection tool exited unsuccessfully
    #[error("`{command}` exited with {}: {stderr}", describe_status(.status))]
    ToolFailed {
        command: String,
        status: Option<i32>,
        stderr: String,
    },

    /// The inspection tool did not finish in time
    #[error("`{command}` timed out after {timeout:?}")]
    ExternalToolTimeout { command: String, timeout: Duration },

    /// The tool output was not the JSON we expected
    #[error("Failed to decode {what}: {source}")]
    Decode {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReaderError {
    /// Whether the failure came from the inspection tool hanging
    pub fn is_timeout(&self) -> bool {
        matches!(self, ReaderError::ExternalToolTimeout { .. })
    }
}

pub type ReaderResult<T> = Result<T, ReaderError>;

fn describe_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("status {}", code),
        None => "a signal".to_string(),
    }
}

/// Configuration for the external inspection tool
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Path or name of the `xcrun` driver
    pub xcrun: PathBuf,
    /// Upper bound for a single tool invocation
    pub timeout: Duration,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            xcrun: PathBuf::from("xcrun"),
            timeout: Duration::from_secs(120),
        }
    }
}

impl ReaderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_xcrun(mut self, xcrun: impl Into<PathBuf>) -> Self {
        self.xcrun = xcrun.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.xcrun.as_os_str().is_empty() {
            return Err("xcrun path cannot be empty".to_string());
        }

        if self.timeout.is_zero() {
            return Err("Timeout must be greater than 0".to_string());
        }

        Ok(())
    }
}

/// Check that `path` looks like an xcresult bundle before spawning any tool
pub fn validate_bundle(path: &Path) -> ReaderResult<()> {
    if !path.exists() {
        return Err(ReaderError::NotFound {
            path: path.to_path_buf(),
        });
    }

    if !path.is_dir() {
        return Err(ReaderError::InvalidBundle {
            path: path.to_path_buf(),
            reason: "Path is not a directory".to_string(),
        });
    }

    if !path.join("Info.plist").is_file() {
        return Err(ReaderError::InvalidBundle {
            path: path.to_path_buf(),
            reason: "Missing Info.plist".to_string(),
        });
    }

    Ok(())
}
