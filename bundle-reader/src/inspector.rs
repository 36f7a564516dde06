use crate::raw::{RawCoverageGraph, RawTestGraph};
use crate::xcrun::{decode, Xcrun};
use crate::{ReaderError, ReaderResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Source of raw records for a bundle
#[async_trait]
pub trait BundleInspector: Send + Sync {
    /// Test tree of the bundle at `bundle`
    async fn test_results(&self, bundle: &Path) -> ReaderResult<RawTestGraph>;

    /// Coverage report of the bundle at `bundle`
    async fn coverage(&self, bundle: &Path) -> ReaderResult<RawCoverageGraph>;
}

#[async_trait]
impl BundleInspector for Xcrun {
    async fn test_results(&self, bundle: &Path) -> ReaderResult<RawTestGraph> {
        self.read(bundle).await
    }

    async fn coverage(&self, bundle: &Path) -> ReaderResult<RawCoverageGraph> {
        self.read_coverage(bundle).await
    }
}

/// JSON previously exported with `xcresulttool` / `xccov`
///
/// Lets the report be produced on machines without Xcode. The bundle path
/// handed to the trait methods is ignored.
#[derive(Debug, Clone)]
pub struct JsonDump {
    pub tests: PathBuf,
    pub coverage: Option<PathBuf>,
}

impl JsonDump {
    pub fn new(tests: impl Into<PathBuf>) -> Self {
        Self {
            tests: tests.into(),
            coverage: None,
        }
    }

    pub fn with_coverage(mut self, coverage: impl Into<PathBuf>) -> Self {
        self.coverage = Some(coverage.into());
        self
    }
}

fn read_dump(path: &Path) -> ReaderResult<Vec<u8>> {
    if !path.exists() {
        return Err(ReaderError::NotFound {
            path: path.to_path_buf(),
        });
    }
    Ok(std::fs::read(path)?)
}

#[async_trait]
impl BundleInspector for JsonDump {
    async fn test_results(&self, _bundle: &Path) -> ReaderResult<RawTestGraph> {
        let bytes = read_dump(&self.tests)?;
        decode(&bytes, "test results")
    }

    async fn coverage(&self, _bundle: &Path) -> ReaderResult<RawCoverageGraph> {
        match &self.coverage {
            Some(path) => {
                let bytes = read_dump(path)?;
                decode(&bytes, "coverage report")
            }
            None => {
                debug!("No coverage dump configured");
                Ok(RawCoverageGraph::default())
            }
        }
    }
}
