//! `xcrun` invocations with a hard timeout
//!
//! Every call spawns exactly one process. A non-zero exit is reported with
//! the tool's stderr untouched; a call that outlives the configured timeout
//! is killed and reported as [`ReaderError::ExternalToolTimeout`]. Nothing is
//! retried.

use crate::raw::{RawCoverageGraph, RawTestGraph};
use crate::{validate_bundle, ReaderConfig, ReaderError, ReaderResult};
use serde::de::DeserializeOwned;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info};

/// Handle on the `xcrun` toolchain driver
#[derive(Debug, Clone, Default)]
pub struct Xcrun {
    config: ReaderConfig,
}

impl Xcrun {
    pub fn new(config: ReaderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Export the test tree of `bundle`
    pub async fn read(&self, bundle: &Path) -> ReaderResult<RawTestGraph> {
        validate_bundle(bundle)?;

        let args = vec![
            OsString::from("xcresulttool"),
            OsString::from("get"),
            OsString::from("test-results"),
            OsString::from("tests"),
            OsString::from("--path"),
            bundle.as_os_str().to_os_string(),
        ];
        let stdout = self.run(&args).await?;
        decode(&stdout, "test results")
    }

    /// Export the line coverage report of `bundle`
    pub async fn read_coverage(&self, bundle: &Path) -> ReaderResult<RawCoverageGraph> {
        validate_bundle(bundle)?;

        let args = vec![
            OsString::from("xccov"),
            OsString::from("view"),
            OsString::from("--report"),
            OsString::from("--json"),
            bundle.as_os_str().to_os_string(),
        ];
        let stdout = self.run(&args).await?;
        decode(&stdout, "coverage report")
    }

    /// Merge several bundles into one at `output`
    ///
    /// A directory already sitting at `output` (typically the leftover of a
    /// previous run) is removed first, since `xcresulttool merge` refuses to
    /// overwrite.
    pub async fn merge(&self, bundles: &[PathBuf], output: &Path) -> ReaderResult<PathBuf> {
        for bundle in bundles {
            validate_bundle(bundle)?;
        }

        if output.is_dir() {
            debug!("Removing stale merged bundle at {}", output.display());
            std::fs::remove_dir_all(output)?;
        }

        let mut args = vec![OsString::from("xcresulttool"), OsString::from("merge")];
        args.extend(bundles.iter().map(|b| b.as_os_str().to_os_string()));
        args.push(OsString::from("--output-path"));
        args.push(output.as_os_str().to_os_string());

        self.run(&args).await?;
        info!("Merged {} bundles into {}", bundles.len(), output.display());
        Ok(output.to_path_buf())
    }

    async fn run(&self, args: &[OsString]) -> ReaderResult<Vec<u8>> {
        let command = describe(&self.config.xcrun, args);
        debug!("Running {}", command);

        let child = Command::new(&self.config.xcrun)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ReaderError::Spawn {
                command: command.clone(),
                reason: e.to_string(),
            })?;

        // Dropping the pending future drops the child, and kill_on_drop reaps it.
        match timeout(self.config.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                if !output.status.success() {
                    return Err(ReaderError::ToolFailed {
                        command,
                        status: output.status.code(),
                        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                    });
                }
                debug!("{} produced {} bytes", command, output.stdout.len());
                Ok(output.stdout)
            }
            Ok(Err(e)) => Err(ReaderError::Io(e)),
            Err(_) => Err(ReaderError::ExternalToolTimeout {
                command,
                timeout: self.config.timeout,
            }),
        }
    }
}

fn describe(program: &Path, args: &[OsString]) -> String {
    let mut parts = vec![program.display().to_string()];
    parts.extend(args.iter().map(|a| a.to_string_lossy().to_string()));
    parts.join(" ")
}

pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8], what: &str) -> ReaderResult<T> {
    serde_json::from_slice(bytes).map_err(|source| ReaderError::Decode {
        what: what.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn fake_bundle() -> tempfile::TempDir {
        let dir = tempfile::Builder::new()
            .suffix(".xcresult")
            .tempdir()
            .unwrap();
        std::fs::write(dir.path().join("Info.plist"), "<plist/>").unwrap();
        dir
    }

    #[cfg(unix)]
    fn fake_xcrun(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("xcrun");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path
    }

    #[test]
    fn test_describe_command() {
        let args = vec![OsString::from("xccov"), OsString::from("view")];
        assert_eq!(describe(Path::new("xcrun"), &args), "xcrun xccov view");
    }

    #[test]
    fn test_decode_error_names_payload() {
        let result: ReaderResult<RawTestGraph> = decode(b"not json", "test results");
        match result {
            Err(ReaderError::Decode { what, .. }) => assert_eq!(what, "test results"),
            other => panic!("expected decode error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_read_missing_bundle() {
        let xcrun = Xcrun::default();
        let result = xcrun.read(Path::new("/nonexistent/Run.xcresult")).await;
        assert!(matches!(result, Err(ReaderError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let bundle = fake_bundle();
        let xcrun = Xcrun::new(ReaderConfig::new().with_xcrun("/nonexistent/xcrun"));
        let result = xcrun.read(bundle.path()).await;
        assert!(matches!(result, Err(ReaderError::Spawn { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_read_decodes_tool_output() {
        let bundle = fake_bundle();
        let bin = tempfile::tempdir().unwrap();
        let tool = fake_xcrun(
            bin.path(),
            r#"echo '{"testNodes": [{"nodeType": "Test Plan", "name": "App"}]}'"#,
        );

        let xcrun = Xcrun::new(ReaderConfig::new().with_xcrun(tool));
        let graph = xcrun.read(bundle.path()).await.unwrap();
        assert_eq!(graph.test_nodes.len(), 1);
        assert_eq!(graph.test_nodes[0].name, "App");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_keeps_stderr() {
        let bundle = fake_bundle();
        let bin = tempfile::tempdir().unwrap();
        let tool = fake_xcrun(bin.path(), "echo 'Error: no coverage data' >&2\nexit 3");

        let xcrun = Xcrun::new(ReaderConfig::new().with_xcrun(tool));
        match xcrun.read_coverage(bundle.path()).await {
            Err(ReaderError::ToolFailed {
                command,
                status,
                stderr,
            }) => {
                assert!(command.contains("xccov view --report --json"));
                assert_eq!(status, Some(3));
                assert_eq!(stderr, "Error: no coverage data\n");
            }
            other => panic!("expected tool failure, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hung_tool_times_out() {
        let bundle = fake_bundle();
        let bin = tempfile::tempdir().unwrap();
        let tool = fake_xcrun(bin.path(), "sleep 30");

        let xcrun = Xcrun::new(
            ReaderConfig::new()
                .with_xcrun(tool)
                .with_timeout(Duration::from_millis(200)),
        );
        let result = xcrun.read(bundle.path()).await;
        assert!(matches!(
            result,
            Err(ReaderError::ExternalToolTimeout { .. })
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_merge_passes_output_path() {
        let first = fake_bundle();
        let second = fake_bundle();
        let bin = tempfile::tempdir().unwrap();
        let log = bin.path().join("args.txt");
        let tool = fake_xcrun(bin.path(), &format!("echo \"$@\" > {}", log.display()));
        let output = bin.path().join("Merged.xcresult");
        std::fs::create_dir(&output).unwrap();

        let xcrun = Xcrun::new(ReaderConfig::new().with_xcrun(tool));
        let merged = xcrun
            .merge(
                &[first.path().to_path_buf(), second.path().to_path_buf()],
                &output,
            )
            .await
            .unwrap();

        assert_eq!(merged, output);
        assert!(!output.exists());
        let args = std::fs::read_to_string(&log).unwrap();
        assert!(args.starts_with("xcresulttool merge"));
        assert!(args.contains(&format!("--output-path {}", output.display())));
    }
}
