//! Bundle resolution and the read → build → render pipeline

use crate::render::{render, RenderOptions, RenderedReport};
use crate::{ReportError, ReportResult};
use bundle_reader::{BundleInspector, ReaderError, Xcrun};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use xcresult_model::{build_coverage, build_test_run, CoverageReport};

/// Reduce the input bundles to the single bundle the report is built from
///
/// Inputs that do not exist are logged and skipped. Several remaining
/// inputs are merged into `merged_path`.
pub async fn resolve_bundle(
    xcrun: &Xcrun,
    inputs: &[PathBuf],
    merged_path: &Path,
) -> ReportResult<PathBuf> {
    if inputs.is_empty() {
        return Err(ReportError::NoInputs);
    }

    let existing: Vec<PathBuf> = inputs
        .iter()
        .filter(|path| {
            let found = path.exists();
            if !found {
                error!("Result bundle not found: {}", path.display());
            }
            found
        })
        .cloned()
        .collect();

    match existing.len() {
        0 if inputs.len() == 1 => Err(ReaderError::NotFound {
            path: inputs[0].clone(),
        }
        .into()),
        0 => Err(ReportError::NoInputs),
        1 => Ok(existing[0].clone()),
        _ => {
            info!("Merging {} result bundles", existing.len());
            Ok(xcrun.merge(&existing, merged_path).await?)
        }
    }
}

/// Read one bundle and render its report
///
/// Coverage is only read when the options ask for it. A bundle recorded
/// without coverage, or one `xccov` refuses to report on, still yields a
/// report, just without the coverage section. A coverage call that times
/// out fails the run.
pub async fn generate<I>(
    inspector: &I,
    bundle: &Path,
    options: &RenderOptions,
) -> ReportResult<RenderedReport>
where
    I: BundleInspector + ?Sized,
{
    info!("Reading test results from {}", bundle.display());
    let raw = inspector.test_results(bundle).await?;
    let run = build_test_run(&raw)?;

    let counts = run.counts();
    info!(
        "Collected {} tests ({} passed, {} failed, {} skipped, {} expected failures)",
        counts.total(),
        counts.passed,
        counts.failed,
        counts.skipped,
        counts.expected_failures
    );

    let coverage = if options.show_code_coverage {
        read_coverage(inspector, bundle).await?
    } else {
        None
    };

    Ok(render(&run, coverage.as_ref(), options))
}

async fn read_coverage<I>(inspector: &I, bundle: &Path) -> ReportResult<Option<CoverageReport>>
where
    I: BundleInspector + ?Sized,
{
    let raw = match inspector.coverage(bundle).await {
        Ok(raw) => raw,
        // xccov exits non-zero for bundles recorded without coverage.
        Err(e @ ReaderError::ToolFailed { .. }) => {
            warn!("{}; the coverage section is omitted", e);
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    match build_coverage(&raw) {
        Ok(coverage) => Ok(Some(coverage)),
        Err(e) if e.is_recoverable() => {
            warn!("{}; the coverage section is omitted", e);
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}
