//! Report rendering
//!
//! [`render`] is a pure function of the test run, the optional coverage
//! report and the options: the same inputs always produce byte-identical
//! text and the same annotation list. Ordering follows the input tree, never
//! a map's iteration order, so a caller that truncates the annotation list
//! always drops the same entries.

mod annotations;
mod detail;
mod summary;

pub use annotations::collect_annotations;
pub use detail::render_detail;
pub use summary::render_summary;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use xcresult_model::{CoverageReport, TestRun, TestStatus, Verdict};

/// Knobs for the renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderOptions {
    /// List passed cases in the detail (they are always counted)
    pub show_passed_tests: bool,
    /// Include coverage in the summary and detail when it is available
    pub show_code_coverage: bool,
    /// Emit warning annotations for skipped and expected-failure cases
    pub annotate_non_failures: bool,
    /// Absolute paths below this root are reported relative to it
    pub workspace_root: Option<PathBuf>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            show_passed_tests: true,
            show_code_coverage: true,
            annotate_non_failures: false,
            workspace_root: None,
        }
    }
}

impl RenderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_show_passed_tests(mut self, show: bool) -> Self {
        self.show_passed_tests = show;
        self
    }

    pub fn with_show_code_coverage(mut self, show: bool) -> Self {
        self.show_code_coverage = show;
        self
    }

    pub fn with_annotate_non_failures(mut self, annotate: bool) -> Self {
        self.annotate_non_failures = annotate;
        self
    }

    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = Some(root.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationLevel {
    Warning,
    Failure,
}

/// Inline remark attached to a source line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub path: String,
    pub line: u32,
    pub level: AnnotationLevel,
    pub title: String,
    pub message: String,
}

/// Everything the caller needs to publish a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedReport {
    pub report_summary: String,
    pub report_detail: String,
    pub annotations: Vec<Annotation>,
    pub test_status: Verdict,
}

/// Render a test run, and its coverage when enabled
pub fn render(
    run: &TestRun,
    coverage: Option<&CoverageReport>,
    options: &RenderOptions,
) -> RenderedReport {
    let coverage = coverage.filter(|_| options.show_code_coverage);

    RenderedReport {
        report_summary: render_summary(run, coverage),
        report_detail: render_detail(run, coverage, options),
        annotations: collect_annotations(run, options),
        test_status: test_status(run),
    }
}

fn test_status(run: &TestRun) -> Verdict {
    let status = if run.counts().failed > 0 {
        Verdict::Failure
    } else {
        Verdict::Success
    };
    debug_assert_eq!(status, run.verdict());
    status
}

pub(crate) fn status_glyph(status: TestStatus) -> &'static str {
    match status {
        TestStatus::Passed => "✅",
        TestStatus::Failed => "❌",
        TestStatus::Skipped => "⊘",
        TestStatus::ExpectedFailure => "⚠️",
    }
}

pub(crate) fn format_duration(duration: Duration) -> String {
    let seconds = duration.as_secs_f64();
    if seconds < 60.0 {
        return format!("{:.2}s", seconds);
    }
    let minutes = (seconds / 60.0).floor();
    format!("{}m {:.2}s", minutes as u64, seconds - minutes * 60.0)
}

pub(crate) fn format_percent(ratio: f64) -> String {
    format!("{:.2}%", ratio * 100.0)
}

pub(crate) fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Escape text for a Markdown table cell
pub(crate) fn escape_cell(text: &str) -> String {
    escape_html(text).replace('|', "\\|").replace('\n', " ")
}

pub(crate) fn relative_path(path: &str, root: Option<&Path>) -> String {
    let candidate = Path::new(path);
    match root {
        Some(root) if candidate.is_absolute() => candidate
            .strip_prefix(root)
            .map(|relative| relative.to_string_lossy().to_string())
            .unwrap_or_else(|_| path.to_string()),
        _ => path.to_string(),
    }
}
