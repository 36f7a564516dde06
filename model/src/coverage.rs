//! Line coverage per target and file
//!
//! All ratios are covered / executable lines, clamped to `[0, 1]`, and 0 when
//! nothing is executable. The overall ratio is weighted by executable lines,
//! so large targets dominate it.

use crate::error::{ModelError, ModelResult};
use bundle_reader::{RawCoverageFile, RawCoverageGraph, RawCoverageTarget};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// `covered / executable`, or 0 when there is nothing to execute
pub fn line_ratio(covered: u64, executable: u64) -> f64 {
    if executable == 0 {
        return 0.0;
    }
    (covered as f64 / executable as f64).clamp(0.0, 1.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageFile {
    pub name: String,
    pub path: String,
    pub covered_lines: u64,
    pub executable_lines: u64,
}

impl CoverageFile {
    pub fn ratio(&self) -> f64 {
        line_ratio(self.covered_lines, self.executable_lines)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageTarget {
    pub name: String,
    pub covered_lines: u64,
    pub executable_lines: u64,
    pub files: Vec<CoverageFile>,
}

impl CoverageTarget {
    pub fn ratio(&self) -> f64 {
        line_ratio(self.covered_lines, self.executable_lines)
    }
}

/// Coverage of one bundle; only ever built whole
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    targets: Vec<CoverageTarget>,
    covered_lines: u64,
    executable_lines: u64,
}

impl CoverageReport {
    pub fn new(targets: Vec<CoverageTarget>) -> Self {
        let covered_lines = targets.iter().map(|t| t.covered_lines).sum();
        let executable_lines = targets.iter().map(|t| t.executable_lines).sum();
        Self {
            targets,
            covered_lines,
            executable_lines,
        }
    }

    pub fn targets(&self) -> &[CoverageTarget] {
        &self.targets
    }

    pub fn covered_lines(&self) -> u64 {
        self.covered_lines
    }

    pub fn executable_lines(&self) -> u64 {
        self.executable_lines
    }

    /// Line-weighted overall ratio
    pub fn ratio(&self) -> f64 {
        line_ratio(self.covered_lines, self.executable_lines)
    }
}

fn file(raw: &RawCoverageFile) -> CoverageFile {
    CoverageFile {
        name: raw.name.clone(),
        path: if raw.path.is_empty() {
            raw.name.clone()
        } else {
            raw.path.clone()
        },
        covered_lines: raw.covered_lines.min(raw.executable_lines),
        executable_lines: raw.executable_lines,
    }
}

fn target(raw: &RawCoverageTarget) -> CoverageTarget {
    CoverageTarget {
        name: raw.name.clone(),
        covered_lines: raw.covered_lines.min(raw.executable_lines),
        executable_lines: raw.executable_lines,
        files: raw.files.iter().map(file).collect(),
    }
}

/// Build the coverage model from an `xccov` report
pub fn build_coverage(raw: &RawCoverageGraph) -> ModelResult<CoverageReport> {
    if raw.targets.is_empty() {
        return Err(ModelError::CoverageUnavailable);
    }

    let report = CoverageReport::new(raw.targets.iter().map(target).collect());
    debug!(
        "Built coverage report: {} targets, {}/{} lines",
        report.targets().len(),
        report.covered_lines(),
        report.executable_lines()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_target(name: &str, covered: u64, executable: u64) -> RawCoverageTarget {
        RawCoverageTarget {
            name: name.to_string(),
            build_product_path: None,
            covered_lines: covered,
            executable_lines: executable,
            line_coverage: line_ratio(covered, executable),
            files: vec![RawCoverageFile {
                name: format!("{}.swift", name),
                path: format!("/src/{}.swift", name),
                covered_lines: covered,
                executable_lines: executable,
                line_coverage: line_ratio(covered, executable),
            }],
        }
    }

    #[test]
    fn test_line_ratio() {
        assert_eq!(line_ratio(0, 0), 0.0);
        assert_eq!(line_ratio(5, 0), 0.0);
        assert_eq!(line_ratio(1, 4), 0.25);
        assert_eq!(line_ratio(9, 4), 1.0);
    }

    #[test]
    fn test_overall_is_line_weighted() {
        let raw = RawCoverageGraph {
            targets: vec![raw_target("Big", 90, 100), raw_target("Small", 0, 10)],
            ..Default::default()
        };

        let report = build_coverage(&raw).unwrap();
        // Weighted: 90 / 110, not the flat mean (0.9 + 0.0) / 2.
        assert!((report.ratio() - 90.0 / 110.0).abs() < 1e-12);
        assert!((report.ratio() - 0.45).abs() > 0.1);
    }

    #[test]
    fn test_zero_executable_target() {
        let raw = RawCoverageGraph {
            targets: vec![raw_target("Empty", 0, 0), raw_target("App", 3, 4)],
            ..Default::default()
        };

        let report = build_coverage(&raw).unwrap();
        assert_eq!(report.targets()[0].ratio(), 0.0);
        assert_eq!(report.ratio(), 0.75);
    }

    #[test]
    fn test_all_targets_empty() {
        let raw = RawCoverageGraph {
            targets: vec![raw_target("Empty", 0, 0)],
            ..Default::default()
        };
        let report = build_coverage(&raw).unwrap();
        assert_eq!(report.ratio(), 0.0);
    }

    #[test]
    fn test_no_targets_is_unavailable() {
        let raw = RawCoverageGraph::default();
        assert_eq!(build_coverage(&raw), Err(ModelError::CoverageUnavailable));
    }

    #[test]
    fn test_files_are_kept_in_order() {
        let mut raw_app = raw_target("App", 5, 10);
        raw_app.files.push(RawCoverageFile {
            name: "Other.swift".to_string(),
            path: String::new(),
            covered_lines: 12,
            executable_lines: 10,
            line_coverage: 1.2,
        });
        let raw = RawCoverageGraph {
            targets: vec![raw_app],
            ..Default::default()
        };

        let report = build_coverage(&raw).unwrap();
        let files = &report.targets()[0].files;
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].path, "/src/App.swift");
        assert_eq!(files[1].path, "Other.swift");
        assert_eq!(files[1].covered_lines, 10);
        assert_eq!(files[1].ratio(), 1.0);
    }
}
