//! Check-run payload preparation
//!
//! The renderer produces complete, untruncated text. Transport limits are
//! applied here, on its output: every text field is cut to
//! [`BYTES_LIMIT`] bytes and the annotation list to [`ANNOTATION_LIMIT`]
//! entries. Upload decisions use the untruncated verdict.

use crate::render::{Annotation, AnnotationLevel, RenderedReport};
use crate::ReportResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{error, warn};
use xcresult_model::Verdict;

/// Maximum size of any text field accepted by the checks API
pub const BYTES_LIMIT: usize = 65535;

/// Maximum number of annotations accepted per request
pub const ANNOTATION_LIMIT: usize = 50;

pub const OUTPUT_TITLE: &str = "Xcode test results";

/// Longest prefix of `text` that fits in `max_bytes` without splitting a
/// character
pub fn truncate_to_bytes(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

fn truncate_field(field: &str, text: &str) -> String {
    if text.len() > BYTES_LIMIT {
        warn!(
            "The '{}' will be truncated because the byte size limit ({}) exceeded.",
            field, BYTES_LIMIT
        );
    }
    truncate_to_bytes(text, BYTES_LIMIT).to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckAnnotation {
    pub path: String,
    pub start_line: u32,
    pub end_line: u32,
    pub annotation_level: AnnotationLevel,
    pub title: String,
    pub message: String,
}

impl From<&Annotation> for CheckAnnotation {
    fn from(annotation: &Annotation) -> Self {
        Self {
            path: annotation.path.clone(),
            start_line: annotation.line,
            end_line: annotation.line,
            annotation_level: annotation.level,
            title: annotation.title.clone(),
            message: annotation.message.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckRunOutput {
    pub title: String,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub annotations: Vec<CheckAnnotation>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckRun {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head_sha: Option<String>,
    pub status: String,
    pub conclusion: Verdict,
    pub completed_at: DateTime<Utc>,
    pub output: CheckRunOutput,
}

/// Shape a rendered report into a check-run request within the API limits
pub fn prepare_check_run(
    name: &str,
    head_sha: Option<String>,
    report: &RenderedReport,
    completed_at: DateTime<Utc>,
) -> CheckRun {
    let summary = truncate_field("summary", &report.report_summary);
    let detail = truncate_field("text", &report.report_detail);

    if report.annotations.len() > ANNOTATION_LIMIT {
        warn!(
            "Annotations that exceed the limit ({}) will be truncated.",
            ANNOTATION_LIMIT
        );
    }
    let annotations = report
        .annotations
        .iter()
        .take(ANNOTATION_LIMIT)
        .map(CheckAnnotation::from)
        .collect();

    CheckRun {
        name: truncate_field("title", name),
        head_sha,
        status: "completed".to_string(),
        conclusion: report.test_status,
        completed_at,
        output: CheckRunOutput {
            title: OUTPUT_TITLE.to_string(),
            summary,
            text: if detail.trim().is_empty() {
                None
            } else {
                Some(detail)
            },
            annotations,
        },
    }
}

/// When the input bundles should be handed to an artifact uploader
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadPolicy {
    #[serde(alias = "true")]
    Always,
    Failure,
    #[default]
    #[serde(alias = "false")]
    Never,
}

impl UploadPolicy {
    pub fn should_upload(&self, verdict: Verdict) -> bool {
        match self {
            UploadPolicy::Always => true,
            UploadPolicy::Failure => verdict == Verdict::Failure,
            UploadPolicy::Never => false,
        }
    }
}

impl FromStr for UploadPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "always" | "true" => Ok(UploadPolicy::Always),
            "failure" => Ok(UploadPolicy::Failure),
            "never" | "false" => Ok(UploadPolicy::Never),
            other => Err(format!(
                "Unknown upload policy '{}', expected always, failure or never",
                other
            )),
        }
    }
}

/// Files of one bundle an artifact uploader should send
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BundleUpload {
    pub name: String,
    pub root: PathBuf,
    pub files: Vec<PathBuf>,
}

/// Every regular file below `bundle`
pub fn list_bundle_files(bundle: &Path) -> ReportResult<Vec<PathBuf>> {
    let pattern = format!(
        "{}/**/*",
        glob::Pattern::escape(&bundle.to_string_lossy())
    );

    let mut files = Vec::new();
    for entry in glob::glob(&pattern)? {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => error!("{}", e),
        }
    }
    Ok(files)
}

/// Decide which input bundles to upload for `verdict`
pub fn plan_uploads(
    policy: UploadPolicy,
    verdict: Verdict,
    bundles: &[PathBuf],
) -> ReportResult<Vec<BundleUpload>> {
    if !policy.should_upload(verdict) {
        return Ok(Vec::new());
    }

    let mut uploads = Vec::new();
    for bundle in bundles {
        if !bundle.exists() {
            continue;
        }

        let files = list_bundle_files(bundle)?;
        if files.is_empty() {
            continue;
        }

        let name = bundle
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| bundle.display().to_string());
        uploads.push(BundleUpload {
            name,
            root: bundle.clone(),
            files,
        });
    }
    Ok(uploads)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(annotations: usize, detail: &str) -> RenderedReport {
        RenderedReport {
            report_summary: "summary".to_string(),
            report_detail: detail.to_string(),
            annotations: (0..annotations)
                .map(|i| Annotation {
                    path: "A.swift".to_string(),
                    line: i as u32 + 1,
                    level: AnnotationLevel::Failure,
                    title: format!("S/t{}()", i),
                    message: "boom".to_string(),
                })
                .collect(),
            test_status: Verdict::Failure,
        }
    }

    #[test]
    fn test_truncate_to_bytes() {
        assert_eq!(truncate_to_bytes("hello", 10), "hello");
        assert_eq!(truncate_to_bytes("hello", 3), "hel");
        // "é" is two bytes; never split it.
        assert_eq!(truncate_to_bytes("aé", 2), "a");
        assert_eq!(truncate_to_bytes("✅✅", 4), "✅");
        assert_eq!(truncate_to_bytes("", 0), "");
    }

    #[test]
    fn test_annotations_are_capped_in_order() {
        let check = prepare_check_run("Tests", None, &report(60, "detail"), Utc::now());
        assert_eq!(check.output.annotations.len(), ANNOTATION_LIMIT);
        assert_eq!(check.output.annotations[0].start_line, 1);
        assert_eq!(check.output.annotations[49].start_line, 50);
        assert_eq!(check.conclusion, Verdict::Failure);
        assert_eq!(check.status, "completed");
    }

    #[test]
    fn test_long_fields_are_truncated() {
        let long = "é".repeat(BYTES_LIMIT);
        let check = prepare_check_run(&long, None, &report(0, &long), Utc::now());
        assert!(check.name.len() <= BYTES_LIMIT);
        let text = check.output.text.unwrap();
        assert!(text.len() <= BYTES_LIMIT);
        assert!(text.len() > BYTES_LIMIT - 2);
    }

    #[test]
    fn test_blank_detail_is_omitted() {
        let check = prepare_check_run("Tests", None, &report(0, "  \n"), Utc::now());
        assert!(check.output.text.is_none());

        let json = serde_json::to_value(&check).unwrap();
        assert!(json["output"].get("text").is_none());
        assert_eq!(json["conclusion"], "failure");
        assert_eq!(json["output"]["title"], OUTPUT_TITLE);
    }

    #[test]
    fn test_check_annotation_shape() {
        let check = prepare_check_run("Tests", Some("abc123".to_string()), &report(1, "d"), Utc::now());
        let json = serde_json::to_value(&check).unwrap();
        let annotation = &json["output"]["annotations"][0];
        assert_eq!(annotation["path"], "A.swift");
        assert_eq!(annotation["start_line"], 1);
        assert_eq!(annotation["end_line"], 1);
        assert_eq!(annotation["annotation_level"], "failure");
        assert_eq!(json["head_sha"], "abc123");
    }

    #[test]
    fn test_upload_policy_parsing() {
        assert_eq!("true".parse::<UploadPolicy>(), Ok(UploadPolicy::Always));
        assert_eq!("Always".parse::<UploadPolicy>(), Ok(UploadPolicy::Always));
        assert_eq!("failure".parse::<UploadPolicy>(), Ok(UploadPolicy::Failure));
        assert_eq!("false".parse::<UploadPolicy>(), Ok(UploadPolicy::Never));
        assert!("sometimes".parse::<UploadPolicy>().is_err());
    }

    #[test]
    fn test_upload_policy_decision() {
        assert!(UploadPolicy::Always.should_upload(Verdict::Success));
        assert!(UploadPolicy::Failure.should_upload(Verdict::Failure));
        assert!(!UploadPolicy::Failure.should_upload(Verdict::Success));
        assert!(!UploadPolicy::Never.should_upload(Verdict::Failure));
    }

    #[test]
    fn test_plan_uploads_lists_files() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = dir.path().join("Run.xcresult");
        std::fs::create_dir_all(bundle.join("Data")).unwrap();
        std::fs::write(bundle.join("Info.plist"), "<plist/>").unwrap();
        std::fs::write(bundle.join("Data").join("data.0"), "x").unwrap();
        let missing = dir.path().join("Missing.xcresult");

        let uploads = plan_uploads(
            UploadPolicy::Failure,
            Verdict::Failure,
            &[bundle.clone(), missing],
        )
        .unwrap();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].name, "Run.xcresult");
        assert_eq!(uploads[0].root, bundle);
        assert_eq!(uploads[0].files.len(), 2);
        assert!(uploads[0].files.iter().all(|f| f.is_file()));

        let none = plan_uploads(UploadPolicy::Failure, Verdict::Success, &[bundle]).unwrap();
        assert!(none.is_empty());
    }
}
