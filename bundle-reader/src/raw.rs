//! Raw records as exported by `xcresulttool` and `xccov`
//!
//! These types mirror the JSON shapes one to one. Optional fields are
//! optional because the tools omit them, not because we chose to.

use serde::{Deserialize, Serialize};

/// Output of `xcresulttool get test-results tests`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTestGraph {
    #[serde(default)]
    pub devices: Vec<RawDevice>,
    #[serde(default)]
    pub test_plan_configurations: Vec<RawConfiguration>,
    #[serde(default)]
    pub test_nodes: Vec<RawTestNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDevice {
    #[serde(default)]
    pub device_id: Option<String>,
    pub device_name: String,
    #[serde(default)]
    pub architecture: Option<String>,
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub os_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawConfiguration {
    pub configuration_id: String,
    pub configuration_name: String,
}

/// One node of the exported test tree
///
/// Containers and leaves share this shape; only `node_type` tells them
/// apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTestNode {
    #[serde(default)]
    pub node_identifier: Option<String>,
    pub node_type: RawNodeType,
    pub name: String,
    #[serde(default)]
    pub details: Option<String>,
    /// Human readable label such as `1.2s` or `2m 3s`
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub duration_in_seconds: Option<f64>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub children: Vec<RawTestNode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RawNodeType {
    #[serde(rename = "Test Plan")]
    TestPlan,
    #[serde(rename = "Unit test bundle")]
    UnitTestBundle,
    #[serde(rename = "UI test bundle")]
    UiTestBundle,
    #[serde(rename = "Test Suite")]
    TestSuite,
    #[serde(rename = "Test Case")]
    TestCase,
    #[serde(rename = "Device")]
    Device,
    #[serde(rename = "Test Plan Configuration")]
    TestPlanConfiguration,
    #[serde(rename = "Arguments")]
    Arguments,
    #[serde(rename = "Repetition")]
    Repetition,
    #[serde(rename = "Test Case Run")]
    TestCaseRun,
    #[serde(rename = "Failure Message")]
    FailureMessage,
    #[serde(rename = "Source Code Reference")]
    SourceCodeReference,
    #[serde(rename = "Attachment")]
    Attachment,
    #[serde(rename = "Expression")]
    Expression,
    #[serde(rename = "Test Value")]
    TestValue,
    #[serde(rename = "Runtime Warning")]
    RuntimeWarning,
    #[serde(other)]
    Unknown,
}

impl RawNodeType {
    pub fn label(&self) -> &'static str {
        match self {
            RawNodeType::TestPlan => "Test Plan",
            RawNodeType::UnitTestBundle => "Unit test bundle",
            RawNodeType::UiTestBundle => "UI test bundle",
            RawNodeType::TestSuite => "Test Suite",
            RawNodeType::TestCase => "Test Case",
            RawNodeType::Device => "Device",
            RawNodeType::TestPlanConfiguration => "Test Plan Configuration",
            RawNodeType::Arguments => "Arguments",
            RawNodeType::Repetition => "Repetition",
            RawNodeType::TestCaseRun => "Test Case Run",
            RawNodeType::FailureMessage => "Failure Message",
            RawNodeType::SourceCodeReference => "Source Code Reference",
            RawNodeType::Attachment => "Attachment",
            RawNodeType::Expression => "Expression",
            RawNodeType::TestValue => "Test Value",
            RawNodeType::RuntimeWarning => "Runtime Warning",
            RawNodeType::Unknown => "Unknown",
        }
    }
}

/// Output of `xccov view --report --json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCoverageGraph {
    #[serde(default)]
    pub covered_lines: u64,
    #[serde(default)]
    pub executable_lines: u64,
    #[serde(default)]
    pub line_coverage: f64,
    #[serde(default)]
    pub targets: Vec<RawCoverageTarget>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCoverageTarget {
    pub name: String,
    #[serde(default)]
    pub build_product_path: Option<String>,
    #[serde(default)]
    pub covered_lines: u64,
    #[serde(default)]
    pub executable_lines: u64,
    #[serde(default)]
    pub line_coverage: f64,
    #[serde(default)]
    pub files: Vec<RawCoverageFile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCoverageFile {
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub covered_lines: u64,
    #[serde(default)]
    pub executable_lines: u64,
    #[serde(default)]
    pub line_coverage: f64,
}

impl RawTestNode {
    /// Convenience constructor used by fixtures and tests
    pub fn new(node_type: RawNodeType, name: impl Into<String>) -> Self {
        Self {
            node_identifier: None,
            node_type,
            name: name.into(),
            details: None,
            duration: None,
            duration_in_seconds: None,
            result: None,
            tags: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_result(mut self, result: impl Into<String>) -> Self {
        self.result = Some(result.into());
        self
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration_in_seconds = Some(seconds);
        self
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.node_identifier = Some(identifier.into());
        self
    }

    pub fn with_child(mut self, child: RawTestNode) -> Self {
        self.children.push(child);
        self
    }
}
