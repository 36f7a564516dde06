//! Typed test-execution hierarchy
//!
//! A [`TestRun`] owns a forest of [`TestGroup`]s (plans, targets, suites)
//! whose leaves are [`TestCase`]s. Group aggregates are computed once, in
//! the constructor, from the children handed in; there is no way to change
//! a group's children or counts afterwards, so a group's counts always equal
//! the sum over its children.

use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use std::time::Duration;

/// Outcome of a single test case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    Passed,
    Failed,
    Skipped,
    ExpectedFailure,
}

impl TestStatus {
    /// Map the result string used by `xcresulttool`
    pub fn from_raw(raw: &str) -> Option<Self> {
        match raw.trim() {
            "Passed" => Some(TestStatus::Passed),
            "Failed" => Some(TestStatus::Failed),
            "Skipped" => Some(TestStatus::Skipped),
            "Expected Failure" => Some(TestStatus::ExpectedFailure),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TestStatus::Passed => "passed",
            TestStatus::Failed => "failed",
            TestStatus::Skipped => "skipped",
            TestStatus::ExpectedFailure => "expected failure",
        }
    }
}

/// Per-node totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub expected_failures: usize,
}

impl Counts {
    pub fn of(status: TestStatus) -> Self {
        let mut counts = Counts::default();
        match status {
            TestStatus::Passed => counts.passed = 1,
            TestStatus::Failed => counts.failed = 1,
            TestStatus::Skipped => counts.skipped = 1,
            TestStatus::ExpectedFailure => counts.expected_failures = 1,
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.passed + self.failed + self.skipped + self.expected_failures
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl Add for Counts {
    type Output = Counts;

    fn add(self, rhs: Counts) -> Counts {
        Counts {
            passed: self.passed + rhs.passed,
            failed: self.failed + rhs.failed,
            skipped: self.skipped + rhs.skipped,
            expected_failures: self.expected_failures + rhs.expected_failures,
        }
    }
}

impl AddAssign for Counts {
    fn add_assign(&mut self, rhs: Counts) {
        *self = *self + rhs;
    }
}

impl Sum for Counts {
    fn sum<I: Iterator<Item = Counts>>(iter: I) -> Counts {
        iter.fold(Counts::default(), Add::add)
    }
}

/// Overall classification of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Success,
    Failure,
}

impl Verdict {
    /// Failure iff at least one case failed
    pub fn from_counts(counts: &Counts) -> Self {
        if counts.failed > 0 {
            Verdict::Failure
        } else {
            Verdict::Success
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Success => "success",
            Verdict::Failure => "failure",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// File and line a failure points at
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// One recorded issue of a test case
///
/// Attachments are kept as names only; their contents stay in the bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Failure {
    pub message: String,
    pub location: Option<SourceLocation>,
    pub attachments: Vec<String>,
}

impl Failure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: None,
            attachments: Vec::new(),
        }
    }

    pub fn at(mut self, file: impl Into<String>, line: u32) -> Self {
        self.location = Some(SourceLocation {
            file: file.into(),
            line,
        });
        self
    }

    pub fn with_attachment(mut self, name: impl Into<String>) -> Self {
        self.attachments.push(name.into());
        self
    }
}

/// Leaf of the tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    /// Suite-qualified name, e.g. `LoginTests/testValidLogin()`
    pub identifier: String,
    pub name: String,
    pub status: TestStatus,
    pub duration: Duration,
    /// Only populated for failed cases
    pub failures: Vec<Failure>,
    /// Skip reasons and expected issues of non-failed cases
    pub notes: Vec<Failure>,
    pub attachments: Vec<String>,
}

impl TestCase {
    pub fn new(identifier: impl Into<String>, status: TestStatus) -> Self {
        let identifier = identifier.into();
        let name = identifier
            .rsplit('/')
            .next()
            .unwrap_or(identifier.as_str())
            .to_string();
        Self {
            identifier,
            name,
            status,
            duration: Duration::ZERO,
            failures: Vec::new(),
            notes: Vec::new(),
            attachments: Vec::new(),
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Record an issue; it lands in `failures` or `notes` depending on status
    pub fn with_issue(mut self, issue: Failure) -> Self {
        if self.status == TestStatus::Failed {
            self.failures.push(issue);
        } else {
            self.notes.push(issue);
        }
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKind {
    Plan,
    Target,
    Suite,
    Configuration,
}

impl GroupKind {
    pub fn label(&self) -> &'static str {
        match self {
            GroupKind::Plan => "test plan",
            GroupKind::Target => "target",
            GroupKind::Suite => "suite",
            GroupKind::Configuration => "configuration",
        }
    }
}

/// Named container of suites and cases
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestGroup {
    kind: GroupKind,
    name: String,
    counts: Counts,
    duration: Duration,
    children: Vec<TestNode>,
}

impl TestGroup {
    /// Build a group; counts are summed from `children`, and so is the
    /// duration unless the bundle recorded one
    pub fn new(
        kind: GroupKind,
        name: impl Into<String>,
        duration: Option<Duration>,
        children: Vec<TestNode>,
    ) -> Self {
        let counts = children.iter().map(TestNode::counts).sum();
        let duration = duration.unwrap_or_else(|| children.iter().map(TestNode::duration).sum());
        Self {
            kind,
            name: name.into(),
            counts,
            duration,
            children,
        }
    }

    pub fn kind(&self) -> GroupKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn counts(&self) -> Counts {
        self.counts
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn children(&self) -> &[TestNode] {
        &self.children
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TestNode {
    Group(TestGroup),
    Case(TestCase),
}

impl TestNode {
    pub fn counts(&self) -> Counts {
        match self {
            TestNode::Group(group) => group.counts(),
            TestNode::Case(case) => Counts::of(case.status),
        }
    }

    pub fn duration(&self) -> Duration {
        match self {
            TestNode::Group(group) => group.duration(),
            TestNode::Case(case) => case.duration,
        }
    }
}

impl From<TestGroup> for TestNode {
    fn from(group: TestGroup) -> Self {
        TestNode::Group(group)
    }
}

impl From<TestCase> for TestNode {
    fn from(case: TestCase) -> Self {
        TestNode::Case(case)
    }
}

/// Device the tests ran on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub name: String,
    pub platform: Option<String>,
    pub os_version: Option<String>,
    pub architecture: Option<String>,
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)?;
        match (&self.platform, &self.os_version) {
            (Some(platform), Some(version)) => write!(f, " ({} {})", platform, version),
            (Some(platform), None) => write!(f, " ({})", platform),
            (None, Some(version)) => write!(f, " ({})", version),
            (None, None) => Ok(()),
        }
    }
}

/// Root of the model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestRun {
    plans: Vec<TestGroup>,
    counts: Counts,
    duration: Duration,
    verdict: Verdict,
    devices: Vec<Device>,
}

impl TestRun {
    pub fn new(plans: Vec<TestGroup>, devices: Vec<Device>) -> Self {
        let counts: Counts = plans.iter().map(TestGroup::counts).sum();
        let duration = plans.iter().map(TestGroup::duration).sum();
        Self {
            verdict: Verdict::from_counts(&counts),
            plans,
            counts,
            duration,
            devices,
        }
    }

    pub fn plans(&self) -> &[TestGroup] {
        &self.plans
    }

    pub fn counts(&self) -> Counts {
        self.counts
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn verdict(&self) -> Verdict {
        self.verdict
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    /// All cases in depth-first, input order
    pub fn cases(&self) -> Vec<&TestCase> {
        fn collect<'a>(node: &'a TestNode, out: &mut Vec<&'a TestCase>) {
            match node {
                TestNode::Case(case) => out.push(case),
                TestNode::Group(group) => {
                    for child in group.children() {
                        collect(child, out);
                    }
                }
            }
        }

        let mut out = Vec::new();
        for plan in &self.plans {
            for child in plan.children() {
                collect(child, &mut out);
            }
        }
        out
    }
}
