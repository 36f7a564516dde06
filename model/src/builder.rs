//! Raw test tree → [`TestRun`]
//!
//! The walk is post-order: children are built first and the group
//! constructor sums them. Childless nodes that carry no test structure
//! (values, expressions, runtime warnings) are skipped with a debug log;
//! unmapped nodes with children are flattened into their parent so no case
//! is ever lost.

use crate::error::{ModelError, ModelResult};
use crate::types::{
    Device, Failure, GroupKind, SourceLocation, TestCase, TestGroup, TestNode, TestRun, TestStatus,
};
use bundle_reader::{RawDevice, RawNodeType, RawTestGraph, RawTestNode};
use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::debug;

/// Build the typed model from an exported test tree
pub fn build_test_run(raw: &RawTestGraph) -> ModelResult<TestRun> {
    let mut nodes = Vec::with_capacity(raw.test_nodes.len());
    build_children(&raw.test_nodes, None, &mut nodes)?;

    let mut plans = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            TestNode::Group(group) => plans.push(group),
            TestNode::Case(case) => {
                return Err(ModelError::UnexpectedNode {
                    node_type: RawNodeType::TestCase.label().to_string(),
                    name: case.identifier,
                    context: "at the top level of the test tree".to_string(),
                })
            }
        }
    }

    let devices = raw.devices.iter().map(device).collect();
    let run = TestRun::new(plans, devices);
    debug!(
        "Built test run: {} cases, {} failed",
        run.counts().total(),
        run.counts().failed
    );
    Ok(run)
}

fn device(raw: &RawDevice) -> Device {
    Device {
        name: raw.device_name.clone(),
        platform: raw.platform.clone(),
        os_version: raw.os_version.clone(),
        architecture: raw.architecture.clone(),
    }
}

fn group_kind(node_type: RawNodeType) -> Option<GroupKind> {
    match node_type {
        RawNodeType::TestPlan => Some(GroupKind::Plan),
        RawNodeType::UnitTestBundle | RawNodeType::UiTestBundle => Some(GroupKind::Target),
        RawNodeType::TestSuite => Some(GroupKind::Suite),
        RawNodeType::Device | RawNodeType::TestPlanConfiguration => {
            Some(GroupKind::Configuration)
        }
        _ => None,
    }
}

fn build_children(
    children: &[RawTestNode],
    parent: Option<&str>,
    out: &mut Vec<TestNode>,
) -> ModelResult<()> {
    for child in children {
        build_node(child, parent, out)?;
    }
    Ok(())
}

fn build_node(node: &RawTestNode, parent: Option<&str>, out: &mut Vec<TestNode>) -> ModelResult<()> {
    if node.node_type == RawNodeType::TestCase {
        out.push(build_case(node, parent)?.into());
        return Ok(());
    }

    let Some(kind) = group_kind(node.node_type) else {
        // Unmapped wrappers still hold cases; their children join the parent.
        if node.children.is_empty() {
            debug!(
                "Skipping {} node '{}' outside of a test case",
                node.node_type.label(),
                node.name
            );
        } else {
            debug!(
                "Flattening {} node '{}' into its parent",
                node.node_type.label(),
                node.name
            );
            build_children(&node.children, parent, out)?;
        }
        return Ok(());
    };

    // Configuration and device groups are transparent for case naming.
    let child_parent = match kind {
        GroupKind::Configuration => parent,
        _ => Some(node.name.as_str()),
    };

    let mut children = Vec::with_capacity(node.children.len());
    build_children(&node.children, child_parent, &mut children)?;

    out.push(TestGroup::new(kind, node.name.clone(), node_duration(node), children).into());
    Ok(())
}

fn build_case(node: &RawTestNode, parent: Option<&str>) -> ModelResult<TestCase> {
    let identifier = match (&node.node_identifier, parent) {
        (Some(identifier), _) => identifier.clone(),
        (None, Some(parent)) => format!("{}/{}", parent, node.name),
        (None, None) => node.name.clone(),
    };

    let raw_status = node.result.as_deref().unwrap_or_default();
    let status =
        TestStatus::from_raw(raw_status).ok_or_else(|| ModelError::UnrecognizedStatus {
            identifier: identifier.clone(),
            status: raw_status.to_string(),
        })?;

    let mut issues = Vec::new();
    let mut attachments = Vec::new();
    collect_issues(&node.children, &mut issues, &mut attachments);

    let mut case = TestCase::new(identifier, status)
        .with_duration(node_duration(node).unwrap_or(Duration::ZERO));
    case.name = node.name.clone();
    case.attachments = attachments;
    for issue in issues {
        case = case.with_issue(issue);
    }
    Ok(case)
}

fn collect_issues(
    children: &[RawTestNode],
    issues: &mut Vec<Failure>,
    attachments: &mut Vec<String>,
) {
    for child in children {
        match child.node_type {
            RawNodeType::FailureMessage => {
                let issue = failure(child);
                // Retried runs repeat the same message; keep the first and
                // gather attachments from every repeat.
                match issues
                    .iter_mut()
                    .find(|kept| kept.message == issue.message && kept.location == issue.location)
                {
                    Some(kept) => {
                        for attachment in issue.attachments {
                            if !kept.attachments.contains(&attachment) {
                                kept.attachments.push(attachment);
                            }
                        }
                    }
                    None => issues.push(issue),
                }
            }
            RawNodeType::Attachment => attachments.push(child.name.clone()),
            RawNodeType::Repetition
            | RawNodeType::TestCaseRun
            | RawNodeType::Device
            | RawNodeType::TestPlanConfiguration
            | RawNodeType::Arguments => collect_issues(&child.children, issues, attachments),
            _ => debug!(
                "Ignoring {} node '{}' inside a test case",
                child.node_type.label(),
                child.name
            ),
        }
    }
}

fn failure(node: &RawTestNode) -> Failure {
    let (mut location, message) = match split_location(&node.name) {
        Some((location, message)) => (Some(location), message),
        None => (None, node.name.trim().to_string()),
    };

    let mut attachments = Vec::new();
    for child in &node.children {
        match child.node_type {
            RawNodeType::SourceCodeReference if location.is_none() => {
                location = split_location(&child.name).map(|(location, _)| location);
            }
            RawNodeType::Attachment => attachments.push(child.name.clone()),
            _ => {}
        }
    }

    Failure {
        message,
        location,
        attachments,
    }
}

fn location_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?s)^\s*(?P<file>[^:\s][^:]*\.[A-Za-z0-9_+-]+):(?P<line>\d+)(?::\s*(?P<message>.*))?$",
        )
        .expect("location pattern is valid")
    })
}

/// Split `File.swift:42: message` into its location and message
fn split_location(text: &str) -> Option<(SourceLocation, String)> {
    let captures = location_pattern().captures(text)?;
    let line: u32 = captures.name("line")?.as_str().parse().ok()?;
    if line == 0 {
        return None;
    }

    let location = SourceLocation {
        file: captures.name("file")?.as_str().to_string(),
        line,
    };
    let message = captures
        .name("message")
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default();
    Some((location, message))
}

fn node_duration(node: &RawTestNode) -> Option<Duration> {
    if let Some(seconds) = node.duration_in_seconds {
        return Duration::try_from_secs_f64(seconds).ok();
    }
    node.duration.as_deref().and_then(parse_duration_label)
}

/// Parse the human readable duration labels `xcresulttool` emits
///
/// Accepts `1.2s`, `0,5s` (comma decimal separator), `2m 3s`, `1h 2m` and
/// `350ms`.
pub fn parse_duration_label(label: &str) -> Option<Duration> {
    let mut total = 0.0_f64;
    let mut seen = false;

    for part in label.split_whitespace() {
        let part = part.replace(',', ".");
        let (number, scale) = if let Some(n) = part.strip_suffix("ms") {
            (n, 0.001)
        } else if let Some(n) = part.strip_suffix('s') {
            (n, 1.0)
        } else if let Some(n) = part.strip_suffix('m') {
            (n, 60.0)
        } else if let Some(n) = part.strip_suffix('h') {
            (n, 3600.0)
        } else {
            return None;
        };
        total += number.parse::<f64>().ok()? * scale;
        seen = true;
    }

    if !seen {
        return None;
    }
    Duration::try_from_secs_f64(total).ok()
}
