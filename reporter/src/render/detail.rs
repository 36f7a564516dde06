use super::{
    escape_cell, escape_html, format_duration, format_percent, relative_path, status_glyph,
    RenderOptions,
};
use xcresult_model::{CoverageReport, Failure, TestCase, TestGroup, TestNode, TestRun, TestStatus};

/// Nested document of every container and (visible) case, followed by the
/// coverage section when one is given
pub fn render_detail(
    run: &TestRun,
    coverage: Option<&CoverageReport>,
    options: &RenderOptions,
) -> String {
    let mut out = String::from("## Test Details\n\n");

    if run.plans().is_empty() {
        out.push_str("_No tests were recorded in this bundle._\n\n");
    }
    for plan in run.plans() {
        render_group(&mut out, plan, options);
    }

    if let Some(coverage) = coverage {
        render_coverage(&mut out, coverage, options);
    }

    out
}

fn group_glyph(group: &TestGroup) -> &'static str {
    let counts = group.counts();
    if counts.failed > 0 {
        status_glyph(TestStatus::Failed)
    } else if counts.skipped > 0 && counts.passed + counts.expected_failures == 0 {
        status_glyph(TestStatus::Skipped)
    } else {
        status_glyph(TestStatus::Passed)
    }
}

fn render_group(out: &mut String, group: &TestGroup, options: &RenderOptions) {
    let counts = group.counts();
    let open = if counts.failed > 0 { " open" } else { "" };

    out.push_str(&format!(
        "<details{}>\n<summary>{} <b>{}</b> ({}) · {} passed, {} failed, {} skipped, {} expected failures · {}</summary>\n\n",
        open,
        group_glyph(group),
        escape_html(group.name()),
        group.kind().label(),
        counts.passed,
        counts.failed,
        counts.skipped,
        counts.expected_failures,
        format_duration(group.duration())
    ));

    let mut in_list = false;
    for child in group.children() {
        match child {
            TestNode::Case(case) => {
                if case.status == TestStatus::Passed && !options.show_passed_tests {
                    continue;
                }
                render_case(out, case);
                in_list = true;
            }
            TestNode::Group(inner) => {
                if in_list {
                    out.push('\n');
                    in_list = false;
                }
                render_group(out, inner, options);
            }
        }
    }
    if in_list {
        out.push('\n');
    }

    out.push_str("</details>\n\n");
}

fn render_case(out: &mut String, case: &TestCase) {
    out.push_str(&format!(
        "- {} <code>{}</code> · {}\n",
        status_glyph(case.status),
        escape_html(&case.name),
        format_duration(case.duration)
    ));

    match case.status {
        TestStatus::Failed if case.failures.is_empty() => {
            out.push_str("  - _No failure message was recorded_\n");
        }
        TestStatus::Failed => {
            for failure in &case.failures {
                render_issue(out, failure);
            }
        }
        _ => {
            for note in &case.notes {
                render_issue(out, note);
            }
        }
    }

    if !case.attachments.is_empty() {
        out.push_str(&format!("  - Attachments: {}\n", code_list(&case.attachments)));
    }
}

fn render_issue(out: &mut String, issue: &Failure) {
    let mut lines = issue.message.lines();
    let first = escape_html(lines.next().unwrap_or_default());
    match &issue.location {
        Some(location) => out.push_str(&format!(
            "  - {} (<code>{}</code>)\n",
            first,
            escape_html(&location.to_string())
        )),
        None => out.push_str(&format!("  - {}\n", first)),
    }
    for line in lines {
        out.push_str(&format!("    {}\n", escape_html(line)));
    }

    if !issue.attachments.is_empty() {
        out.push_str(&format!("    - Attachments: {}\n", code_list(&issue.attachments)));
    }
}

fn code_list(names: &[String]) -> String {
    names
        .iter()
        .map(|name| format!("<code>{}</code>", escape_html(name)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_coverage(out: &mut String, coverage: &CoverageReport, options: &RenderOptions) {
    let root = options.workspace_root.as_deref();

    out.push_str(&format!(
        "## Code Coverage\n\n**{}** of executable lines covered ({}/{})\n\n",
        format_percent(coverage.ratio()),
        coverage.covered_lines(),
        coverage.executable_lines()
    ));

    let mut targets: Vec<_> = coverage.targets().iter().collect();
    targets.sort_by(|a, b| a.name.cmp(&b.name));

    out.push_str("| Target | Files | Covered | Executable | Coverage |\n");
    out.push_str("| :--- | ---: | ---: | ---: | ---: |\n");
    for target in &targets {
        out.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            escape_cell(&target.name),
            target.files.len(),
            target.covered_lines,
            target.executable_lines,
            format_percent(target.ratio())
        ));
    }
    out.push('\n');

    for target in targets.iter().filter(|t| !t.files.is_empty()) {
        let mut files: Vec<_> = target.files.iter().collect();
        files.sort_by(|a, b| a.path.cmp(&b.path));

        out.push_str(&format!(
            "<details>\n<summary>{}</summary>\n\n",
            escape_html(&target.name)
        ));
        out.push_str("| File | Covered | Executable | Coverage |\n");
        out.push_str("| :--- | ---: | ---: | ---: |\n");
        for file in files {
            out.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                escape_cell(&relative_path(&file.path, root)),
                file.covered_lines,
                file.executable_lines,
                format_percent(file.ratio())
            ));
        }
        out.push_str("\n</details>\n\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use xcresult_model::{CoverageFile, CoverageTarget, GroupKind};

    fn case(id: &str, status: TestStatus) -> TestNode {
        TestCase::new(id, status).into()
    }

    fn suite(name: &str, children: Vec<TestNode>) -> TestGroup {
        TestGroup::new(GroupKind::Suite, name, None, children)
    }

    #[test]
    fn test_failed_case_lists_messages_and_location() {
        let failing = TestCase::new("LoginTests/testInvalidLogin()", TestStatus::Failed)
            .with_duration(Duration::from_millis(300))
            .with_issue(Failure::new("Expected true, got false").at("Login.swift", 42))
            .with_issue(Failure::new("Crashed\nwith <signal>").with_attachment("crash.log"));
        let run = TestRun::new(vec![suite("LoginTests", vec![failing.into()])], vec![]);

        let detail = render_detail(&run, None, &RenderOptions::default());
        assert!(detail.contains("<details open>"));
        assert!(detail.contains("- ❌ <code>testInvalidLogin()</code> · 0.30s"));
        assert!(detail.contains("  - Expected true, got false (<code>Login.swift:42</code>)"));
        assert!(detail.contains("  - Crashed\n    with &lt;signal&gt;\n"));
        assert!(detail.contains("Attachments: <code>crash.log</code>"));
    }

    #[test]
    fn test_hidden_passed_cases_keep_header_counts() {
        let run = TestRun::new(
            vec![suite(
                "GreenTests",
                vec![
                    case("GreenTests/a()", TestStatus::Passed),
                    case("GreenTests/b()", TestStatus::Passed),
                ],
            )],
            vec![],
        );
        let options = RenderOptions::default().with_show_passed_tests(false);

        let detail = render_detail(&run, None, &options);
        assert!(detail.contains("<b>GreenTests</b> (suite) · 2 passed, 0 failed"));
        assert!(!detail.contains("<code>a()</code>"));
        assert!(!detail.contains("<code>b()</code>"));
        assert!(!detail.contains("<details open>"));

        let shown = render_detail(&run, None, &RenderOptions::default());
        assert!(shown.contains("- ✅ <code>a()</code>"));
    }

    #[test]
    fn test_nested_groups_in_input_order() {
        let target = TestGroup::new(
            GroupKind::Target,
            "AppTests",
            None,
            vec![
                suite("BTests", vec![case("BTests/x()", TestStatus::Skipped)]).into(),
                suite("ATests", vec![case("ATests/y()", TestStatus::Passed)]).into(),
            ],
        );
        let run = TestRun::new(vec![target], vec![]);

        let detail = render_detail(&run, None, &RenderOptions::default());
        let b = detail.find("<b>BTests</b>").unwrap();
        let a = detail.find("<b>ATests</b>").unwrap();
        assert!(b < a);
        assert!(detail.contains("⊘ <b>BTests</b>"));
        assert!(detail.contains("(target) · 1 passed, 0 failed, 1 skipped"));
    }

    #[test]
    fn test_empty_run() {
        let run = TestRun::new(vec![], vec![]);
        let detail = render_detail(&run, None, &RenderOptions::default());
        assert!(detail.contains("No tests were recorded"));
    }

    #[test]
    fn test_coverage_tables_sorted() {
        let coverage = CoverageReport::new(vec![
            CoverageTarget {
                name: "Zeta.framework".to_string(),
                covered_lines: 1,
                executable_lines: 2,
                files: vec![],
            },
            CoverageTarget {
                name: "App.app".to_string(),
                covered_lines: 3,
                executable_lines: 4,
                files: vec![
                    CoverageFile {
                        name: "View.swift".to_string(),
                        path: "/work/Sources/View.swift".to_string(),
                        covered_lines: 1,
                        executable_lines: 2,
                    },
                    CoverageFile {
                        name: "Login.swift".to_string(),
                        path: "/work/Sources/Login.swift".to_string(),
                        covered_lines: 2,
                        executable_lines: 2,
                    },
                ],
            },
        ]);
        let run = TestRun::new(vec![], vec![]);
        let options = RenderOptions::default().with_workspace_root("/work");

        let detail = render_detail(&run, Some(&coverage), &options);
        assert!(detail.contains("**66.67%** of executable lines covered (4/6)"));
        let app = detail.find("| App.app | 2 | 3 | 4 | 75.00% |").unwrap();
        let zeta = detail.find("| Zeta.framework | 0 | 1 | 2 | 50.00% |").unwrap();
        assert!(app < zeta);

        let login = detail.find("| Sources/Login.swift |").unwrap();
        let view = detail.find("| Sources/View.swift |").unwrap();
        assert!(login < view);
    }
}
