use super::{relative_path, Annotation, AnnotationLevel, RenderOptions};
use xcresult_model::{Failure, TestCase, TestNode, TestRun, TestStatus};

/// Annotations in depth-first, input order
///
/// One per located failure of a failed case. With
/// `annotate_non_failures`, also one warning per skipped or
/// expected-failure case that has a located note. Issues without a location
/// are left to the detail document.
pub fn collect_annotations(run: &TestRun, options: &RenderOptions) -> Vec<Annotation> {
    let mut annotations = Vec::new();
    for plan in run.plans() {
        for child in plan.children() {
            visit(child, options, &mut annotations);
        }
    }
    annotations
}

fn visit(node: &TestNode, options: &RenderOptions, annotations: &mut Vec<Annotation>) {
    match node {
        TestNode::Group(group) => {
            for child in group.children() {
                visit(child, options, annotations);
            }
        }
        TestNode::Case(case) => annotate_case(case, options, annotations),
    }
}

fn annotate_case(case: &TestCase, options: &RenderOptions, annotations: &mut Vec<Annotation>) {
    match case.status {
        TestStatus::Failed => {
            for failure in &case.failures {
                if let Some(annotation) =
                    annotation(case, failure, AnnotationLevel::Failure, options)
                {
                    annotations.push(annotation);
                }
            }
        }
        TestStatus::Skipped | TestStatus::ExpectedFailure if options.annotate_non_failures => {
            if let Some(annotation) = case
                .notes
                .iter()
                .find_map(|note| annotation(case, note, AnnotationLevel::Warning, options))
            {
                annotations.push(annotation);
            }
        }
        _ => {}
    }
}

fn annotation(
    case: &TestCase,
    issue: &Failure,
    level: AnnotationLevel,
    options: &RenderOptions,
) -> Option<Annotation> {
    let location = issue.location.as_ref()?;

    let mut message = match (level, issue.message.is_empty()) {
        (AnnotationLevel::Failure, true) => "Test failed".to_string(),
        (AnnotationLevel::Failure, false) => issue.message.clone(),
        (AnnotationLevel::Warning, true) => capitalize(case.status.label()),
        (AnnotationLevel::Warning, false) => {
            format!("{}: {}", capitalize(case.status.label()), issue.message)
        }
    };
    if !issue.attachments.is_empty() {
        message.push_str(&format!("\nAttachments: {}", issue.attachments.join(", ")));
    }

    Some(Annotation {
        path: relative_path(&location.file, options.workspace_root.as_deref()),
        line: location.line,
        level,
        title: case.identifier.clone(),
        message,
    })
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xcresult_model::{GroupKind, TestGroup};

    fn failed(id: &str, failures: Vec<Failure>) -> TestNode {
        failures
            .into_iter()
            .fold(TestCase::new(id, TestStatus::Failed), TestCase::with_issue)
            .into()
    }

    fn run_of(children: Vec<TestNode>) -> TestRun {
        TestRun::new(
            vec![TestGroup::new(GroupKind::Plan, "Plan", None, children)],
            vec![],
        )
    }

    #[test]
    fn test_one_annotation_per_located_failure() {
        let run = run_of(vec![failed(
            "LoginTests/testInvalidLogin()",
            vec![
                Failure::new("Expected true, got false").at("Login.swift", 42),
                Failure::new("no location here"),
            ],
        )]);

        let annotations = collect_annotations(&run, &RenderOptions::default());
        assert_eq!(
            annotations,
            vec![Annotation {
                path: "Login.swift".to_string(),
                line: 42,
                level: AnnotationLevel::Failure,
                title: "LoginTests/testInvalidLogin()".to_string(),
                message: "Expected true, got false".to_string(),
            }]
        );
    }

    #[test]
    fn test_depth_first_order() {
        let run = run_of(vec![
            TestGroup::new(
                GroupKind::Suite,
                "Z",
                None,
                vec![failed("Z/first()", vec![Failure::new("1").at("Z.swift", 1)])],
            )
            .into(),
            failed("Plan/second()", vec![Failure::new("2").at("P.swift", 2)]),
            TestGroup::new(
                GroupKind::Suite,
                "A",
                None,
                vec![failed(
                    "A/third()",
                    vec![
                        Failure::new("3").at("A.swift", 3),
                        Failure::new("4").at("A.swift", 4),
                    ],
                )],
            )
            .into(),
        ]);

        let annotations = collect_annotations(&run, &RenderOptions::default());
        let messages: Vec<&str> = annotations.iter().map(|a| a.message.as_str()).collect();
        assert_eq!(messages, vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn test_skips_only_annotated_on_request() {
        let skipped: TestNode = TestCase::new("S/testLater()", TestStatus::Skipped)
            .with_issue(Failure::new("Not ready").at("S.swift", 3))
            .into();
        let expected: TestNode = TestCase::new("S/testKnown()", TestStatus::ExpectedFailure)
            .with_issue(Failure::new("").at("S.swift", 8))
            .into();
        let run = run_of(vec![skipped, expected]);

        assert!(collect_annotations(&run, &RenderOptions::default()).is_empty());

        let options = RenderOptions::default().with_annotate_non_failures(true);
        let annotations = collect_annotations(&run, &options);
        assert_eq!(annotations.len(), 2);
        assert_eq!(annotations[0].level, AnnotationLevel::Warning);
        assert_eq!(annotations[0].message, "Skipped: Not ready");
        assert_eq!(annotations[1].message, "Expected failure");
    }

    #[test]
    fn test_paths_relative_to_workspace() {
        let run = run_of(vec![failed(
            "S/t()",
            vec![Failure::new("boom")
                .at("/ci/work/Tests/S.swift", 5)
                .with_attachment("shot.png")],
        )]);
        let options = RenderOptions::default().with_workspace_root("/ci/work");

        let annotations = collect_annotations(&run, &options);
        assert_eq!(annotations[0].path, "Tests/S.swift");
        assert_eq!(annotations[0].message, "boom\nAttachments: shot.png");
    }
}
