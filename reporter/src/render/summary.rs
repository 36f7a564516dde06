use super::{format_duration, format_percent};
use xcresult_model::{CoverageReport, TestRun, Verdict};

/// One compact block: verdict, totals, time and overall coverage
pub fn render_summary(run: &TestRun, coverage: Option<&CoverageReport>) -> String {
    let counts = run.counts();
    let verdict = match run.verdict() {
        Verdict::Success => "✅ Success",
        Verdict::Failure => "❌ Failure",
    };

    let mut header =
        "| Total | ✅ Passed | ❌ Failed | ⊘ Skipped | ⚠️ Expected Failure | ⏱ Time |".to_string();
    let mut align = "| ---: | ---: | ---: | ---: | ---: | ---: |".to_string();
    let mut row = format!(
        "| {} | {} | {} | {} | {} | {} |",
        counts.total(),
        counts.passed,
        counts.failed,
        counts.skipped,
        counts.expected_failures,
        format_duration(run.duration())
    );

    if let Some(coverage) = coverage {
        header.push_str(" Coverage |");
        align.push_str(" ---: |");
        row.push_str(&format!(" {} |", format_percent(coverage.ratio())));
    }

    let mut out = format!("## Test Results: {}\n\n{}\n{}\n{}\n", verdict, header, align, row);

    if !run.devices().is_empty() {
        let devices: Vec<String> = run.devices().iter().map(|d| d.to_string()).collect();
        out.push_str(&format!("\nDevices: {}\n", devices.join(", ")));
    }

    out
}
