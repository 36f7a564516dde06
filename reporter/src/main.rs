use bundle_reader::{JsonDump, ReaderConfig, Xcrun};
use chrono::Utc;
use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;
use xcresult_report::prelude::*;

#[derive(Parser)]
#[command(name = "xcresult-report")]
#[command(about = "Turn Xcode result bundles into check-run reports")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a report for one or more result bundles
    Report {
        /// Result bundle to report on (repeat to merge several)
        #[arg(short, long = "path", required_unless_present = "tests_json")]
        paths: Vec<PathBuf>,
        /// TOML file with report settings
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Check-run name
        #[arg(long)]
        title: Option<String>,
        /// List passed tests in the detail
        #[arg(long, action = ArgAction::Set)]
        show_passed_tests: Option<bool>,
        /// Include code coverage
        #[arg(long, action = ArgAction::Set)]
        show_code_coverage: Option<bool>,
        /// Emit warnings for skipped and expected-failure tests
        #[arg(long)]
        annotate_non_failures: bool,
        /// When to hand the bundles to an uploader: always, failure or never
        #[arg(long)]
        upload_bundles: Option<UploadPolicy>,
        /// Read an exported `xcresulttool get test-results tests` JSON instead
        #[arg(long)]
        tests_json: Option<PathBuf>,
        /// Exported `xccov view --report --json` output to go with --tests-json
        #[arg(long, requires = "tests_json")]
        coverage_json: Option<PathBuf>,
        /// Commit the check run belongs to
        #[arg(long, env = "GITHUB_SHA")]
        sha: Option<String>,
        /// Write the check-run payload here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Append the summary to this file
        #[arg(long, env = "GITHUB_STEP_SUMMARY")]
        summary_file: Option<PathBuf>,
        /// Report paths relative to this directory
        #[arg(long, env = "GITHUB_WORKSPACE")]
        workspace: Option<PathBuf>,
        /// Seconds to wait for each xcrun call
        #[arg(long)]
        timeout: Option<u64>,
        /// xcrun executable to use
        #[arg(long)]
        xcrun: Option<PathBuf>,
    },
    /// Merge several result bundles into one
    Merge {
        /// Bundles to merge
        #[arg(required = true, num_args = 2..)]
        paths: Vec<PathBuf>,
        /// Merged bundle location
        #[arg(short, long)]
        output: PathBuf,
        /// Seconds to wait for xcrun
        #[arg(long, default_value = "120")]
        timeout: u64,
    },
}

#[derive(Serialize)]
struct PublishPlan {
    check_run: CheckRun,
    uploads: Vec<BundleUpload>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Report {
            paths,
            config,
            title,
            show_passed_tests,
            show_code_coverage,
            annotate_non_failures,
            upload_bundles,
            tests_json,
            coverage_json,
            sha,
            output,
            summary_file,
            workspace,
            timeout,
            xcrun,
        } => {
            let mut config = match config {
                Some(path) => ReportConfig::load(&path)?,
                None => ReportConfig::default(),
            };
            if let Some(title) = title {
                config.title = title;
            }
            if let Some(show) = show_passed_tests {
                config.show_passed_tests = show;
            }
            if let Some(show) = show_code_coverage {
                config.show_code_coverage = show;
            }
            config.annotate_non_failures |= annotate_non_failures;
            if let Some(policy) = upload_bundles {
                config.upload_bundles = policy;
            }
            if workspace.is_some() {
                config.workspace_root = workspace;
            }
            if let Some(timeout) = timeout {
                config.timeout_secs = timeout;
            }
            if let Some(xcrun) = xcrun {
                config.xcrun = xcrun;
            }
            config.check()?;

            let xcrun = Xcrun::new(config.reader_config());
            let options = config.render_options();

            let report = match tests_json {
                Some(tests) => {
                    let mut dump = JsonDump::new(tests);
                    if let Some(coverage) = coverage_json {
                        dump = dump.with_coverage(coverage);
                    }
                    let bundle = paths.first().cloned().unwrap_or_default();
                    generate(&dump, &bundle, &options).await?
                }
                None => {
                    let bundle =
                        resolve_bundle(&xcrun, &paths, &config.merged_bundle_path).await?;
                    generate(&xcrun, &bundle, &options).await?
                }
            };

            if let Some(path) = summary_file {
                append_summary(&path, &report.report_summary)?;
            }

            let check_run = prepare_check_run(&config.title, sha, &report, Utc::now());
            let uploads = plan_uploads(config.upload_bundles, report.test_status, &paths)?;
            let payload = serde_json::to_string_pretty(&PublishPlan { check_run, uploads })?;

            match output {
                Some(path) => std::fs::write(&path, payload)?,
                None => println!("{}", payload),
            }

            info!("Test status: {}", report.test_status);
        }
        Commands::Merge {
            paths,
            output,
            timeout,
        } => {
            let config = ReaderConfig::new()
                .with_timeout(std::time::Duration::from_secs(timeout));
            config
                .validate()
                .map_err(|message| ReportError::InvalidConfig { message })?;

            let merged = Xcrun::new(config).merge(&paths, &output).await?;
            println!("{}", merged.display());
        }
    }

    Ok(())
}

fn append_summary(path: &Path, summary: &str) -> std::io::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(file, "{}", summary)
}
