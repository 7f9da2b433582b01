//! Scan command - classify a whole repository

use super::load_detector;
use anyhow::{Context, Result};
use console::style;
use hdva::config::HdvaConfig;
use hdva::scan::{collect_python_files, scan_files, ScanReport, Severity};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

pub fn run(config: &HdvaConfig, path: &Path, model: Option<&Path>, format: &str) -> Result<()> {
    let root = path
        .canonicalize()
        .with_context(|| format!("Path does not exist: {}", path.display()))?;
    if !root.is_dir() {
        anyhow::bail!("Path is not a directory: {}", root.display());
    }

    let detector = load_detector(config, model)?;
    let listing = collect_python_files(&root);
    let files = &listing.files;

    let mut report = if format == "json" {
        scan_files(&detector, &root, files)
    } else {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message(format!("Scanning {} Python files...", files.len()));
        spinner.enable_steady_tick(Duration::from_millis(100));
        let report = scan_files(&detector, &root, files);
        spinner.finish_and_clear();
        report
    };
    report.record_failures(listing.walk_failures);

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&root, &report);
    }
    Ok(())
}

fn print_report(root: &Path, report: &ScanReport) {
    println!("\n{} {}", style("HDVA scan of").bold(), root.display());
    println!("{}", style("──────────────────────────────────────").dim());

    let summary = &report.summary;
    println!(
        "  {} files scanned, {} flagged ({} high, {} medium), {} failed",
        summary.files_scanned,
        summary.files_flagged,
        summary.high,
        summary.medium,
        summary.files_failed
    );

    if !report.issues.is_empty() {
        println!("\n{}", style("ISSUES").bold());
        for issue in &report.issues {
            let severity = match issue.severity {
                Severity::High => style(issue.severity.to_string()).red().bold(),
                Severity::Medium => style(issue.severity.to_string()).yellow(),
            };
            println!(
                "  {:<8} {:.3}  {}  {}",
                severity,
                issue.probability,
                style(&issue.file).cyan(),
                issue.issue
            );
        }
    }

    if !report.failures.is_empty() {
        println!("\n{}", style("FAILURES").bold());
        for failure in &report.failures {
            println!("  {}  {}", style(&failure.file).cyan(), failure.error);
        }
    }

    if report.issues.is_empty() && report.failures.is_empty() {
        println!("\n{} No hallucinated files found", style("✓").green());
    }
}
