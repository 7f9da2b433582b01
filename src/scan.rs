//! Repository scan
//!
//! Walks a directory tree for Python files (honouring `.gitignore` and
//! `.ignore`), classifies every file in parallel and reports the ones that
//! look hallucinated. A file or directory that cannot be read is recorded
//! as a failure; the scan carries on.

use crate::detector::{read_source, Detector};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Agent name reported in every scan
pub const AGENT_NAME: &str = "HDVA";

/// Probability at or above which an issue is `High`
pub const HIGH_SEVERITY_THRESHOLD: f64 = 0.8;

const PYTHON_EXTENSIONS: &[&str] = &["py"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    High,
    Medium,
}

impl Severity {
    pub fn from_probability(probability: f64) -> Self {
        if probability >= HIGH_SEVERITY_THRESHOLD {
            Severity::High
        } else {
            Severity::Medium
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::High => write!(f, "High"),
            Severity::Medium => write!(f, "Medium"),
        }
    }
}

/// A file classified as HALLUCINATED
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanIssue {
    pub file: String,
    pub issue: String,
    pub severity: Severity,
    pub probability: f64,
}

/// A file that could not be analyzed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanFailure {
    pub file: String,
    pub error: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub files_scanned: usize,
    pub files_flagged: usize,
    pub files_failed: usize,
    pub high: usize,
    pub medium: usize,
}

/// Output of [`scan_repository`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub agent: String,
    pub issues: Vec<ScanIssue>,
    pub failures: Vec<ScanFailure>,
    pub summary: ScanSummary,
}

impl ScanReport {
    /// Add failures found outside per-file analysis (directory walk errors)
    pub fn record_failures(&mut self, failures: Vec<ScanFailure>) {
        self.summary.files_failed += failures.len();
        self.failures.extend(failures);
    }
}

/// Result of walking a directory for Python files
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PythonFiles {
    /// Sorted
    pub files: Vec<PathBuf>,
    /// Entries the walker could not read
    pub walk_failures: Vec<ScanFailure>,
}

/// Python files under `root`, plus whatever the walk could not enter
pub fn collect_python_files(root: &Path) -> PythonFiles {
    let walker = ignore::WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(true)
        .require_git(false)
        .build();

    let mut listing = PythonFiles::default();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Walk error under {}: {}", root.display(), e);
                listing.walk_failures.push(walk_failure(root, &e));
                continue;
            }
        };
        let is_python = entry.file_type().is_some_and(|ft| ft.is_file())
            && entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| PYTHON_EXTENSIONS.contains(&ext));
        if is_python {
            listing.files.push(entry.into_path());
        }
    }
    listing.files.sort();
    listing
}

/// Path carried by a walker error, if any
fn error_path(err: &ignore::Error) -> Option<&Path> {
    match err {
        ignore::Error::WithPath { path, .. } => Some(path),
        ignore::Error::Loop { child, .. } => Some(child),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => {
            error_path(err)
        }
        ignore::Error::Partial(errs) => errs.iter().find_map(error_path),
        _ => None,
    }
}

fn walk_failure(root: &Path, err: &ignore::Error) -> ScanFailure {
    ScanFailure {
        file: error_path(err).map_or_else(|| ".".to_string(), |p| display_path(root, p)),
        error: err.to_string(),
    }
}

fn display_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

enum FileResult {
    Clean,
    Flagged(ScanIssue),
    Failed(ScanFailure),
}

/// Classify every Python file under `root`
pub fn scan_repository(detector: &Detector, root: &Path) -> ScanReport {
    let listing = collect_python_files(root);
    let mut report = scan_files(detector, root, &listing.files);
    report.record_failures(listing.walk_failures);
    report
}

/// Classify `files`, reporting paths relative to `root`
pub fn scan_files(detector: &Detector, root: &Path, files: &[PathBuf]) -> ScanReport {
    tracing::info!("Scanning {} Python files under {}", files.len(), root.display());

    let results: Vec<FileResult> = files
        .par_iter()
        .map(|path| {
            let file = display_path(root, path);
            let outcome = read_source(path).and_then(|code| detector.predict_one(&code));
            match outcome {
                Ok(prediction) if prediction.label.is_hallucinated() => {
                    FileResult::Flagged(ScanIssue {
                        file,
                        issue: "File appears hallucinated".to_string(),
                        severity: Severity::from_probability(prediction.probability),
                        probability: prediction.probability,
                    })
                }
                Ok(_) => FileResult::Clean,
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", path.display(), e);
                    FileResult::Failed(ScanFailure {
                        file,
                        error: e.to_string(),
                    })
                }
            }
        })
        .collect();

    let mut issues = Vec::new();
    let mut failures = Vec::new();
    for result in results {
        match result {
            FileResult::Clean => {}
            FileResult::Flagged(issue) => issues.push(issue),
            FileResult::Failed(failure) => failures.push(failure),
        }
    }

    let high = issues.iter().filter(|i| i.severity == Severity::High).count();
    let summary = ScanSummary {
        files_scanned: files.len(),
        files_flagged: issues.len(),
        files_failed: failures.len(),
        high,
        medium: issues.len() - high,
    };

    ScanReport {
        agent: AGENT_NAME.to_string(),
        issues,
        failures,
        summary,
    }
}
