//! Analyze and features commands - single-file inspection

use super::load_detector;
use anyhow::{Context, Result};
use console::style;
use hdva::config::HdvaConfig;
use hdva::detector::{read_source, Analysis, Source};
use hdva::features::{NumericFeatures, StructuralExtractor};
use hdva::models::Label;
use serde::Serialize;
use std::path::Path;

/// Characters of source echoed before the verdict
const EXCERPT_CHARS: usize = 300;

#[derive(Serialize)]
struct FileAnalysis<'a> {
    file: String,
    #[serde(flatten)]
    analysis: &'a Analysis,
}

pub fn run(config: &HdvaConfig, file: &Path, model: Option<&Path>, format: &str) -> Result<()> {
    let detector = load_detector(config, model)?;
    let code = read_source(file)?;
    let analysis = detector
        .analyze(Source::Text(&code))
        .with_context(|| format!("Failed to analyze {}", file.display()))?;

    if format == "json" {
        let out = FileAnalysis {
            file: file.display().to_string(),
            analysis: &analysis,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("\n{} {}", style("Analyzing file:").bold(), file.display());
    println!("{}", style("=".repeat(60)).dim());
    println!("{}", excerpt(&code));

    print_features(&NumericFeatures::from_records(
        analysis.structural_features,
        analysis.surface_features,
    ));

    let verdict = match analysis.label {
        Label::Hallucinated => style(analysis.label.as_str()).red().bold(),
        Label::Real => style(analysis.label.as_str()).green().bold(),
    };
    println!(
        "\n{} {} (P={:.3})",
        style("Prediction:").bold(),
        verdict,
        analysis.probability
    );
    Ok(())
}

pub fn features(config: &HdvaConfig, file: &Path, format: &str) -> Result<()> {
    let code = read_source(file)?;
    let extractor = StructuralExtractor::new().with_max_depth(config.max_tree_depth());
    let numeric = NumericFeatures::extract(&code, &extractor);

    if format == "json" {
        #[derive(Serialize)]
        struct FeatureRecord {
            file: String,
            structural_features: hdva::features::StructuralFeatures,
            surface_features: hdva::features::SurfaceFeatures,
        }
        let record = FeatureRecord {
            file: file.display().to_string(),
            structural_features: numeric.structural.record(),
            surface_features: numeric.surface,
        };
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    println!("\n{} {}", style("Features of").bold(), file.display());
    print_features(&numeric);
    Ok(())
}

fn print_features(numeric: &NumericFeatures) {
    println!("\n{}", style("Extracted Features:").bold());
    if !numeric.structural.is_parsable() {
        println!("  {}", style("(source did not parse)").yellow());
    }
    for (name, value) in numeric.to_map() {
        println!("  {:<20} {}", name, format_value(value));
    }
    if numeric.structural.record().truncated {
        println!("  {}", style("(syntax tree deeper than the traversal bound)").yellow());
    }
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value:.3}")
    }
}

fn excerpt(code: &str) -> String {
    let mut out: String = code.chars().take(EXCERPT_CHARS).collect();
    if code.chars().count() > EXCERPT_CHARS {
        out.push_str("...");
    }
    out
}
