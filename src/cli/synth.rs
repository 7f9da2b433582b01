//! Synth command - write a synthetic labeled corpus

use anyhow::{Context, Result};
use console::style;
use hdva::classifier::{save_jsonl, synthesize, DatasetStats};
use hdva::config::HdvaConfig;
use std::path::Path;

pub fn run(
    config: &HdvaConfig,
    output: &Path,
    n_real: Option<usize>,
    n_hall: Option<usize>,
    seed: Option<u64>,
) -> Result<()> {
    let dataset = synthesize(
        n_real.unwrap_or_else(|| config.n_real()),
        n_hall.unwrap_or_else(|| config.n_hall()),
        seed.unwrap_or_else(|| config.seed()),
    );
    save_jsonl(output, &dataset)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!(
        "{} Wrote {} to {}",
        style("✓").green(),
        DatasetStats::of(&dataset),
        style(output.display()).cyan()
    );
    Ok(())
}
