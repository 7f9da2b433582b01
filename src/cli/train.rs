//! Train command

use anyhow::{Context, Result};
use console::style;
use hdva::classifier::{self, DatasetStats};
use hdva::config::HdvaConfig;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;

pub struct TrainArgs {
    pub data: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub n_real: Option<usize>,
    pub n_hall: Option<usize>,
    pub trees: Option<usize>,
    pub max_depth: Option<usize>,
    pub seed: Option<u64>,
}

pub fn run(config: &HdvaConfig, args: TrainArgs) -> Result<()> {
    let mut train_config = config.train_config();
    if let Some(trees) = args.trees {
        train_config.forest.n_trees = trees;
    }
    if let Some(depth) = args.max_depth {
        train_config.forest.max_depth = depth;
    }
    if let Some(seed) = args.seed {
        train_config.forest.seed = seed;
        train_config.split_seed = seed;
    }
    if train_config.forest.n_trees == 0 || train_config.forest.max_depth == 0 {
        anyhow::bail!("--trees and --max-depth must be at least 1");
    }

    let dataset = match &args.data {
        Some(path) => classifier::load_jsonl(path)
            .with_context(|| format!("Failed to load training data from {}", path.display()))?,
        None => {
            let n_real = args.n_real.unwrap_or_else(|| config.n_real());
            let n_hall = args.n_hall.unwrap_or_else(|| config.n_hall());
            println!(
                "{} Generating synthetic dataset ({} REAL, {} HALLUCINATED)",
                style("›").cyan(),
                n_real,
                n_hall
            );
            classifier::synthesize(n_real, n_hall, args.seed.unwrap_or_else(|| config.seed()))
        }
    };
    println!("{} {}", style("›").cyan(), DatasetStats::of(&dataset));

    let output = args.output.unwrap_or_else(|| config.model_path());

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(create_spinner_style());
    spinner.set_message(format!(
        "Training {} trees (max depth {})...",
        train_config.forest.n_trees, train_config.forest.max_depth
    ));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let result = classifier::train_and_save(&dataset, &train_config, &output);
    spinner.finish_and_clear();
    let outcome = result.context("Training failed")?;

    println!(
        "\n{} ({} train / {} test)\n",
        style("Hold-out evaluation").bold(),
        outcome.train_size,
        outcome.test_size
    );
    println!("{}", outcome.report);
    println!(
        "{} Model saved to {}",
        style("✓").green(),
        style(output.display()).cyan()
    );
    Ok(())
}

fn create_spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        .template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}
