//! CLI command definitions and handlers

mod analyze;
mod init;
mod scan;
mod synth;
mod train;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hdva::config::HdvaConfig;
use hdva::detector::Detector;
use std::path::{Path, PathBuf};

/// hdva - Hallucination Detection & Validation for Python code
///
/// Flags snippets that call fabricated APIs, undefined symbols or
/// nonsensical method chains.
#[derive(Parser, Debug)]
#[command(name = "hdva")]
#[command(
    version,
    about = "Classify Python code as REAL or HALLUCINATED",
    after_help = "\
Examples:
  hdva train                              Train on a synthetic corpus
  hdva train --data corpus.jsonl          Train on labeled data
  hdva analyze snippet.py                 Classify one file
  hdva scan . --format json               Scan a repository
  hdva features snippet.py                Show extracted features"
)]
pub struct Cli {
    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(
        long,
        global = true,
        default_value = "info",
        value_parser = ["error", "warn", "info", "debug", "trace"]
    )]
    pub log_level: String,

    /// Config file (overrides ./hdva.toml and the user config)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write an example hdva.toml in the current directory
    Init {
        /// Write the user-level config instead (~/.config/hdva/config.toml)
        #[arg(long)]
        user: bool,
    },

    /// Train a model bundle and report hold-out accuracy
    #[command(after_help = "\
Examples:
  hdva train                                  500 + 500 synthetic snippets
  hdva train --n-real 200 --n-hall 200        Smaller synthetic corpus
  hdva train --data corpus.jsonl -o model.json")]
    Train {
        /// Labeled JSONL corpus ({\"code\": ..., \"label\": \"REAL\"|\"HALLUCINATED\"})
        #[arg(long)]
        data: Option<PathBuf>,

        /// Where to save the bundle (default: configured model path)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Synthetic REAL snippets when no --data is given
        #[arg(long)]
        n_real: Option<usize>,

        /// Synthetic HALLUCINATED snippets when no --data is given
        #[arg(long)]
        n_hall: Option<usize>,

        /// Number of trees
        #[arg(long)]
        trees: Option<usize>,

        /// Maximum tree depth
        #[arg(long)]
        max_depth: Option<usize>,

        /// Seed for sampling, splitting and training
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Classify a single Python file
    Analyze {
        /// File to analyze
        file: PathBuf,

        /// Model bundle (default: configured model path)
        #[arg(long, short = 'm')]
        model: Option<PathBuf>,

        /// Output format: text, json
        #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },

    /// Classify every Python file under a directory
    Scan {
        /// Repository root
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Model bundle (default: configured model path)
        #[arg(long, short = 'm')]
        model: Option<PathBuf>,

        /// Output format: text, json
        #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },

    /// Print structural and surface features of a file (no model needed)
    Features {
        /// File to inspect
        file: PathBuf,

        /// Output format: text, json
        #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },

    /// Write a synthetic labeled corpus as JSONL
    Synth {
        /// Output file
        #[arg(long, short = 'o')]
        output: PathBuf,

        #[arg(long)]
        n_real: Option<usize>,

        #[arg(long)]
        n_hall: Option<usize>,

        #[arg(long)]
        seed: Option<u64>,
    },
}

pub fn run(cli: Cli) -> Result<()> {
    let config = HdvaConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Init { user } => init::run(Path::new("."), user),

        Commands::Train {
            data,
            output,
            n_real,
            n_hall,
            trees,
            max_depth,
            seed,
        } => train::run(
            &config,
            train::TrainArgs {
                data,
                output,
                n_real,
                n_hall,
                trees,
                max_depth,
                seed,
            },
        ),

        Commands::Analyze {
            file,
            model,
            format,
        } => analyze::run(&config, &file, model.as_deref(), &format),

        Commands::Scan {
            path,
            model,
            format,
        } => scan::run(&config, &path, model.as_deref(), &format),

        Commands::Features { file, format } => analyze::features(&config, &file, &format),

        Commands::Synth {
            output,
            n_real,
            n_hall,
            seed,
        } => synth::run(&config, &output, n_real, n_hall, seed),
    }
}

/// Load the detector, pointing at `hdva train` when no bundle exists
fn load_detector(config: &HdvaConfig, model: Option<&Path>) -> Result<Detector> {
    let path = model
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.model_path());
    if !path.exists() {
        anyhow::bail!(
            "Model not found at {}. Run `hdva train` first.",
            path.display()
        );
    }
    Detector::load(&path).with_context(|| format!("Failed to load model {}", path.display()))
}
