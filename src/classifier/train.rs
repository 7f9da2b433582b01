//! Training pipeline
//!
//! Hold-out split, vectorizer fit on the training half, forest training,
//! evaluation on the test half, bundle packaging.

use super::bundle::ModelBundle;
use super::features::{FeatureVectorizer, VectorizerConfig};
use super::metrics::ClassificationReport;
use super::model::{ForestConfig, RandomForest};
use crate::error::{HdvaError, HdvaResult};
use crate::features::structural::{StructuralExtractor, DEFAULT_MAX_TREE_DEPTH};
use crate::models::{unzip_dataset, Dataset, LabeledExample};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::Path;

/// Training configuration
#[derive(Debug, Clone, PartialEq)]
pub struct TrainConfig {
    pub vectorizer: VectorizerConfig,
    pub forest: ForestConfig,
    /// Share of the corpus held out for evaluation, in (0, 1)
    pub test_fraction: f64,
    /// Seed for the hold-out shuffle
    pub split_seed: u64,
    pub max_tree_depth: usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            vectorizer: VectorizerConfig {
                max_vocabulary: 800,
                ..VectorizerConfig::default()
            },
            forest: ForestConfig::default(),
            test_fraction: 0.2,
            split_seed: 42,
            max_tree_depth: DEFAULT_MAX_TREE_DEPTH,
        }
    }
}

/// Training result
#[derive(Debug)]
pub struct TrainOutcome {
    pub bundle: ModelBundle,
    /// Evaluation on the held-out split
    pub report: ClassificationReport,
    pub train_size: usize,
    pub test_size: usize,
}

/// Deterministic shuffled split; the test half has `ceil(n * test_fraction)` rows
pub fn train_test_split(
    dataset: &[LabeledExample],
    test_fraction: f64,
    seed: u64,
) -> HdvaResult<(Dataset, Dataset)> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(HdvaError::Config(format!(
            "test_fraction must be in (0, 1), got {test_fraction}"
        )));
    }
    let n = dataset.len();
    let test_size = (n as f64 * test_fraction).ceil() as usize;
    if n < 2 || test_size >= n {
        return Err(HdvaError::Dataset(format!(
            "need at least 2 examples to split (got {n})"
        )));
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(&mut ChaCha8Rng::seed_from_u64(seed));

    let test = order[..test_size].iter().map(|&i| dataset[i].clone()).collect();
    let train = order[test_size..].iter().map(|&i| dataset[i].clone()).collect();
    Ok((train, test))
}

/// Train a bundle on `dataset` and evaluate it on a held-out split
pub fn train(dataset: &[LabeledExample], config: &TrainConfig) -> HdvaResult<TrainOutcome> {
    if dataset.is_empty() {
        return Err(HdvaError::Dataset("no labeled examples to train on".into()));
    }
    if config.max_tree_depth == 0 {
        return Err(HdvaError::Config("max_tree_depth must be positive".into()));
    }
    let (train_set, test_set) = train_test_split(dataset, config.test_fraction, config.split_seed)?;
    tracing::info!(
        "Training: {} examples, Test: {} examples",
        train_set.len(),
        test_set.len()
    );

    let (train_codes, train_labels) = unzip_dataset(&train_set);
    let (test_codes, test_labels) = unzip_dataset(&test_set);

    let mut vectorizer = FeatureVectorizer::new(config.vectorizer)
        .with_extractor(StructuralExtractor::new().with_max_depth(config.max_tree_depth));
    let x_train = vectorizer.fit_transform(&train_codes)?;

    let mut forest = RandomForest::new(config.forest);
    forest.fit(&x_train, &train_labels)?;

    let x_test = vectorizer.transform(&test_codes)?;
    let predicted = forest.predict(&x_test)?;
    let report = ClassificationReport::new(&test_labels, &predicted);
    tracing::info!("Hold-out accuracy: {:.4}", report.accuracy);

    Ok(TrainOutcome {
        bundle: ModelBundle::new(&vectorizer, forest)?,
        report,
        train_size: train_set.len(),
        test_size: test_set.len(),
    })
}

/// Train and persist. Nothing is written unless training succeeds.
pub fn train_and_save(
    dataset: &[LabeledExample],
    config: &TrainConfig,
    path: &Path,
) -> HdvaResult<TrainOutcome> {
    let outcome = train(dataset, config)?;
    outcome.bundle.save(path)?;
    Ok(outcome)
}
