//! Random forest classifier
//!
//! Bagged CART trees: each tree sees a bootstrap resample of the rows and a
//! random feature subset at every split. The label is the majority vote and
//! the probability is the fraction of trees voting HALLUCINATED.
//!
//! Tree `i` draws from a ChaCha8 stream seeded with `seed + i`, so a forest
//! is reproducible regardless of how rayon schedules the trees.

use super::features::FeatureVector;
use super::tree::{DecisionTree, TreeParams};
use crate::error::{HdvaError, HdvaResult};
use crate::models::Label;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Prediction result
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    /// Majority vote
    pub label: Label,
    /// Fraction of trees voting HALLUCINATED
    pub probability: f64,
}

impl Prediction {
    fn from_votes(hallucinated_votes: usize, n_trees: usize) -> Self {
        let probability = hallucinated_votes as f64 / n_trees as f64;
        Self {
            label: if probability >= 0.5 {
                Label::Hallucinated
            } else {
                Label::Real
            },
            probability,
        }
    }
}

/// Forest hyperparameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForestConfig {
    pub n_trees: usize,
    pub max_depth: usize,
    /// Features evaluated per split; `None` means `sqrt(n_features)`
    pub max_features: Option<usize>,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 200,
            max_depth: 16,
            max_features: None,
            seed: 42,
        }
    }
}

/// Ensemble of decision trees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    config: ForestConfig,
    /// Width of the rows the forest was trained on
    n_features: usize,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    /// An untrained forest
    pub fn new(config: ForestConfig) -> Self {
        Self {
            config,
            n_features: 0,
            trees: Vec::new(),
        }
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn is_trained(&self) -> bool {
        !self.trees.is_empty()
    }

    /// Train on rows `x` with labels `y`.
    ///
    /// Fails on empty or ragged input, mismatched lengths and single-class
    /// labels. On failure the forest is left untouched.
    pub fn fit(&mut self, x: &[FeatureVector], y: &[Label]) -> HdvaResult<()> {
        if x.is_empty() {
            return Err(HdvaError::Training("no training samples provided".into()));
        }
        if x.len() != y.len() {
            return Err(HdvaError::Training(format!(
                "sample count ({}) does not match label count ({})",
                x.len(),
                y.len()
            )));
        }
        let n_features = x[0].len();
        if n_features == 0 {
            return Err(HdvaError::Training("feature vectors are empty".into()));
        }
        if let Some(pos) = x.iter().position(|row| row.len() != n_features) {
            return Err(HdvaError::Training(format!(
                "row {} has {} features, expected {}",
                pos,
                x[pos].len(),
                n_features
            )));
        }
        if x.iter().any(|row| row.values.iter().any(|v| !v.is_finite())) {
            return Err(HdvaError::Training("feature matrix contains non-finite values".into()));
        }
        if self.config.n_trees == 0 {
            return Err(HdvaError::Training("forest needs at least one tree".into()));
        }

        let labels: Vec<usize> = y.iter().map(|l| l.index()).collect();
        let positives = labels.iter().filter(|&&c| c == 1).count();
        if positives == 0 || positives == labels.len() {
            return Err(HdvaError::Training(format!(
                "training labels contain a single class ({} samples, {} HALLUCINATED)",
                labels.len(),
                positives
            )));
        }

        let rows: Vec<Vec<f64>> = x.iter().map(|fv| fv.values.clone()).collect();
        let params = TreeParams {
            max_depth: self.config.max_depth,
            max_features: self
                .config
                .max_features
                .unwrap_or_else(|| (n_features as f64).sqrt().round() as usize)
                .clamp(1, n_features),
            min_samples_split: 2,
            min_samples_leaf: 1,
        };
        let n_samples = rows.len();
        let seed = self.config.seed;

        tracing::info!(
            "Training random forest: {} trees, max_depth={}, max_features={}, {} samples x {} features",
            self.config.n_trees,
            params.max_depth,
            params.max_features,
            n_samples,
            n_features
        );

        let trees: Vec<DecisionTree> = (0..self.config.n_trees)
            .into_par_iter()
            .map(|i| {
                let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(i as u64));
                let bootstrap: Vec<usize> =
                    (0..n_samples).map(|_| rng.random_range(0..n_samples)).collect();
                DecisionTree::fit(&rows, &labels, bootstrap, &params, &mut rng)
            })
            .collect();

        self.trees = trees;
        self.n_features = n_features;
        Ok(())
    }

    /// Vote for one row
    pub fn predict_one(&self, row: &FeatureVector) -> HdvaResult<Prediction> {
        self.check_ready(row)?;
        let votes = self.trees.iter().filter(|t| t.predict(&row.values) == 1).count();
        Ok(Prediction::from_votes(votes, self.trees.len()))
    }

    /// Predictions for a batch of rows
    pub fn predict_batch(&self, x: &[FeatureVector]) -> HdvaResult<Vec<Prediction>> {
        x.iter().map(|row| self.predict_one(row)).collect()
    }

    /// Discrete labels
    pub fn predict(&self, x: &[FeatureVector]) -> HdvaResult<Vec<Label>> {
        Ok(self.predict_batch(x)?.into_iter().map(|p| p.label).collect())
    }

    /// Probability of HALLUCINATED per row
    pub fn predict_proba(&self, x: &[FeatureVector]) -> HdvaResult<Vec<f64>> {
        Ok(self
            .predict_batch(x)?
            .into_iter()
            .map(|p| p.probability)
            .collect())
    }

    fn check_ready(&self, row: &FeatureVector) -> HdvaResult<()> {
        if self.trees.is_empty() {
            return Err(HdvaError::ModelNotTrained);
        }
        if row.len() != self.n_features {
            return Err(HdvaError::LayoutMismatch {
                expected: self.n_features,
                actual: row.len(),
            });
        }
        Ok(())
    }

    /// Structural checks used when loading persisted state
    pub fn validate(&self) -> Result<(), String> {
        if self.trees.is_empty() {
            return Err("forest has no trees".into());
        }
        if self.trees.len() != self.config.n_trees {
            return Err(format!(
                "forest declares {} trees but stores {}",
                self.config.n_trees,
                self.trees.len()
            ));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features)
                .map_err(|e| format!("tree {i}: {e}"))?;
            if tree.depth() > self.config.max_depth {
                return Err(format!(
                    "tree {i} is deeper ({}) than the depth limit {}",
                    tree.depth(),
                    self.config.max_depth
                ));
            }
        }
        Ok(())
    }
}
