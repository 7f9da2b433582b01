//! Layered configuration for hdva
//!
//! Supports loading config from:
//! - Environment variables (`HDVA_MODEL_PATH`, `HDVA_SEED`)
//! - An explicit `--config` file
//! - `./hdva.toml`
//! - ~/.config/hdva/config.toml
//!
//! Every field is optional in the files; accessors fall back to defaults.

use crate::classifier::{ForestConfig, NumericNameScope, TrainConfig, VectorizerConfig};
use crate::error::{HdvaError, HdvaResult};
use crate::features::structural::DEFAULT_MAX_TREE_DEPTH;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Project-local config file name
pub const LOCAL_CONFIG_FILE: &str = "hdva.toml";

/// Bundle path used when nothing else is configured
pub const DEFAULT_MODEL_PATH: &str = "hdva_model.json";

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct HdvaConfig {
    #[serde(default)]
    pub model: ModelSection,
    #[serde(default)]
    pub vectorizer: VectorizerSection,
    #[serde(default)]
    pub forest: ForestSection,
    #[serde(default)]
    pub training: TrainingSection,
    #[serde(default)]
    pub synthetic: SyntheticSection,
    #[serde(default)]
    pub extractor: ExtractorSection,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ModelSection {
    /// Where bundles are saved and loaded
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct VectorizerSection {
    pub max_vocabulary: Option<usize>,
    /// `"full"` or `{ prefix = n }`
    pub numeric_scope: Option<NumericNameScope>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ForestSection {
    pub n_trees: Option<usize>,
    pub max_depth: Option<usize>,
    pub max_features: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TrainingSection {
    pub test_fraction: Option<f64>,
    /// Seeds the hold-out split, the forest and the synthetic corpus
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SyntheticSection {
    pub n_real: Option<usize>,
    pub n_hall: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ExtractorSection {
    pub max_tree_depth: Option<usize>,
}

impl HdvaConfig {
    /// Load config from all sources, with priority:
    /// 1. Environment variables (highest)
    /// 2. `explicit` file, if given (must exist)
    /// 3. `./hdva.toml`
    /// 4. User config (~/.config/hdva/config.toml)
    pub fn load(explicit: Option<&Path>) -> HdvaResult<Self> {
        let mut config = HdvaConfig::default();

        if let Some(user) = Self::user_config_path().filter(|p| p.exists()) {
            config.merge(Self::from_file(&user)?);
        }

        let local = Path::new(LOCAL_CONFIG_FILE);
        if local.exists() {
            config.merge(Self::from_file(local)?);
        }

        if let Some(path) = explicit {
            config.merge(Self::from_file(path)?);
        }

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse one TOML file
    pub fn from_file(path: &Path) -> HdvaResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| HdvaError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_toml(&content)
            .map_err(|e| HdvaError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Get the user config file path
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("hdva").join("config.toml"))
    }

    /// Environment overrides; `lookup` is `std::env::var` outside tests
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> HdvaResult<()> {
        if let Some(path) = lookup("HDVA_MODEL_PATH").filter(|p| !p.is_empty()) {
            self.model.path = Some(PathBuf::from(path));
        }
        if let Some(seed) = lookup("HDVA_SEED").filter(|s| !s.is_empty()) {
            let seed = seed
                .trim()
                .parse::<u64>()
                .map_err(|e| HdvaError::Config(format!("HDVA_SEED='{seed}': {e}")))?;
            self.training.seed = Some(seed);
        }
        Ok(())
    }

    /// Merge another config into this one (other takes priority)
    fn merge(&mut self, other: HdvaConfig) {
        fn take<T>(slot: &mut Option<T>, other: Option<T>) {
            if other.is_some() {
                *slot = other;
            }
        }
        take(&mut self.model.path, other.model.path);
        take(&mut self.vectorizer.max_vocabulary, other.vectorizer.max_vocabulary);
        take(&mut self.vectorizer.numeric_scope, other.vectorizer.numeric_scope);
        take(&mut self.forest.n_trees, other.forest.n_trees);
        take(&mut self.forest.max_depth, other.forest.max_depth);
        take(&mut self.forest.max_features, other.forest.max_features);
        take(&mut self.training.test_fraction, other.training.test_fraction);
        take(&mut self.training.seed, other.training.seed);
        take(&mut self.synthetic.n_real, other.synthetic.n_real);
        take(&mut self.synthetic.n_hall, other.synthetic.n_hall);
        take(&mut self.extractor.max_tree_depth, other.extractor.max_tree_depth);
    }

    /// Reject values no component can work with
    pub fn validate(&self) -> HdvaResult<()> {
        let positive = [
            ("vectorizer.max_vocabulary", self.vectorizer.max_vocabulary),
            ("forest.n_trees", self.forest.n_trees),
            ("forest.max_depth", self.forest.max_depth),
            ("forest.max_features", self.forest.max_features),
            ("extractor.max_tree_depth", self.extractor.max_tree_depth),
        ];
        for (name, value) in positive {
            if value == Some(0) {
                return Err(HdvaError::Config(format!("{name} must be greater than 0")));
            }
        }
        if self.vectorizer.numeric_scope == Some(NumericNameScope::Prefix(0)) {
            return Err(HdvaError::Config(
                "vectorizer.numeric_scope prefix must be greater than 0".into(),
            ));
        }
        let fraction = self.test_fraction();
        if !(fraction > 0.0 && fraction < 1.0) {
            return Err(HdvaError::Config(format!(
                "training.test_fraction must be in (0, 1), got {fraction}"
            )));
        }
        Ok(())
    }

    pub fn model_path(&self) -> PathBuf {
        self.model
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH))
    }

    pub fn seed(&self) -> u64 {
        self.training.seed.unwrap_or(42)
    }

    pub fn test_fraction(&self) -> f64 {
        self.training.test_fraction.unwrap_or(0.2)
    }

    pub fn n_real(&self) -> usize {
        self.synthetic.n_real.unwrap_or(500)
    }

    pub fn n_hall(&self) -> usize {
        self.synthetic.n_hall.unwrap_or(500)
    }

    pub fn max_tree_depth(&self) -> usize {
        self.extractor.max_tree_depth.unwrap_or(DEFAULT_MAX_TREE_DEPTH)
    }

    /// Resolved training settings
    pub fn train_config(&self) -> TrainConfig {
        let defaults = TrainConfig::default();
        let forest_defaults = ForestConfig::default();
        TrainConfig {
            vectorizer: VectorizerConfig {
                max_vocabulary: self
                    .vectorizer
                    .max_vocabulary
                    .unwrap_or(defaults.vectorizer.max_vocabulary),
                numeric_scope: self.vectorizer.numeric_scope.unwrap_or_default(),
            },
            forest: ForestConfig {
                n_trees: self.forest.n_trees.unwrap_or(forest_defaults.n_trees),
                max_depth: self.forest.max_depth.unwrap_or(forest_defaults.max_depth),
                max_features: self.forest.max_features,
                seed: self.seed(),
            },
            test_fraction: self.test_fraction(),
            split_seed: self.seed(),
            max_tree_depth: self.max_tree_depth(),
        }
    }

    /// Initialize the user config directory and write a commented example
    pub fn init_user_config() -> HdvaResult<PathBuf> {
        let config_path = Self::user_config_path()
            .ok_or_else(|| HdvaError::Config("could not determine config directory".into()))?;

        if !config_path.exists() {
            let write = || -> std::io::Result<()> {
                if let Some(parent) = config_path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(&config_path, EXAMPLE_CONFIG)
            };
            write().map_err(|e| {
                HdvaError::Config(format!("cannot write {}: {}", config_path.display(), e))
            })?;
        }

        Ok(config_path)
    }
}

pub const EXAMPLE_CONFIG: &str = r#"# hdva configuration

[model]
# path = "hdva_model.json"

[vectorizer]
# max_vocabulary = 800
# "full" uses every training document to fix the numeric feature names;
# { prefix = 10 } only looks at the first ten.
# numeric_scope = "full"

[forest]
# n_trees = 200
# max_depth = 16
# max_features = 28

[training]
# test_fraction = 0.2
# seed = 42

[synthetic]
# n_real = 500
# n_hall = 500

[extractor]
# max_tree_depth = 1000
"#;
