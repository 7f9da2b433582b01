//! Persisted model bundle
//!
//! One JSON document holding the frozen vectorizer state and the trained
//! forest, so the feature layout and the model can never drift apart.
//! Floats are written with exact round-trip precision: a reloaded bundle
//! reproduces bit-identical predictions.

use super::features::{FeatureVectorizer, VectorizerState};
use super::model::RandomForest;
use crate::error::{HdvaError, HdvaResult};
use crate::features::structural::{StructuralExtractor, DEFAULT_MAX_TREE_DEPTH};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Bumped whenever the serialized layout changes
pub const BUNDLE_FORMAT_VERSION: u32 = 1;

fn default_max_tree_depth() -> usize {
    DEFAULT_MAX_TREE_DEPTH
}

/// Vectorizer state and classifier, saved and loaded together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelBundle {
    pub format_version: u32,
    pub created_at: DateTime<Utc>,
    /// Traversal bound the structural features were extracted with
    #[serde(default = "default_max_tree_depth")]
    pub max_tree_depth: usize,
    pub vectorizer: VectorizerState,
    pub classifier: RandomForest,
}

impl ModelBundle {
    /// Package a fitted vectorizer with a forest trained on its layout
    pub fn new(vectorizer: &FeatureVectorizer, classifier: RandomForest) -> HdvaResult<Self> {
        let state = vectorizer.state()?.clone();
        let max_tree_depth = vectorizer.extractor().max_depth();
        if max_tree_depth == 0 {
            return Err(HdvaError::Config("max_tree_depth must be positive".into()));
        }
        if !classifier.is_trained() {
            return Err(HdvaError::ModelNotTrained);
        }
        if classifier.n_features() != state.feature_count() {
            return Err(HdvaError::LayoutMismatch {
                expected: state.feature_count(),
                actual: classifier.n_features(),
            });
        }
        Ok(Self {
            format_version: BUNDLE_FORMAT_VERSION,
            created_at: Utc::now(),
            max_tree_depth,
            vectorizer: state,
            classifier,
        })
    }

    /// Internal consistency of a deserialized bundle
    pub fn validate(&self) -> Result<(), String> {
        if self.format_version != BUNDLE_FORMAT_VERSION {
            return Err(format!(
                "unsupported format version {} (expected {})",
                self.format_version, BUNDLE_FORMAT_VERSION
            ));
        }
        if self.max_tree_depth == 0 {
            return Err("max_tree_depth must be positive".into());
        }
        self.vectorizer.validate()?;
        self.classifier.validate()?;
        let width = self.vectorizer.feature_count();
        if width != self.classifier.n_features() {
            return Err(format!(
                "vectorizer produces {} columns but classifier expects {}",
                width,
                self.classifier.n_features()
            ));
        }
        Ok(())
    }

    /// Width of the feature vectors this bundle consumes
    pub fn feature_count(&self) -> usize {
        self.vectorizer.feature_count()
    }

    /// Rebuild the fitted vectorizer and hand back the forest
    pub fn into_parts(self) -> (FeatureVectorizer, RandomForest) {
        let extractor = StructuralExtractor::new().with_max_depth(self.max_tree_depth);
        (
            FeatureVectorizer::from_state(self.vectorizer, extractor),
            self.classifier,
        )
    }

    pub fn to_bytes(&self) -> HdvaResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| HdvaError::ModelSave {
            path: PathBuf::from("<memory>"),
            source: e.into(),
        })
    }

    pub fn from_bytes(bytes: &[u8]) -> HdvaResult<Self> {
        Self::decode(bytes, Path::new("<memory>"))
    }

    /// Write the bundle to `path`.
    ///
    /// The JSON goes to a sibling temp file that is renamed over `path`, so
    /// a failed save leaves no partial bundle behind.
    pub fn save(&self, path: &Path) -> HdvaResult<()> {
        let save_err = |source: std::io::Error| HdvaError::ModelSave {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(save_err)?;
        }

        let tmp_path = temp_path(path);
        let written = (|| -> std::io::Result<()> {
            let mut writer = BufWriter::new(File::create(&tmp_path)?);
            serde_json::to_writer(&mut writer, self)?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
            Ok(())
        })();

        if let Err(e) = written.and_then(|_| fs::rename(&tmp_path, path)) {
            let _ = fs::remove_file(&tmp_path);
            return Err(save_err(e));
        }

        info!(
            "Model bundle saved to {} ({} features, {} trees)",
            path.display(),
            self.feature_count(),
            self.classifier.n_trees()
        );
        Ok(())
    }

    /// Read and validate a bundle. Every failure is a `ModelLoad` error.
    pub fn load(path: &Path) -> HdvaResult<Self> {
        let bytes = fs::read(path).map_err(|e| HdvaError::model_load(path, e))?;
        let bundle = Self::decode(&bytes, path)?;
        debug!(
            "Loaded model bundle {} (created {})",
            path.display(),
            bundle.created_at.to_rfc3339()
        );
        Ok(bundle)
    }

    fn decode(bytes: &[u8], origin: &Path) -> HdvaResult<Self> {
        let bundle: Self =
            serde_json::from_slice(bytes).map_err(|e| HdvaError::model_load(origin, e))?;
        bundle
            .validate()
            .map_err(|reason| HdvaError::model_load(origin, reason))?;
        Ok(bundle)
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "bundle".to_string());
    path.with_file_name(format!(".{name}.tmp"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::model::ForestConfig;
    use crate::models::Label;

    fn trained_parts() -> (FeatureVectorizer, RandomForest) {
        let codes = [
            "def compute_sum(nums):\n    return sum(nums)\n",
            "import math\n\ndef circle_area(r):\n    return math.pi * r * r\n",
            "def transform_data(df):\n    return df.whenify().transmute()\n",
            "def compute(x):\n    return vectorized_thingy(x)\n",
        ];
        let labels = [Label::Real, Label::Real, Label::Hallucinated, Label::Hallucinated];
        let mut vectorizer = FeatureVectorizer::default();
        let x = vectorizer.fit_transform(&codes).unwrap();
        let mut forest = RandomForest::new(ForestConfig {
            n_trees: 5,
            max_depth: 4,
            max_features: None,
            seed: 7,
        });
        forest.fit(&x, &labels).unwrap();
        (vectorizer, forest)
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models").join("hdva.json");
        let (vectorizer, forest) = trained_parts();
        let bundle = ModelBundle::new(&vectorizer, forest).unwrap();

        bundle.save(&path).unwrap();
        let loaded = ModelBundle::load(&path).unwrap();
        assert_eq!(bundle, loaded);

        // no temp file left behind
        let leftovers: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_bytes_roundtrip() {
        let (vectorizer, forest) = trained_parts();
        let bundle = ModelBundle::new(&vectorizer, forest).unwrap();
        let restored = ModelBundle::from_bytes(&bundle.to_bytes().unwrap()).unwrap();
        assert_eq!(bundle.vectorizer, restored.vectorizer);
        assert_eq!(bundle.classifier, restored.classifier);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ModelBundle::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, HdvaError::ModelLoad { .. }));
    }

    #[test]
    fn test_load_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, b"{\"format_version\": 1").unwrap();
        assert!(matches!(ModelBundle::load(&path), Err(HdvaError::ModelLoad { .. })));
    }

    #[test]
    fn test_layout_disagreement_rejected() {
        let (vectorizer, forest) = trained_parts();
        let mut bundle = ModelBundle::new(&vectorizer, forest).unwrap();
        bundle.vectorizer.numeric_feature_names.pop();
        let bytes = serde_json::to_vec(&bundle).unwrap();
        let err = ModelBundle::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, HdvaError::ModelLoad { .. }));
    }

    #[test]
    fn test_version_mismatch_rejected() {
        let (vectorizer, forest) = trained_parts();
        let mut bundle = ModelBundle::new(&vectorizer, forest).unwrap();
        bundle.format_version = BUNDLE_FORMAT_VERSION + 1;
        assert!(bundle.validate().unwrap_err().contains("format version"));
    }

    #[test]
    fn test_zero_depth_extractor_rejected() {
        let (_, forest) = trained_parts();
        let codes = ["x = 1\n", "y = foo()\n"];
        let mut vectorizer = FeatureVectorizer::default()
            .with_extractor(StructuralExtractor::new().with_max_depth(0));
        vectorizer.fit(&codes).unwrap();
        let err = ModelBundle::new(&vectorizer, forest).unwrap_err();
        assert!(matches!(err, HdvaError::Config(_)));
    }

    #[test]
    fn test_untrained_forest_rejected() {
        let (vectorizer, _) = trained_parts();
        let err = ModelBundle::new(&vectorizer, RandomForest::new(ForestConfig::default()))
            .unwrap_err();
        assert!(matches!(err, HdvaError::ModelNotTrained));
    }
}
