//! Inference handle
//!
//! A [`Detector`] is a loaded bundle ready to predict. It only offers `&self`
//! operations, so one instance can be shared across threads behind an `Arc`.

use crate::classifier::{FeatureVectorizer, ModelBundle, Prediction, RandomForest};
use crate::error::{HdvaError, HdvaResult};
use crate::features::{StructuralFeatures, SurfaceFeatures};
use crate::models::Label;
use serde::Serialize;
use std::path::Path;

/// What to analyze
#[derive(Debug, Clone, Copy)]
pub enum Source<'a> {
    Text(&'a str),
    Path(&'a Path),
}

impl Source<'_> {
    fn read(&self) -> HdvaResult<String> {
        match self {
            Source::Text(text) => Ok((*text).to_string()),
            Source::Path(path) => read_source(path),
        }
    }
}

/// Read a source file; invalid UTF-8 is replaced rather than rejected
pub fn read_source(path: &Path) -> HdvaResult<String> {
    let bytes = std::fs::read(path).map_err(|source| HdvaError::Input {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Verdict for one snippet, with the features it was based on
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub label: Label,
    /// Probability of HALLUCINATED
    pub probability: f64,
    pub structural_features: StructuralFeatures,
    pub surface_features: SurfaceFeatures,
}

/// Fitted vectorizer and trained forest
#[derive(Debug, Clone)]
pub struct Detector {
    vectorizer: FeatureVectorizer,
    forest: RandomForest,
}

impl Detector {
    pub fn from_bundle(bundle: ModelBundle) -> Self {
        let (vectorizer, forest) = bundle.into_parts();
        Self { vectorizer, forest }
    }

    /// Load and validate a bundle from disk
    pub fn load(path: &Path) -> HdvaResult<Self> {
        ModelBundle::load(path).map(Self::from_bundle)
    }

    pub fn feature_count(&self) -> usize {
        self.forest.n_features()
    }

    pub fn vectorizer(&self) -> &FeatureVectorizer {
        &self.vectorizer
    }

    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    /// Classify one snippet
    pub fn predict_one(&self, code: &str) -> HdvaResult<Prediction> {
        let row = self.vectorizer.transform_one(code)?;
        self.forest.predict_one(&row)
    }

    pub fn predict<S: AsRef<str> + Sync>(&self, texts: &[S]) -> HdvaResult<Vec<Label>> {
        let x = self.vectorizer.transform(texts)?;
        self.forest.predict(&x)
    }

    pub fn predict_proba<S: AsRef<str> + Sync>(&self, texts: &[S]) -> HdvaResult<Vec<f64>> {
        let x = self.vectorizer.transform(texts)?;
        self.forest.predict_proba(&x)
    }

    /// Prediction plus the structural and surface features of the input
    pub fn analyze(&self, source: Source<'_>) -> HdvaResult<Analysis> {
        let code = source.read()?;
        let (row, numeric) = self.vectorizer.transform_one_with_features(&code)?;
        let prediction = self.forest.predict_one(&row)?;
        Ok(Analysis {
            label: prediction.label,
            probability: prediction.probability,
            structural_features: numeric.structural.record(),
            surface_features: numeric.surface,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{synthesize, train, ForestConfig, TrainConfig};
    use crate::features::NumericFeatures;

    fn detector() -> Detector {
        let config = TrainConfig {
            forest: ForestConfig {
                n_trees: 15,
                max_depth: 8,
                max_features: None,
                seed: 42,
            },
            ..TrainConfig::default()
        };
        let outcome = train(&synthesize(40, 40, 42), &config).unwrap();
        Detector::from_bundle(outcome.bundle)
    }

    #[test]
    fn test_analyze_text() {
        let detector = detector();
        let analysis = detector
            .analyze(Source::Text("def compute(x):\n    return vectorized_thingy(x)\n"))
            .unwrap();
        assert_eq!(analysis.label, Label::Hallucinated);
        assert!(analysis.probability >= 0.5);
        assert!(analysis.structural_features.parsable);
        assert_eq!(analysis.structural_features.function_count, 1);
        assert_eq!(analysis.surface_features.line_count, 2);
    }

    #[test]
    fn test_analyze_path_matches_text() {
        let detector = detector();
        let code = "import math\n\ndef circle_area(r: float) -> float:\n    return math.pi * r * r\n";
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("area.py");
        std::fs::write(&path, code).unwrap();

        let from_path = detector.analyze(Source::Path(&path)).unwrap();
        let from_text = detector.analyze(Source::Text(code)).unwrap();
        assert_eq!(from_path, from_text);
        assert_eq!(from_text.label, Label::Real);
    }

    #[test]
    fn test_analysis_agrees_with_separate_extraction() {
        let detector = detector();
        let code = "def model_predict(data):\n    return oracle_predictor(data)\n";
        let analysis = detector.analyze(Source::Text(code)).unwrap();
        let numeric = NumericFeatures::extract(code, detector.vectorizer().extractor());
        assert_eq!(analysis.structural_features, numeric.structural.record());
        assert_eq!(analysis.surface_features, numeric.surface);
        assert_eq!(analysis.probability, detector.predict_one(code).unwrap().probability);
    }

    #[test]
    fn test_unreadable_path() {
        let detector = detector();
        let err = detector
            .analyze(Source::Path(Path::new("/nonexistent/file.py")))
            .unwrap_err();
        assert!(matches!(err, HdvaError::Input { .. }));
    }

    #[test]
    fn test_unparsable_snippet_still_classified() {
        let detector = detector();
        let analysis = detector.analyze(Source::Text("def foo(:\n")).unwrap();
        assert!(!analysis.structural_features.parsable);
        assert!((0.0..=1.0).contains(&analysis.probability));
    }

    #[test]
    fn test_batch_agrees_with_single() {
        let detector = detector();
        let texts = ["def f(a, b):\n    return a * b\n", "x = oracle_predictor(1)\n"];
        let probs = detector.predict_proba(&texts).unwrap();
        let labels = detector.predict(&texts).unwrap();
        for (i, text) in texts.iter().enumerate() {
            let single = detector.predict_one(text).unwrap();
            assert_eq!(single.probability, probs[i]);
            assert_eq!(single.label, labels[i]);
        }
    }
}
