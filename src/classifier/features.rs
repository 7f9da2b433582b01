//! Feature vectorization for snippet classification
//!
//! Combines a TF-IDF term vector over identifier tokens with the structural
//! and surface features of each snippet. Both halves of the layout are
//! frozen by [`FeatureVectorizer::fit`]:
//!
//! ```text
//! [ tfidf(vocabulary) ... | numeric(numeric_feature_names) ... ]
//! ```
//!
//! Numeric names missing from a snippet read as 0; names the snippet reports
//! outside the frozen list are dropped.

use super::tfidf::TfidfModel;
use crate::error::{HdvaError, HdvaResult};
use crate::features::{pseudo_document, tokenize, NumericFeatures, StructuralExtractor};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Default vocabulary cap
pub const DEFAULT_MAX_VOCABULARY: usize = 1000;

/// Prefix size used by the legacy numeric-name sampling
pub const LEGACY_NUMERIC_SAMPLE: usize = 10;

/// Which documents decide the numeric feature names
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericNameScope {
    /// Union of keys over the whole fit corpus
    #[default]
    #[serde(rename = "full", alias = "full_corpus")]
    FullCorpus,
    /// Union of keys over the first `n` documents only. Keys that first
    /// appear later are excluded from every vector.
    Prefix(usize),
}

/// Fixed-width feature vector for one snippet
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    pub values: Vec<f64>,
}

impl FeatureVector {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Vectorizer settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorizerConfig {
    pub max_vocabulary: usize,
    pub numeric_scope: NumericNameScope,
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        Self {
            max_vocabulary: DEFAULT_MAX_VOCABULARY,
            numeric_scope: NumericNameScope::default(),
        }
    }
}

/// Frozen vectorizer state, persisted inside the model bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorizerState {
    pub tfidf: TfidfModel,
    pub numeric_feature_names: Vec<String>,
}

impl VectorizerState {
    /// Width of every vector produced from this state
    pub fn feature_count(&self) -> usize {
        self.tfidf.len() + self.numeric_feature_names.len()
    }

    pub fn validate(&self) -> Result<(), String> {
        self.tfidf.validate()?;
        let unique: BTreeSet<&String> = self.numeric_feature_names.iter().collect();
        if unique.len() != self.numeric_feature_names.len() {
            return Err("duplicate numeric feature name".into());
        }
        Ok(())
    }
}

/// Turns snippets into [`FeatureVector`]s
#[derive(Debug, Clone)]
pub struct FeatureVectorizer {
    config: VectorizerConfig,
    extractor: StructuralExtractor,
    state: Option<VectorizerState>,
}

impl FeatureVectorizer {
    pub fn new(config: VectorizerConfig) -> Self {
        Self {
            config,
            extractor: StructuralExtractor::new(),
            state: None,
        }
    }

    /// Use a specific structural extractor (depth bound)
    pub fn with_extractor(mut self, extractor: StructuralExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Rebuild a fitted vectorizer from persisted state
    pub fn from_state(state: VectorizerState, extractor: StructuralExtractor) -> Self {
        Self {
            config: VectorizerConfig {
                max_vocabulary: state.tfidf.len(),
                numeric_scope: NumericNameScope::FullCorpus,
            },
            extractor,
            state: Some(state),
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.state.is_some()
    }

    pub fn state(&self) -> HdvaResult<&VectorizerState> {
        self.state.as_ref().ok_or(HdvaError::VectorizerNotFitted)
    }

    pub fn config(&self) -> &VectorizerConfig {
        &self.config
    }

    pub fn extractor(&self) -> &StructuralExtractor {
        &self.extractor
    }

    /// Width of the vectors `transform` produces
    pub fn feature_count(&self) -> HdvaResult<usize> {
        Ok(self.state()?.feature_count())
    }

    /// Learn the vocabulary and the numeric-name order from `corpus`.
    ///
    /// Can only be called once; the layout is frozen afterwards.
    pub fn fit<S: AsRef<str> + Sync>(&mut self, corpus: &[S]) -> HdvaResult<&mut Self> {
        if self.state.is_some() {
            return Err(HdvaError::VectorizerAlreadyFitted);
        }
        if corpus.is_empty() {
            return Err(HdvaError::Dataset("cannot fit on an empty corpus".into()));
        }

        let documents: Vec<String> = corpus
            .par_iter()
            .map(|code| pseudo_document(&tokenize(code.as_ref())))
            .collect();
        let tfidf = TfidfModel::fit(&documents, self.config.max_vocabulary);

        let sample = match self.config.numeric_scope {
            NumericNameScope::FullCorpus => corpus,
            NumericNameScope::Prefix(n) => &corpus[..n.min(corpus.len())],
        };
        let names: BTreeSet<&'static str> = sample
            .par_iter()
            .map(|code| {
                NumericFeatures::extract(code.as_ref(), &self.extractor)
                    .to_map()
                    .into_keys()
                    .collect::<Vec<_>>()
            })
            .flatten()
            .collect();
        let numeric_feature_names: Vec<String> = names.into_iter().map(String::from).collect();

        tracing::info!(
            "Vectorizer fitted: {} terms, {} numeric features ({} documents)",
            tfidf.len(),
            numeric_feature_names.len(),
            corpus.len()
        );

        self.state = Some(VectorizerState {
            tfidf,
            numeric_feature_names,
        });
        Ok(self)
    }

    /// Vectorize one snippet against the frozen layout
    pub fn transform_one(&self, code: &str) -> HdvaResult<FeatureVector> {
        let state = self.state()?;
        Ok(Self::vectorize(state, &self.extractor, code))
    }

    /// Vectorize a batch; rows are in input order
    pub fn transform<S: AsRef<str> + Sync>(&self, codes: &[S]) -> HdvaResult<Vec<FeatureVector>> {
        let state = self.state()?;
        Ok(codes
            .par_iter()
            .map(|code| Self::vectorize(state, &self.extractor, code.as_ref()))
            .collect())
    }

    pub fn fit_transform<S: AsRef<str> + Sync>(
        &mut self,
        corpus: &[S],
    ) -> HdvaResult<Vec<FeatureVector>> {
        self.fit(corpus)?;
        self.transform(corpus)
    }

    /// Vectorize one snippet and hand back the features it was built from
    pub fn transform_one_with_features(
        &self,
        code: &str,
    ) -> HdvaResult<(FeatureVector, NumericFeatures)> {
        let state = self.state()?;
        let numeric = NumericFeatures::extract(code, &self.extractor);
        Ok((Self::assemble(state, code, &numeric), numeric))
    }

    fn vectorize(
        state: &VectorizerState,
        extractor: &StructuralExtractor,
        code: &str,
    ) -> FeatureVector {
        Self::assemble(state, code, &NumericFeatures::extract(code, extractor))
    }

    fn assemble(state: &VectorizerState, code: &str, numeric: &NumericFeatures) -> FeatureVector {
        let mut values = state.tfidf.transform_one(&pseudo_document(&tokenize(code)));
        let numeric = numeric.to_map();
        values.extend(
            state
                .numeric_feature_names
                .iter()
                .map(|name| numeric.get(name.as_str()).copied().unwrap_or(0.0)),
        );
        FeatureVector::new(values)
    }
}

impl Default for FeatureVectorizer {
    fn default() -> Self {
        Self::new(VectorizerConfig::default())
    }
}
