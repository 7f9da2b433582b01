//! Hallucination classifier
//!
//! Pipeline: snippet → TF-IDF terms ++ structural/surface features →
//! random forest vote → REAL / HALLUCINATED with a probability.
//!
//! The vectorizer layout and the forest are always persisted together in a
//! [`ModelBundle`], so inference can never see a layout the model was not
//! trained on.

pub mod bootstrap;
pub mod bundle;
pub mod dataset;
pub mod features;
pub mod metrics;
pub mod model;
pub mod tfidf;
pub mod train;
mod tree;

pub use bootstrap::synthesize;
pub use bundle::{ModelBundle, BUNDLE_FORMAT_VERSION};
pub use dataset::{load_jsonl, save_jsonl, DatasetStats};
pub use features::{
    FeatureVector, FeatureVectorizer, NumericNameScope, VectorizerConfig, VectorizerState,
};
pub use metrics::{ClassificationReport, ConfusionMatrix};
pub use model::{ForestConfig, Prediction, RandomForest};
pub use train::{train, train_and_save, train_test_split, TrainConfig, TrainOutcome};
