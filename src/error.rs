//! Error types for the detection core
//!
//! Parse failures are deliberately absent: an unparsable snippet is a
//! feature value (see [`crate::features::StructuralOutcome`]), not an error.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the library
#[derive(Error, Debug)]
pub enum HdvaError {
    #[error("vectorizer has not been fitted: call fit() or load a model bundle first")]
    VectorizerNotFitted,

    #[error("vectorizer is already fitted; its vocabulary and feature layout are frozen")]
    VectorizerAlreadyFitted,

    #[error("classifier has not been trained: train it or load a model bundle first")]
    ModelNotTrained,

    #[error("failed to load model bundle {path}: {reason}")]
    ModelLoad { path: PathBuf, reason: String },

    #[error("failed to save model bundle {path}: {source}")]
    ModelSave {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("classifier training failed: {0}")]
    Training(String),

    #[error("failed to read {path}: {source}")]
    Input {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("feature layout mismatch: model expects {expected} columns, got {actual}")]
    LayoutMismatch { expected: usize, actual: usize },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid dataset: {0}")]
    Dataset(String),
}

impl HdvaError {
    pub(crate) fn model_load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        HdvaError::ModelLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type HdvaResult<T> = Result<T, HdvaError>;
