//! Core data models
//!
//! Labels and labeled examples shared by the vectorizer, the classifier
//! and the dataset tooling.

use serde::{Deserialize, Serialize};

/// Verdict for a snippet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Label {
    /// Plausible, genuinely authored code
    Real,
    /// Fabricated APIs, undefined symbols or nonsensical chains
    Hallucinated,
}

impl Label {
    /// Both labels in class-index order
    pub const ALL: [Label; 2] = [Label::Real, Label::Hallucinated];

    /// Class index used by the classifier (REAL = 0, HALLUCINATED = 1)
    pub fn index(self) -> usize {
        match self {
            Label::Real => 0,
            Label::Hallucinated => 1,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Label::Real),
            1 => Some(Label::Hallucinated),
            _ => None,
        }
    }

    pub fn is_hallucinated(self) -> bool {
        self == Label::Hallucinated
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Label::Real => "REAL",
            Label::Hallucinated => "HALLUCINATED",
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Label {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "REAL" | "0" => Ok(Label::Real),
            "HALLUCINATED" | "1" => Ok(Label::Hallucinated),
            other => Err(format!("unknown label '{other}' (expected REAL or HALLUCINATED)")),
        }
    }
}

/// A snippet with its ground-truth label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledExample {
    pub code: String,
    pub label: Label,
}

impl LabeledExample {
    pub fn new(code: impl Into<String>, label: Label) -> Self {
        Self {
            code: code.into(),
            label,
        }
    }
}

/// Ordered list of labeled examples
pub type Dataset = Vec<LabeledExample>;

/// Split a dataset into parallel text and label vectors
pub fn unzip_dataset(dataset: &[LabeledExample]) -> (Vec<String>, Vec<Label>) {
    dataset
        .iter()
        .map(|ex| (ex.code.clone(), ex.label))
        .unzip()
}
