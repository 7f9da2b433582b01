//! Bounded-vocabulary TF-IDF over token pseudo-documents
//!
//! ```text
//! idf(t)      = ln((1 + n) / (1 + df(t))) + 1
//! tfidf(t, d) = count(t, d) * idf(t), then L2-normalised per document
//! ```
//!
//! The vocabulary keeps the `max_features` terms with the highest document
//! frequency; indices follow lexicographic term order.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Normalise a pseudo-document token: lowercase, no trailing dots
fn normalize_term(token: &str) -> Option<String> {
    let term = token.trim_end_matches('.');
    if term.is_empty() {
        None
    } else {
        Some(term.to_lowercase())
    }
}

fn terms(document: &str) -> impl Iterator<Item = String> + '_ {
    document.split_whitespace().filter_map(normalize_term)
}

/// Fitted TF-IDF state. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfidfModel {
    /// term -> column index
    vocabulary: BTreeMap<String, usize>,
    /// per-column idf weight
    idf: Vec<f64>,
}

impl TfidfModel {
    /// Fit on whitespace-delimited pseudo-documents
    pub fn fit<S: AsRef<str>>(documents: &[S], max_features: usize) -> Self {
        let n_docs = documents.len();
        let mut doc_freq: FxHashMap<String, usize> = FxHashMap::default();
        let mut term_freq: FxHashMap<String, usize> = FxHashMap::default();

        for doc in documents {
            let mut seen: FxHashSet<String> = FxHashSet::default();
            for term in terms(doc.as_ref()) {
                *term_freq.entry(term.clone()).or_insert(0) += 1;
                seen.insert(term);
            }
            for term in seen {
                *doc_freq.entry(term).or_insert(0) += 1;
            }
        }

        let mut ranked: Vec<(String, usize)> = doc_freq.into_iter().collect();
        ranked.sort_by(|a, b| {
            b.1.cmp(&a.1)
                .then_with(|| term_freq[&b.0].cmp(&term_freq[&a.0]))
                .then_with(|| a.0.cmp(&b.0))
        });
        ranked.truncate(max_features);

        let selected: BTreeMap<String, usize> = ranked.into_iter().collect();
        let mut vocabulary = BTreeMap::new();
        let mut idf = Vec::with_capacity(selected.len());
        for (idx, (term, df)) in selected.into_iter().enumerate() {
            idf.push(((1.0 + n_docs as f64) / (1.0 + df as f64)).ln() + 1.0);
            vocabulary.insert(term, idx);
        }

        Self { vocabulary, idf }
    }

    /// Weighted, L2-normalised term vector. Unknown terms contribute nothing.
    pub fn transform_one(&self, document: &str) -> Vec<f64> {
        let mut row = vec![0.0; self.idf.len()];
        for term in terms(document) {
            if let Some(&idx) = self.vocabulary.get(&term) {
                row[idx] += 1.0;
            }
        }

        for (value, idf) in row.iter_mut().zip(&self.idf) {
            *value *= idf;
        }

        let norm = row.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for value in row.iter_mut() {
                *value /= norm;
            }
        }
        row
    }

    pub fn vocabulary(&self) -> &BTreeMap<String, usize> {
        &self.vocabulary
    }

    pub fn idf(&self) -> &[f64] {
        &self.idf
    }

    pub fn len(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vocabulary.is_empty()
    }

    /// Check that the vocabulary indices form `0..len` and match the weights
    pub fn validate(&self) -> Result<(), String> {
        if self.idf.len() != self.vocabulary.len() {
            return Err(format!(
                "vocabulary has {} terms but {} weights",
                self.vocabulary.len(),
                self.idf.len()
            ));
        }
        let mut seen = vec![false; self.idf.len()];
        for (term, &idx) in &self.vocabulary {
            match seen.get_mut(idx) {
                Some(slot) if !*slot => *slot = true,
                _ => return Err(format!("term '{term}' has invalid index {idx}")),
            }
        }
        if self.idf.iter().any(|w| !w.is_finite()) {
            return Err("non-finite idf weight".into());
        }
        Ok(())
    }
}
