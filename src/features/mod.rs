//! Feature extraction from raw source text
//!
//! Three independent extractors, leaves of the pipeline:
//! - [`tokenize`]: identifier tokens with literals stripped
//! - [`structural`]: tree-sitter node-kind counts and nesting depth
//! - [`surface`]: line / char / comment / blank / token counts

pub mod structural;
pub mod surface;
pub mod tokenize;

pub use structural::{StructuralExtractor, StructuralFeatures, StructuralOutcome};
pub use surface::SurfaceFeatures;
pub use tokenize::{pseudo_document, strip_literals, tokenize, TokenStream};

use std::collections::BTreeMap;

/// Structural and surface features of one snippet
#[derive(Debug, Clone, PartialEq)]
pub struct NumericFeatures {
    pub structural: StructuralOutcome,
    pub surface: SurfaceFeatures,
}

impl NumericFeatures {
    pub fn extract(text: &str, extractor: &StructuralExtractor) -> Self {
        let structural = extractor.extract(text);
        if !structural.is_parsable() {
            tracing::debug!("snippet did not parse; using degenerate structural record");
        }
        Self {
            structural,
            surface: surface::extract(text),
        }
    }

    /// Rebuild from flat records, e.g. the ones carried by an analysis
    pub fn from_records(structural: StructuralFeatures, surface: SurfaceFeatures) -> Self {
        let structural = if structural.parsable {
            StructuralOutcome::Parsed(structural)
        } else {
            StructuralOutcome::Unparsable
        };
        Self { structural, surface }
    }

    /// All named values this snippet reports
    pub fn to_map(&self) -> BTreeMap<&'static str, f64> {
        self.structural
            .named_values()
            .into_iter()
            .chain(self.surface.named_values())
            .collect()
    }
}
