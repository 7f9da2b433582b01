//! Synthetic labeled corpus for bootstrapping training
//!
//! Used when no real labeled data exists yet. Snippets are drawn from two
//! small template pools:
//! - REAL: plausible standard-library code
//! - HALLUCINATED: fabricated APIs, undefined symbols, nonsense method chains
//!
//! Each template may get a marker comment with a fixed probability. One
//! seeded ChaCha8 stream drives sampling, markers and the final shuffle, so a
//! given `(n_real, n_hall, seed)` always yields the same ordered dataset.

use crate::models::{Dataset, Label, LabeledExample};
use rand::seq::{IndexedRandom, SliceRandom};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const REAL_TEMPLATES: &[&str] = &[
    "def compute_sum(nums: list[int]) -> int:\n    return sum(nums)\n",
    "class MyClass:\n    def __init__(self, x):\n        self.x = x\n    def get(self):\n        return self.x\n",
    "import math\n\ndef circle_area(r: float) -> float:\n    return math.pi * r * r\n",
    "def read_file(path):\n    with open(path, 'r') as f:\n        return f.read()\n",
    "# simple example\ndef multiply(a, b):\n    return a * b\n",
    "from collections import Counter\n\ndef top_k(items, k=3):\n    c = Counter(items)\n    return c.most_common(k)\n",
];

const HALLUCINATED_TEMPLATES: &[&str] = &[
    "def transform_data(df):\n    return df.whenify().transmute()\n",
    "from fake_lib import hypercall\n\ndef process(x):\n    return hypercall(x, mode='super')\n",
    "def compute(x):\n    return vectorized_thingy(x)\n",
    "def model_predict(data):\n    return oracle_predictor(data)\n",
    "def foo():\n    unknown = MagicTransformer().apply(foo=42)\n    return unknown\n",
];

/// Probability of the `# generated id` trailer on REAL snippets
const REAL_MARKER_P: f64 = 0.3;
/// Probability of the spurious numpy import on HALLUCINATED snippets
const HALLUCINATED_IMPORT_P: f64 = 0.4;
/// Probability of the `# hallucination id` trailer on HALLUCINATED snippets
const HALLUCINATED_MARKER_P: f64 = 0.2;

fn real_snippet<R: Rng>(i: usize, rng: &mut R) -> String {
    let mut code = REAL_TEMPLATES.choose(rng).copied().unwrap_or_default().to_string();
    if rng.random_bool(REAL_MARKER_P) {
        code.push_str(&format!("\n# generated id: {i}"));
    }
    code
}

fn hallucinated_snippet<R: Rng>(i: usize, rng: &mut R) -> String {
    let template = HALLUCINATED_TEMPLATES.choose(rng).copied().unwrap_or_default();
    let mut code = if rng.random_bool(HALLUCINATED_IMPORT_P) {
        format!("import numpy as np\n{template}")
    } else {
        template.to_string()
    };
    if rng.random_bool(HALLUCINATED_MARKER_P) {
        code.push_str(&format!("\n# hallucination id: {i}"));
    }
    code
}

/// Balanced, reproducible corpus of `n_real + n_hall` labeled snippets
pub fn synthesize(n_real: usize, n_hall: usize, seed: u64) -> Dataset {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut dataset: Dataset = Vec::with_capacity(n_real + n_hall);

    for i in 0..n_real {
        dataset.push(LabeledExample::new(real_snippet(i, &mut rng), Label::Real));
    }
    for i in 0..n_hall {
        dataset.push(LabeledExample::new(
            hallucinated_snippet(i, &mut rng),
            Label::Hallucinated,
        ));
    }
    dataset.shuffle(&mut rng);

    tracing::debug!(
        "Synthesized {} snippets ({} REAL, {} HALLUCINATED, seed {})",
        dataset.len(),
        n_real,
        n_hall,
        seed
    );
    dataset
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::StructuralExtractor;

    #[test]
    fn test_same_seed_same_dataset() {
        assert_eq!(synthesize(50, 50, 42), synthesize(50, 50, 42));
    }

    #[test]
    fn test_different_seed_differs() {
        assert_ne!(synthesize(50, 50, 42), synthesize(50, 50, 43));
    }

    #[test]
    fn test_label_counts() {
        let data = synthesize(30, 20, 1);
        assert_eq!(data.len(), 50);
        assert_eq!(data.iter().filter(|e| e.label == Label::Real).count(), 30);
        assert_eq!(data.iter().filter(|e| e.label == Label::Hallucinated).count(), 20);
    }

    #[test]
    fn test_empty_request() {
        assert!(synthesize(0, 0, 42).is_empty());
    }

    #[test]
    fn test_snippets_come_from_templates() {
        for example in synthesize(40, 40, 9) {
            let pool = match example.label {
                Label::Real => REAL_TEMPLATES,
                Label::Hallucinated => HALLUCINATED_TEMPLATES,
            };
            assert!(
                pool.iter().any(|t| example.code.contains(t)),
                "unexpected snippet: {:?}",
                example.code
            );
        }
    }

    #[test]
    fn test_templates_parse() {
        let extractor = StructuralExtractor::new();
        for template in REAL_TEMPLATES.iter().chain(HALLUCINATED_TEMPLATES) {
            assert!(extractor.extract(template).is_parsable(), "{template}");
        }
    }
}
