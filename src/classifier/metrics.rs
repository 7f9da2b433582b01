//! Hold-out evaluation
//!
//! Per-class precision / recall / F1 with macro and support-weighted
//! averages. Divisions by zero yield 0.

use crate::models::Label;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary confusion counts, HALLUCINATED as the positive class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub tp: usize,
    pub tn: usize,
    pub fp: usize,
    pub r#fn: usize,
}

impl ConfusionMatrix {
    pub fn from_predictions(truth: &[Label], predicted: &[Label]) -> Self {
        let mut matrix = Self::default();
        for (t, p) in truth.iter().zip(predicted) {
            match (p.is_hallucinated(), t.is_hallucinated()) {
                (true, true) => matrix.tp += 1,
                (false, false) => matrix.tn += 1,
                (true, false) => matrix.fp += 1,
                (false, true) => matrix.r#fn += 1,
            }
        }
        matrix
    }

    pub fn total(&self) -> usize {
        self.tp + self.tn + self.fp + self.r#fn
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.tp + self.tn, self.total())
    }

    /// Metrics with `label` treated as the positive class
    fn class_metrics(&self, label: Label) -> ClassMetrics {
        let (tp, fp, r#fn) = match label {
            Label::Hallucinated => (self.tp, self.fp, self.r#fn),
            Label::Real => (self.tn, self.r#fn, self.fp),
        };
        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + r#fn);
        let f1 = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };
        ClassMetrics {
            label,
            precision,
            recall,
            f1,
            support: tp + r#fn,
        }
    }
}

fn ratio(num: usize, denom: usize) -> f64 {
    if denom == 0 {
        0.0
    } else {
        num as f64 / denom as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub label: Label,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Averaged precision / recall / F1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AveragedMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// Evaluation of a classifier on a labelled hold-out set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub accuracy: f64,
    pub confusion: ConfusionMatrix,
    /// REAL first, then HALLUCINATED
    pub classes: Vec<ClassMetrics>,
    pub macro_avg: AveragedMetrics,
    pub weighted_avg: AveragedMetrics,
}

impl ClassificationReport {
    pub fn new(truth: &[Label], predicted: &[Label]) -> Self {
        let confusion = ConfusionMatrix::from_predictions(truth, predicted);
        let classes: Vec<ClassMetrics> = Label::ALL
            .iter()
            .map(|&label| confusion.class_metrics(label))
            .collect();

        let n_classes = classes.len() as f64;
        let macro_avg = AveragedMetrics {
            precision: classes.iter().map(|c| c.precision).sum::<f64>() / n_classes,
            recall: classes.iter().map(|c| c.recall).sum::<f64>() / n_classes,
            f1: classes.iter().map(|c| c.f1).sum::<f64>() / n_classes,
        };

        let total = confusion.total();
        let weighted = |metric: fn(&ClassMetrics) -> f64| {
            if total == 0 {
                0.0
            } else {
                classes
                    .iter()
                    .map(|c| metric(c) * c.support as f64)
                    .sum::<f64>()
                    / total as f64
            }
        };
        let weighted_avg = AveragedMetrics {
            precision: weighted(|c| c.precision),
            recall: weighted(|c| c.recall),
            f1: weighted(|c| c.f1),
        };

        Self {
            accuracy: confusion.accuracy(),
            confusion,
            classes,
            macro_avg,
            weighted_avg,
        }
    }

    pub fn support(&self) -> usize {
        self.confusion.total()
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Accuracy: {:.4}", self.accuracy)?;
        writeln!(f)?;
        writeln!(
            f,
            "{:>14} {:>10} {:>10} {:>10} {:>10}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for c in &self.classes {
            writeln!(
                f,
                "{:>14} {:>10.2} {:>10.2} {:>10.2} {:>10}",
                c.label.as_str(),
                c.precision,
                c.recall,
                c.f1,
                c.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>14} {:>10} {:>10} {:>10.2} {:>10}",
            "accuracy",
            "",
            "",
            self.accuracy,
            self.support()
        )?;
        for (name, avg) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            writeln!(
                f,
                "{:>14} {:>10.2} {:>10.2} {:>10.2} {:>10}",
                name,
                avg.precision,
                avg.recall,
                avg.f1,
                self.support()
            )?;
        }
        Ok(())
    }
}
