//! CART decision tree for binary classification
//!
//! Gini impurity, midpoint thresholds, and a random feature subset at each
//! split. Nodes live in a flat arena so both building and prediction are
//! iterative and the tree serializes as a plain list.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// One arena node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    /// Rows with `x[feature] <= threshold` go to `left`
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Class index (0 = REAL, 1 = HALLUCINATED) and training support
    Leaf { class: usize, samples: usize },
}

/// Growth limits for a single tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeParams {
    pub max_depth: usize,
    /// Non-constant features to evaluate per split
    pub max_features: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

/// A fitted decision tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<TreeNode>,
}

/// `[count(class 0), count(class 1)]`
type ClassCounts = [usize; 2];

fn count_classes(rows: &[usize], y: &[usize]) -> ClassCounts {
    let mut counts = [0usize; 2];
    for &r in rows {
        counts[y[r]] += 1;
    }
    counts
}

fn gini(counts: ClassCounts) -> f64 {
    let n = (counts[0] + counts[1]) as f64;
    if n == 0.0 {
        return 0.0;
    }
    let p0 = counts[0] as f64 / n;
    let p1 = counts[1] as f64 / n;
    1.0 - p0 * p0 - p1 * p1
}

// Ties go to HALLUCINATED, matching the forest's vote rule.
fn majority(counts: ClassCounts) -> usize {
    if counts[1] >= counts[0] {
        1
    } else {
        0
    }
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

/// Pending node during construction
struct Frame {
    node: usize,
    rows: Vec<usize>,
    depth: usize,
}

impl DecisionTree {
    /// Grow a tree over `rows` (indices into `x`; may repeat for bootstraps)
    pub fn fit<R: Rng>(
        x: &[Vec<f64>],
        y: &[usize],
        rows: Vec<usize>,
        params: &TreeParams,
        rng: &mut R,
    ) -> Self {
        let n_features = x.first().map_or(0, Vec::len);
        let mut features: Vec<usize> = (0..n_features).collect();
        let mut nodes = vec![TreeNode::Leaf {
            class: 0,
            samples: 0,
        }];
        let mut stack = vec![Frame {
            node: 0,
            rows,
            depth: 0,
        }];

        while let Some(Frame { node, rows, depth }) = stack.pop() {
            let counts = count_classes(&rows, y);
            let leaf = TreeNode::Leaf {
                class: majority(counts),
                samples: rows.len(),
            };

            let pure = counts[0] == 0 || counts[1] == 0;
            if pure || depth >= params.max_depth || rows.len() < params.min_samples_split {
                nodes[node] = leaf;
                continue;
            }

            features.shuffle(rng);
            let Some(split) = best_split(x, y, &rows, counts, &features, params) else {
                nodes[node] = leaf;
                continue;
            };

            let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
                .iter()
                .partition(|&&r| x[r][split.feature] <= split.threshold);

            let left = nodes.len();
            let right = left + 1;
            nodes.push(TreeNode::Leaf {
                class: 0,
                samples: 0,
            });
            nodes.push(TreeNode::Leaf {
                class: 0,
                samples: 0,
            });
            nodes[node] = TreeNode::Split {
                feature: split.feature,
                threshold: split.threshold,
                left,
                right,
            };

            stack.push(Frame {
                node: right,
                rows: right_rows,
                depth: depth + 1,
            });
            stack.push(Frame {
                node: left,
                rows: left_rows,
                depth: depth + 1,
            });
        }

        Self { nodes }
    }

    /// Class index for one row
    pub fn predict(&self, row: &[f64]) -> usize {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { class, .. } => return *class,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let value = row.get(*feature).copied().unwrap_or(0.0);
                    idx = if value <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    /// Longest root-to-leaf path (a lone leaf has depth 0)
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((idx, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            if let Some(TreeNode::Split { left, right, .. }) = self.nodes.get(idx) {
                stack.push((*left, depth + 1));
                stack.push((*right, depth + 1));
            }
        }
        deepest
    }

    /// Check arena links and feature indices against the expected width
    pub fn validate(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("empty tree".into());
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(format!(
                            "node {idx} splits on feature {feature} of {n_features}"
                        ));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {idx} has a non-finite threshold"));
                    }
                    // children are always appended after their parent
                    let in_range = |child: usize| child > idx && child < self.nodes.len();
                    if !in_range(*left) || !in_range(*right) {
                        return Err(format!("node {idx} has invalid children"));
                    }
                }
                TreeNode::Leaf { class, .. } => {
                    if *class > 1 {
                        return Err(format!("leaf {idx} has class {class}"));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Scan `features` (already shuffled) until `max_features` non-constant ones
/// were evaluated and a split exists.
fn best_split(
    x: &[Vec<f64>],
    y: &[usize],
    rows: &[usize],
    parent_counts: ClassCounts,
    features: &[usize],
    params: &TreeParams,
) -> Option<SplitCandidate> {
    let parent_impurity = gini(parent_counts);
    let n = rows.len() as f64;
    let mut best: Option<SplitCandidate> = None;
    let mut evaluated = 0usize;
    let mut column: Vec<(f64, usize)> = Vec::with_capacity(rows.len());

    for &feature in features {
        if evaluated >= params.max_features && best.is_some() {
            break;
        }

        column.clear();
        column.extend(rows.iter().map(|&r| (x[r][feature], y[r])));
        column.sort_by(|a, b| a.0.total_cmp(&b.0));

        if column.first().map(|c| c.0) == column.last().map(|c| c.0) {
            continue;
        }
        evaluated += 1;

        let mut left = [0usize; 2];
        for i in 0..column.len() - 1 {
            left[column[i].1] += 1;
            if column[i].0 == column[i + 1].0 {
                continue;
            }
            let n_left = i + 1;
            let n_right = column.len() - n_left;
            if n_left < params.min_samples_leaf || n_right < params.min_samples_leaf {
                continue;
            }
            let right = [parent_counts[0] - left[0], parent_counts[1] - left[1]];
            let impurity =
                (n_left as f64 / n) * gini(left) + (n_right as f64 / n) * gini(right);

            if impurity + 1e-12 < parent_impurity
                && best.as_ref().map_or(true, |b| impurity < b.impurity)
            {
                let mut threshold = column[i].0 + (column[i + 1].0 - column[i].0) / 2.0;
                // guard against the midpoint rounding up to the right value
                if threshold >= column[i + 1].0 {
                    threshold = column[i].0;
                }
                best = Some(SplitCandidate {
                    feature,
                    threshold,
                    impurity,
                });
            }
        }
    }

    best
}
