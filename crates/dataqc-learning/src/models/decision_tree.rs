//! CART decision tree shared by the forest and boosting ensembles.
//!
//! Classification trees split on Gini impurity and store the class
//! distribution in each leaf. Regression trees split on variance and store
//! the mean target. Rows go left when `x[feature] <= threshold`.

use ndarray::{Array2, ArrayView1};
use rand::Rng;
use rand::seq::index;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    /// Class distribution (classification) or a single value (regression).
    Leaf { value: Vec<f64> },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

/// Growth limits for a tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features sampled at each split, all when `None`.
    pub max_features: Option<usize>,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
        }
    }
}

/// Fitting targets.
#[derive(Debug, Clone, Copy)]
pub enum Targets<'a> {
    Classes { y: &'a [usize], n_classes: usize },
    Values(&'a [f64]),
}

/// A fitted decision tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    root: TreeNode,
    n_features: usize,
}

/// Running statistics of one side of a candidate split.
#[derive(Clone)]
struct NodeStats {
    count: usize,
    class_counts: Vec<f64>,
    sum: f64,
    sq_sum: f64,
}

impl NodeStats {
    fn empty(targets: Targets<'_>) -> Self {
        let n_classes = match targets {
            Targets::Classes { n_classes, .. } => n_classes,
            Targets::Values(_) => 0,
        };
        Self {
            count: 0,
            class_counts: vec![0.0; n_classes],
            sum: 0.0,
            sq_sum: 0.0,
        }
    }

    fn of_rows(targets: Targets<'_>, rows: &[usize]) -> Self {
        let mut stats = Self::empty(targets);
        for &row in rows {
            stats.add(targets, row);
        }
        stats
    }

    #[inline]
    fn add(&mut self, targets: Targets<'_>, row: usize) {
        self.count += 1;
        match targets {
            Targets::Classes { y, .. } => self.class_counts[y[row]] += 1.0,
            Targets::Values(y) => {
                self.sum += y[row];
                self.sq_sum += y[row] * y[row];
            }
        }
    }

    #[inline]
    fn remove(&mut self, targets: Targets<'_>, row: usize) {
        self.count -= 1;
        match targets {
            Targets::Classes { y, .. } => self.class_counts[y[row]] -= 1.0,
            Targets::Values(y) => {
                self.sum -= y[row];
                self.sq_sum -= y[row] * y[row];
            }
        }
    }

    fn impurity(&self, targets: Targets<'_>) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let n = self.count as f64;
        match targets {
            Targets::Classes { .. } => {
                1.0 - self.class_counts.iter().map(|c| (c / n).powi(2)).sum::<f64>()
            }
            Targets::Values(_) => (self.sq_sum / n - (self.sum / n).powi(2)).max(0.0),
        }
    }

    fn leaf_value(&self, targets: Targets<'_>) -> Vec<f64> {
        let n = self.count.max(1) as f64;
        match targets {
            Targets::Classes { .. } => self.class_counts.iter().map(|c| c / n).collect(),
            Targets::Values(_) => vec![self.sum / n],
        }
    }
}

struct Builder<'a> {
    x: &'a Array2<f64>,
    targets: Targets<'a>,
    params: TreeParams,
}

impl Builder<'_> {
    fn build(&self, rows: &[usize], depth: usize, rng: &mut impl Rng) -> TreeNode {
        let stats = NodeStats::of_rows(self.targets, rows);
        let impurity = stats.impurity(self.targets);

        let should_stop = rows.len() < self.params.min_samples_split
            || self.params.max_depth.is_some_and(|d| depth >= d)
            || impurity <= 1e-12;

        if should_stop {
            return TreeNode::Leaf {
                value: stats.leaf_value(self.targets),
            };
        }

        let n_features = self.x.ncols();
        let candidates: Vec<usize> = match self.params.max_features {
            Some(k) if k < n_features => index::sample(rng, n_features, k).into_vec(),
            _ => (0..n_features).collect(),
        };

        let best = candidates
            .into_par_iter()
            .filter_map(|feature| self.best_split_for(feature, rows, &stats, impurity))
            .max_by(|a, b| a.gain.total_cmp(&b.gain).then(b.feature.cmp(&a.feature)));

        let Some(best) = best else {
            return TreeNode::Leaf {
                value: stats.leaf_value(self.targets),
            };
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .iter()
            .partition(|&&row| self.x[[row, best.feature]] <= best.threshold);

        TreeNode::Split {
            feature: best.feature,
            threshold: best.threshold,
            left: Box::new(self.build(&left_rows, depth + 1, rng)),
            right: Box::new(self.build(&right_rows, depth + 1, rng)),
        }
    }

    /// Scan the sorted values of one feature, updating child statistics
    /// incrementally.
    fn best_split_for(
        &self,
        feature: usize,
        rows: &[usize],
        parent: &NodeStats,
        parent_impurity: f64,
    ) -> Option<SplitCandidate> {
        let mut order = rows.to_vec();
        order.sort_by(|&a, &b| self.x[[a, feature]].total_cmp(&self.x[[b, feature]]));

        let n = rows.len() as f64;
        let mut left = NodeStats::empty(self.targets);
        let mut right = parent.clone();
        let mut best: Option<SplitCandidate> = None;

        for k in 0..order.len().saturating_sub(1) {
            let row = order[k];
            left.add(self.targets, row);
            right.remove(self.targets, row);

            let value = self.x[[row, feature]];
            let next = self.x[[order[k + 1], feature]];
            if value >= next {
                continue;
            }
            if left.count < self.params.min_samples_leaf || right.count < self.params.min_samples_leaf
            {
                continue;
            }

            let weighted = (left.count as f64 * left.impurity(self.targets)
                + right.count as f64 * right.impurity(self.targets))
                / n;
            let gain = parent_impurity - weighted;

            if gain > 1e-12 && best.as_ref().is_none_or(|b| gain > b.gain) {
                best = Some(SplitCandidate {
                    feature,
                    threshold: midpoint(value, next),
                    gain,
                });
            }
        }

        best
    }
}

/// Split point between two sorted distinct values, always `>= a` and `< b`.
///
/// Halving before adding keeps `±1e308` spreads finite. When the midpoint is
/// not usable (an infinite side, or rounding up to `b`) `a` itself is used.
fn midpoint(a: f64, b: f64) -> f64 {
    let mid = a / 2.0 + b / 2.0;
    if mid.is_finite() && mid >= a && mid < b {
        mid
    } else {
        a
    }
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl DecisionTree {
    /// Fit on the listed rows of `x`.
    ///
    /// `rows` may repeat positions (bootstrap samples).
    pub fn fit(
        x: &Array2<f64>,
        targets: Targets<'_>,
        rows: &[usize],
        params: TreeParams,
        rng: &mut impl Rng,
    ) -> Self {
        let builder = Builder { x, targets, params };
        Self {
            root: builder.build(rows, 0, rng),
            n_features: x.ncols(),
        }
    }

    /// Root node.
    pub fn root(&self) -> &TreeNode {
        &self.root
    }

    /// Width of the matrix the tree was fitted on.
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Leaf value reached by `sample`.
    pub fn leaf_value(&self, sample: ArrayView1<'_, f64>) -> &[f64] {
        let mut node = &self.root;
        loop {
            match node {
                TreeNode::Leaf { value } => return value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if sample[*feature] <= *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }

    /// Number of nodes, leaves included.
    pub fn node_count(&self) -> usize {
        fn count(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => 1 + count(left) + count(right),
            }
        }
        count(&self.root)
    }
}
