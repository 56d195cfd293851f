//! Isolation forest anomaly detection.

use crate::error::{LearningError, Result};
use ndarray::{Array2, ArrayView1};
use rand::seq::index;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Offset subtracted from the score under automatic contamination.
const AUTO_OFFSET: f64 = -0.5;

/// Isolation tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IsolationTree {
    Internal {
        feature: usize,
        threshold: f64,
        /// Samples with `x[feature] < threshold`.
        left: Box<IsolationTree>,
        right: Box<IsolationTree>,
    },
    External {
        size: usize,
    },
}

impl IsolationTree {
    fn build(
        x: &Array2<f64>,
        rows: &[usize],
        height: usize,
        max_height: usize,
        rng: &mut impl Rng,
    ) -> Self {
        let n_samples = rows.len();
        if height >= max_height || n_samples <= 1 {
            return Self::External { size: n_samples };
        }

        let feature = rng.gen_range(0..x.ncols());
        // Bounds over finite cells only; infinite cells still split against them.
        let (min_val, max_val) = rows
            .iter()
            .map(|&r| x[[r, feature]])
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));

        if max_val <= min_val || max_val - min_val < 1e-10 {
            return Self::External { size: n_samples };
        }

        // Interpolate instead of sampling the range: `max_val - min_val` may overflow.
        let t: f64 = rng.gen_range(0.0..1.0);
        let threshold = min_val * (1.0 - t) + max_val * t;
        let (left, right): (Vec<usize>, Vec<usize>) =
            rows.iter().partition(|&&r| x[[r, feature]] < threshold);

        if left.is_empty() || right.is_empty() {
            return Self::External { size: n_samples };
        }

        Self::Internal {
            feature,
            threshold,
            left: Box::new(Self::build(x, &left, height + 1, max_height, rng)),
            right: Box::new(Self::build(x, &right, height + 1, max_height, rng)),
        }
    }

    /// Depth at which `sample` is isolated, corrected for leaf size.
    pub fn path_length(&self, sample: ArrayView1<'_, f64>) -> f64 {
        let mut node = self;
        let mut depth = 0.0;
        loop {
            match node {
                Self::External { size } => return depth + average_path_length(*size),
                Self::Internal {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if sample[*feature] < *threshold {
                        left
                    } else {
                        right
                    };
                    depth += 1.0;
                }
            }
        }
    }
}

/// Average path length of an unsuccessful BST search over `n` points.
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Fitted isolation forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationForest {
    trees: Vec<IsolationTree>,
    sample_size: usize,
    n_features: usize,
    offset: f64,
}

impl IsolationForest {
    /// Fit `n_estimators` trees, each on `min(max_samples, rows)` rows drawn
    /// without replacement. Trees grow to `ceil(log2(sample_size))`.
    pub fn fit(x: &Array2<f64>, n_estimators: usize, max_samples: usize, seed: u64) -> Result<Self> {
        let n_samples = x.nrows();
        if n_samples == 0 {
            return Err(LearningError::Training(
                "isolation forest needs at least one row".to_string(),
            ));
        }
        if x.ncols() == 0 {
            return Err(LearningError::Training(
                "isolation forest needs at least one feature".to_string(),
            ));
        }

        let sample_size = max_samples.min(n_samples).max(1);
        let max_height = (sample_size as f64).log2().ceil().max(0.0) as usize;

        let trees: Vec<IsolationTree> = (0..n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(tree_idx as u64));
                let rows = index::sample(&mut rng, n_samples, sample_size).into_vec();
                IsolationTree::build(x, &rows, 0, max_height, &mut rng)
            })
            .collect();

        debug!(
            "Fitted isolation forest: {} trees, {} samples per tree, max height {}",
            trees.len(),
            sample_size,
            max_height
        );

        Ok(Self {
            trees,
            sample_size,
            n_features: x.ncols(),
            offset: AUTO_OFFSET,
        })
    }

    /// Anomaly score in `(0, 1]`, higher is more anomalous.
    pub fn anomaly_score(&self, sample: ArrayView1<'_, f64>) -> f64 {
        let mean_path = self
            .trees
            .iter()
            .map(|tree| tree.path_length(sample))
            .sum::<f64>()
            / self.trees.len().max(1) as f64;

        let normalizer = average_path_length(self.sample_size);
        let ratio = if normalizer > 0.0 {
            mean_path / normalizer
        } else {
            1.0
        };
        2f64.powf(-ratio)
    }

    /// Decision function per row: negative for anomalies, positive for inliers.
    pub fn decision_function(&self, x: &Array2<f64>) -> Result<Vec<f64>> {
        if x.ncols() != self.n_features {
            return Err(LearningError::Prediction(format!(
                "expected {} features, got {}",
                self.n_features,
                x.ncols()
            )));
        }

        Ok(x.rows()
            .into_iter()
            .map(|row| -self.anomaly_score(row) - self.offset)
            .collect())
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }
}
