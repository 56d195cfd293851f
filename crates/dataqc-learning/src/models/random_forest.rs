//! Random forest classifier.

use super::decision_tree::{DecisionTree, Targets, TreeParams};
use crate::error::{LearningError, Result};
use ndarray::Array2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Bagged ensemble of Gini trees; probabilities are averaged leaf
/// distributions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestClassifier {
    trees: Vec<DecisionTree>,
    n_classes: usize,
}

impl RandomForestClassifier {
    /// Fit `n_estimators` trees in parallel on bootstrap samples.
    ///
    /// Tree `i` draws its sample from a generator seeded with `seed + i`, so
    /// the result does not depend on thread scheduling.
    pub fn fit(
        x: &Array2<f64>,
        y: &[usize],
        n_classes: usize,
        n_estimators: usize,
        max_depth: Option<usize>,
        seed: u64,
    ) -> Result<Self> {
        let n_samples = x.nrows();
        if n_samples == 0 || n_samples != y.len() {
            return Err(LearningError::Training(format!(
                "random forest needs matching non-empty inputs, got {} rows and {} labels",
                n_samples,
                y.len()
            )));
        }

        let max_features = ((x.ncols() as f64).sqrt().ceil() as usize).max(1);
        let params = TreeParams {
            max_depth,
            max_features: Some(max_features),
            ..TreeParams::default()
        };
        let targets = Targets::Classes { y, n_classes };

        let trees: Vec<DecisionTree> = (0..n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(tree_idx as u64));
                let sample: Vec<usize> = (0..n_samples)
                    .map(|_| rng.gen_range(0..n_samples))
                    .collect();
                DecisionTree::fit(x, targets, &sample, params, &mut rng)
            })
            .collect();

        debug!(
            "Fitted random forest: {} trees, {} classes, {} features per split",
            trees.len(),
            n_classes,
            max_features
        );

        Ok(Self { trees, n_classes })
    }

    /// Class probabilities, `rows x n_classes`.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Array2<f64> {
        let mut proba = Array2::<f64>::zeros((x.nrows(), self.n_classes));
        let n_trees = self.trees.len().max(1) as f64;

        for (i, row) in x.rows().into_iter().enumerate() {
            for tree in &self.trees {
                for (k, p) in tree.leaf_value(row).iter().enumerate() {
                    proba[[i, k]] += p / n_trees;
                }
            }
        }

        proba
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }
}
