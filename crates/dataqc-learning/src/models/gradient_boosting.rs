//! Binary gradient-boosted trees with log-loss.
//!
//! Each stage fits a shallow regression tree to the residuals
//! `y - sigmoid(raw)`; leaves hold the mean residual. The raw score of a
//! sample is `init + learning_rate * sum(leaf values)`.

use super::decision_tree::{DecisionTree, Targets, TreeParams};
use crate::error::{LearningError, Result};
use ndarray::{Array2, ArrayView1};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Clamp for the prior probability so the initial log-odds stay finite.
const PRIOR_EPS: f64 = 1e-6;

#[inline]
pub fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Fitted binary boosting model. Class 1 is the positive class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostingClassifier {
    init: f64,
    learning_rate: f64,
    trees: Vec<DecisionTree>,
}

impl GradientBoostingClassifier {
    /// Whether boosting supports a target with `n_classes` classes.
    pub fn supports(n_classes: usize) -> bool {
        n_classes == 2
    }

    /// Fit `n_estimators` stages.
    pub fn fit(
        x: &Array2<f64>,
        y: &[usize],
        n_classes: usize,
        n_estimators: usize,
        max_depth: usize,
        learning_rate: f64,
        seed: u64,
    ) -> Result<Self> {
        if !Self::supports(n_classes) {
            return Err(LearningError::Training(format!(
                "gradient boosting needs exactly 2 classes, got {}",
                n_classes
            )));
        }
        let n_samples = x.nrows();
        if n_samples == 0 || n_samples != y.len() {
            return Err(LearningError::Training(format!(
                "gradient boosting needs matching non-empty inputs, got {} rows and {} labels",
                n_samples,
                y.len()
            )));
        }

        let targets: Vec<f64> = y.iter().map(|&c| c as f64).collect();
        let prior = (targets.iter().sum::<f64>() / n_samples as f64).clamp(PRIOR_EPS, 1.0 - PRIOR_EPS);
        let init = (prior / (1.0 - prior)).ln();

        let params = TreeParams {
            max_depth: Some(max_depth),
            ..TreeParams::default()
        };
        let rows: Vec<usize> = (0..n_samples).collect();
        let mut raw = vec![init; n_samples];
        let mut trees = Vec::with_capacity(n_estimators);
        // Trees see every feature, the generator is never drawn from.
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        for _ in 0..n_estimators {
            let residuals: Vec<f64> = targets
                .iter()
                .zip(&raw)
                .map(|(t, r)| t - sigmoid(*r))
                .collect();

            let tree = DecisionTree::fit(x, Targets::Values(&residuals), &rows, params, &mut rng);
            for (i, row) in x.rows().into_iter().enumerate() {
                raw[i] += learning_rate * tree.leaf_value(row)[0];
            }
            trees.push(tree);
        }

        debug!(
            "Fitted gradient boosting: {} stages, prior {:.4}",
            trees.len(),
            prior
        );

        Ok(Self {
            init,
            learning_rate,
            trees,
        })
    }

    /// Raw log-odds of the positive class.
    pub fn decision_value(&self, sample: ArrayView1<'_, f64>) -> f64 {
        self.init
            + self.learning_rate
                * self
                    .trees
                    .iter()
                    .map(|tree| tree.leaf_value(sample)[0])
                    .sum::<f64>()
    }

    /// Class probabilities, `rows x 2`.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Array2<f64> {
        let mut proba = Array2::<f64>::zeros((x.nrows(), 2));
        for (i, row) in x.rows().into_iter().enumerate() {
            let p = sigmoid(self.decision_value(row));
            proba[[i, 0]] = 1.0 - p;
            proba[[i, 1]] = p;
        }
        proba
    }

    pub fn init(&self) -> f64 {
        self.init
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supports_only_binary() {
        assert!(GradientBoostingClassifier::supports(2));
        assert!(!GradientBoostingClassifier::supports(1));
        assert!(!GradientBoostingClassifier::supports(3));
    }

    #[test]
    fn test_boosting_separates_threshold() {
        let x = Array2::from_shape_vec((8, 1), vec![1.0, 2.0, 3.0, 4.0, 10.0, 11.0, 12.0, 13.0])
            .unwrap();
        let y = [0, 0, 0, 0, 1, 1, 1, 1];
        let model = GradientBoostingClassifier::fit(&x, &y, 2, 50, 3, 0.1, 42).unwrap();
        let proba = model.predict_proba(&x);

        assert!(model.init().abs() < 1e-12);
        for i in 0..4 {
            assert!(proba[[i, 1]] < 0.5);
        }
        for i in 4..8 {
            assert!(proba[[i, 1]] > 0.5);
        }
    }

    #[test]
    fn test_boosting_rejects_multiclass() {
        let x = Array2::from_shape_vec((3, 1), vec![1.0, 2.0, 3.0]).unwrap();
        let err = GradientBoostingClassifier::fit(&x, &[0, 1, 2], 3, 10, 3, 0.1, 42).unwrap_err();
        assert_eq!(err.error_code(), "TRAINING_ERROR");
    }
}
