//! Tree-based models.
//!
//! - [`DecisionTree`]: CART building block
//! - [`RandomForestClassifier`]: bagged trees, any number of classes
//! - [`GradientBoostingClassifier`]: boosted trees, binary targets
//! - [`IsolationForest`]: unsupervised anomaly scores

mod decision_tree;
mod gradient_boosting;
mod isolation_forest;
mod random_forest;

pub use decision_tree::{DecisionTree, Targets, TreeNode, TreeParams};
pub use gradient_boosting::{GradientBoostingClassifier, sigmoid};
pub use isolation_forest::{IsolationForest, IsolationTree, average_path_length};
pub use random_forest::RandomForestClassifier;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Which classifier a supervised pipeline holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    GradientBoosting,
    RandomForest,
}

impl ClassifierKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassifierKind::GradientBoosting => "gradient_boosting",
            ClassifierKind::RandomForest => "random_forest",
        }
    }
}

/// A fitted supervised classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Classifier {
    GradientBoosting(GradientBoostingClassifier),
    RandomForest(RandomForestClassifier),
}

impl Classifier {
    pub fn kind(&self) -> ClassifierKind {
        match self {
            Self::GradientBoosting(_) => ClassifierKind::GradientBoosting,
            Self::RandomForest(_) => ClassifierKind::RandomForest,
        }
    }

    /// Class probabilities, `rows x classes`.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Array2<f64> {
        match self {
            Self::GradientBoosting(model) => model.predict_proba(x),
            Self::RandomForest(model) => model.predict_proba(x),
        }
    }

    /// Most probable class index per row, ties to the lowest index.
    pub fn predict(&self, x: &Array2<f64>) -> Vec<usize> {
        self.predict_proba(x)
            .rows()
            .into_iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .fold((0, f64::NEG_INFINITY), |(best, best_p), (k, &p)| {
                        if p > best_p { (k, p) } else { (best, best_p) }
                    })
                    .0
            })
            .collect()
    }
}
