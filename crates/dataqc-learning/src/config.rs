//! Configuration for the training pipeline.
//!
//! # Example
//!
//! ```
//! use dataqc_learning::{ClassifierChoice, TrainingConfig};
//!
//! let config = TrainingConfig::builder()
//!     .classifier(ClassifierChoice::RandomForest)
//!     .n_estimators(50)
//!     .build()
//!     .expect("valid config");
//! ```

use crate::error::LearningError;
use serde::{Deserialize, Serialize};

/// Which supervised classifier to fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierChoice {
    /// Gradient boosting when the target supports it, random forest otherwise.
    #[default]
    Auto,
    /// Always gradient boosting. Training fails for non-binary targets.
    GradientBoosting,
    /// Always random forest.
    RandomForest,
}

/// Configuration for supervised and unsupervised training.
///
/// Use [`TrainingConfig::builder()`] to construct a validated configuration.
///
/// # Validation
///
/// [`build()`](TrainingConfigBuilder::build) rejects:
/// - `validation_fraction` outside `(0.0, 1.0)`
/// - `n_estimators`, `isolation_max_samples` or `boosting_max_depth` of 0
/// - `learning_rate` that is not a positive finite number
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingConfig {
    /// Fraction of rows held out by the stratified split (default: 0.15).
    ///
    /// The held-out rows are not scored.
    pub validation_fraction: f64,

    /// Seed for the split, bootstrap sampling and isolation trees (default: 42).
    pub random_seed: u64,

    /// Trees per ensemble (default: 200).
    pub n_estimators: usize,

    /// Maximum depth of boosted trees (default: 3).
    pub boosting_max_depth: usize,

    /// Maximum depth of forest trees (default: unlimited).
    pub forest_max_depth: Option<usize>,

    /// Shrinkage applied to each boosted tree (default: 0.1).
    pub learning_rate: f64,

    /// Classifier selection (default: [`ClassifierChoice::Auto`]).
    pub classifier: ClassifierChoice,

    /// Upper bound on rows drawn per isolation tree (default: 256).
    pub isolation_max_samples: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            validation_fraction: 0.15,
            random_seed: 42,
            n_estimators: 200,
            boosting_max_depth: 3,
            forest_max_depth: None,
            learning_rate: 0.1,
            classifier: ClassifierChoice::Auto,
            isolation_max_samples: 256,
        }
    }
}

impl TrainingConfig {
    /// Create a new builder for `TrainingConfig`.
    #[must_use]
    pub fn builder() -> TrainingConfigBuilder {
        TrainingConfigBuilder::default()
    }

    /// Check every constraint listed on the type.
    pub fn validate(&self) -> Result<(), LearningError> {
        if !(self.validation_fraction > 0.0 && self.validation_fraction < 1.0) {
            return Err(LearningError::InvalidConfig(
                "validation_fraction must be between 0.0 and 1.0 (exclusive)".to_string(),
            ));
        }

        if self.n_estimators == 0 {
            return Err(LearningError::InvalidConfig(
                "n_estimators must be at least 1".to_string(),
            ));
        }

        if self.boosting_max_depth == 0 {
            return Err(LearningError::InvalidConfig(
                "boosting_max_depth must be at least 1".to_string(),
            ));
        }

        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(LearningError::InvalidConfig(
                "learning_rate must be a positive number".to_string(),
            ));
        }

        if self.isolation_max_samples == 0 {
            return Err(LearningError::InvalidConfig(
                "isolation_max_samples must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for [`TrainingConfig`].
#[derive(Debug, Clone, Default)]
pub struct TrainingConfigBuilder {
    config: TrainingConfig,
}

impl TrainingConfigBuilder {
    /// Set the held-out fraction (default: 0.15).
    #[must_use]
    pub fn validation_fraction(mut self, fraction: f64) -> Self {
        self.config.validation_fraction = fraction;
        self
    }

    /// Set the random seed (default: 42).
    #[must_use]
    pub fn random_seed(mut self, seed: u64) -> Self {
        self.config.random_seed = seed;
        self
    }

    /// Set the ensemble size (default: 200).
    #[must_use]
    pub fn n_estimators(mut self, n: usize) -> Self {
        self.config.n_estimators = n;
        self
    }

    /// Set the boosted tree depth (default: 3).
    #[must_use]
    pub fn boosting_max_depth(mut self, depth: usize) -> Self {
        self.config.boosting_max_depth = depth;
        self
    }

    /// Limit forest tree depth (default: unlimited).
    #[must_use]
    pub fn forest_max_depth(mut self, depth: usize) -> Self {
        self.config.forest_max_depth = Some(depth);
        self
    }

    /// Set the boosting learning rate (default: 0.1).
    #[must_use]
    pub fn learning_rate(mut self, rate: f64) -> Self {
        self.config.learning_rate = rate;
        self
    }

    /// Force or auto-select the classifier.
    #[must_use]
    pub fn classifier(mut self, choice: ClassifierChoice) -> Self {
        self.config.classifier = choice;
        self
    }

    /// Set the isolation tree sample cap (default: 256).
    #[must_use]
    pub fn isolation_max_samples(mut self, n: usize) -> Self {
        self.config.isolation_max_samples = n;
        self
    }

    /// Build the configuration, validating all settings.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::InvalidConfig`] when a constraint of
    /// [`TrainingConfig`] is violated.
    pub fn build(self) -> Result<TrainingConfig, LearningError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
