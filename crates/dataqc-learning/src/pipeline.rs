//! Training pipeline.
//!
//! [`TrainingPipeline`] fits either a supervised classifier (when a target
//! column is given) or an isolation forest, persists the native artifact and,
//! for supervised models, tries to export a portable graph.
//!
//! # Supervised branch
//!
//! 1. Drop rows whose target is null
//! 2. Partition the remaining columns into numeric and categorical features
//! 3. Hold out a stratified validation split (never scored)
//! 4. Fit the [`Preprocessor`] and the classifier on the training rows
//! 5. Save the native artifact, then the portable graph (best effort)
//!
//! # Example
//!
//! ```rust,ignore
//! use dataqc_learning::{ModelStore, TrainingConfig, TrainingPipeline};
//!
//! let store = ModelStore::open("data/model_store")?;
//! let (model_id, paths) = store.allocate()?;
//!
//! let pipeline = TrainingPipeline::builder()
//!     .config(TrainingConfig::default())
//!     .build()?;
//! let report = pipeline.train(&df, Some("clicked"), &paths)?;
//! println!("{} -> {:?}", model_id, report.kind);
//! ```

use crate::artifact::ModelArtifact;
use crate::config::{ClassifierChoice, TrainingConfig};
use crate::error::{LearningError, Result};
use crate::features::{FeatureColumns, column_as_labels, numeric_matrix};
use crate::models::{
    Classifier, GradientBoostingClassifier, IsolationForest, RandomForestClassifier,
};
use crate::portable::{ModelGraph, export_graph};
use crate::preprocessing::Preprocessor;
use crate::split::stratified_split;
use crate::store::ArtifactPaths;
use crate::types::{ClassLabel, ModelKind, TrainingReport};
use dataqc_processing::numeric_column_names;
use ndarray::Axis;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// A fitted supervised model: preprocessing plus classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupervisedPipeline {
    /// Target column the classifier predicts.
    pub target: String,
    pub preprocessor: Preprocessor,
    /// Class labels, ascending. Classifier output `k` is `classes[k]`.
    pub classes: Vec<ClassLabel>,
    pub classifier: Classifier,
}

impl SupervisedPipeline {
    /// Raw feature columns in fitted order.
    pub fn feature_names(&self) -> Vec<String> {
        self.preprocessor.feature_names()
    }

    /// Predict one label per row of `df`.
    ///
    /// Columns not used in training are ignored. Absent or mistyped feature
    /// columns fail with [`LearningError::ColumnMismatch`].
    pub fn predict(&self, df: &DataFrame) -> Result<Vec<ClassLabel>> {
        let x = self.preprocessor.transform(df)?;
        self.classifier
            .predict(&x)
            .into_iter()
            .map(|k| {
                self.classes.get(k).cloned().ok_or_else(|| {
                    LearningError::Prediction(format!("class index {} out of range", k))
                })
            })
            .collect()
    }
}

/// Fits and persists models.
///
/// Use [`TrainingPipeline::builder()`] to construct one.
#[derive(Debug, Clone)]
pub struct TrainingPipeline {
    config: TrainingConfig,
}

impl TrainingPipeline {
    /// Create a new builder for `TrainingPipeline`.
    #[must_use]
    pub fn builder() -> TrainingPipelineBuilder {
        TrainingPipelineBuilder::default()
    }

    #[must_use]
    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Train on `df` and write the artifacts to `paths`.
    ///
    /// With a `target` the supervised branch runs, otherwise the
    /// unsupervised one. Portable export failures are logged and leave no
    /// portable file; everything else is returned.
    ///
    /// # Errors
    ///
    /// - [`Training`](LearningError::Training): no rows, unknown target,
    ///   every target null, no usable features, or a fit failure
    /// - [`Io`](LearningError::Io) / [`Serialization`](LearningError::Serialization):
    ///   the native artifact could not be written
    pub fn train(
        &self,
        df: &DataFrame,
        target: Option<&str>,
        paths: &ArtifactPaths,
    ) -> Result<TrainingReport> {
        if df.height() == 0 || df.width() == 0 {
            return Err(LearningError::Training("dataset has no rows".to_string()));
        }

        match target {
            Some(target) => self.train_supervised(df, target, paths),
            None => self.train_unsupervised(df, paths),
        }
    }

    fn train_supervised(
        &self,
        df: &DataFrame,
        target: &str,
        paths: &ArtifactPaths,
    ) -> Result<TrainingReport> {
        if df.column(target).is_err() {
            return Err(LearningError::Training(format!(
                "target column '{}' not found",
                target
            )));
        }

        let labels = column_as_labels(df, target)?;
        let (rows, row_labels): (Vec<usize>, Vec<ClassLabel>) = labels
            .into_iter()
            .enumerate()
            .filter_map(|(row, label)| label.map(|l| (row, l)))
            .unzip();

        let dropped = df.height() - rows.len();
        if dropped > 0 {
            warn!(
                "Dropping {} rows with a null '{}' before training",
                dropped, target
            );
        }
        if rows.is_empty() {
            return Err(LearningError::Training(format!(
                "target column '{}' has no values",
                target
            )));
        }

        let columns = FeatureColumns::partition(df, Some(target));
        if !columns.dropped.is_empty() {
            warn!(
                "Ignoring columns with unsupported types: {}",
                columns.dropped.join(", ")
            );
        }
        if columns.is_empty() {
            return Err(LearningError::Training(
                "no usable feature columns".to_string(),
            ));
        }

        let classes: Vec<ClassLabel> = row_labels
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let class_index: BTreeMap<&ClassLabel, usize> =
            classes.iter().enumerate().map(|(k, label)| (label, k)).collect();
        let y: Vec<usize> = row_labels.iter().map(|l| class_index[l]).collect();
        let n_classes = classes.len();

        // Positions into `rows`, not DataFrame rows.
        let train_positions: Vec<usize> = if n_classes > 1 {
            let split = stratified_split(
                &y,
                n_classes,
                self.config.validation_fraction,
                self.config.random_seed,
            );
            debug!(
                "Stratified split: {} training rows, {} held out",
                split.train.len(),
                split.validation.len()
            );
            split.train
        } else {
            (0..rows.len()).collect()
        };

        let train_rows: Vec<usize> = train_positions.iter().map(|&p| rows[p]).collect();
        let y_train: Vec<usize> = train_positions.iter().map(|&p| y[p]).collect();

        let preprocessor = Preprocessor::fit(df, &columns, &train_rows)?;
        let x_train = preprocessor.transform(df)?.select(Axis(0), &train_rows);

        let classifier = self.fit_classifier(&x_train, &y_train, n_classes)?;
        info!(
            "Trained {} on {} rows, {} features, {} classes",
            classifier.kind().as_str(),
            train_rows.len(),
            preprocessor.output_width(),
            n_classes
        );

        let pipeline = SupervisedPipeline {
            target: target.to_string(),
            preprocessor,
            classes,
            classifier,
        };
        let report = TrainingReport {
            kind: ModelKind::Supervised,
            target: Some(target.to_string()),
            classifier: Some(pipeline.classifier.kind()),
            feature_columns: pipeline.feature_names(),
            training_rows: train_rows.len(),
            portable_exported: false,
        };

        let graph = export_graph(&pipeline);
        ModelArtifact::Supervised(pipeline).save(&paths.native)?;
        debug!("Saved native artifact to {}", paths.native.display());

        let portable_exported = match graph {
            Ok(graph) => write_portable(&graph, paths),
            Err(e) => {
                warn!("Portable export skipped: {}", e);
                false
            }
        };

        Ok(TrainingReport {
            portable_exported,
            ..report
        })
    }

    fn fit_classifier(
        &self,
        x: &ndarray::Array2<f64>,
        y: &[usize],
        n_classes: usize,
    ) -> Result<Classifier> {
        let config = &self.config;
        let boosting = match config.classifier {
            ClassifierChoice::Auto => GradientBoostingClassifier::supports(n_classes),
            ClassifierChoice::GradientBoosting => true,
            ClassifierChoice::RandomForest => false,
        };

        if boosting {
            GradientBoostingClassifier::fit(
                x,
                y,
                n_classes,
                config.n_estimators,
                config.boosting_max_depth,
                config.learning_rate,
                config.random_seed,
            )
            .map(Classifier::GradientBoosting)
        } else {
            RandomForestClassifier::fit(
                x,
                y,
                n_classes,
                config.n_estimators,
                config.forest_max_depth,
                config.random_seed,
            )
            .map(Classifier::RandomForest)
        }
    }

    fn train_unsupervised(&self, df: &DataFrame, paths: &ArtifactPaths) -> Result<TrainingReport> {
        let feature_columns = numeric_column_names(df);
        if feature_columns.is_empty() {
            return Err(LearningError::Training(
                "no numeric columns to fit an anomaly detector on".to_string(),
            ));
        }

        let x = numeric_matrix(df, &feature_columns, 0.0)?;
        let detector = IsolationForest::fit(
            &x,
            self.config.n_estimators,
            self.config.isolation_max_samples,
            self.config.random_seed,
        )?;
        info!(
            "Trained isolation forest on {} rows, {} columns",
            x.nrows(),
            feature_columns.len()
        );

        let report = TrainingReport {
            kind: ModelKind::Unsupervised,
            target: None,
            classifier: None,
            feature_columns: feature_columns.clone(),
            training_rows: x.nrows(),
            portable_exported: false,
        };

        ModelArtifact::Unsupervised {
            detector,
            feature_columns,
        }
        .save(&paths.native)?;
        debug!("Saved native artifact to {}", paths.native.display());

        Ok(report)
    }
}

/// Write the portable graph. Failures are logged, never returned.
fn write_portable(graph: &ModelGraph, paths: &ArtifactPaths) -> bool {
    match graph.save(&paths.portable) {
        Ok(()) => {
            debug!("Saved portable graph to {}", paths.portable.display());
            true
        }
        Err(e) => {
            warn!("Failed to write portable graph: {}", e);
            if paths.portable.exists() {
                if let Err(e) = std::fs::remove_file(&paths.portable) {
                    warn!("Failed to remove partial portable graph: {}", e);
                }
            }
            false
        }
    }
}

/// Builder for [`TrainingPipeline`].
#[derive(Debug, Clone, Default)]
pub struct TrainingPipelineBuilder {
    config: Option<TrainingConfig>,
}

impl TrainingPipelineBuilder {
    /// Set the training configuration (default: [`TrainingConfig::default()`]).
    #[must_use]
    pub fn config(mut self, config: TrainingConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Validate the configuration and build the pipeline.
    pub fn build(self) -> Result<TrainingPipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        Ok(TrainingPipeline { config })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ModelStore;
    use polars::prelude::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn small_config() -> TrainingConfig {
        TrainingConfig::builder().n_estimators(20).build().unwrap()
    }

    fn setup() -> (TempDir, ArtifactPaths) {
        let tmp = TempDir::new().unwrap();
        let store = ModelStore::open(tmp.path()).unwrap();
        let paths = store.paths("test0001").unwrap();
        (tmp, paths)
    }

    // ==================== builder tests ====================

    #[test]
    fn test_builder_rejects_invalid_config() {
        let config = TrainingConfig {
            n_estimators: 0,
            ..TrainingConfig::default()
        };
        let err = TrainingPipeline::builder().config(config).build().unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_builder_defaults() {
        let pipeline = TrainingPipeline::builder().build().unwrap();
        assert_eq!(pipeline.config(), &TrainingConfig::default());
    }

    // ==================== supervised tests ====================

    #[test]
    fn test_null_targets_are_dropped() {
        let (_tmp, paths) = setup();
        let df = df![
            "x" => [1.0f64, 2.0, 3.0, 10.0, 11.0, 12.0, 5.0],
            "y" => [Some(0i64), Some(0), Some(0), Some(1), Some(1), Some(1), None],
        ]
        .unwrap();

        let pipeline = TrainingPipeline::builder().config(small_config()).build().unwrap();
        let report = pipeline.train(&df, Some("y"), &paths).unwrap();

        // 6 labelled rows, ceil(0.15 * 6) = 1 held out
        assert_eq!(report.training_rows, 5);
        assert_eq!(report.classifier, Some(crate::models::ClassifierKind::GradientBoosting));
        assert!(report.portable_exported);
        assert!(paths.native.exists());
        assert!(paths.portable.exists());
    }

    #[test]
    fn test_all_null_target_fails() {
        let (_tmp, paths) = setup();
        let df = df![
            "x" => [1.0f64, 2.0],
            "y" => [None::<i64>, None],
        ]
        .unwrap();
        let pipeline = TrainingPipeline::builder().config(small_config()).build().unwrap();
        let err = pipeline.train(&df, Some("y"), &paths).unwrap_err();
        assert_eq!(err.error_code(), "TRAINING_ERROR");
        assert!(!paths.native.exists());
    }

    #[test]
    fn test_target_only_dataset_fails() {
        let (_tmp, paths) = setup();
        let df = df!["y" => [0i64, 1, 0, 1]].unwrap();
        let pipeline = TrainingPipeline::builder().config(small_config()).build().unwrap();
        let err = pipeline.train(&df, Some("y"), &paths).unwrap_err();
        assert!(err.to_string().contains("no usable feature columns"));
    }

    #[test]
    fn test_single_class_uses_forest_on_all_rows() {
        let (_tmp, paths) = setup();
        let df = df![
            "x" => [1.0f64, 2.0, 3.0],
            "y" => ["a", "a", "a"],
        ]
        .unwrap();
        let pipeline = TrainingPipeline::builder().config(small_config()).build().unwrap();
        let report = pipeline.train(&df, Some("y"), &paths).unwrap();

        assert_eq!(report.training_rows, 3);
        assert_eq!(report.classifier, Some(crate::models::ClassifierKind::RandomForest));

        let ModelArtifact::Supervised(model) = ModelArtifact::load(&paths.native).unwrap() else {
            panic!("expected supervised artifact");
        };
        assert_eq!(
            model.predict(&df).unwrap(),
            vec![ClassLabel::Text("a".into()); 3]
        );
    }

    #[test]
    fn test_forced_boosting_on_multiclass_fails() {
        let (_tmp, paths) = setup();
        let df = df![
            "x" => [1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0],
            "y" => [0i64, 1, 2, 0, 1, 2],
        ]
        .unwrap();
        let config = TrainingConfig::builder()
            .n_estimators(5)
            .classifier(ClassifierChoice::GradientBoosting)
            .build()
            .unwrap();
        let pipeline = TrainingPipeline::builder().config(config).build().unwrap();
        let err = pipeline.train(&df, Some("y"), &paths).unwrap_err();
        assert_eq!(err.error_code(), "TRAINING_ERROR");
    }

    #[test]
    fn test_categorical_feature_skips_portable_export() {
        let (_tmp, paths) = setup();
        let df = df![
            "city" => ["rome", "paris", "rome", "paris", "rome", "paris"],
            "y" => [1i64, 0, 1, 0, 1, 0],
        ]
        .unwrap();
        let pipeline = TrainingPipeline::builder().config(small_config()).build().unwrap();
        let report = pipeline.train(&df, Some("y"), &paths).unwrap();

        assert!(!report.portable_exported);
        assert!(paths.native.exists());
        assert!(!paths.portable.exists());
    }

    #[test]
    fn test_unknown_target_fails() {
        let (_tmp, paths) = setup();
        let df = df!["x" => [1.0f64]].unwrap();
        let pipeline = TrainingPipeline::builder().build().unwrap();
        let err = pipeline.train(&df, Some("nope"), &paths).unwrap_err();
        assert!(err.to_string().contains("'nope' not found"));
    }

    // ==================== unsupervised tests ====================

    #[test]
    fn test_unsupervised_uses_numeric_columns() {
        let (_tmp, paths) = setup();
        let df = df![
            "a" => [Some(1.0f64), None, Some(3.0)],
            "label" => ["x", "y", "z"],
            "b" => [1i64, 2, 3],
        ]
        .unwrap();
        let pipeline = TrainingPipeline::builder().config(small_config()).build().unwrap();
        let report = pipeline.train(&df, None, &paths).unwrap();

        assert_eq!(report.kind, ModelKind::Unsupervised);
        assert_eq!(report.feature_columns, vec!["a", "b"]);
        assert!(!paths.portable.exists());

        match ModelArtifact::load(&paths.native).unwrap() {
            ModelArtifact::Unsupervised {
                feature_columns, ..
            } => assert_eq!(feature_columns, vec!["a", "b"]),
            other => panic!("unexpected artifact {:?}", other.kind()),
        }
    }

    #[test]
    fn test_unsupervised_without_numeric_columns_fails() {
        let (_tmp, paths) = setup();
        let df = df!["label" => ["x", "y"]].unwrap();
        let pipeline = TrainingPipeline::builder().build().unwrap();
        let err = pipeline.train(&df, None, &paths).unwrap_err();
        assert_eq!(err.error_code(), "TRAINING_ERROR");
    }

    #[test]
    fn test_empty_dataset_fails() {
        let (_tmp, paths) = setup();
        let df = DataFrame::empty();
        let pipeline = TrainingPipeline::builder().build().unwrap();
        assert_eq!(
            pipeline.train(&df, None, &paths).unwrap_err().error_code(),
            "TRAINING_ERROR"
        );
    }
}
