//! End-to-end tests: discover a target, train, persist, predict and record
//! history against the CSV fixtures.

use dataqc_learning::{
    ClassifierKind, InferenceDispatcher, LearningError, MAX_HISTORY_ENTRIES, ModelArtifact,
    ModelKind, ModelStore, PredictionHistory, PredictionKind, PredictionOutput, TrainingConfig,
    TrainingPipeline,
};
use dataqc_processing::{discover_target, read_csv_bytes, read_csv_path};
use polars::prelude::*;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::path::PathBuf;
use tempfile::TempDir;

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

struct Workspace {
    _tmp: TempDir,
    store: ModelStore,
    history: PredictionHistory,
}

impl Workspace {
    fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let store = ModelStore::open(tmp.path().join("model_store")).unwrap();
        let history = PredictionHistory::open(tmp.path().join("prediction_history")).unwrap();
        Self {
            _tmp: tmp,
            store,
            history,
        }
    }

    fn train(&self, df: &DataFrame, target: Option<&str>) -> String {
        let (model_id, paths) = self.store.allocate().unwrap();
        let config = TrainingConfig::builder().n_estimators(50).build().unwrap();
        TrainingPipeline::builder()
            .config(config)
            .build()
            .unwrap()
            .train(df, target, &paths)
            .unwrap();
        model_id
    }

    fn dispatcher(&self) -> InferenceDispatcher<'_> {
        InferenceDispatcher::new(&self.store, &self.history)
    }
}

fn predictions(output: &PredictionOutput) -> &[serde_json::Value] {
    match output {
        PredictionOutput::Predictions(values) => values,
        PredictionOutput::AnomalyScore(_) => panic!("expected class predictions"),
    }
}

// ============================================================================
// Supervised
// ============================================================================

#[test]
fn test_click_scenario_end_to_end() {
    let ws = Workspace::new();
    let df = read_csv_path(fixtures_path().join("clicks.csv")).unwrap();

    let target = discover_target(&df).unwrap();
    assert_eq!(target.as_deref(), Some("clicked"));

    let (model_id, paths) = ws.store.allocate().unwrap();
    let report = TrainingPipeline::builder()
        .build()
        .unwrap()
        .train(&df, target.as_deref(), &paths)
        .unwrap();
    assert_eq!(report.kind, ModelKind::Supervised);
    assert_eq!(report.feature_columns, vec!["age"]);
    assert_eq!(report.classifier, Some(ClassifierKind::GradientBoosting));
    assert!(report.portable_exported);

    let new_data = read_csv_bytes(b"age\n30\n").unwrap();
    let response = ws.dispatcher().predict(&model_id, &new_data).unwrap();

    let values = predictions(&response.output);
    assert_eq!(values.len(), 1);
    assert!(values[0] == json!(0) || values[0] == json!(1));
    assert_eq!(response.history.len(), 1);
    assert_eq!(response.history[0].kind, PredictionKind::Prediction);
}

#[test]
fn test_response_json_shape() {
    let ws = Workspace::new();
    let df = read_csv_path(fixtures_path().join("clicks.csv")).unwrap();
    let model_id = ws.train(&df, Some("clicked"));

    let response = ws
        .dispatcher()
        .predict(&model_id, &read_csv_bytes(b"age\n30\n60\n").unwrap())
        .unwrap();
    let json = serde_json::to_value(&response).unwrap();

    assert_eq!(json["predictions"].as_array().unwrap().len(), 2);
    assert_eq!(json["history"][0]["type"], "prediction");
    assert!(json.get("anomaly_score").is_none());
}

#[test]
fn test_round_trip_on_training_data() {
    let ws = Workspace::new();
    let df = read_csv_path(fixtures_path().join("clicks.csv")).unwrap();
    let model_id = ws.train(&df, Some("clicked"));

    // The frame still holds the numeric target; the graph's feature names
    // narrow the input back to `age`.
    let response = ws.dispatcher().predict(&model_id, &df).unwrap();
    assert_eq!(predictions(&response.output).len(), df.height());
}

#[test]
fn test_multiclass_uses_random_forest() {
    let ws = Workspace::new();
    let df = read_csv_path(fixtures_path().join("species.csv")).unwrap();
    assert_eq!(discover_target(&df).unwrap(), None);

    let (model_id, paths) = ws.store.allocate().unwrap();
    let config = TrainingConfig::builder().n_estimators(50).build().unwrap();
    let report = TrainingPipeline::builder()
        .config(config)
        .build()
        .unwrap()
        .train(&df, Some("species"), &paths)
        .unwrap();
    assert_eq!(report.classifier, Some(ClassifierKind::RandomForest));
    assert!(report.portable_exported);

    let response = ws.dispatcher().predict(&model_id, &df).unwrap();
    let values = predictions(&response.output);
    assert_eq!(values.len(), 12);
    assert_eq!(values[0], json!("setosa"));
    assert_eq!(values[11], json!("virginica"));
}

#[test]
fn test_portable_and_native_agree() {
    let ws = Workspace::new();
    let df = read_csv_path(fixtures_path().join("species.csv")).unwrap();
    let model_id = ws.train(&df, Some("species"));
    let paths = ws.store.paths(&model_id).unwrap();

    let portable = ws.dispatcher().predict(&model_id, &df).unwrap();

    let ModelArtifact::Supervised(pipeline) = ModelArtifact::load(&paths.native).unwrap() else {
        panic!("expected supervised artifact");
    };
    let native: Vec<serde_json::Value> = pipeline
        .predict(&df)
        .unwrap()
        .iter()
        .map(|label| label.to_json())
        .collect();

    assert_eq!(predictions(&portable.output), native.as_slice());
}

#[test]
fn test_categorical_features_predict_natively() {
    let ws = Workspace::new();
    let df = df![
        "plan" => ["free", "pro", "free", "pro", "free", "pro", "free", "pro"],
        "visits" => [1i64, 9, 2, 8, 1, 7, 3, 9],
        "clicked" => [0i64, 1, 0, 1, 0, 1, 0, 1],
    ]
    .unwrap();
    let model_id = ws.train(&df, Some("clicked"));
    assert!(!ws.store.paths(&model_id).unwrap().portable.exists());

    let new_data = df![
        "plan" => ["pro", "enterprise"],
        "visits" => [Some(9i64), None],
    ]
    .unwrap();
    let response = ws.dispatcher().predict(&model_id, &new_data).unwrap();
    assert_eq!(predictions(&response.output).len(), 2);
    assert_eq!(predictions(&response.output)[0], json!(1));
}

#[test]
fn test_native_supervised_reports_column_mismatch() {
    let ws = Workspace::new();
    let df = df![
        "plan" => ["free", "pro", "free", "pro"],
        "clicked" => [0i64, 1, 0, 1],
    ]
    .unwrap();
    let model_id = ws.train(&df, Some("clicked"));

    let err = ws
        .dispatcher()
        .predict(&model_id, &df!["visits" => [3i64]].unwrap())
        .unwrap_err();
    assert!(matches!(err, LearningError::ColumnMismatch(_)));
    assert!(
        err.to_string()
            .ends_with("Please ensure prediction data has the same structure as training data.")
    );
}

// ============================================================================
// Unsupervised
// ============================================================================

#[test]
fn test_unsupervised_scores_outlier_lowest() {
    let ws = Workspace::new();
    let df = read_csv_path(fixtures_path().join("readings.csv")).unwrap();
    let target = discover_target(&df).unwrap();
    assert_eq!(target, None);

    let model_id = ws.train(&df, target.as_deref());
    let response = ws.dispatcher().predict(&model_id, &df).unwrap();

    let PredictionOutput::AnomalyScore(scores) = &response.output else {
        panic!("expected anomaly scores");
    };
    assert_eq!(scores.len(), 8);
    let lowest = scores
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i);
    assert_eq!(lowest, Some(7));
    assert_eq!(response.history[0].kind, PredictionKind::AnomalyScore);
}

#[test]
fn test_unsupervised_missing_column_is_named() {
    let ws = Workspace::new();
    let df = read_csv_path(fixtures_path().join("readings.csv")).unwrap();
    let model_id = ws.train(&df, None);

    let err = ws
        .dispatcher()
        .predict(&model_id, &df!["temperature" => [21.0f64]].unwrap())
        .unwrap_err();
    match err {
        LearningError::MissingColumns(columns) => assert_eq!(columns, vec!["pressure"]),
        other => panic!("unexpected error: {}", other),
    }
    assert!(!ws.history.path(&model_id).exists());
}

// ============================================================================
// Lookup and History
// ============================================================================

#[test]
fn test_unknown_model_is_not_found() {
    let ws = Workspace::new();
    let df = read_csv_path(fixtures_path().join("clicks.csv")).unwrap();

    let err = ws.dispatcher().predict("deadbeef", &df).unwrap_err();
    assert_eq!(err.error_code(), "MODEL_NOT_FOUND");
    assert_eq!(err.to_string(), "Model not found");
    assert!(!ws.history.path("deadbeef").exists());
    assert!(ws.history.read("deadbeef").is_empty());
}

#[test]
fn test_history_is_bounded_and_chronological() {
    let ws = Workspace::new();
    let df = read_csv_path(fixtures_path().join("readings.csv")).unwrap();
    let model_id = ws.train(&df, None);

    let mut first_timestamp = None;
    let mut last = None;
    for i in 0..=MAX_HISTORY_ENTRIES {
        let batch = df.slice(i as i64 % 8, 1);
        let response = ws.dispatcher().predict(&model_id, &batch).unwrap();
        if i == 0 {
            first_timestamp = Some(response.history[0].timestamp.clone());
        }
        last = Some(response);
    }

    let history = last.unwrap().history;
    assert_eq!(history.len(), MAX_HISTORY_ENTRIES);
    assert!(history.iter().all(|e| Some(&e.timestamp) != first_timestamp.as_ref()));
    assert!(
        history
            .windows(2)
            .all(|pair| pair[0].timestamp <= pair[1].timestamp)
    );
    assert_eq!(ws.history.read(&model_id), history);
}

#[test]
fn test_corrupt_history_does_not_fail_prediction() {
    let ws = Workspace::new();
    let df = read_csv_path(fixtures_path().join("readings.csv")).unwrap();
    let model_id = ws.train(&df, None);
    std::fs::write(ws.history.path(&model_id), "{broken").unwrap();

    let response = ws.dispatcher().predict(&model_id, &df).unwrap();
    assert!(response.history.is_empty());
}

#[test]
fn test_corrupt_artifact_is_load_error() {
    let ws = Workspace::new();
    let df = read_csv_path(fixtures_path().join("readings.csv")).unwrap();
    let model_id = ws.train(&df, None);
    std::fs::write(ws.store.paths(&model_id).unwrap().native, b"garbage").unwrap();

    let err = ws.dispatcher().predict(&model_id, &df).unwrap_err();
    assert_eq!(err.error_code(), "MODEL_LOAD_ERROR");
    assert!(err.to_string().starts_with("Failed to load model"));
}

// ============================================================================
// Extreme Values
// ============================================================================

fn anomaly_scores(output: &PredictionOutput) -> &[f64] {
    match output {
        PredictionOutput::AnomalyScore(scores) => scores,
        PredictionOutput::Predictions(_) => panic!("expected anomaly scores"),
    }
}

#[test]
fn test_supervised_training_on_extreme_values() {
    let ws = Workspace::new();
    let df = read_csv_path(fixtures_path().join("extremes.csv")).unwrap();
    assert_eq!(df.column("score").unwrap().dtype(), &DataType::Float64);

    let (model_id, paths) = ws.store.allocate().unwrap();
    let config = TrainingConfig::builder().n_estimators(20).build().unwrap();
    let report = TrainingPipeline::builder()
        .config(config)
        .build()
        .unwrap()
        .train(&df, Some("clicked"), &paths)
        .unwrap();

    // The score statistics do not fit the f32 graph input
    assert!(!report.portable_exported);
    assert!(!paths.portable.exists());

    let response = ws.dispatcher().predict(&model_id, &df).unwrap();
    assert_eq!(predictions(&response.output).len(), 6);
}

#[test]
fn test_unsupervised_training_on_extreme_spread() {
    let ws = Workspace::new();
    let df = read_csv_bytes(b"a,b\n-1e308,1\n1e308,2\n0,3\n5,4\n").unwrap();
    let model_id = ws.train(&df, None);

    let response = ws.dispatcher().predict(&model_id, &df).unwrap();
    let scores = anomaly_scores(&response.output);
    assert_eq!(scores.len(), 4);
    assert!(scores.iter().all(|s| s.is_finite()));
}

#[test]
fn test_unsupervised_training_on_infinite_values() {
    let ws = Workspace::new();
    let df = read_csv_bytes(b"a,b\n-1e308,1\ninf,2\n0,3\n5,4\n").unwrap();
    let model_id = ws.train(&df, None);

    let response = ws.dispatcher().predict(&model_id, &df).unwrap();
    let scores = anomaly_scores(&response.output);
    assert_eq!(scores.len(), 4);
    assert!(scores.iter().all(|s| s.is_finite()));
}
