//! Common types used throughout the dataqc-learning crate.
//!
//! # Overview
//!
//! - [`ClassLabel`]: a supervised target value
//! - [`ModelKind`]: supervised or unsupervised artifact
//! - [`TrainingReport`]: what a training run produced
//! - [`PredictionOutput`] / [`PredictionResponse`]: inference results
//! - [`HistoryEntry`] / [`PredictionKind`]: prediction history records

use crate::models::ClassifierKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

/// A value of a supervised target column.
///
/// A column has a single dtype, so labels of one model share a variant.
/// Ordering sorts within a variant; floats use total ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClassLabel {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ClassLabel {
    fn rank(&self) -> u8 {
        match self {
            Self::Bool(_) => 0,
            Self::Int(_) => 1,
            Self::Float(_) => 2,
            Self::Text(_) => 3,
        }
    }

    /// JSON representation used in prediction responses.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(i) => Value::Number((*i).into()),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Self::Text(s) => Value::String(s.clone()),
        }
    }
}

impl PartialEq for ClassLabel {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ClassLabel {}

impl PartialOrd for ClassLabel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ClassLabel {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Float(a), Self::Float(b)) => a.total_cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

/// Kind of a trained model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Supervised,
    Unsupervised,
}

impl ModelKind {
    /// Returns the string used in responses.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Supervised => "supervised",
            ModelKind::Unsupervised => "unsupervised",
        }
    }
}

/// Result of a training run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingReport {
    /// Which branch was taken.
    pub kind: ModelKind,

    /// Target column of a supervised model.
    pub target: Option<String>,

    /// Fitted classifier of a supervised model.
    pub classifier: Option<ClassifierKind>,

    /// Raw feature columns in fitted order.
    pub feature_columns: Vec<String>,

    /// Rows used to fit (after dropping null targets and the held-out split).
    pub training_rows: usize,

    /// Whether the portable graph was written.
    pub portable_exported: bool,
}

/// Type of a recorded prediction call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionKind {
    Prediction,
    AnomalyScore,
}

/// One record of the prediction history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Local time, ISO-8601 with microseconds.
    pub timestamp: String,

    /// Trend value of the batch.
    pub value: f64,

    #[serde(rename = "type")]
    pub kind: PredictionKind,
}

/// Per-row model outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionOutput {
    /// Class labels from a supervised model.
    Predictions(Vec<Value>),
    /// Decision-function scores from an anomaly detector.
    AnomalyScore(Vec<f64>),
}

impl PredictionOutput {
    /// Number of per-row outputs.
    pub fn len(&self) -> usize {
        match self {
            Self::Predictions(values) => values.len(),
            Self::AnomalyScore(scores) => scores.len(),
        }
    }

    /// Whether there are no outputs.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// History type recorded for this output.
    pub fn kind(&self) -> PredictionKind {
        match self {
            Self::Predictions(_) => PredictionKind::Prediction,
            Self::AnomalyScore(_) => PredictionKind::AnomalyScore,
        }
    }

    /// Single number summarizing the batch for the history.
    ///
    /// Numeric and boolean outputs use the mean. Other outputs use the first
    /// value when it is a string of ASCII digits, else 0.0.
    pub fn trend_value(&self) -> f64 {
        match self {
            Self::AnomalyScore(scores) => mean(scores.iter().copied()),
            Self::Predictions(values) => match values.first() {
                Some(Value::Number(_)) | Some(Value::Bool(_)) => {
                    mean(values.iter().map(json_as_f64))
                }
                Some(Value::String(s)) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => {
                    s.parse().unwrap_or(0.0)
                }
                _ => 0.0,
            },
        }
    }
}

fn json_as_f64(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::Bool(b) => f64::from(u8::from(*b)),
        _ => 0.0,
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}

/// Response of a prediction call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    #[serde(flatten)]
    pub output: PredictionOutput,

    /// Stored history after this call, oldest first.
    pub history: Vec<HistoryEntry>,
}
