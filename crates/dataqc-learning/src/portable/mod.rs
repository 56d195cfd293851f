//! Portable model format.
//!
//! A supervised pipeline with numeric features only is exported as an
//! ONNX-style JSON graph that can be executed without the native model
//! artifact.

mod export;
mod graph;
mod session;

pub use export::{LABEL_OUTPUT, PROBABILITIES_OUTPUT, export_graph};
pub use graph::{
    Attribute, ElemType, FEATURE_NAMES_KEY, Graph, IR_VERSION, ML_DOMAIN, ModelGraph, Node,
    OpsetImport, PORTABLE_INPUT_NAME, ValueInfo,
};
pub use session::InferenceSession;
