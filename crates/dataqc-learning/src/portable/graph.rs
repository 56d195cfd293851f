//! ONNX-style inference graph stored as JSON.
//!
//! The layout follows the ONNX `ModelProto` structure (ir version, opset
//! imports, metadata properties, a graph of typed inputs/outputs and
//! operator nodes). Operators use the ONNX-ML names and attribute
//! conventions.

use crate::error::{LearningError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Name of the single graph input.
pub const PORTABLE_INPUT_NAME: &str = "float_input";

/// Metadata key holding the JSON-encoded feature column names.
pub const FEATURE_NAMES_KEY: &str = "feature_names";

pub const IR_VERSION: i64 = 8;
pub const ML_DOMAIN: &str = "ai.onnx.ml";

/// Element type of a graph tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ElemType {
    Float,
    Int64,
    String,
}

/// Typed graph input or output. `None` dimensions are dynamic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueInfo {
    pub name: String,
    pub elem_type: ElemType,
    pub shape: Vec<Option<i64>>,
}

/// Operator attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Attribute {
    Int(i64),
    Float(f64),
    String(String),
    Ints(Vec<i64>),
    Floats(Vec<f64>),
    Strings(Vec<String>),
}

/// Operator node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub op_type: String,
    pub domain: String,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub attributes: BTreeMap<String, Attribute>,
}

impl Node {
    pub fn new(
        name: impl Into<String>,
        op_type: impl Into<String>,
        inputs: Vec<String>,
        outputs: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            op_type: op_type.into(),
            domain: ML_DOMAIN.to_string(),
            inputs,
            outputs,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Attribute) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn ints(&self, key: &str) -> Option<&[i64]> {
        match self.attributes.get(key) {
            Some(Attribute::Ints(values)) => Some(values),
            _ => None,
        }
    }

    pub fn floats(&self, key: &str) -> Option<&[f64]> {
        match self.attributes.get(key) {
            Some(Attribute::Floats(values)) => Some(values),
            _ => None,
        }
    }

    pub fn strings(&self, key: &str) -> Option<&[String]> {
        match self.attributes.get(key) {
            Some(Attribute::Strings(values)) => Some(values),
            _ => None,
        }
    }

    pub fn string(&self, key: &str) -> Option<&str> {
        match self.attributes.get(key) {
            Some(Attribute::String(value)) => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpsetImport {
    pub domain: String,
    pub version: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    pub name: String,
    pub inputs: Vec<ValueInfo>,
    pub outputs: Vec<ValueInfo>,
    pub nodes: Vec<Node>,
}

/// A complete portable model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelGraph {
    pub ir_version: i64,
    pub producer_name: String,
    pub producer_version: String,
    pub opset_import: Vec<OpsetImport>,
    pub metadata_props: BTreeMap<String, String>,
    pub graph: Graph,
}

impl ModelGraph {
    pub fn new(graph: Graph) -> Self {
        Self {
            ir_version: IR_VERSION,
            producer_name: "dataqc".to_string(),
            producer_version: env!("CARGO_PKG_VERSION").to_string(),
            opset_import: vec![
                OpsetImport {
                    domain: String::new(),
                    version: 15,
                },
                OpsetImport {
                    domain: ML_DOMAIN.to_string(),
                    version: 3,
                },
            ],
            metadata_props: BTreeMap::new(),
            graph,
        }
    }

    /// Record the feature column names the input matrix is built from.
    pub fn with_feature_names(mut self, names: &[String]) -> Result<Self> {
        self.metadata_props
            .insert(FEATURE_NAMES_KEY.to_string(), serde_json::to_string(names)?);
        Ok(self)
    }

    /// Feature column names, if the graph declares them.
    pub fn feature_names(&self) -> Option<Vec<String>> {
        self.metadata_props
            .get(FEATURE_NAMES_KEY)
            .and_then(|raw| serde_json::from_str(raw).ok())
    }

    /// Write the graph as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Parse a graph from JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| LearningError::ModelLoad(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_json_is_tagged() {
        let node = Node::new("scaler", "Scaler", vec!["x".into()], vec!["y".into()])
            .with_attribute("offset", Attribute::Floats(vec![1.0]))
            .with_attribute("post_transform", Attribute::String("NONE".into()));
        let json = serde_json::to_value(&node).unwrap();

        assert_eq!(json["attributes"]["offset"], serde_json::json!({"floats": [1.0]}));
        assert_eq!(json["domain"], ML_DOMAIN);
        assert_eq!(node.floats("offset"), Some(&[1.0][..]));
        assert_eq!(node.string("post_transform"), Some("NONE"));
        assert_eq!(node.ints("offset"), None);
    }

    #[test]
    fn test_feature_names_roundtrip_through_metadata() {
        let graph = Graph {
            name: "g".into(),
            inputs: vec![],
            outputs: vec![],
            nodes: vec![],
        };
        let names = vec!["a,b".to_string(), "c".to_string()];
        let model = ModelGraph::new(graph).with_feature_names(&names).unwrap();

        let bytes = serde_json::to_vec(&model).unwrap();
        let parsed = ModelGraph::from_slice(&bytes).unwrap();
        assert_eq!(parsed.feature_names(), Some(names));
    }

    #[test]
    fn test_from_slice_rejects_garbage() {
        let err = ModelGraph::from_slice(b"not json").unwrap_err();
        assert_eq!(err.error_code(), "MODEL_LOAD_ERROR");
    }

    #[test]
    fn test_value_info_dynamic_dimension() {
        let info = ValueInfo {
            name: PORTABLE_INPUT_NAME.into(),
            elem_type: ElemType::Float,
            shape: vec![None, Some(3)],
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"name": "float_input", "elem_type": "FLOAT", "shape": [null, 3]})
        );
    }
}
