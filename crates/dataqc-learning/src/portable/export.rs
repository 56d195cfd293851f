//! Conversion of a fitted supervised pipeline into a [`ModelGraph`].
//!
//! Graph: `float_input -> Imputer -> Scaler -> TreeEnsembleClassifier`.
//! The input matrix holds the numeric feature columns in fitted order, so
//! pipelines with categorical features cannot be exported.

use super::graph::{
    Attribute, ElemType, Graph, ModelGraph, Node, PORTABLE_INPUT_NAME, ValueInfo,
};
use crate::error::{LearningError, Result};
use crate::models::{Classifier, TreeNode};
use crate::pipeline::SupervisedPipeline;
use crate::types::ClassLabel;

pub const LABEL_OUTPUT: &str = "label";
pub const PROBABILITIES_OUTPUT: &str = "probabilities";

/// Build the portable graph of `pipeline`.
///
/// # Errors
///
/// [`LearningError::Export`] when a feature is categorical, there are no
/// features, a feature's statistics exceed the `f32` range of the input, or
/// the class labels are floats.
pub fn export_graph(pipeline: &SupervisedPipeline) -> Result<ModelGraph> {
    let preprocessor = &pipeline.preprocessor;

    if let Some(transform) = preprocessor.categorical.first() {
        return Err(LearningError::Export(format!(
            "feature '{}' is categorical and cannot be fed as float input",
            transform.column
        )));
    }
    let n_features = preprocessor.numeric.len();
    if n_features == 0 {
        return Err(LearningError::Export("pipeline has no features".to_string()));
    }

    if let Some(transform) = preprocessor.numeric.iter().find(|t| {
        [t.median, t.mean, t.scale]
            .iter()
            .any(|v| v.abs() > f64::from(f32::MAX))
    }) {
        return Err(LearningError::Export(format!(
            "feature '{}' has values outside the float input range",
            transform.column
        )));
    }

    let (labels_key, labels_attr, label_type) = class_labels_attribute(&pipeline.classes)?;

    let imputer = Node::new(
        "imputer",
        "Imputer",
        vec![PORTABLE_INPUT_NAME.to_string()],
        vec!["imputed".to_string()],
    )
    .with_attribute(
        "imputed_value_floats",
        Attribute::Floats(preprocessor.numeric.iter().map(|t| t.median).collect()),
    );

    let scaler = Node::new(
        "scaler",
        "Scaler",
        vec!["imputed".to_string()],
        vec!["scaled".to_string()],
    )
    .with_attribute(
        "offset",
        Attribute::Floats(preprocessor.numeric.iter().map(|t| t.mean).collect()),
    )
    .with_attribute(
        "scale",
        Attribute::Floats(preprocessor.numeric.iter().map(|t| 1.0 / t.scale).collect()),
    );

    let mut ensemble = EnsembleAttributes::default();
    let mut post_transform = "NONE";
    let mut base_values = None;

    match &pipeline.classifier {
        Classifier::RandomForest(forest) => {
            let n_trees = forest.trees().len().max(1) as f64;
            for (tree_id, tree) in forest.trees().iter().enumerate() {
                ensemble.add_tree(tree_id as i64, tree.root(), &|leaf: &[f64]| {
                    leaf.iter()
                        .enumerate()
                        .map(|(k, p)| (k as i64, p / n_trees))
                        .collect()
                });
            }
        }
        Classifier::GradientBoosting(boosting) => {
            let rate = boosting.learning_rate();
            for (tree_id, tree) in boosting.trees().iter().enumerate() {
                ensemble.add_tree(tree_id as i64, tree.root(), &|leaf: &[f64]| {
                    vec![(0, rate * leaf[0])]
                });
            }
            post_transform = "LOGISTIC";
            base_values = Some(vec![boosting.init()]);
        }
    }

    let mut classifier = ensemble
        .into_node(Node::new(
            "classifier",
            "TreeEnsembleClassifier",
            vec!["scaled".to_string()],
            vec![LABEL_OUTPUT.to_string(), PROBABILITIES_OUTPUT.to_string()],
        ))
        .with_attribute(labels_key, labels_attr)
        .with_attribute("post_transform", Attribute::String(post_transform.to_string()));
    if let Some(values) = base_values {
        classifier = classifier.with_attribute("base_values", Attribute::Floats(values));
    }

    let graph = Graph {
        name: format!("dataqc_{}", pipeline.classifier.kind().as_str()),
        inputs: vec![ValueInfo {
            name: PORTABLE_INPUT_NAME.to_string(),
            elem_type: ElemType::Float,
            shape: vec![None, Some(n_features as i64)],
        }],
        outputs: vec![
            ValueInfo {
                name: LABEL_OUTPUT.to_string(),
                elem_type: label_type,
                shape: vec![None],
            },
            ValueInfo {
                name: PROBABILITIES_OUTPUT.to_string(),
                elem_type: ElemType::Float,
                shape: vec![None, Some(pipeline.classes.len() as i64)],
            },
        ],
        nodes: vec![imputer, scaler, classifier],
    };

    ModelGraph::new(graph).with_feature_names(&preprocessor.feature_names())
}

fn class_labels_attribute(classes: &[ClassLabel]) -> Result<(&'static str, Attribute, ElemType)> {
    let mut ints = Vec::with_capacity(classes.len());
    let mut strings = Vec::with_capacity(classes.len());

    for label in classes {
        match label {
            ClassLabel::Int(i) => ints.push(*i),
            ClassLabel::Bool(b) => ints.push(i64::from(*b)),
            ClassLabel::Text(s) => strings.push(s.clone()),
            ClassLabel::Float(f) => {
                return Err(LearningError::Export(format!(
                    "class label {} is a float and has no portable representation",
                    f
                )));
            }
        }
    }

    if strings.is_empty() {
        Ok(("classlabels_int64s", Attribute::Ints(ints), ElemType::Int64))
    } else {
        Ok((
            "classlabels_strings",
            Attribute::Strings(strings),
            ElemType::String,
        ))
    }
}

/// Flat ONNX-ML tree ensemble attribute arrays.
#[derive(Default)]
struct EnsembleAttributes {
    nodes_treeids: Vec<i64>,
    nodes_nodeids: Vec<i64>,
    nodes_featureids: Vec<i64>,
    nodes_values: Vec<f64>,
    nodes_modes: Vec<String>,
    nodes_truenodeids: Vec<i64>,
    nodes_falsenodeids: Vec<i64>,
    class_treeids: Vec<i64>,
    class_nodeids: Vec<i64>,
    class_ids: Vec<i64>,
    class_weights: Vec<f64>,
}

impl EnsembleAttributes {
    /// Append a tree with node ids assigned in pre-order from 0.
    fn add_tree(&mut self, tree_id: i64, root: &TreeNode, leaf_weights: &dyn Fn(&[f64]) -> Vec<(i64, f64)>) {
        let mut next_id = 0;
        self.visit(tree_id, root, &mut next_id, leaf_weights);
    }

    fn visit(
        &mut self,
        tree_id: i64,
        node: &TreeNode,
        next_id: &mut i64,
        leaf_weights: &dyn Fn(&[f64]) -> Vec<(i64, f64)>,
    ) -> i64 {
        let node_id = *next_id;
        *next_id += 1;
        let pos = self.nodes_nodeids.len();

        self.nodes_treeids.push(tree_id);
        self.nodes_nodeids.push(node_id);

        match node {
            TreeNode::Leaf { value } => {
                self.nodes_featureids.push(0);
                self.nodes_values.push(0.0);
                self.nodes_modes.push("LEAF".to_string());
                self.nodes_truenodeids.push(0);
                self.nodes_falsenodeids.push(0);

                for (class_id, weight) in leaf_weights(value) {
                    self.class_treeids.push(tree_id);
                    self.class_nodeids.push(node_id);
                    self.class_ids.push(class_id);
                    self.class_weights.push(weight);
                }
            }
            TreeNode::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                self.nodes_featureids.push(*feature as i64);
                self.nodes_values.push(*threshold);
                self.nodes_modes.push("BRANCH_LEQ".to_string());
                self.nodes_truenodeids.push(0);
                self.nodes_falsenodeids.push(0);

                let left_id = self.visit(tree_id, left, next_id, leaf_weights);
                let right_id = self.visit(tree_id, right, next_id, leaf_weights);
                self.nodes_truenodeids[pos] = left_id;
                self.nodes_falsenodeids[pos] = right_id;
            }
        }

        node_id
    }

    fn into_node(self, node: Node) -> Node {
        node.with_attribute("nodes_treeids", Attribute::Ints(self.nodes_treeids))
            .with_attribute("nodes_nodeids", Attribute::Ints(self.nodes_nodeids))
            .with_attribute("nodes_featureids", Attribute::Ints(self.nodes_featureids))
            .with_attribute("nodes_values", Attribute::Floats(self.nodes_values))
            .with_attribute("nodes_modes", Attribute::Strings(self.nodes_modes))
            .with_attribute("nodes_truenodeids", Attribute::Ints(self.nodes_truenodeids))
            .with_attribute("nodes_falsenodeids", Attribute::Ints(self.nodes_falsenodeids))
            .with_attribute("class_treeids", Attribute::Ints(self.class_treeids))
            .with_attribute("class_nodeids", Attribute::Ints(self.class_nodeids))
            .with_attribute("class_ids", Attribute::Ints(self.class_ids))
            .with_attribute("class_weights", Attribute::Floats(self.class_weights))
    }
}
