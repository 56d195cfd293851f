//! Executes a portable [`ModelGraph`].
//!
//! Supported operators: `Imputer`, `Scaler` and `TreeEnsembleClassifier`
//! (branch modes `BRANCH_LEQ` / `BRANCH_LT`, post transforms `NONE` /
//! `LOGISTIC`). A binary ensemble with a single score column is read as the
//! log-odds of the second class label.

use super::graph::{ModelGraph, Node, ValueInfo};
use crate::error::{LearningError, Result};
use crate::models::sigmoid;
use ndarray::{Array2, ArrayView2};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// A loaded, validated graph ready to run.
#[derive(Debug, Clone)]
pub struct InferenceSession {
    inputs: Vec<ValueInfo>,
    feature_names: Option<Vec<String>>,
    steps: Vec<Step>,
}

#[derive(Debug, Clone)]
enum Step {
    Impute {
        input: String,
        output: String,
        values: Vec<f64>,
    },
    Scale {
        input: String,
        output: String,
        offset: Vec<f64>,
        scale: Vec<f64>,
    },
    Classify {
        input: String,
        ensemble: CompiledEnsemble,
    },
}

#[derive(Debug, Clone)]
enum CompiledNode {
    Branch {
        feature: usize,
        threshold: f64,
        strict: bool,
        true_child: usize,
        false_child: usize,
    },
    Leaf {
        weights: Vec<(usize, f64)>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PostTransform {
    None,
    Logistic,
}

#[derive(Debug, Clone)]
enum Labels {
    Int(Vec<i64>),
    Text(Vec<String>),
}

impl Labels {
    fn len(&self) -> usize {
        match self {
            Labels::Int(values) => values.len(),
            Labels::Text(values) => values.len(),
        }
    }

    fn get(&self, idx: usize) -> Option<Value> {
        match self {
            Labels::Int(values) => values.get(idx).map(|v| Value::from(*v)),
            Labels::Text(values) => values.get(idx).map(|v| Value::from(v.as_str())),
        }
    }
}

#[derive(Debug, Clone)]
struct CompiledEnsemble {
    roots: Vec<usize>,
    nodes: Vec<CompiledNode>,
    n_targets: usize,
    base_values: Vec<f64>,
    post_transform: PostTransform,
    labels: Labels,
}

impl InferenceSession {
    /// Load and compile a graph file.
    ///
    /// Every failure (unreadable file, malformed JSON, unsupported operator,
    /// inconsistent attributes) is a [`LearningError::ModelLoad`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|e| LearningError::ModelLoad(format!("{}: {}", path.display(), e)))?;
        let graph = ModelGraph::from_slice(&bytes)?;
        Self::from_graph(&graph)
    }

    /// Compile an in-memory graph.
    pub fn from_graph(graph: &ModelGraph) -> Result<Self> {
        if graph.graph.inputs.is_empty() {
            return Err(LearningError::ModelLoad("graph declares no inputs".to_string()));
        }

        let steps = graph
            .graph
            .nodes
            .iter()
            .map(compile_node)
            .collect::<Result<Vec<_>>>()?;

        debug!(
            "Compiled portable graph '{}' with {} steps",
            graph.graph.name,
            steps.len()
        );

        Ok(Self {
            inputs: graph.graph.inputs.clone(),
            feature_names: graph.feature_names(),
            steps,
        })
    }

    /// Declared graph inputs.
    pub fn inputs(&self) -> &[ValueInfo] {
        &self.inputs
    }

    /// Feature column names recorded at export, if any.
    pub fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    /// Run the graph on a float matrix and return one label per row.
    pub fn run(&self, input_name: &str, x: ArrayView2<'_, f32>) -> Result<Vec<Value>> {
        let input = self
            .inputs
            .iter()
            .find(|info| info.name == input_name)
            .ok_or_else(|| LearningError::Prediction(format!("unknown input '{}'", input_name)))?;

        if let Some(Some(width)) = input.shape.get(1) {
            if x.ncols() as i64 != *width {
                return Err(LearningError::Prediction(format!(
                    "invalid dimensions for input '{}': expected {} columns, got {}",
                    input_name,
                    width,
                    x.ncols()
                )));
            }
        }

        let mut tensors: HashMap<&str, Array2<f64>> = HashMap::new();
        tensors.insert(input_name, x.mapv(f64::from));
        let mut labels = None;

        for step in &self.steps {
            match step {
                Step::Impute {
                    input,
                    output,
                    values,
                } => {
                    let mut tensor = fetch(&tensors, input)?.clone();
                    check_width(values.len(), tensor.ncols(), "Imputer")?;
                    for mut row in tensor.rows_mut() {
                        for (j, v) in row.iter_mut().enumerate() {
                            if v.is_nan() {
                                *v = broadcast(values, j);
                            }
                        }
                    }
                    tensors.insert(output, tensor);
                }
                Step::Scale {
                    input,
                    output,
                    offset,
                    scale,
                } => {
                    let mut tensor = fetch(&tensors, input)?.clone();
                    check_width(offset.len(), tensor.ncols(), "Scaler")?;
                    check_width(scale.len(), tensor.ncols(), "Scaler")?;
                    for mut row in tensor.rows_mut() {
                        for (j, v) in row.iter_mut().enumerate() {
                            *v = (*v - broadcast(offset, j)) * broadcast(scale, j);
                        }
                    }
                    tensors.insert(output, tensor);
                }
                Step::Classify { input, ensemble } => {
                    let tensor = fetch(&tensors, input)?;
                    labels = Some(ensemble.classify(tensor)?);
                }
            }
        }

        labels.ok_or_else(|| LearningError::Prediction("graph produced no labels".to_string()))
    }
}

fn fetch<'a>(tensors: &'a HashMap<&str, Array2<f64>>, name: &str) -> Result<&'a Array2<f64>> {
    tensors
        .get(name)
        .ok_or_else(|| LearningError::Prediction(format!("tensor '{}' is not produced", name)))
}

fn check_width(len: usize, width: usize, op: &str) -> Result<()> {
    if len == 1 || len == width {
        Ok(())
    } else {
        Err(LearningError::Prediction(format!(
            "{} expects {} columns, got {}",
            op, len, width
        )))
    }
}

#[inline]
fn broadcast(values: &[f64], j: usize) -> f64 {
    if values.len() == 1 { values[0] } else { values[j] }
}

fn single_input(node: &Node) -> Result<String> {
    node.inputs
        .first()
        .cloned()
        .ok_or_else(|| LearningError::ModelLoad(format!("node '{}' has no input", node.name)))
}

fn single_output(node: &Node) -> Result<String> {
    node.outputs
        .first()
        .cloned()
        .ok_or_else(|| LearningError::ModelLoad(format!("node '{}' has no output", node.name)))
}

fn required<'a, T: ?Sized>(value: Option<&'a T>, node: &Node, key: &str) -> Result<&'a T> {
    value.ok_or_else(|| {
        LearningError::ModelLoad(format!("node '{}' is missing attribute '{}'", node.name, key))
    })
}

fn compile_node(node: &Node) -> Result<Step> {
    match node.op_type.as_str() {
        "Imputer" => Ok(Step::Impute {
            input: single_input(node)?,
            output: single_output(node)?,
            values: required(node.floats("imputed_value_floats"), node, "imputed_value_floats")?
                .to_vec(),
        }),
        "Scaler" => Ok(Step::Scale {
            input: single_input(node)?,
            output: single_output(node)?,
            offset: required(node.floats("offset"), node, "offset")?.to_vec(),
            scale: required(node.floats("scale"), node, "scale")?.to_vec(),
        }),
        "TreeEnsembleClassifier" => Ok(Step::Classify {
            input: single_input(node)?,
            ensemble: CompiledEnsemble::compile(node)?,
        }),
        other => Err(LearningError::ModelLoad(format!(
            "unsupported operator '{}'",
            other
        ))),
    }
}

fn to_index(value: i64, what: &str) -> Result<usize> {
    usize::try_from(value).map_err(|_| LearningError::ModelLoad(format!("negative {}: {}", what, value)))
}

impl CompiledEnsemble {
    fn compile(node: &Node) -> Result<Self> {
        let tree_ids = required(node.ints("nodes_treeids"), node, "nodes_treeids")?;
        let node_ids = required(node.ints("nodes_nodeids"), node, "nodes_nodeids")?;
        let feature_ids = required(node.ints("nodes_featureids"), node, "nodes_featureids")?;
        let values = required(node.floats("nodes_values"), node, "nodes_values")?;
        let modes = required(node.strings("nodes_modes"), node, "nodes_modes")?;
        let true_ids = required(node.ints("nodes_truenodeids"), node, "nodes_truenodeids")?;
        let false_ids = required(node.ints("nodes_falsenodeids"), node, "nodes_falsenodeids")?;

        let n = tree_ids.len();
        if [node_ids.len(), feature_ids.len(), values.len(), modes.len(), true_ids.len(), false_ids.len()]
            .iter()
            .any(|&len| len != n)
        {
            return Err(LearningError::ModelLoad(
                "tree node attributes have different lengths".to_string(),
            ));
        }

        let mut index: HashMap<(i64, i64), usize> = HashMap::with_capacity(n);
        for (pos, key) in tree_ids.iter().copied().zip(node_ids.iter().copied()).enumerate() {
            if index.insert(key, pos).is_some() {
                return Err(LearningError::ModelLoad(format!(
                    "duplicate node {} in tree {}",
                    key.1, key.0
                )));
            }
        }

        let resolve = |tree: i64, id: i64| -> Result<usize> {
            index.get(&(tree, id)).copied().ok_or_else(|| {
                LearningError::ModelLoad(format!("node {} of tree {} does not exist", id, tree))
            })
        };

        let mut nodes = Vec::with_capacity(n);
        for pos in 0..n {
            let tree = tree_ids[pos];
            let compiled = match modes[pos].as_str() {
                "LEAF" => CompiledNode::Leaf {
                    weights: Vec::new(),
                },
                mode @ ("BRANCH_LEQ" | "BRANCH_LT") => CompiledNode::Branch {
                    feature: to_index(feature_ids[pos], "feature id")?,
                    threshold: values[pos],
                    strict: mode == "BRANCH_LT",
                    true_child: resolve(tree, true_ids[pos])?,
                    false_child: resolve(tree, false_ids[pos])?,
                },
                other => {
                    return Err(LearningError::ModelLoad(format!(
                        "unsupported node mode '{}'",
                        other
                    )));
                }
            };
            nodes.push(compiled);
        }

        let class_tree_ids = required(node.ints("class_treeids"), node, "class_treeids")?;
        let class_node_ids = required(node.ints("class_nodeids"), node, "class_nodeids")?;
        let class_ids = required(node.ints("class_ids"), node, "class_ids")?;
        let class_weights = required(node.floats("class_weights"), node, "class_weights")?;
        let m = class_tree_ids.len();
        if class_node_ids.len() != m || class_ids.len() != m || class_weights.len() != m {
            return Err(LearningError::ModelLoad(
                "class weight attributes have different lengths".to_string(),
            ));
        }

        let mut n_targets = 0;
        for j in 0..m {
            let pos = resolve(class_tree_ids[j], class_node_ids[j])?;
            let class_id = to_index(class_ids[j], "class id")?;
            n_targets = n_targets.max(class_id + 1);
            match &mut nodes[pos] {
                CompiledNode::Leaf { weights } => weights.push((class_id, class_weights[j])),
                CompiledNode::Branch { .. } => {
                    return Err(LearningError::ModelLoad(format!(
                        "class weight attached to branch node {}",
                        class_node_ids[j]
                    )));
                }
            }
        }

        // Root of each tree: its smallest node id, trees in order of appearance.
        let mut roots: Vec<(i64, i64, usize)> = Vec::new();
        for pos in 0..n {
            let candidate = (tree_ids[pos], node_ids[pos], pos);
            match roots.iter().position(|(tree, _, _)| *tree == tree_ids[pos]) {
                Some(i) if node_ids[pos] < roots[i].1 => roots[i] = candidate,
                Some(_) => {}
                None => roots.push(candidate),
            }
        }

        let labels = match (node.ints("classlabels_int64s"), node.strings("classlabels_strings")) {
            (Some(ints), _) => Labels::Int(ints.to_vec()),
            (None, Some(strings)) => Labels::Text(strings.to_vec()),
            (None, None) => {
                return Err(LearningError::ModelLoad(
                    "ensemble declares no class labels".to_string(),
                ));
            }
        };

        let post_transform = match node.string("post_transform").unwrap_or("NONE") {
            "NONE" => PostTransform::None,
            "LOGISTIC" => PostTransform::Logistic,
            other => {
                return Err(LearningError::ModelLoad(format!(
                    "unsupported post_transform '{}'",
                    other
                )));
            }
        };

        let binary_score = n_targets == 1 && labels.len() == 2;
        if !binary_score && n_targets > labels.len() {
            return Err(LearningError::ModelLoad(format!(
                "{} score columns for {} class labels",
                n_targets,
                labels.len()
            )));
        }

        Ok(Self {
            roots: roots.into_iter().map(|(_, _, pos)| pos).collect(),
            nodes,
            n_targets,
            base_values: node.floats("base_values").map(<[f64]>::to_vec).unwrap_or_default(),
            post_transform,
            labels,
        })
    }

    fn classify(&self, x: &Array2<f64>) -> Result<Vec<Value>> {
        let mut out = Vec::with_capacity(x.nrows());

        for row in x.rows() {
            let mut scores = vec![0.0; self.n_targets.max(1)];

            for &root in &self.roots {
                let mut pos = root;
                let mut steps = 0;
                loop {
                    steps += 1;
                    if steps > self.nodes.len() {
                        return Err(LearningError::Prediction("tree contains a cycle".to_string()));
                    }
                    match &self.nodes[pos] {
                        CompiledNode::Leaf { weights } => {
                            for &(k, w) in weights {
                                scores[k] += w;
                            }
                            break;
                        }
                        CompiledNode::Branch {
                            feature,
                            threshold,
                            strict,
                            true_child,
                            false_child,
                        } => {
                            let value = *row.get(*feature).ok_or_else(|| {
                                LearningError::Prediction(format!(
                                    "feature index {} out of range",
                                    feature
                                ))
                            })?;
                            let go_true = if *strict {
                                value < *threshold
                            } else {
                                value <= *threshold
                            };
                            pos = if go_true { *true_child } else { *false_child };
                        }
                    }
                }
            }

            for (score, base) in scores.iter_mut().zip(&self.base_values) {
                *score += base;
            }
            if self.post_transform == PostTransform::Logistic {
                for score in &mut scores {
                    *score = sigmoid(*score);
                }
            }

            let label_idx = if self.n_targets == 1 && self.labels.len() == 2 {
                usize::from(scores[0] > 0.5)
            } else {
                scores
                    .iter()
                    .enumerate()
                    .fold((0, f64::NEG_INFINITY), |(best, best_s), (k, &s)| {
                        if s > best_s { (k, s) } else { (best, best_s) }
                    })
                    .0
            };

            let label = self.labels.get(label_idx).ok_or_else(|| {
                LearningError::Prediction(format!("class index {} has no label", label_idx))
            })?;
            out.push(label);
        }

        Ok(out)
    }
}
