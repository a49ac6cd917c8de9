use std::{collections::HashMap, path::Path};

use log::{debug, info};
use ndarray::{Array1, Array2, ArrayView2};

use super::ops;
use crate::{
    MlErr, Result,
    graph::{GRAPH_KEY, Graph, Op},
    storage::TensorFile,
};

/// An inference runtime bound to one exported artifact.
///
/// The session only knows the artifact's graph and initializers, it runs the nodes itself.
#[derive(Debug, Clone)]
pub struct Session {
    graph: Graph,
    matrices: HashMap<String, Array2<f32>>,
    vectors: HashMap<String, Array1<f32>>,
}

impl Session {
    /// Loads the artifact at `path`.
    ///
    /// # Returns
    /// A new `Session`, or an error if the graph is malformed or an initializer the graph
    /// references is missing or ill-shaped.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = TensorFile::read(&path)?;

        let json = file
            .metadata
            .remove(GRAPH_KEY)
            .ok_or_else(|| MlErr::InvalidArtifact("the file holds no graph".to_string()))?;
        let graph = Graph::from_json(&json)?;

        let mut matrices = HashMap::new();
        let mut vectors = HashMap::new();
        let mut width = HashMap::new();
        for input in &graph.inputs {
            width.insert(input.name.as_str(), input.width);
        }

        for node in &graph.nodes {
            let fan_in = width.get(node.input.as_str()).copied().ok_or_else(|| {
                MlErr::InvalidArtifact(format!("node {} reads an unknown value", node.name))
            })?;

            if let Op::Gemm { weight, bias } = &node.op {
                let w = file.get(weight, &[fan_in, node.width])?;
                let w = Array2::from_shape_vec((fan_in, node.width), w.data.clone())
                    .map_err(|e| MlErr::InvalidArtifact(e.to_string()))?;
                matrices.insert(weight.clone(), w);

                let b = file.get(bias, &[node.width])?;
                vectors.insert(bias.clone(), Array1::from_vec(b.data.clone()));
            } else if fan_in != node.width {
                return Err(MlErr::InvalidArtifact(format!(
                    "node {} maps width {fan_in} to {}",
                    node.name, node.width
                )));
            }

            width.insert(node.output.as_str(), node.width);
        }

        info!(
            nodes = graph.nodes.len(), producer = graph.producer.as_str();
            "loaded artifact {}", path.as_ref().display()
        );

        Ok(Self {
            graph,
            matrices,
            vectors,
        })
    }

    pub fn input_names(&self) -> Vec<&str> {
        self.graph.inputs.iter().map(|v| v.name.as_str()).collect()
    }

    pub fn output_names(&self) -> Vec<&str> {
        self.graph.outputs.iter().map(|v| v.name.as_str()).collect()
    }

    /// Runs the graph.
    ///
    /// # Arguments
    /// * `inputs` - A batch for every graph input, keyed by the input's name.
    ///
    /// # Returns
    /// Every graph output, in the order of `output_names`.
    pub fn run(&self, inputs: &[(&str, ArrayView2<f32>)]) -> Result<Vec<(String, Array2<f32>)>> {
        let mut values: HashMap<&str, Array2<f32>> = HashMap::new();

        for info in &self.graph.inputs {
            let (_, x) = inputs
                .iter()
                .find(|(name, _)| *name == info.name)
                .ok_or_else(|| MlErr::MissingInput {
                    name: info.name.clone(),
                })?;

            if x.ncols() != info.width {
                return Err(MlErr::SizeMismatch {
                    what: "session input width",
                    got: x.ncols(),
                    expected: info.width,
                });
            }

            values.insert(info.name.as_str(), x.to_owned());
        }

        for node in &self.graph.nodes {
            let x = values.get(node.input.as_str()).ok_or_else(|| {
                MlErr::InvalidArtifact(format!("node {} reads an unknown value", node.name))
            })?;

            let y = match &node.op {
                Op::Gemm { weight, bias } => {
                    let (w, b) = self.initializers(weight, bias)?;
                    ops::gemm(x.view(), w, b)?
                }
                Op::Relu => ops::relu(x.view()),
                Op::Sigmoid { amp } => ops::sigmoid(x.view(), *amp),
            };

            debug!(node = node.name.as_str(); "ran node");
            values.insert(node.output.as_str(), y);
        }

        self.graph
            .outputs
            .iter()
            .map(|info| {
                let y = values.remove(info.name.as_str()).ok_or_else(|| {
                    MlErr::InvalidArtifact(format!("output {} is never produced", info.name))
                })?;
                Ok((info.name.clone(), y))
            })
            .collect()
    }

    fn initializers(&self, weight: &str, bias: &str) -> Result<(&Array2<f32>, &Array1<f32>)> {
        let w = self.matrices.get(weight).ok_or_else(|| MlErr::MissingTensor {
            name: weight.to_string(),
        })?;
        let b = self.vectors.get(bias).ok_or_else(|| MlErr::MissingTensor {
            name: bias.to_string(),
        })?;

        Ok((w, b))
    }
}
