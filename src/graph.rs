//! The traced computation stored inside an exported artifact.
//!
//! A `Graph` is a straight line of nodes, each reading one named value and writing another. The
//! parameters the nodes reference are stored next to it as named tensors.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{MlErr, Result};

/// The metadata key the JSON-encoded graph is stored under.
pub const GRAPH_KEY: &str = "graph";

/// Identifies who wrote an artifact.
pub const PRODUCER: &str = "classifier";

/// The artifact format revision.
pub const FORMAT_VERSION: u32 = 1;

/// A named value crossing the graph boundary, with its observed row width.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueInfo {
    pub name: String,
    pub width: usize,
}

/// What a node computes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op")]
pub enum Op {
    /// `y = x · weight + bias`, with `weight` of shape `(in, out)` and `bias` of shape `(out)`.
    Gemm { weight: String, bias: String },
    Relu,
    Sigmoid { amp: f32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub input: String,
    pub output: String,
    /// The row width of `output` when the graph was traced.
    pub width: usize,
    #[serde(flatten)]
    pub op: Op,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    pub producer: String,
    pub version: u32,
    pub inputs: Vec<ValueInfo>,
    pub outputs: Vec<ValueInfo>,
    pub nodes: Vec<Node>,
}

impl Graph {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses a graph and checks it is well formed.
    pub fn from_json(json: &str) -> Result<Self> {
        let graph: Self = serde_json::from_str(json)?;
        graph.validate()?;
        Ok(graph)
    }

    /// Checks that the format is known, that every node reads a value that was already
    /// produced and that every output is produced by some node or is an input.
    pub fn validate(&self) -> Result<()> {
        if self.version != FORMAT_VERSION {
            return Err(MlErr::InvalidArtifact(format!(
                "unknown format version {}",
                self.version
            )));
        }

        if self.inputs.is_empty() {
            return Err(MlErr::InvalidArtifact("the graph has no inputs".to_string()));
        }

        let mut known: HashSet<&str> = self.inputs.iter().map(|v| v.name.as_str()).collect();
        for node in &self.nodes {
            if !known.contains(node.input.as_str()) {
                return Err(MlErr::InvalidArtifact(format!(
                    "node {} reads {}, which nothing produces before it",
                    node.name, node.input
                )));
            }
            known.insert(node.output.as_str());
        }

        if let Some(missing) = self
            .outputs
            .iter()
            .find(|v| !known.contains(v.name.as_str()))
        {
            return Err(MlErr::InvalidArtifact(format!(
                "output {} is never produced",
                missing.name
            )));
        }

        Ok(())
    }
}
