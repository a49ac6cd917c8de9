//! Exporting a trained model as a self-contained artifact.
//!
//! The artifact is a tensor file: the stage parameters are its tensors and the traced graph is
//! stored as JSON in its metadata, so it can be run without building a `Sequential`.

use std::path::Path;

use log::{debug, info};
use ndarray::{Array2, ArrayView2};

use crate::{
    MlErr, Result,
    arch::{Model, Sequential, activations::ActFn, layout},
    graph::{FORMAT_VERSION, GRAPH_KEY, Graph, Node, Op, PRODUCER, ValueInfo},
    storage::{Tensor, TensorFile},
};

/// The name of the artifact's input value.
pub const INPUT_NAME: &str = "input";

/// The name of the artifact's output value.
pub const OUTPUT_NAME: &str = "output";

/// Traces `model` by running `sample` through it stage by stage and writes the resulting graph,
/// together with `params`, to `path`.
///
/// # Arguments
/// * `path` - Where to write the artifact.
/// * `model` - The model to export.
/// * `params` - The model's trained parameters.
/// * `sample` - A batch of inputs of the model's input width.
///
/// # Returns
/// The model's output for `sample`, as observed while tracing.
pub fn export<P: AsRef<Path>>(
    path: P,
    model: &Sequential,
    params: &[f32],
    sample: ArrayView2<f32>,
) -> Result<Array2<f32>> {
    if model.layers().is_empty() {
        return Err(MlErr::EmptyModel);
    }

    if params.len() != model.size() {
        return Err(MlErr::SizeMismatch {
            what: "model parameters",
            got: params.len(),
            expected: model.size(),
        });
    }

    if sample.ncols() != model.input_size() {
        return Err(MlErr::SizeMismatch {
            what: "export sample width",
            got: sample.ncols(),
            expected: model.input_size(),
        });
    }

    let mut file = TensorFile::new();
    let mut nodes = Vec::with_capacity(model.layers().len() * 2);
    let mut offset = 0;
    let mut value = INPUT_NAME.to_string();
    let mut y = sample.to_owned();
    let last = model.layers().len() - 1;

    for (i, layer) in model.layers().iter().enumerate() {
        let (fan_in, fan_out) = layer.dim();
        let layer_params = &params[offset..offset + layer.size()];
        offset += layer.size();

        y = layer.predict(layer_params, y.view())?;

        let (w, b) = layer_params.split_at(fan_in * fan_out);
        let weight = layout::weight_name(i);
        let bias = layout::bias_name(i);
        file.insert(weight.clone(), Tensor::new(vec![fan_in, fan_out], w.to_vec())?);
        file.insert(bias.clone(), Tensor::new(vec![fan_out], b.to_vec())?);

        let z = if i == last && layer.act_fn().is_none() {
            OUTPUT_NAME.to_string()
        } else {
            format!("layers.{i}.z")
        };
        nodes.push(Node {
            name: format!("layers.{i}.gemm"),
            input: value,
            output: z.clone(),
            width: fan_out,
            op: Op::Gemm { weight, bias },
        });
        value = z;

        if let Some(act_fn) = layer.act_fn() {
            let a = if i == last {
                OUTPUT_NAME.to_string()
            } else {
                format!("layers.{i}.a")
            };
            let op = match act_fn {
                ActFn::Relu(_) => Op::Relu,
                ActFn::Sigmoid(s) => Op::Sigmoid { amp: s.amp() },
            };
            nodes.push(Node {
                name: format!("layers.{i}.act"),
                input: value,
                output: a.clone(),
                width: fan_out,
                op,
            });
            value = a;
        }

        debug!(layer = i, width = fan_out; "traced stage");
    }

    let graph = Graph {
        producer: PRODUCER.to_string(),
        version: FORMAT_VERSION,
        inputs: vec![ValueInfo {
            name: INPUT_NAME.to_string(),
            width: model.input_size(),
        }],
        outputs: vec![ValueInfo {
            name: OUTPUT_NAME.to_string(),
            width: model.output_size(),
        }],
        nodes,
    };
    graph.validate()?;

    file.metadata.insert(GRAPH_KEY.to_string(), graph.to_json()?);
    file.write(&path)?;
    info!(nodes = graph.nodes.len(); "exported model to {}", path.as_ref().display());

    Ok(y)
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;
    use crate::{
        arch::{layers::Dense, mlp},
        storage::TensorFile,
    };

    fn params(n: usize) -> Vec<f32> {
        (0..n).map(|i| ((i * 5 % 13) as f32 - 6.) / 10.).collect()
    }

    #[test]
    fn export_writes_graph_and_initializers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.graph.safetensors");
        let model = mlp(&[3, 4, 2], ActFn::relu());
        let p = params(model.size());
        let x = array![[0.2, -0.1, 0.7]];

        let traced = export(&path, &model, &p, x.view()).unwrap();
        assert_eq!(traced, model.predict(&p, x.view()).unwrap());

        let file = TensorFile::read(&path).unwrap();
        let graph = Graph::from_json(&file.metadata[GRAPH_KEY]).unwrap();
        let ops: Vec<_> = graph.nodes.iter().map(|n| n.op.clone()).collect();

        assert_eq!(ops.len(), 3);
        assert!(matches!(ops[0], Op::Gemm { .. }));
        assert_eq!(ops[1], Op::Relu);
        assert!(matches!(ops[2], Op::Gemm { .. }));
        assert_eq!(graph.nodes[2].output, OUTPUT_NAME);
        assert_eq!(graph.inputs[0].width, 3);
        assert_eq!(file.get("layers.1.weight", &[4, 2]).unwrap().data, p[16..24]);
    }

    #[test]
    fn export_names_a_final_activation_as_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.graph.safetensors");
        let model = Sequential::new([Dense::new((2, 2), Some(ActFn::sigmoid(2.)))]);
        let p = params(model.size());

        export(&path, &model, &p, array![[1., 2.]].view()).unwrap();

        let file = TensorFile::read(&path).unwrap();
        let graph = Graph::from_json(&file.metadata[GRAPH_KEY]).unwrap();
        assert_eq!(graph.nodes[1].op, Op::Sigmoid { amp: 2. });
        assert_eq!(graph.nodes[1].output, OUTPUT_NAME);
    }

    #[test]
    fn export_rejects_wrong_sample_width() {
        let dir = tempfile::tempdir().unwrap();
        let model = mlp(&[3, 2], ActFn::relu());
        let p = params(model.size());

        let res = export(
            dir.path().join("m.safetensors"),
            &model,
            &p,
            array![[1., 2.]].view(),
        );
        assert!(matches!(res, Err(MlErr::SizeMismatch { got: 2, expected: 3, .. })));
    }
}
