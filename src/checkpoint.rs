//! Persisting trained parameters.
//!
//! A checkpoint holds parameter values only, one tensor per stage weight and bias keyed by the
//! stage's name. The structure of the model isn't stored: loading needs a model of the same
//! shape to already exist.

use std::path::Path;

use log::info;

use crate::{
    MlErr, Result,
    arch::{Model, Sequential},
    storage::{Tensor, TensorFile},
};

/// Writes `params` to `path`, split into the named tensors of `model`.
///
/// # Arguments
/// * `path` - Where to write the checkpoint.
/// * `model` - The model the parameters belong to.
/// * `params` - The model's parameters.
pub fn save<P: AsRef<Path>>(path: P, model: &Sequential, params: &[f32]) -> Result<()> {
    if params.len() != model.size() {
        return Err(MlErr::SizeMismatch {
            what: "model parameters",
            got: params.len(),
            expected: model.size(),
        });
    }

    let mut file = TensorFile::new();
    for slot in model.param_layout() {
        let tensor = Tensor::new(slot.shape, params[slot.range].to_vec())?;
        file.insert(slot.name, tensor);
    }

    file.write(&path)?;
    info!("saved model state to {}", path.as_ref().display());
    Ok(())
}

/// Reads the checkpoint at `path` into a fresh parameter buffer laid out for `model`.
///
/// # Arguments
/// * `path` - The checkpoint written by `save`.
/// * `model` - A model with the same structure as the one that was saved.
///
/// # Returns
/// The parameters, or an error if a stage's tensor is missing or has another shape.
pub fn load<P: AsRef<Path>>(path: P, model: &Sequential) -> Result<Vec<f32>> {
    let file = TensorFile::read(path)?;
    let layout = model.param_layout();

    let expected = layout.len();
    if file.tensors.len() != expected {
        return Err(MlErr::SizeMismatch {
            what: "checkpoint tensors",
            got: file.tensors.len(),
            expected,
        });
    }

    let mut params = vec![0.; model.size()];
    for slot in layout {
        let tensor = file.get(&slot.name, &slot.shape)?;
        params[slot.range].copy_from_slice(&tensor.data);
    }

    Ok(params)
}
