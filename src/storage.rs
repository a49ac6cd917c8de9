//! Named `f32` tensor files, stored in the safetensors format.

use std::{
    collections::{BTreeMap, HashMap},
    fs,
    path::Path,
};

use safetensors::{Dtype, SafeTensors, tensor::TensorView};

use crate::{MlErr, Result};

/// A dense row-major tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

impl Tensor {
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(MlErr::SizeMismatch {
                what: "tensor elements",
                got: data.len(),
                expected,
            });
        }

        Ok(Self { shape, data })
    }
}

/// A set of named tensors plus string metadata, as read from or written to disk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TensorFile {
    pub tensors: BTreeMap<String, Tensor>,
    pub metadata: HashMap<String, String>,
}

impl TensorFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, tensor: Tensor) {
        self.tensors.insert(name.into(), tensor);
    }

    /// Returns the tensor called `name`, checking it has the `expected` shape.
    pub fn get(&self, name: &str, expected: &[usize]) -> Result<&Tensor> {
        let tensor = self
            .tensors
            .get(name)
            .ok_or_else(|| MlErr::MissingTensor {
                name: name.to_string(),
            })?;

        if tensor.shape != expected {
            return Err(MlErr::TensorShapeMismatch {
                name: name.to_string(),
                got: tensor.shape.clone(),
                expected: expected.to_vec(),
            });
        }

        Ok(tensor)
    }

    /// Writes every tensor and the metadata to `path`, replacing it if it exists.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let views = self
            .tensors
            .iter()
            .map(|(name, tensor)| {
                let bytes: &[u8] = bytemuck::cast_slice(&tensor.data);
                let view = TensorView::new(Dtype::F32, tensor.shape.clone(), bytes)?;
                Ok((name.as_str(), view))
            })
            .collect::<Result<Vec<_>>>()?;

        let metadata = (!self.metadata.is_empty()).then(|| self.metadata.clone());
        safetensors::serialize_to_file(views, &metadata, path.as_ref())?;
        Ok(())
    }

    /// Reads a file written by `write`. Every tensor must hold `f32` values.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let buffer = fs::read(path)?;

        let (_, header) = SafeTensors::read_metadata(&buffer)?;
        let metadata = header.metadata().clone().unwrap_or_default();

        let mut tensors = BTreeMap::new();
        for (name, view) in SafeTensors::deserialize(&buffer)?.tensors() {
            if view.dtype() != Dtype::F32 {
                return Err(MlErr::UnsupportedDtype { name });
            }

            let tensor = Tensor::new(view.shape().to_vec(), to_f32s(view.data()))?;
            tensors.insert(name, tensor);
        }

        Ok(Self { tensors, metadata })
    }
}

fn to_f32s(bytes: &[u8]) -> Vec<f32> {
    match bytemuck::try_cast_slice::<u8, f32>(bytes) {
        Ok(floats) => floats.to_vec(),
        // The buffer isn't 4-byte aligned, decode it element by element.
        Err(_) => bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect(),
    }
}
