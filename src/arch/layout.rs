use std::ops::Range;

/// A named tensor inside a model's flat parameter buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSlot {
    pub name: String,
    pub shape: Vec<usize>,
    pub range: Range<usize>,
}

impl ParamSlot {
    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

/// Returns the name of a stage's weight matrix.
pub fn weight_name(layer: usize) -> String {
    format!("layers.{layer}.weight")
}

/// Returns the name of a stage's bias vector.
pub fn bias_name(layer: usize) -> String {
    format!("layers.{layer}.bias")
}
