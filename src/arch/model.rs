use ndarray::{Array2, ArrayView2};

use crate::{Result, arch::loss::LossFn, optimization::Optimizer};

pub trait Model {
    /// Returns the amount of parameters in the model.
    fn size(&self) -> usize;

    /// Runs one optimization step over a single batch: forward pass, loss, clearing the
    /// gradient buffer, backward pass and the optimizer's update. **`params` gets updated**.
    ///
    /// # Arguments
    /// * `params` - The model's parameters.
    /// * `grad` - A buffer for writing the computed gradient.
    /// * `loss_fn` - The loss function.
    /// * `optimizer` - The optimizer that dictates how to update the parameters.
    /// * `x` - The batch's inputs, one sample per row.
    /// * `y` - The batch's targets, one sample per row.
    ///
    /// # Returns
    /// The batch loss.
    fn step<L, O>(
        &mut self,
        params: &mut [f32],
        grad: &mut [f32],
        loss_fn: &L,
        optimizer: &mut O,
        x: ArrayView2<f32>,
        y: ArrayView2<f32>,
    ) -> Result<f32>
    where
        L: LossFn,
        O: Optimizer;

    /// Computes the model's output for `x` without tracking anything for a backward pass.
    fn predict(&self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>>;
}
