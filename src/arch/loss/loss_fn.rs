use ndarray::{Array2, ArrayView2};

/// A scalar measure of how far a batch of predictions is from its targets.
pub trait LossFn {
    /// Returns the mean loss over the rows of the batch.
    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32;

    /// Returns the derivative of `loss` with respect to `y_pred`.
    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array2<f32>;
}
