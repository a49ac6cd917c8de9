use ndarray::{Array2, ArrayView2, Zip};

use super::LossFn;

/// Squared error averaged over every element of the batch, `mean((y_pred - y)^2)`.
///
/// Used for regression heads and the sigmoid gate tests, where the targets are not one-hot.
#[derive(Default, Clone, Copy, Debug)]
pub struct Mse;

impl Mse {
    pub fn new() -> Self {
        Self
    }
}

impl LossFn for Mse {
    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32 {
        if y_pred.is_empty() {
            return 0.;
        }

        let sum = Zip::from(&y_pred)
            .and(&y)
            .fold(0f32, |acc, &p, &t| acc + (p - t) * (p - t));
        sum / y_pred.len() as f32
    }

    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array2<f32> {
        let scale = 2. / y_pred.len().max(1) as f32;
        Zip::from(&y_pred)
            .and(&y)
            .map_collect(|&p, &t| scale * (p - t))
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn matching_targets_cost_nothing() {
        let y = array![[1., 2.], [3., 4.]];
        assert_eq!(Mse.loss(y.view(), y.view()), 0.);
        assert!(Mse.loss_prime(y.view(), y.view()).iter().all(|&d| d == 0.));
    }

    #[test]
    fn loss_is_the_mean_over_every_element() {
        let y_pred = array![[1., 2.], [3., 4.]];
        let y = array![[0., 2.], [3., 2.]];

        assert_eq!(Mse.loss(y_pred.view(), y.view()), 1.25);
        assert_eq!(
            Mse.loss_prime(y_pred.view(), y.view()),
            array![[0.5, 0.], [0., 1.]]
        );
    }

    #[test]
    fn single_row_known_values() {
        let y_pred = array![[1., 2.]];
        let y = array![[0., 0.]];

        assert_eq!(Mse.loss(y_pred.view(), y.view()), 2.5);
        assert_eq!(Mse.loss_prime(y_pred.view(), y.view()), array![[1., 2.]]);
    }

    #[test]
    fn empty_batch_has_zero_loss() {
        let y = Array2::<f32>::zeros((0, 3));
        assert_eq!(Mse.loss(y.view(), y.view()), 0.);
        assert_eq!(Mse.loss_prime(y.view(), y.view()).dim(), (0, 3));
    }
}
