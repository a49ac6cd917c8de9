use ndarray::{Array2, ArrayView2, Axis};

use super::LossFn;

/// Softmax cross entropy over raw logits with one-hot targets.
///
/// `L = -mean_rows(sum(y * log_softmax(y_pred)))`
#[derive(Default, Clone, Copy, Debug)]
pub struct CrossEntropy;

impl CrossEntropy {
    /// Returns a new `CrossEntropy`.
    pub fn new() -> Self {
        Self
    }
}

/// Row-wise softmax, shifted by each row's maximum so `exp` can't overflow.
pub fn softmax(logits: ArrayView2<f32>) -> Array2<f32> {
    let mut probs = logits.to_owned();

    for mut row in probs.axis_iter_mut(Axis(0)) {
        let max = row.fold(f32::NEG_INFINITY, |a, &b| a.max(b));
        row.mapv_inplace(|z| (z - max).exp());
        let sum = row.sum();
        row.mapv_inplace(|e| e / sum);
    }

    probs
}

impl LossFn for CrossEntropy {
    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32 {
        let rows = y_pred.nrows();
        if rows == 0 {
            return 0.;
        }

        let total: f32 = y_pred
            .axis_iter(Axis(0))
            .zip(y.axis_iter(Axis(0)))
            .map(|(z, t)| {
                let max = z.fold(f32::NEG_INFINITY, |a, &b| a.max(b));
                let lse = max + z.mapv(|z| (z - max).exp()).sum().ln();
                z.iter().zip(t).map(|(&z, &t)| -t * (z - lse)).sum::<f32>()
            })
            .sum();

        total / rows as f32
    }

    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array2<f32> {
        let rows = y_pred.nrows().max(1) as f32;
        (softmax(y_pred) - &y) / rows
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn softmax_rows_sum_to_one() {
        let probs = softmax(array![[1., 2., 3.], [1000., 1000., 1000.]].view());

        for row in probs.axis_iter(Axis(0)) {
            assert!((row.sum() - 1.).abs() < 1e-6);
        }
        assert!((probs[[1, 0]] - 1. / 3.).abs() < 1e-6);
    }

    #[test]
    fn uniform_logits_cost_log_classes() {
        let logits = array![[0., 0., 0., 0.]];
        let y = array![[0., 1., 0., 0.]];

        let loss = CrossEntropy.loss(logits.view(), y.view());
        assert!((loss - 4f32.ln()).abs() < 1e-6);
    }

    #[test]
    fn confident_correct_prediction_is_cheap() {
        let logits = array![[20., 0.], [0., 20.]];
        let y = array![[1., 0.], [0., 1.]];

        let loss = CrossEntropy.loss(logits.view(), y.view());
        assert!(loss >= 0.);
        assert!(loss < 1e-6);
    }

    #[test]
    fn loss_prime_is_softmax_minus_target_over_rows() {
        let logits = array![[0., 0.], [0., 0.]];
        let y = array![[1., 0.], [0., 1.]];

        let d = CrossEntropy.loss_prime(logits.view(), y.view());
        assert_eq!(d, array![[-0.25, 0.25], [0.25, -0.25]]);
    }
}
