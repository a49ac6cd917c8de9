use std::ops::Range;

use ndarray::{Array2, ArrayView2};

use super::{
    Model,
    layers::Dense,
    layout::{self, ParamSlot},
    loss::LossFn,
};
use crate::{MlErr, Result, optimization::Optimizer};

/// A sequential model: information flows forward when computing an output and backward when
/// computing the *deltas* of its layers.
#[derive(Clone, Debug)]
pub struct Sequential {
    layers: Vec<Dense>,
}

impl Sequential {
    /// Creates a new `Sequential`.
    ///
    /// # Arguments
    /// * `layers` - The layers the sequential is composed of.
    ///
    /// # Returns
    /// A new `Sequential` instance.
    pub fn new<I>(layers: I) -> Self
    where
        I: IntoIterator<Item = Dense>,
    {
        Self {
            layers: layers.into_iter().collect(),
        }
    }

    pub fn layers(&self) -> &[Dense] {
        &self.layers
    }

    /// Returns the width of the model's input, zero if it has no layers.
    pub fn input_size(&self) -> usize {
        self.layers.first().map_or(0, |l| l.dim().0)
    }

    /// Returns the width of the model's output, zero if it has no layers.
    pub fn output_size(&self) -> usize {
        self.layers.last().map_or(0, |l| l.dim().1)
    }

    /// Checks that every stage's output width equals the next stage's input width, and that the
    /// model maps `input_size` features to `classes` outputs.
    pub fn check_dims(&self, input_size: usize, classes: usize) -> Result<()> {
        if self.layers.is_empty() {
            return Err(MlErr::EmptyModel);
        }

        let mut width = input_size;
        for (i, layer) in self.layers.iter().enumerate() {
            let (fan_in, fan_out) = layer.dim();
            if fan_in != width {
                return Err(MlErr::LayerDimMismatch {
                    layer: i,
                    got: fan_in,
                    expected: width,
                });
            }
            width = fan_out;
        }

        if width != classes {
            return Err(MlErr::SizeMismatch {
                what: "model output classes",
                got: width,
                expected: classes,
            });
        }

        Ok(())
    }

    /// Returns the named tensors of the model, in parameter buffer order.
    pub fn param_layout(&self) -> Vec<ParamSlot> {
        let mut slots = Vec::with_capacity(self.layers.len() * 2);

        for (i, (layer, range)) in self.layers.iter().zip(self.ranges()).enumerate() {
            let (fan_in, fan_out) = layer.dim();
            let w_end = range.start + fan_in * fan_out;

            slots.push(ParamSlot {
                name: layout::weight_name(i),
                shape: vec![fan_in, fan_out],
                range: range.start..w_end,
            });
            slots.push(ParamSlot {
                name: layout::bias_name(i),
                shape: vec![fan_out],
                range: w_end..range.end,
            });
        }

        slots
    }

    /// Makes a forward pass through the network, recording what `backward` needs.
    ///
    /// # Arguments
    /// * `params` - The model's parameters.
    /// * `x` - The input data.
    ///
    /// # Returns
    /// The prediction for the given input or an error if occurred.
    pub fn forward(&mut self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.check_params(params.len())?;

        let ranges = self.ranges();
        let mut layers = self.layers.iter_mut().zip(ranges);

        let Some((first, range)) = layers.next() else {
            return Err(MlErr::EmptyModel);
        };

        let mut y = first.forward(&params[range], x)?;
        for (layer, range) in layers {
            y = layer.forward(&params[range], y.view())?;
        }

        Ok(y)
    }

    /// Propagates the loss derivative from the output back to the first layer, accumulating
    /// the gradient of every parameter into `grad`.
    ///
    /// # Arguments
    /// * `params` - The model's parameters.
    /// * `grad` - A buffer of the same size as `params`.
    /// * `d` - The derivative of the loss with respect to the last `forward` output.
    pub fn backward(&mut self, params: &[f32], grad: &mut [f32], d: Array2<f32>) -> Result<()> {
        self.check_params(params.len())?;
        self.check_params(grad.len())?;

        let ranges = self.ranges();
        let mut d = d;

        for (layer, range) in self.layers.iter_mut().zip(ranges).rev() {
            d = layer.backward(&params[range.clone()], &mut grad[range], d)?;
        }

        Ok(())
    }

    /// Computes the model's output without recording any backward state. The model is only
    /// borrowed, so nothing about it can change while predicting.
    ///
    /// # Arguments
    /// * `params` - The model's parameters.
    /// * `x` - The input data.
    ///
    /// # Returns
    /// The prediction for the given input or an error if occurred.
    pub fn predict(&self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.check_params(params.len())?;

        let mut layers = self.layers.iter().zip(self.ranges());

        let Some((first, range)) = layers.next() else {
            return Err(MlErr::EmptyModel);
        };

        let mut y = first.predict(&params[range], x)?;
        for (layer, range) in layers {
            y = layer.predict(&params[range], y.view())?;
        }

        Ok(y)
    }

    fn ranges(&self) -> Vec<Range<usize>> {
        let mut start = 0;

        self.layers
            .iter()
            .map(|layer| {
                let range = start..start + layer.size();
                start = range.end;
                range
            })
            .collect()
    }

    fn check_params(&self, got: usize) -> Result<()> {
        let expected = self.size();
        if got != expected {
            return Err(MlErr::SizeMismatch {
                what: "model parameters",
                got,
                expected,
            });
        }

        Ok(())
    }
}

impl Model for Sequential {
    fn size(&self) -> usize {
        self.layers.iter().map(|layer| layer.size()).sum()
    }

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
        O: Optimizer,
    {
        let y_pred = self.forward(params, x)?;
        if y_pred.dim() != y.dim() {
            return Err(MlErr::SizeMismatch {
                what: "label width",
                got: y.ncols(),
                expected: y_pred.ncols(),
            });
        }

        let loss = loss_fn.loss(y_pred.view(), y);
        let d = loss_fn.loss_prime(y_pred.view(), y);

        grad.fill(0.);
        self.backward(params, grad, d)?;
        optimizer.update_params(params, grad)?;

        Ok(loss)
    }

    fn predict(&self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>> {
        Sequential::predict(self, params, x)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;
    use crate::{
        arch::{
            activations::ActFn,
            loss::{CrossEntropy, Mse},
        },
        optimization::GradientDescent,
    };

    fn mlp() -> Sequential {
        Sequential::new([
            Dense::new((3, 4), Some(ActFn::relu())),
            Dense::new((4, 2), None),
        ])
    }

    fn params(n: usize) -> Vec<f32> {
        (0..n).map(|i| ((i * 7 % 11) as f32 - 5.) / 10.).collect()
    }

    #[test]
    fn size_sums_layers() {
        assert_eq!(mlp().size(), 4 * 4 + 5 * 2);
    }

    #[test]
    fn check_dims_accepts_matching_chain() {
        assert!(mlp().check_dims(3, 2).is_ok());
    }

    #[test]
    fn check_dims_rejects_broken_chain() {
        let model = Sequential::new([Dense::new((3, 4), None), Dense::new((5, 2), None)]);

        assert!(matches!(
            model.check_dims(3, 2),
            Err(MlErr::LayerDimMismatch {
                layer: 1,
                got: 5,
                expected: 4
            })
        ));
    }

    #[test]
    fn check_dims_rejects_wrong_input_and_classes() {
        assert!(mlp().check_dims(4, 2).is_err());
        assert!(mlp().check_dims(3, 10).is_err());
        assert!(matches!(
            Sequential::new([]).check_dims(3, 2),
            Err(MlErr::EmptyModel)
        ));
    }

    #[test]
    fn param_layout_covers_the_buffer() {
        let model = mlp();
        let layout = model.param_layout();
        let names: Vec<_> = layout.iter().map(|s| s.name.as_str()).collect();

        assert_eq!(
            names,
            [
                "layers.0.weight",
                "layers.0.bias",
                "layers.1.weight",
                "layers.1.bias"
            ]
        );
        assert_eq!(layout[0].shape, [3, 4]);
        assert_eq!(layout[1].range, 12..16);
        assert_eq!(layout[3].range.end, model.size());

        let total: usize = layout.iter().map(ParamSlot::len).sum();
        assert_eq!(total, model.size());
    }

    #[test]
    fn predict_equals_forward() {
        let mut model = mlp();
        let p = params(model.size());
        let x = array![[0.1, -0.4, 0.9], [1.0, 0.5, -0.2]];

        let predicted = model.predict(&p, x.view()).unwrap();
        let forwarded = model.forward(&p, x.view()).unwrap();
        assert_eq!(predicted, forwarded);
    }

    #[test]
    fn forward_rejects_wrong_param_count() {
        let mut model = mlp();
        let p = params(model.size() - 1);
        let x = array![[0.1, -0.4, 0.9]];

        assert!(model.forward(&p, x.view()).is_err());
    }

    #[test]
    fn backward_matches_finite_differences() {
        const EPS: f32 = 1e-2;

        let mut model = Sequential::new([
            Dense::new((3, 4), Some(ActFn::sigmoid(1.))),
            Dense::new((4, 2), None),
        ]);
        let p = params(model.size());
        let x = array![[0.1, -0.4, 0.9], [1.0, 0.5, -0.2]];
        let y = array![[1., 0.], [0., 1.]];
        let loss_fn = CrossEntropy;

        let y_pred = model.forward(&p, x.view()).unwrap();
        let d = loss_fn.loss_prime(y_pred.view(), y.view());
        let mut grad = vec![0.; model.size()];
        model.backward(&p, &mut grad, d).unwrap();

        for i in 0..p.len() {
            let mut plus = p.clone();
            let mut minus = p.clone();
            plus[i] += EPS;
            minus[i] -= EPS;

            let l_plus = loss_fn.loss(model.predict(&plus, x.view()).unwrap().view(), y.view());
            let l_minus = loss_fn.loss(model.predict(&minus, x.view()).unwrap().view(), y.view());
            let numeric = (l_plus - l_minus) / (2. * EPS);

            assert!(
                (numeric - grad[i]).abs() < 1e-3,
                "param {i}: numeric {numeric}, analytic {}",
                grad[i]
            );
        }
    }

    #[test]
    fn step_lowers_the_loss() {
        let mut model = Sequential::new([Dense::new((2, 1), None)]);
        let mut p = vec![0.; model.size()];
        let mut grad = vec![0.; model.size()];
        let mut optimizer = GradientDescent::new(0.1);
        let x = array![[1., 0.], [0., 1.], [1., 1.]];
        let y = array![[1.], [2.], [3.]];

        let first = model
            .step(&mut p, &mut grad, &Mse, &mut optimizer, x.view(), y.view())
            .unwrap();
        let mut last = first;
        for _ in 0..50 {
            last = model
                .step(&mut p, &mut grad, &Mse, &mut optimizer, x.view(), y.view())
                .unwrap();
        }

        assert!(last < first);
    }

    #[test]
    fn step_rejects_wrong_label_width() {
        let mut model = mlp();
        let mut p = params(model.size());
        let mut grad = vec![0.; model.size()];
        let mut optimizer = GradientDescent::new(0.1);
        let x = array![[0.1, -0.4, 0.9]];
        let y = array![[1., 0., 0.]];

        let res = model.step(&mut p, &mut grad, &CrossEntropy, &mut optimizer, x.view(), y.view());
        assert!(res.is_err());
    }
}
