use super::{Sequential, activations::ActFn, layers::Dense};

/// Builds a multilayer perceptron whose stages map `widths[i]` features to `widths[i + 1]`.
/// Every stage but the last is followed by `act_fn`, the last one yields raw logits.
///
/// # Arguments
/// * `widths` - The input width, the hidden widths and the output width, in order.
/// * `act_fn` - The nonlinearity between stages.
///
/// # Returns
/// The model, without any layer when `widths` has less than two elements.
pub fn mlp(widths: &[usize], act_fn: ActFn) -> Sequential {
    let stages = widths.len().saturating_sub(1);

    Sequential::new(widths.windows(2).enumerate().map(|(i, dim)| {
        let act_fn = (i + 1 < stages).then_some(act_fn);
        Dense::new((dim[0], dim[1]), act_fn)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mlp_interleaves_act_fns() {
        let model = mlp(&[784, 512, 512, 10], ActFn::relu());
        let layers = model.layers();

        assert_eq!(layers.len(), 3);
        assert_eq!(layers[0].dim(), (784, 512));
        assert_eq!(layers[2].dim(), (512, 10));
        assert_eq!(layers[0].act_fn(), Some(ActFn::relu()));
        assert_eq!(layers[1].act_fn(), Some(ActFn::relu()));
        assert_eq!(layers[2].act_fn(), None);
        assert!(model.check_dims(784, 10).is_ok());
    }

    #[test]
    fn mlp_without_stages_is_empty() {
        assert!(mlp(&[3], ActFn::relu()).layers().is_empty());
    }
}
