mod scheme;

use rand::Rng;

pub use scheme::InitScheme;

use crate::{Result, arch::Sequential};

/// Draws a fresh parameter buffer for `model` with the default scheme, every stage uniform in
/// `±1/sqrt(fan_in)`.
pub fn init_params<R: Rng>(model: &Sequential, rng: R) -> Result<Vec<f32>> {
    init_params_with(model, InitScheme::default(), rng)
}

/// Draws a fresh parameter buffer for `model`.
///
/// # Arguments
/// * `model` - The model whose parameters are being created.
/// * `scheme` - How every stage is filled.
/// * `rng` - The random number generator shared by every stage.
///
/// # Returns
/// A buffer of `model.size()` parameters.
pub fn init_params_with<R: Rng>(
    model: &Sequential,
    scheme: InitScheme,
    mut rng: R,
) -> Result<Vec<f32>> {
    let layout = model.param_layout();
    let mut params = vec![0.; layout.last().map_or(0, |slot| slot.range.end)];

    for (layer, slots) in model.layers().iter().zip(layout.chunks_exact(2)) {
        let (weight, bias) = (&slots[0], &slots[1]);
        let (w, b) = params[weight.range.start..bias.range.end].split_at_mut(weight.len());
        scheme.fill(&mut rng, layer.dim(), w, b)?;
    }

    Ok(params)
}
