use crate::{MlErr, Result};

pub trait Optimizer {
    /// Updates the parameters in place following the optimizer's learning rule.
    ///
    /// # Arguments
    /// * `params` - The parameters that are going to be modified.
    /// * `grad` - The gradient of the loss with respect to `params`.
    ///
    /// # Returns
    /// An error if `params` and `grad` differ in length.
    fn update_params(&mut self, params: &mut [f32], grad: &[f32]) -> Result<()>;
}

impl<O: Optimizer + ?Sized> Optimizer for Box<O> {
    fn update_params(&mut self, params: &mut [f32], grad: &[f32]) -> Result<()> {
        (**self).update_params(params, grad)
    }
}

pub(super) fn check_len(params: &[f32], grad: &[f32]) -> Result<()> {
    check_state("gradient", grad.len(), params.len())
}

/// Checks that per-parameter optimizer state of length `got` fits `expected` parameters.
pub(super) fn check_state(what: &'static str, got: usize, expected: usize) -> Result<()> {
    if got != expected {
        return Err(MlErr::SizeMismatch {
            what,
            got,
            expected,
        });
    }

    Ok(())
}
