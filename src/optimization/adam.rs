use super::{
    Optimizer,
    optimizer::{check_len, check_state},
};
use crate::Result;

/// The Adam optimizer: per-parameter step sizes from bias corrected running estimates of the
/// gradient's first and second moments.
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    t: i32,
    m: Vec<f32>,
    v: Vec<f32>,
}

impl Adam {
    /// Creates a new `Adam` optimizer.
    ///
    /// # Arguments
    /// * `len` - The amount of parameters it will update.
    /// * `learning_rate` - The largest step a parameter can take on an update.
    /// * `beta1` - The decay of the first moment estimate.
    /// * `beta2` - The decay of the second moment estimate.
    /// * `epsilon` - Added to the second moment's root to avoid dividing by zero.
    pub fn new(len: usize, learning_rate: f32, beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Self {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            t: 0,
            m: vec![0.; len],
            v: vec![0.; len],
        }
    }

    /// Returns the amount of updates applied so far.
    pub fn steps(&self) -> i32 {
        self.t
    }
}

impl Optimizer for Adam {
    fn update_params(&mut self, params: &mut [f32], grad: &[f32]) -> Result<()> {
        check_len(params, grad)?;
        check_state("adam state", self.m.len(), params.len())?;

        self.t = self.t.saturating_add(1);
        let m_scale = 1. / (1. - self.beta1.powi(self.t));
        let v_scale = 1. / (1. - self.beta2.powi(self.t));

        let (lr, b1, b2, eps) = (self.learning_rate, self.beta1, self.beta2, self.epsilon);
        let moments = self.m.iter_mut().zip(self.v.iter_mut());

        for ((p, &g), (m, v)) in params.iter_mut().zip(grad).zip(moments) {
            *m = b1 * *m + (1. - b1) * g;
            *v = b2 * *v + (1. - b2) * g * g;

            let m_hat = *m * m_scale;
            let v_hat = *v * v_scale;
            *p -= lr * m_hat / (v_hat.sqrt() + eps);
        }

        Ok(())
    }
}
