use rand::Rng;
use rand_distr::{Distribution, Normal, Uniform};
use serde::{Deserialize, Serialize};

use crate::Result;

/// How the parameters of a stage are drawn.
///
/// The bias of a stage is drawn from the same bound as its weights for `LinearDefault` and
/// `Uniform`, and set to zero for the other schemes.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InitScheme {
    /// `U(-1/sqrt(fan_in), 1/sqrt(fan_in))` for weights and biases.
    #[default]
    LinearDefault,
    /// `U(-sqrt(6/(fan_in + fan_out)), sqrt(6/(fan_in + fan_out)))`.
    XavierUniform,
    /// `N(0, sqrt(2/fan_in))`, suited to ReLU stacks.
    Kaiming,
    Uniform {
        low: f32,
        high: f32,
    },
    Normal {
        mean: f32,
        std_dev: f32,
    },
}

impl InitScheme {
    /// Fills the weights and the bias of a stage of dimensions `dim`.
    ///
    /// # Arguments
    /// * `rng` - The random number generator to draw from.
    /// * `dim` - The input and output widths of the stage.
    /// * `w` - The stage's weights.
    /// * `b` - The stage's bias.
    ///
    /// # Returns
    /// An error if the scheme's distribution can't be built.
    pub fn fill<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        dim: (usize, usize),
        w: &mut [f32],
        b: &mut [f32],
    ) -> Result<()> {
        let fan_in = dim.0.max(1) as f32;
        let fan_sum = (dim.0 + dim.1).max(1) as f32;

        match *self {
            Self::LinearDefault => {
                let bound = 1. / fan_in.sqrt();
                let dist = Uniform::new(-bound, bound)?;
                draw(&dist, rng, w);
                draw(&dist, rng, b);
            }
            Self::Uniform { low, high } => {
                let dist = Uniform::new(low, high)?;
                draw(&dist, rng, w);
                draw(&dist, rng, b);
            }
            Self::XavierUniform => {
                let bound = (6. / fan_sum).sqrt();
                draw(&Uniform::new(-bound, bound)?, rng, w);
                b.fill(0.);
            }
            Self::Kaiming => {
                draw(&Normal::new(0., (2. / fan_in).sqrt())?, rng, w);
                b.fill(0.);
            }
            Self::Normal { mean, std_dev } => {
                draw(&Normal::new(mean, std_dev)?, rng, w);
                b.fill(0.);
            }
        }

        Ok(())
    }
}

fn draw<D, R>(dist: &D, rng: &mut R, out: &mut [f32])
where
    D: Distribution<f32>,
    R: Rng + ?Sized,
{
    for p in out {
        *p = dist.sample(rng);
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn filled(scheme: InitScheme, dim: (usize, usize)) -> (Vec<f32>, Vec<f32>) {
        let mut rng = StdRng::seed_from_u64(42);
        let mut w = vec![f32::NAN; dim.0 * dim.1];
        let mut b = vec![f32::NAN; dim.1];
        scheme.fill(&mut rng, dim, &mut w, &mut b).unwrap();
        (w, b)
    }

    #[test]
    fn linear_default_respects_bound() {
        let (w, b) = filled(InitScheme::LinearDefault, (16, 64));

        assert!(w.iter().chain(&b).all(|p| p.abs() <= 0.25));
        assert!(w.iter().any(|&p| p != w[0]));
        assert!(b.iter().any(|&p| p != 0.));
    }

    #[test]
    fn xavier_and_kaiming_zero_the_bias() {
        for scheme in [InitScheme::XavierUniform, InitScheme::Kaiming] {
            let (w, b) = filled(scheme, (8, 4));

            assert!(w.iter().all(|p| p.is_finite()));
            assert!(b.iter().all(|&p| p == 0.));
        }

        let (w, _) = filled(InitScheme::XavierUniform, (8, 4));
        assert!(w.iter().all(|p| p.abs() <= (0.5f32).sqrt()));
    }

    #[test]
    fn invalid_distributions_are_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        let (mut w, mut b) = (vec![0.; 1], vec![0.; 1]);

        let uniform = InitScheme::Uniform { low: 1., high: -1. };
        assert!(uniform.fill(&mut rng, (1, 1), &mut w, &mut b).is_err());

        let normal = InitScheme::Normal {
            mean: 0.,
            std_dev: f32::NAN,
        };
        assert!(normal.fill(&mut rng, (1, 1), &mut w, &mut b).is_err());
    }

    #[test]
    fn same_seed_same_parameters() {
        assert_eq!(
            filled(InitScheme::Kaiming, (5, 3)),
            filled(InitScheme::Kaiming, (5, 3))
        );
    }
}
