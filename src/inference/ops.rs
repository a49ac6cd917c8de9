use ndarray::{Array1, Array2, ArrayView2};

use crate::{MlErr, Result};

/// `x · w + b`.
pub fn gemm(x: ArrayView2<f32>, w: &Array2<f32>, b: &Array1<f32>) -> Result<Array2<f32>> {
    if x.ncols() != w.nrows() {
        return Err(MlErr::SizeMismatch {
            what: "gemm input width",
            got: x.ncols(),
            expected: w.nrows(),
        });
    }

    let mut z = x.dot(w);
    z += b;
    Ok(z)
}

pub fn relu(x: ArrayView2<f32>) -> Array2<f32> {
    x.mapv(|z| z.max(0.))
}

pub fn sigmoid(x: ArrayView2<f32>, amp: f32) -> Array2<f32> {
    x.mapv(|z| amp / (1. + (-z).exp()))
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn gemm_adds_bias_per_row() {
        let w = array![[1., 2.], [3., 4.], [5., 6.]];
        let b = array![0.5, -0.5];
        let x = array![[1., 0., 0.], [0., 1., 1.]];

        assert_eq!(gemm(x.view(), &w, &b).unwrap(), array![[1.5, 1.5], [8.5, 9.5]]);
        assert!(gemm(array![[1., 0.]].view(), &w, &b).is_err());
    }

    #[test]
    fn activations_are_elementwise() {
        let x = array![[-1., 0., 2.]];

        assert_eq!(relu(x.view()), array![[0., 0., 2.]]);
        assert_eq!(sigmoid(array![[0.]].view(), 3.), array![[1.5]]);
    }
}
