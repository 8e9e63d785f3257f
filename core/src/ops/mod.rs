//! Reference operators.
//!
//! All of them work on `f64` tensors, image tensors being NHWC and filters
//! HWCF (the `HWIO` of other frameworks). They mirror the TensorFlow kernels
//! the library under test is validated against, including how SAME padding
//! is laid out and how gradients are defined.

pub mod batchnorm;
pub mod bias;
pub mod binary;
pub mod conv;
pub mod depthwise;
pub mod gather;
pub mod grouped;
pub mod matmul;
pub mod pointwise;
pub mod pool;
pub mod reduce;
pub mod scatter_nd;
pub mod softmax;
pub mod transpose;

use crate::internal::*;
use ndarray::Ix4;

pub(crate) fn as_nhwc<'a>(t: &'a ArrayD<f64>, what: &str) -> RefResult<ndarray::ArrayView4<'a, f64>> {
    t.view()
        .into_dimensionality::<Ix4>()
        .with_context(|| format!("{what} must be a rank 4 tensor, got {:?}", t.shape()))
}

/// Normalizes a possibly negative axis for a tensor of rank `rank`.
pub fn resolve_axis(axis: isize, rank: usize) -> RefResult<usize> {
    let resolved = if axis < 0 { axis + rank as isize } else { axis };
    ensure!(
        resolved >= 0 && (resolved as usize) < rank,
        "Axis {} is out of range for a rank {} tensor",
        axis,
        rank
    );
    Ok(resolved as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axes() {
        assert_eq!(resolve_axis(0, 3).unwrap(), 0);
        assert_eq!(resolve_axis(-1, 3).unwrap(), 2);
        assert_eq!(resolve_axis(-3, 3).unwrap(), 0);
        assert!(resolve_axis(3, 3).is_err());
        assert!(resolve_axis(-4, 3).is_err());
    }

    #[test]
    fn nhwc_views() {
        let t = ArrayD::from_shape_vec(vec![1, 2, 3, 2], (0..12).map(|x| x as f64).collect()).unwrap();
        let view = as_nhwc(&t, "input").unwrap();
        assert_eq!(view.dim(), (1, 2, 3, 2));
        assert_eq!(view[[0, 1, 2, 1]], 11.0);
        let flat = ArrayD::<f64>::zeros(vec![2, 3]);
        let err = as_nhwc(&flat, "filter").unwrap_err();
        assert!(format!("{err:?}").contains("filter must be a rank 4 tensor"));
    }
}
