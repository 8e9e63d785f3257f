use std::fmt;
use std::str::FromStr;

use ndarray::Zip;

use crate::internal::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointwiseOp {
    Relu,
    Tanh,
}

impl PointwiseOp {
    pub fn forward(&self, input: &ArrayD<f64>) -> ArrayD<f64> {
        match self {
            PointwiseOp::Relu => input.mapv(|x| x.max(0.0)),
            PointwiseOp::Tanh => input.mapv(f64::tanh),
        }
    }

    /// Input gradient given the output gradient `errors`: `dy * (x > 0)` for
    /// relu, `dy * (1 - y^2)` for tanh.
    pub fn gradient(&self, input: &ArrayD<f64>, errors: &ArrayD<f64>) -> RefResult<ArrayD<f64>> {
        ensure!(
            input.shape() == errors.shape(),
            "Gradient of {} needs errors shaped like its input ({:?} vs {:?})",
            self,
            input.shape(),
            errors.shape()
        );
        Ok(match self {
            PointwiseOp::Relu => Zip::from(input)
                .and(errors)
                .map_collect(|&x, &dy| if x > 0.0 { dy } else { 0.0 }),
            PointwiseOp::Tanh => Zip::from(&self.forward(input))
                .and(errors)
                .map_collect(|&y, &dy| dy * (1.0 - y * y)),
        })
    }
}

impl FromStr for PointwiseOp {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> RefResult<PointwiseOp> {
        match s {
            "relu" => Ok(PointwiseOp::Relu),
            "tanh" => Ok(PointwiseOp::Tanh),
            _ => bail!("Unrecognized pointwise op {:?}", s),
        }
    }
}

impl fmt::Display for PointwiseOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            PointwiseOp::Relu => "relu",
            PointwiseOp::Tanh => "tanh",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn relu() {
        let x = iota_signed_tensor(&[4]).unwrap();
        let y = PointwiseOp::Relu.forward(&x);
        assert_eq!(y.iter().copied().collect::<Vec<_>>(), vec![0.0, 0.0, 0.0, 1.0]);
        let g = PointwiseOp::Relu.gradient(&x, &iota_tensor(&[4], 0.0).unwrap()).unwrap();
        assert_eq!(g.iter().copied().collect::<Vec<_>>(), vec![0.0, 0.0, 0.0, 4.0]);
    }

    #[test]
    fn tanh() {
        let x = iota_signed_tensor(&[3]).unwrap();
        let g = PointwiseOp::Tanh.gradient(&x, &constant_tensor(&[3], 1.0)).unwrap();
        assert_abs_diff_eq!(g[&[2][..]], 1.0);
        let t = 1f64.tanh();
        assert_abs_diff_eq!(g[&[1][..]], 1.0 - t * t, epsilon = 1e-12);
        let t = 2f64.tanh();
        assert_abs_diff_eq!(g[&[0][..]], 1.0 - t * t, epsilon = 1e-12);
    }

    #[test]
    fn parse() {
        assert_eq!("tanh".parse::<PointwiseOp>().unwrap(), PointwiseOp::Tanh);
        assert!("sigmoid".parse::<PointwiseOp>().is_err());
        let x = constant_tensor(&[2], 1.0);
        assert!(PointwiseOp::Relu.gradient(&x, &constant_tensor(&[3], 1.0)).is_err());
    }
}
