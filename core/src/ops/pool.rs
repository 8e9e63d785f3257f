use std::fmt;
use std::str::FromStr;

use ndarray::Array4;

use super::as_nhwc;
use crate::internal::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolOp {
    Max,
    Average,
}

impl FromStr for PoolOp {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> RefResult<PoolOp> {
        match s {
            "max" | "maxwithnan" => Ok(PoolOp::Max),
            "avg" => Ok(PoolOp::Average),
            _ => bail!("Unrecognized pooling op {:?}", s),
        }
    }
}

impl fmt::Display for PoolOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            PoolOp::Max => "max",
            PoolOp::Average => "avg",
        })
    }
}

/// 2D pooling over NHWC tensors. Padding never takes part in the result:
/// average divides by the number of actual input cells in the window.
#[derive(Debug, Clone, Copy, new, PartialEq)]
pub struct Pool2d {
    pub op: PoolOp,
    pub window: Window2d,
}

impl Pool2d {
    pub fn output_shape(&self, input_shape: &[usize]) -> RefResult<[usize; 4]> {
        let (n, h, w, c) = nhwc(input_shape)?;
        let (oh, ow) = self.window.output_hw((h, w));
        Ok([n, oh, ow, c])
    }

    pub fn forward(&self, input: &ArrayD<f64>) -> RefResult<ArrayD<f64>> {
        let input = as_nhwc(input, "pooling input")?;
        let (n, h, w, c) = input.dim();
        let (oh, ow) = self.window.output_hw((h, w));
        let mut output = Array4::<f64>::zeros((n, oh, ow, c));
        for ((b, y, x, ch), out) in output.indexed_iter_mut() {
            let values = self
                .window
                .taps((h, w), (y, x))
                .into_iter()
                .map(|tap| input[[b, tap.input.0, tap.input.1, ch]]);
            *out = match self.op {
                PoolOp::Max => values.fold(f64::NEG_INFINITY, f64::max),
                PoolOp::Average => {
                    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
                    sum / count.max(1) as f64
                }
            };
        }
        Ok(output.into_dyn())
    }

    /// Gradient of the pooling with respect to its input, given the
    /// gradient `errors` of its output.
    ///
    /// Max pooling routes each error to the first maximum met while scanning
    /// the window row by row.
    pub fn backward(&self, input: &ArrayD<f64>, errors: &ArrayD<f64>) -> RefResult<ArrayD<f64>> {
        let expected = self.output_shape(input.shape())?;
        ensure!(
            errors.shape() == expected,
            "Pooling gradient expects errors of shape {:?}, got {:?}",
            expected,
            errors.shape()
        );
        let input = as_nhwc(input, "pooling input")?;
        let errors = as_nhwc(errors, "pooling errors")?;
        let (n, h, w, c) = input.dim();
        let mut grad = Array4::<f64>::zeros((n, h, w, c));
        for ((b, y, x, ch), &err) in errors.indexed_iter() {
            let taps = self.window.taps((h, w), (y, x));
            match self.op {
                PoolOp::Max => {
                    let mut best: Option<((usize, usize), f64)> = None;
                    for tap in &taps {
                        let v = input[[b, tap.input.0, tap.input.1, ch]];
                        if best.is_none_or(|(_, max)| v > max) {
                            best = Some((tap.input, v));
                        }
                    }
                    if let Some(((iy, ix), _)) = best {
                        grad[[b, iy, ix, ch]] += err;
                    }
                }
                PoolOp::Average => {
                    let share = err / taps.len().max(1) as f64;
                    for tap in &taps {
                        grad[[b, tap.input.0, tap.input.1, ch]] += share;
                    }
                }
            }
        }
        Ok(grad.into_dyn())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array;

    fn image(h: usize, w: usize, values: &[f64]) -> ArrayD<f64> {
        Array::from_shape_vec((1, h, w, 1), values.to_vec()).unwrap().into_dyn()
    }

    #[test]
    fn max_valid() {
        let pool = Pool2d::new(PoolOp::Max, Window2d::square(2, 2, PaddingMode::Valid));
        let input = iota_tensor(&[1, 4, 4, 1], 0.0).unwrap();
        let out = pool.forward(&input).unwrap();
        assert_eq!(out.shape(), &[1, 2, 2, 1]);
        assert_eq!(out.iter().copied().collect::<Vec<_>>(), vec![6.0, 8.0, 14.0, 16.0]);
    }

    #[test]
    fn average_excludes_padding() {
        let pool = Pool2d::new(PoolOp::Average, Window2d::square(3, 1, PaddingMode::Same));
        let input = image(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let out = pool.forward(&input).unwrap();
        assert_eq!(out.iter().copied().collect::<Vec<_>>(), vec![2.5; 4]);
    }

    #[test]
    fn channels_are_independent() {
        let pool = Pool2d::new(PoolOp::Max, Window2d::square(2, 1, PaddingMode::Valid));
        let input = iota_tensor(&[1, 2, 2, 2], 0.0).unwrap();
        let out = pool.forward(&input).unwrap();
        assert_eq!(out.iter().copied().collect::<Vec<_>>(), vec![7.0, 8.0]);
    }

    #[test]
    fn max_gradient_goes_to_first_max() {
        let pool = Pool2d::new(PoolOp::Max, Window2d::square(2, 2, PaddingMode::Valid));
        let input = image(2, 2, &[5.0, 1.0, 5.0, 5.0]);
        let errors = image(1, 1, &[3.0]);
        let grad = pool.backward(&input, &errors).unwrap();
        assert_eq!(grad.iter().copied().collect::<Vec<_>>(), vec![3.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn max_gradient_accumulates_overlaps() {
        let pool = Pool2d::new(PoolOp::Max, Window2d::square(2, 1, PaddingMode::Valid));
        let input = image(2, 3, &[1.0, 9.0, 1.0, 1.0, 1.0, 1.0]);
        let errors = image(1, 2, &[1.0, 2.0]);
        let grad = pool.backward(&input, &errors).unwrap();
        assert_eq!(grad.iter().copied().collect::<Vec<_>>(), vec![0.0, 3.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn average_gradient_spreads_over_valid_cells() {
        let pool = Pool2d::new(PoolOp::Average, Window2d::square(3, 1, PaddingMode::Same));
        let input = image(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let errors = image(2, 2, &[4.0, 4.0, 4.0, 4.0]);
        let grad = pool.backward(&input, &errors).unwrap();
        assert_eq!(grad.iter().copied().collect::<Vec<_>>(), vec![4.0; 4]);
    }

    #[test]
    fn gradient_checks_shapes() {
        let pool = Pool2d::new(PoolOp::Average, Window2d::square(3, 1, PaddingMode::Valid));
        let input = image(4, 4, &[0.0; 16]);
        assert!(pool.backward(&input, &image(4, 4, &[0.0; 16])).is_err());
    }

    #[test]
    fn parse_ops() {
        assert_eq!("maxwithnan".parse::<PoolOp>().unwrap(), PoolOp::Max);
        assert_eq!("avg".parse::<PoolOp>().unwrap(), PoolOp::Average);
        assert!("min".parse::<PoolOp>().is_err());
    }
}
