use ndarray::Array4;

use super::as_nhwc;
use crate::internal::*;

/// Depthwise 2D convolution: every input channel `c` is convolved with its
/// own `multiplier` filters, producing channels `c * multiplier + m`.
///
/// Filters are laid out `[H, W, C, multiplier]`.
#[derive(Debug, Clone, Copy, new, PartialEq, Eq)]
pub struct DepthwiseConv2d {
    pub stride: (usize, usize),
    pub padding: PaddingMode,
}

impl DepthwiseConv2d {
    fn window(&self, filter_shape: &[usize]) -> Window2d {
        Window2d::new((filter_shape[0], filter_shape[1]), self.stride, self.padding)
    }

    pub fn output_shape(&self, input_shape: &[usize], filter_shape: &[usize]) -> RefResult<[usize; 4]> {
        let (n, h, w, c) = nhwc(input_shape)?;
        ensure!(
            filter_shape.len() == 4 && filter_shape[2] == c,
            "Depthwise filter {:?} does not match input {:?}",
            filter_shape,
            input_shape
        );
        let (oh, ow) = self.window(filter_shape).output_hw((h, w));
        Ok([n, oh, ow, c * filter_shape[3]])
    }

    pub fn forward(&self, input: &ArrayD<f64>, filter: &ArrayD<f64>) -> RefResult<ArrayD<f64>> {
        let [n, oh, ow, oc] = self.output_shape(input.shape(), filter.shape())?;
        let window = self.window(filter.shape());
        let multiplier = filter.shape()[3];
        let input = as_nhwc(input, "depthwise input")?;
        let filter = as_nhwc(filter, "depthwise filter")?;
        let (_, h, w, c) = input.dim();
        let mut output = Array4::<f64>::zeros((n, oh, ow, oc));
        for b in 0..n {
            for tap in window.all_taps((h, w)) {
                let (y, x) = tap.output;
                let (kh, kw) = tap.kernel;
                let (iy, ix) = tap.input;
                for ci in 0..c {
                    for m in 0..multiplier {
                        output[[b, y, x, ci * multiplier + m]] +=
                            input[[b, iy, ix, ci]] * filter[[kh, kw, ci, m]];
                    }
                }
            }
        }
        Ok(output.into_dyn())
    }

    pub fn input_backprop(
        &self,
        input_shape: &[usize],
        filter: &ArrayD<f64>,
        errors: &ArrayD<f64>,
    ) -> RefResult<ArrayD<f64>> {
        let out_shape = self.output_shape(input_shape, filter.shape())?;
        ensure!(errors.shape() == out_shape, "Wrong errors shape {:?}", errors.shape());
        let window = self.window(filter.shape());
        let multiplier = filter.shape()[3];
        let (n, h, w, c) = nhwc(input_shape)?;
        let filter = as_nhwc(filter, "depthwise filter")?;
        let errors = as_nhwc(errors, "depthwise errors")?;
        let mut grad = Array4::<f64>::zeros((n, h, w, c));
        for b in 0..n {
            for tap in window.all_taps((h, w)) {
                let (y, x) = tap.output;
                let (kh, kw) = tap.kernel;
                let (iy, ix) = tap.input;
                for ci in 0..c {
                    for m in 0..multiplier {
                        grad[[b, iy, ix, ci]] +=
                            errors[[b, y, x, ci * multiplier + m]] * filter[[kh, kw, ci, m]];
                    }
                }
            }
        }
        Ok(grad.into_dyn())
    }

    pub fn filter_backprop(
        &self,
        input: &ArrayD<f64>,
        filter_shape: &[usize],
        errors: &ArrayD<f64>,
    ) -> RefResult<ArrayD<f64>> {
        let out_shape = self.output_shape(input.shape(), filter_shape)?;
        ensure!(errors.shape() == out_shape, "Wrong errors shape {:?}", errors.shape());
        let window = self.window(filter_shape);
        let multiplier = filter_shape[3];
        let input = as_nhwc(input, "depthwise input")?;
        let errors = as_nhwc(errors, "depthwise errors")?;
        let (n, h, w, c) = input.dim();
        let mut grad = Array4::<f64>::zeros((filter_shape[0], filter_shape[1], c, multiplier));
        for b in 0..n {
            for tap in window.all_taps((h, w)) {
                let (y, x) = tap.output;
                let (kh, kw) = tap.kernel;
                let (iy, ix) = tap.input;
                for ci in 0..c {
                    for m in 0..multiplier {
                        grad[[kh, kw, ci, m]] +=
                            input[[b, iy, ix, ci]] * errors[[b, y, x, ci * multiplier + m]];
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
    use crate::ops::conv::Conv2d;
    use approx::assert_abs_diff_eq;

    #[test]
    fn single_channel_is_a_convolution() {
        let depthwise = DepthwiseConv2d::new((2, 2), PaddingMode::Same);
        let conv = Conv2d::new((2, 2), PaddingMode::Same);
        let input = iota_tensor(&[2, 5, 5, 1], 0.0).unwrap();
        let filter = iota_tensor(&[3, 3, 1, 2], 0.0).unwrap();
        assert_eq!(
            depthwise.forward(&input, &filter).unwrap(),
            conv.forward(&input, &filter).unwrap()
        );
    }

    #[test]
    fn channels_do_not_mix() {
        let depthwise = DepthwiseConv2d::new((1, 1), PaddingMode::Valid);
        let input = iota_tensor(&[1, 1, 1, 2], 0.0).unwrap();
        let filter = iota_tensor(&[1, 1, 2, 2], 0.0).unwrap();
        let out = depthwise.forward(&input, &filter).unwrap();
        // channel 0 (value 1) with filters 1, 2, channel 1 (value 2) with 3, 4
        assert_eq!(out.iter().copied().collect::<Vec<_>>(), vec![1.0, 2.0, 6.0, 8.0]);
    }

    #[test]
    fn backprops_are_adjoint() {
        for padding in PaddingMode::ALL {
            let op = DepthwiseConv2d::new((1, 2), padding);
            let input = iota_tensor(&[1, 6, 5, 2], 9.0).unwrap();
            let filter = iota_tensor(&[3, 3, 2, 2], 4.0).unwrap();
            let out_shape = op.output_shape(input.shape(), filter.shape()).unwrap();
            let errors = iota_tensor(&out_shape, 5.0).unwrap();
            let lhs = (&op.forward(&input, &filter).unwrap() * &errors).sum();
            let grad_in = op.input_backprop(input.shape(), &filter, &errors).unwrap();
            assert_abs_diff_eq!((&grad_in * &input).sum(), lhs, epsilon = 1e-6);
            let grad_filter = op.filter_backprop(&input, filter.shape(), &errors).unwrap();
            assert_abs_diff_eq!((&grad_filter * &filter).sum(), lhs, epsilon = 1e-6);
        }
    }
}
