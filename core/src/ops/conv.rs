use ndarray::Array4;

use super::as_nhwc;
use crate::internal::*;

/// 2D convolution of NHWC images with HWCF filters.
#[derive(Debug, Clone, Copy, new, PartialEq, Eq)]
pub struct Conv2d {
    pub stride: (usize, usize),
    pub padding: PaddingMode,
}

impl Conv2d {
    pub fn window(&self, filter_shape: &[usize]) -> RefResult<Window2d> {
        ensure!(filter_shape.len() == 4, "Expected a HWCF filter shape, got {:?}", filter_shape);
        Ok(Window2d::new((filter_shape[0], filter_shape[1]), self.stride, self.padding))
    }

    pub fn output_shape(&self, input_shape: &[usize], filter_shape: &[usize]) -> RefResult<[usize; 4]> {
        let (n, h, w, c) = nhwc(input_shape)?;
        ensure!(
            filter_shape.len() == 4 && filter_shape[2] == c,
            "Filter {:?} does not match input {:?}",
            filter_shape,
            input_shape
        );
        let (oh, ow) = self.window(filter_shape)?.output_hw((h, w));
        Ok([n, oh, ow, filter_shape[3]])
    }

    pub fn forward(&self, input: &ArrayD<f64>, filter: &ArrayD<f64>) -> RefResult<ArrayD<f64>> {
        let out_shape = self.output_shape(input.shape(), filter.shape())?;
        let window = self.window(filter.shape())?;
        let input = as_nhwc(input, "convolution input")?;
        let filter = as_nhwc(filter, "convolution filter")?;
        let (n, h, w, c) = input.dim();
        let features = out_shape[3];
        let mut output = Array4::<f64>::zeros((n, out_shape[1], out_shape[2], features));
        for b in 0..n {
            for tap in window.all_taps((h, w)) {
                let (y, x) = tap.output;
                let (kh, kw) = tap.kernel;
                let (iy, ix) = tap.input;
                for ci in 0..c {
                    let v = input[[b, iy, ix, ci]];
                    for f in 0..features {
                        output[[b, y, x, f]] += v * filter[[kh, kw, ci, f]];
                    }
                }
            }
        }
        Ok(output.into_dyn())
    }

    /// Gradient with respect to the input, given the output gradient `errors`.
    pub fn input_backprop(
        &self,
        input_shape: &[usize],
        filter: &ArrayD<f64>,
        errors: &ArrayD<f64>,
    ) -> RefResult<ArrayD<f64>> {
        let out_shape = self.output_shape(input_shape, filter.shape())?;
        ensure!(errors.shape() == out_shape, "Wrong errors shape {:?}", errors.shape());
        let window = self.window(filter.shape())?;
        let (n, h, w, c) = nhwc(input_shape)?;
        let filter = as_nhwc(filter, "convolution filter")?;
        let errors = as_nhwc(errors, "convolution errors")?;
        let mut grad = Array4::<f64>::zeros((n, h, w, c));
        for b in 0..n {
            for tap in window.all_taps((h, w)) {
                let (y, x) = tap.output;
                let (kh, kw) = tap.kernel;
                let (iy, ix) = tap.input;
                for ci in 0..c {
                    grad[[b, iy, ix, ci]] += (0..out_shape[3])
                        .map(|f| errors[[b, y, x, f]] * filter[[kh, kw, ci, f]])
                        .sum::<f64>();
                }
            }
        }
        Ok(grad.into_dyn())
    }

    /// Gradient with respect to the filter, given the output gradient `errors`.
    pub fn filter_backprop(
        &self,
        input: &ArrayD<f64>,
        filter_shape: &[usize],
        errors: &ArrayD<f64>,
    ) -> RefResult<ArrayD<f64>> {
        let out_shape = self.output_shape(input.shape(), filter_shape)?;
        ensure!(errors.shape() == out_shape, "Wrong errors shape {:?}", errors.shape());
        let window = self.window(filter_shape)?;
        let input = as_nhwc(input, "convolution input")?;
        let errors = as_nhwc(errors, "convolution errors")?;
        let (n, h, w, c) = input.dim();
        let features = out_shape[3];
        let mut grad = Array4::<f64>::zeros((filter_shape[0], filter_shape[1], c, features));
        for b in 0..n {
            for tap in window.all_taps((h, w)) {
                let (y, x) = tap.output;
                let (kh, kw) = tap.kernel;
                let (iy, ix) = tap.input;
                for ci in 0..c {
                    let v = input[[b, iy, ix, ci]];
                    for f in 0..features {
                        grad[[kh, kw, ci, f]] += v * errors[[b, y, x, f]];
                    }
                }
            }
        }
        Ok(grad.into_dyn())
    }
}
