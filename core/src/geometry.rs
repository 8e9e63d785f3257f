use std::fmt;
use std::str::FromStr;

use itertools::iproduct;

use crate::internal::*;

/// TensorFlow padding conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PaddingMode {
    #[default]
    Valid,
    Same,
}

use PaddingMode::*;

#[derive(Debug, Clone, Copy, new, PartialEq, Eq)]
pub struct ComputedPaddedDim {
    pub input: usize,
    pub output: usize,
    pub pad_before: usize,
    pub pad_after: usize,
}

impl PaddingMode {
    pub const ALL: [PaddingMode; 2] = [Same, Valid];

    pub fn compute(
        &self,
        input_spatial_shape: &[usize],
        kernel_spatial_shape: &[usize],
        strides: &[usize],
    ) -> Vec<ComputedPaddedDim> {
        (0..input_spatial_shape.len())
            .map(|d| self.compute_one(input_spatial_shape[d], kernel_spatial_shape[d], strides[d]))
            .collect()
    }

    pub fn compute_one(&self, input: usize, kernel: usize, stride: usize) -> ComputedPaddedDim {
        match self {
            Valid => Self::valid(input, kernel, stride),
            Same => Self::same(input, kernel, stride),
        }
    }

    fn valid(input: usize, kernel: usize, stride: usize) -> ComputedPaddedDim {
        let output = (input + 1).saturating_sub(kernel).div_ceil(stride);
        ComputedPaddedDim::new(input, output, 0, 0)
    }

    fn same(input: usize, kernel: usize, stride: usize) -> ComputedPaddedDim {
        let output = input.div_ceil(stride);
        let pad = ((output.max(1) - 1) * stride + kernel).saturating_sub(input);
        let lower_pad = pad / 2;
        ComputedPaddedDim::new(input, output, lower_pad, pad - lower_pad)
    }
}

impl FromStr for PaddingMode {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> RefResult<PaddingMode> {
        match s {
            "SAME" => Ok(Same),
            "VALID" => Ok(Valid),
            _ => bail!("Unrecognized padding mode {:?}", s),
        }
    }
}

impl fmt::Display for PaddingMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Same => "SAME",
            Valid => "VALID",
        })
    }
}

/// One term of a sliding window sum: output position, kernel offset and the
/// (non padding) input position they read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tap {
    pub output: (usize, usize),
    pub kernel: (usize, usize),
    pub input: (usize, usize),
}

/// A 2D sliding window over the H and W axes of an NHWC tensor.
#[derive(Debug, Clone, Copy, new, PartialEq, Eq)]
pub struct Window2d {
    pub kernel: (usize, usize),
    pub stride: (usize, usize),
    pub padding: PaddingMode,
}

impl Window2d {
    pub fn square(kernel: usize, stride: usize, padding: PaddingMode) -> Window2d {
        Window2d::new((kernel, kernel), (stride, stride), padding)
    }

    pub fn dims(&self, input_hw: (usize, usize)) -> (ComputedPaddedDim, ComputedPaddedDim) {
        (
            self.padding.compute_one(input_hw.0, self.kernel.0, self.stride.0),
            self.padding.compute_one(input_hw.1, self.kernel.1, self.stride.1),
        )
    }

    pub fn output_hw(&self, input_hw: (usize, usize)) -> (usize, usize) {
        let (h, w) = self.dims(input_hw);
        (h.output, w.output)
    }

    /// Taps reading the input for one output position, kernel rows first.
    pub fn taps(&self, input_hw: (usize, usize), output: (usize, usize)) -> Vec<Tap> {
        let (h, w) = self.dims(input_hw);
        iproduct!(0..self.kernel.0, 0..self.kernel.1)
            .filter_map(|(kh, kw)| {
                let ih = (output.0 * self.stride.0 + kh).checked_sub(h.pad_before)?;
                let iw = (output.1 * self.stride.1 + kw).checked_sub(w.pad_before)?;
                (ih < h.input && iw < w.input).then_some(Tap {
                    output,
                    kernel: (kh, kw),
                    input: (ih, iw),
                })
            })
            .collect()
    }

    /// Every tap of the window, output rows first.
    pub fn all_taps(&self, input_hw: (usize, usize)) -> Vec<Tap> {
        let (oh, ow) = self.output_hw(input_hw);
        iproduct!(0..oh, 0..ow).flat_map(|o| self.taps(input_hw, o)).collect()
    }
}

/// Splits an NHWC shape, failing on anything else.
pub fn nhwc(shape: &[usize]) -> RefResult<(usize, usize, usize, usize)> {
    ensure!(shape.len() == 4, "Expected a NHWC shape, got {:?}", shape);
    Ok((shape[0], shape[1], shape[2], shape[3]))
}
