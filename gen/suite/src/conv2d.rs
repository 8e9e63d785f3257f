use std::fmt;
use std::str::FromStr;

use itertools::iproduct;
use refgen_core::internal::*;
use refgen_core::ops::conv::Conv2d;
use refgen_core::ops::depthwise::DepthwiseConv2d;
use refgen_infra::{Fixture, FixtureSuite, Template, Vars};

use crate::common::{CONV_WINDOW_STRIDES, dims_name, file_with_preamble, input_sizes};

const INCLUDES: &str = r#"
#include <gtest/gtest.h>

#include "portdnn/padding_mode.h"

#include "test/types/cartesian_product.h"
#include "test/types/data_format_types.h"
#include "test/types/kernel_data_types.h"
#include "test/types/nested_pairs_to_tuple4.h"
#include "test/types/test_backend_types.h"
#include "test/types/to_gtest_types.h"

#include "test/conv2d/selector_list.h"
#include "test/conv2d/window_stride_fixture.h"

#include <array>
#include <vector>"#;

const DATA_TYPES: &str = r"
using DataTypeList = sycldnn::types::KernelDataTypes;
using Selectors = sycldnn::types::SelectorList;
using Backends = sycldnn::types::AllMatmulBackendTypes;
using DataFormats = sycldnn::types::DataFormatTypes;

using SNNTypePairs =
    sycldnn::types::CartesianProduct<Selectors, DataTypeList>::type;
using BackendTypePairs =
    sycldnn::types::CartesianProduct<SNNTypePairs, Backends>::type;
using DataFormatBackendTypePairs =
    sycldnn::types::CartesianProduct<BackendTypePairs, DataFormats>::type;
using TestTuple4 =
    sycldnn::types::NestedPairsToTuple4<DataFormatBackendTypePairs>::type;

using GTestTypeTuple4s = sycldnn::types::ToGTestTypes<TestTuple4>::type;
";

const SUITE_DECL: &str = r"
template <typename Tuple>
using {{ test_case }} = WindowStrideTest<Tuple, {{ window }}, {{ stride }}>;
TYPED_TEST_SUITE({{ test_case }}, GTestTypeTuple4s);";

const TEST: &str = r"TYPED_TEST({{ test_case }}, {{ test_name }}) {
  using DataType = typename TestFixture::DataType;
  const std::vector<DataType> exp_out = {{ exp_out }};
  const std::array<int, 4> in_shape = {{ in_shape }};
  const int features = {{ features }};
  const auto padding = sycldnn::PaddingMode::{{ padding }};
  const DataType max_input_val = {{ max_input_val }};
  this->run_{{ pass }}_test(exp_out, in_shape, features, padding, max_input_val);
}";

const BATCHES: [usize; 2] = [1, 3];
const CHANNELS: [usize; 3] = [1, 2, 4];
const FEATURES: [usize; 3] = [1, 2, 4];

/// Which computation of a convolution a fixture checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConvPass {
    Forward,
    InputBackprop,
    FilterBackprop,
}

impl ConvPass {
    pub const ALL: [ConvPass; 3] = [ConvPass::Forward, ConvPass::InputBackprop, ConvPass::FilterBackprop];
}

impl FromStr for ConvPass {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> RefResult<ConvPass> {
        match s {
            "forward" => Ok(ConvPass::Forward),
            "input_backprop" => Ok(ConvPass::InputBackprop),
            "filter_backprop" => Ok(ConvPass::FilterBackprop),
            _ => bail!("Unknown test type requested: {:?}", s),
        }
    }
}

impl fmt::Display for ConvPass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            ConvPass::Forward => "forward",
            ConvPass::InputBackprop => "input_backprop",
            ConvPass::FilterBackprop => "filter_backprop",
        })
    }
}

/// Sliding window convolutions tested through their three passes.
pub trait WindowedConv {
    fn output_shape(&self, input_shape: &[usize], filter_shape: &[usize]) -> RefResult<[usize; 4]>;
    fn forward(&self, input: &ArrayD<f64>, filter: &ArrayD<f64>) -> RefResult<ArrayD<f64>>;
    fn input_backprop(
        &self,
        input_shape: &[usize],
        filter: &ArrayD<f64>,
        errors: &ArrayD<f64>,
    ) -> RefResult<ArrayD<f64>>;
    fn filter_backprop(
        &self,
        input: &ArrayD<f64>,
        filter_shape: &[usize],
        errors: &ArrayD<f64>,
    ) -> RefResult<ArrayD<f64>>;

    /// Runs `pass` on iota tensors bounded by `max`. Backprop passes use an
    /// iota tensor as the output gradient.
    fn pass(
        &self,
        pass: ConvPass,
        input_shape: &[usize],
        filter_shape: &[usize],
        max: f64,
    ) -> RefResult<ArrayD<f64>> {
        let errors = || iota_tensor(&self.output_shape(input_shape, filter_shape)?, max);
        match pass {
            ConvPass::Forward => {
                self.forward(&iota_tensor(input_shape, max)?, &iota_tensor(filter_shape, max)?)
            }
            ConvPass::InputBackprop => {
                self.input_backprop(input_shape, &iota_tensor(filter_shape, max)?, &errors()?)
            }
            ConvPass::FilterBackprop => {
                self.filter_backprop(&iota_tensor(input_shape, max)?, filter_shape, &errors()?)
            }
        }
    }
}

macro_rules! windowed_conv {
    ($conv: ty) => {
        impl WindowedConv for $conv {
            fn output_shape(
                &self,
                input_shape: &[usize],
                filter_shape: &[usize],
            ) -> RefResult<[usize; 4]> {
                <$conv>::output_shape(self, input_shape, filter_shape)
            }
            fn forward(&self, input: &ArrayD<f64>, filter: &ArrayD<f64>) -> RefResult<ArrayD<f64>> {
                <$conv>::forward(self, input, filter)
            }
            fn input_backprop(
                &self,
                input_shape: &[usize],
                filter: &ArrayD<f64>,
                errors: &ArrayD<f64>,
            ) -> RefResult<ArrayD<f64>> {
                <$conv>::input_backprop(self, input_shape, filter, errors)
            }
            fn filter_backprop(
                &self,
                input: &ArrayD<f64>,
                filter_shape: &[usize],
                errors: &ArrayD<f64>,
            ) -> RefResult<ArrayD<f64>> {
                <$conv>::filter_backprop(self, input, filter_shape, errors)
            }
        }
    };
}

windowed_conv!(Conv2d);
windowed_conv!(DepthwiseConv2d);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conv2dCase {
    pub pass: ConvPass,
    pub window: usize,
    pub stride: usize,
}

impl Conv2dCase {
    fn test_case(&self) -> String {
        format!("{}Window{}Stride{}", to_camel_case(&self.pass.to_string()), self.window, self.stride)
    }
}

impl Fixture for Conv2dCase {
    fn filename(&self) -> String {
        format!("conv2d/{}_window{}_stride{}.cc", self.pass, self.window, self.stride)
    }

    fn render(&self) -> RefResult<String> {
        let test_case = self.test_case();
        let mut file = file_with_preamble("conv2d", &[INCLUDES, DATA_TYPES]);
        file.render(
            &Template::parse(SUITE_DECL)?,
            &Vars::new()
                .with("test_case", &test_case)
                .with("window", self.window)
                .with("stride", self.stride),
        )?;
        let test = Template::parse(TEST)?;
        let sizes = input_sizes(self.window, self.stride);
        for (n, h, w, c) in iproduct!(BATCHES, sizes, sizes, CHANNELS) {
            let in_shape = [n, h, w, c];
            for (features, padding) in iproduct!(FEATURES, PaddingMode::ALL) {
                let filter_shape = [self.window, self.window, c, features];
                let conv = Conv2d::new((self.stride, self.stride), padding);
                let (output, max_input_val) = result_and_magnitude(|max| {
                    conv.pass(self.pass, &in_shape, &filter_shape, max)
                })?;
                let vars = Vars::new()
                    .with("test_case", &test_case)
                    .with("test_name", format!("{padding}{}x{features}", dims_name(&in_shape)))
                    .with("exp_out", format_tensor(output.iter())?)
                    .with("in_shape", format_shape(&in_shape))
                    .with("features", features)
                    .with("padding", padding)
                    .with("max_input_val", format_magnitude(max_input_val))
                    .with("pass", self.pass);
                file.render(&test, &vars)?;
            }
        }
        Ok(file.finish())
    }
}

pub fn suite() -> RefResult<FixtureSuite> {
    let mut suite = FixtureSuite::default();
    for ((window, stride), pass) in iproduct!(CONV_WINDOW_STRIDES, ConvPass::ALL) {
        suite.add(Conv2dCase { pass, window, stride })?;
    }
    Ok(suite)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names() {
        let case = Conv2dCase { pass: ConvPass::FilterBackprop, window: 7, stride: 4 };
        assert_eq!(case.test_case(), "FilterBackpropWindow7Stride4");
        assert_eq!(case.filename(), "conv2d/filter_backprop_window7_stride4.cc");
        assert_eq!(suite().unwrap().len(), 30);
        assert_eq!("input_backprop".parse::<ConvPass>().unwrap(), ConvPass::InputBackprop);
        assert!("backward".parse::<ConvPass>().is_err());
    }

    #[test]
    fn single_tap_forward() {
        let conv = Conv2d::new((1, 1), PaddingMode::Valid);
        let out = conv.pass(ConvPass::Forward, &[1, 2, 2, 1], &[1, 1, 1, 2], REQUIRED_MAX).unwrap();
        // inputs 1..=4, filters 1 and 2
        assert_eq!(out.iter().copied().collect::<Vec<_>>(), vec![1., 2., 2., 4., 3., 6., 4., 8.]);
    }

    #[test]
    fn backprop_shapes() {
        let conv = Conv2d::new((2, 2), PaddingMode::Same);
        let input = conv.pass(ConvPass::InputBackprop, &[1, 5, 5, 2], &[3, 3, 2, 4], 4.0).unwrap();
        assert_eq!(input.shape(), &[1, 5, 5, 2]);
        let filter = conv.pass(ConvPass::FilterBackprop, &[1, 5, 5, 2], &[3, 3, 2, 4], 4.0).unwrap();
        assert_eq!(filter.shape(), &[3, 3, 2, 4]);
    }
}
