use itertools::iproduct;
use refgen_core::internal::*;
use refgen_core::ops::depthwise::DepthwiseConv2d;
use refgen_infra::{Fixture, FixtureSuite, Template, Vars};

use crate::common::{CONV_WINDOW_STRIDES, dims_name, file_with_preamble, input_sizes};
use crate::conv2d::{ConvPass, WindowedConv};

const INCLUDES: &str = r#"
#include <gtest/gtest.h>

#include "portdnn/padding_mode.h"

#include "test/types/cartesian_product.h"
#include "test/types/kernel_data_types.h"
#include "test/types/test_backend_types.h"
#include "test/types/to_gtest_types.h"

#include "test/depthwise_conv2d/window_stride_fixture.h"

#include <array>
#include <vector>"#;

const DATA_TYPES: &str = r"
using DataTypeList = sycldnn::types::KernelDataTypes;
using Backends = sycldnn::types::DefaultBackendTypes;

using SNNTypePairs =
    sycldnn::types::CartesianProduct<DataTypeList, Backends>::type;
using GTestTypePairs = sycldnn::types::ToGTestTypes<SNNTypePairs>::type;
";

const SUITE_DECL: &str = r"
template <typename Pair>
using {{ test_case }} =
    sycldnn::depthwise_conv2d::WindowStrideTest<Pair, {{ window }}, {{ stride }}>;
TYPED_TEST_SUITE({{ test_case }}, GTestTypePairs);";

const TEST: &str = r"TYPED_TEST({{ test_case }}, {{ test_name }}) {
  using DataType = typename TestFixture::DataType;
  const std::vector<DataType> exp_out = {{ exp_out }};
  const std::array<int, 4> in_shape = {{ in_shape }};
  const int multiplier = {{ multiplier }};
  const auto padding = sycldnn::PaddingMode::{{ padding }};
  const DataType max_input_val = {{ max_input_val }};
  this->run_{{ pass }}_test(exp_out, in_shape, multiplier, padding, max_input_val);
}";

const BATCHES: [usize; 2] = [1, 3];
const CHANNELS: [usize; 3] = [1, 2, 4];
const MULTIPLIERS: [usize; 3] = [1, 2, 4];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthwiseConv2dCase {
    pub pass: ConvPass,
    pub window: usize,
    pub stride: usize,
}

impl Fixture for DepthwiseConv2dCase {
    fn filename(&self) -> String {
        format!("depthwise_conv2d/{}_window{}_stride{}.cc", self.pass, self.window, self.stride)
    }

    fn render(&self) -> RefResult<String> {
        let test_case =
            format!("{}Window{}Stride{}", to_camel_case(&self.pass.to_string()), self.window, self.stride);
        let mut file = file_with_preamble("depthwise_conv2d", &[INCLUDES, DATA_TYPES]);
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
            for (multiplier, padding) in iproduct!(MULTIPLIERS, PaddingMode::ALL) {
                let filter_shape = [self.window, self.window, c, multiplier];
                let conv = DepthwiseConv2d::new((self.stride, self.stride), padding);
                let (output, max_input_val) = result_and_magnitude(|max| {
                    conv.pass(self.pass, &in_shape, &filter_shape, max)
                })?;
                let vars = Vars::new()
                    .with("test_case", &test_case)
                    .with("test_name", format!("{padding}{}x{multiplier}", dims_name(&in_shape)))
                    .with("exp_out", format_tensor(output.iter())?)
                    .with("in_shape", format_shape(&in_shape))
                    .with("multiplier", multiplier)
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
        suite.add(DepthwiseConv2dCase { pass, window, stride })?;
    }
    Ok(suite)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn files() {
        let case = DepthwiseConv2dCase { pass: ConvPass::InputBackprop, window: 1, stride: 2 };
        assert_eq!(case.filename(), "depthwise_conv2d/input_backprop_window1_stride2.cc");
        assert_eq!(suite().unwrap().len(), 30);
    }

    #[test]
    fn multiplied_channels() {
        let conv = DepthwiseConv2d::new((1, 1), PaddingMode::Valid);
        // one pixel holding 1 and 2, filters [[1, 2], [3, 4]]
        let out = conv.pass(ConvPass::Forward, &[1, 1, 1, 2], &[1, 1, 2, 2], REQUIRED_MAX).unwrap();
        assert_eq!(out.iter().copied().collect::<Vec<_>>(), vec![1., 2., 6., 8.]);
    }
}
