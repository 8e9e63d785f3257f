use itertools::iproduct;
use lazy_static::lazy_static;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::seq::index::sample;
use refgen_core::internal::*;
use refgen_core::ops::conv::Conv2d;
use refgen_core::ops::grouped::{GroupFormat, GroupedConv2d};
use refgen_infra::{Fixture, FixtureSuite, Template, Vars};

use crate::common::{CONV_WINDOW_STRIDES, dims_name, file_with_preamble, input_sizes};

const INCLUDES: &str = r#"
#include <gtest/gtest.h>

#include "portdnn/padding_mode.h"

#include "test/types/cartesian_product.h"
#include "test/types/data_format_types.h"
#include "test/types/kernel_data_types.h"
#include "test/types/nested_pairs_to_triple.h"
#include "test/types/test_backend_types.h"
#include "test/types/to_gtest_types.h"

#include "test/conv2d/selector_list.h"
#include "test/conv2d/group_convolution_fixture.h"

#include <array>
#include <vector>"#;

const DATA_TYPES: &str = r"
using DataTypeList = sycldnn::types::KernelDataTypes;
using Selectors = sycldnn::types::SelectorList;
using Backends = sycldnn::types::AllMatmulBackendTypes;

using SNNTypePairs =
    sycldnn::types::CartesianProduct<Selectors, DataTypeList>::type;
using BackendTypePairs =
    sycldnn::types::CartesianProduct<SNNTypePairs, Backends>::type;
using TestTriples =
    sycldnn::types::NestedPairsToTriple<BackendTypePairs>::type;

using GTestTypeTriples = sycldnn::types::ToGTestTypes<TestTriples>::type;
";

const SUITE_DECL: &str = r"
template <typename Triple>
using {{ test_case }} = GroupWindowStrideTest<Triple, {{ window }}, {{ stride }}, {{ groups }}>;
TYPED_TEST_SUITE({{ test_case }}, GTestTypeTriples);";

const TEST: &str = r"TYPED_TEST({{ test_case }}, {{ test_name }}) {
  using DataType = typename TestFixture::DataType;
  const std::vector<DataType> exp_out = {{ exp_out }};
  const std::array<int, 4> in_shape = {{ in_shape }};
  const int features = {{ features }};
  const auto padding = sycldnn::PaddingMode::{{ padding }};
  const auto filter_format = sycldnn::FilterFormat::{{ filter_format }};
  const auto group_format = sycldnn::BatchFormat::{{ group_format }};
  const DataType max_input_val = {{ max_input_val }};
  this->run_forward_test(exp_out, in_shape, features, padding,
  filter_format, group_format, max_input_val);
}";

/// Group counts, matching [`CONV_WINDOW_STRIDES`] one to one.
const GROUPS: [usize; 10] = [2, 2, 3, 2, 3, 4, 4, 5, 6, 7];
const BATCHES: [usize; 2] = [1, 3];
const CHANNELS: [usize; 3] = [1, 2, 4];
const FEATURES: [usize; 3] = [1, 2, 4];
const FILTER_FORMATS: [&str; 2] = ["HWCF", "FHWC"];
/// Parameter cases drawn for every shape.
const SAMPLE_SIZE: usize = 5;
const SAMPLE_SEED: u64 = 23456;
const START_MAGNITUDE: f64 = 4.0;

/// Everything a grouped test varies besides the shape. Channels and
/// features are per group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamCase {
    pub padding: PaddingMode,
    pub filter_format: &'static str,
    pub group_format: GroupFormat,
    pub channels: usize,
    pub features: usize,
}

lazy_static! {
    /// The library does not support FHWC filters with interleaved groups.
    static ref PARAM_CASES: Vec<ParamCase> = iproduct!(
        PaddingMode::ALL,
        FILTER_FORMATS,
        [GroupFormat::Strided, GroupFormat::Interleaved],
        CHANNELS,
        FEATURES
    )
    .filter(|(_, filter_format, group_format, _, _)| {
        !(*filter_format == "FHWC" && *group_format == GroupFormat::Interleaved)
    })
    .map(|(padding, filter_format, group_format, channels, features)| ParamCase {
        padding,
        filter_format,
        group_format,
        channels,
        features,
    })
    .collect();
}

/// The parameter cases every shape of a file is tested with: a seeded
/// sample, so each file covers the same few cases.
pub fn sampled_param_cases() -> Vec<ParamCase> {
    let mut rng = SmallRng::seed_from_u64(SAMPLE_SEED);
    sample(&mut rng, PARAM_CASES.len(), SAMPLE_SIZE).into_iter().map(|ix| PARAM_CASES[ix]).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupedConv2dCase {
    pub window: usize,
    pub stride: usize,
    pub groups: usize,
}

impl GroupedConv2dCase {
    fn test_case(&self) -> String {
        format!("ForwardWindow{}Stride{}Groups{}", self.window, self.stride, self.groups)
    }

    fn expected(&self, in_shape: &[usize; 4], features: usize, params: &ParamCase) -> RefResult<(ArrayD<f64>, f64)> {
        let op = GroupedConv2d::new(
            Conv2d::new((self.stride, self.stride), params.padding),
            self.groups,
            params.group_format,
        );
        let filter_shape = [self.window, self.window, in_shape[3] / self.groups, features];
        MagnitudeSearch::new().starting_at(START_MAGNITUDE).run(|max| {
            op.forward(&iota_tensor(in_shape, max)?, &iota_tensor(&filter_shape, max)?)
        })
    }
}

impl Fixture for GroupedConv2dCase {
    fn filename(&self) -> String {
        format!("conv2d/forward_window{}_stride{}_groups{}.cc", self.window, self.stride, self.groups)
    }

    fn render(&self) -> RefResult<String> {
        let test_case = self.test_case();
        let mut file = file_with_preamble("grouped_conv2d", &[INCLUDES, DATA_TYPES]);
        file.render(
            &Template::parse(SUITE_DECL)?,
            &Vars::new()
                .with("test_case", &test_case)
                .with("window", self.window)
                .with("stride", self.stride)
                .with("groups", self.groups),
        )?;
        let test = Template::parse(TEST)?;
        let params = sampled_param_cases();
        let sizes = input_sizes(self.window, self.stride);
        for (n, h, w) in iproduct!(BATCHES, sizes, sizes) {
            for param in &params {
                let in_shape = [n, h, w, param.channels * self.groups];
                let features = param.features * self.groups;
                let (output, max_input_val) = self.expected(&in_shape, features, param)?;
                let test_name = format!(
                    "{}{}{}{}x{features}",
                    param.padding,
                    param.filter_format,
                    param.group_format,
                    dims_name(&in_shape)
                );
                let vars = Vars::new()
                    .with("test_case", &test_case)
                    .with("test_name", test_name)
                    .with("exp_out", format_tensor(output.iter())?)
                    .with("in_shape", format_shape(&in_shape))
                    .with("features", features)
                    .with("padding", param.padding)
                    .with("filter_format", param.filter_format)
                    .with("group_format", param.group_format)
                    .with("max_input_val", format_magnitude(max_input_val));
                file.render(&test, &vars)?;
            }
        }
        Ok(file.finish())
    }
}

pub fn suite() -> RefResult<FixtureSuite> {
    let mut suite = FixtureSuite::default();
    for ((window, stride), groups) in CONV_WINDOW_STRIDES.into_iter().zip(GROUPS) {
        suite.add(GroupedConv2dCase { window, stride, groups })?;
    }
    Ok(suite)
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::Itertools;

    #[test]
    fn param_table() {
        assert_eq!(PARAM_CASES.len(), 54);
        assert!(
            !PARAM_CASES
                .iter()
                .any(|p| p.filter_format == "FHWC" && p.group_format == GroupFormat::Interleaved)
        );
    }

    #[test]
    fn sample_is_stable_and_distinct() {
        let first = sampled_param_cases();
        assert_eq!(first, sampled_param_cases());
        assert_eq!(first.len(), SAMPLE_SIZE);
        let distinct = first.iter().map(|p| format!("{p:?}")).unique().count();
        assert_eq!(distinct, SAMPLE_SIZE);
    }

    #[test]
    fn names() {
        let case = GroupedConv2dCase { window: 11, stride: 4, groups: 7 };
        assert_eq!(case.test_case(), "ForwardWindow11Stride4Groups7");
        assert_eq!(case.filename(), "conv2d/forward_window11_stride4_groups7.cc");
        assert_eq!(suite().unwrap().len(), 10);
    }

    #[test]
    fn groups_are_independent() {
        let case = GroupedConv2dCase { window: 1, stride: 1, groups: 2 };
        let params = ParamCase {
            padding: PaddingMode::Valid,
            filter_format: "HWCF",
            group_format: GroupFormat::Strided,
            channels: 1,
            features: 1,
        };
        // one pixel, channels 1 and 2, filters 1 and 2
        let (out, max) = case.expected(&[1, 1, 1, 2], 2, &params).unwrap();
        assert_eq!(max, START_MAGNITUDE);
        assert_eq!(out.iter().copied().collect::<Vec<_>>(), vec![1., 4.]);
    }
}
