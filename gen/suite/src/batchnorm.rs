use std::fmt;

use itertools::iproduct;
use refgen_core::internal::*;
use refgen_core::ops::batchnorm::{BatchNorm, BatchNormForward, BatchNormGradient};
use refgen_infra::{Fixture, FixtureSuite, Template, Vars};

use crate::common::{dims_name, file_with_preamble};

const INCLUDES: &str = r#"
#include <gtest/gtest.h>

#include "portdnn/data_format.h"

#include "portdnn/batchnorm/direction.h"
#include "portdnn/batchnorm/params.h"

#include "test/batchnorm/batchnorm_fixture.h"
#include "test/types/cartesian_product.h"
#include "test/types/data_format_types.h"
#include "test/types/kernel_data_types.h"
#include "test/types/nested_pairs_to_triple.h"
#include "test/types/test_backend_types.h"
#include "test/types/to_gtest_types.h"

#include <vector>"#;

const TEST_TYPES: &str = r"
using DataTypeList = sycldnn::types::KernelDataTypes;
using Backends = sycldnn::types::AllBackendTypes;
using DataFormats = sycldnn::types::DataFormatTypes;

using TypeBackendPairs =
    sycldnn::types::CartesianProduct<DataTypeList, Backends>::type;
using TypeBackendFormatTriple =
    sycldnn::types::CartesianProduct<TypeBackendPairs, DataFormats>::type;

using TestTriples =
    sycldnn::types::NestedPairsToTriple<TypeBackendFormatTriple>::type;
using GTestTypeTriples = sycldnn::types::ToGTestTypes<TestTriples>::type;
";

const SUITE_DECL: &str = r"
using namespace sycldnn; // NOLINT(google-build-using-namespace)
template <typename Triple>
using {{ test_case }} = BatchNormFixture<Triple, batchnorm::{{ direction }}>;
TYPED_TEST_CASE({{ test_case }}, GTestTypeTriples);";

const FORWARD_TEST: &str = r"TYPED_TEST({{ test_case }}, {{ test_name }}) {
  using DataType = typename TestFixture::DataType;
  const std::vector<DataType> exp_running_mean = {{ running_mean }};
  const std::vector<DataType> exp_running_var = {{ running_var }};
  const std::vector<DataType> exp_out = {{ exp_out }};
  const std::array<int, 4> in_shape = {{ in_shape }};
  const bool is_training = {{ is_training }};
  const float momentum = {{ momentum }};
  const float epsilon = {{ epsilon }};
  const auto params = getBatchNormParams(in_shape, is_training, momentum, epsilon);
  const DataType max_input_val = {{ max_input_val }};
  const DataType max_beta_val = {{ max_beta_val }};
  const DataType max_gamma_val = {{ max_gamma_val }};
  const DataType max_input_mean_val = {{ max_mean_val }};
  const DataType max_input_var_val = {{ max_var_val }};
  this->test_batchnorm(exp_running_mean, exp_running_var, 
                       exp_out, params, max_input_val, 
                       max_beta_val, max_gamma_val, 
                       max_input_mean_val, max_input_var_val);
}";

const GRADIENT_TEST: &str = r"TYPED_TEST({{ test_case }}, {{ test_name }}) {
  using DataType = typename TestFixture::DataType;
  const std::vector<DataType> exp_grad = {{ input_grad }};
  const std::vector<DataType> beta_grad = {{ offset_grad }};
  const std::vector<DataType> gamma_grad = {{ scale_grad }};
  const std::array<int, 4> in_shape = {{ in_shape }};
  const bool is_training = {{ is_training }};
  const float momentum = {{ momentum }};
  const float epsilon = {{ epsilon }};
  const auto params = getBatchNormParams(in_shape, is_training, momentum, epsilon);
  const DataType max_input_val = {{ max_input_val }};
  const DataType max_gradient_val = {{ max_gradient_val }};
  const DataType max_gamma_val = {{ max_gamma_val }};
  const DataType max_pop_mean_val = {{ max_mean_val }};
  const DataType max_pop_var_val = {{ max_var_val }};
  this->test_batchnorm(exp_grad, beta_grad, gamma_grad, params, 
                       max_input_val, max_gradient_val, 
                       max_gamma_val, max_pop_mean_val, 
                       max_pop_var_val);
}";

const BATCHES: [usize; 2] = [1, 3];
const SIZES: [usize; 3] = [1, 8, 9];
const CHANNELS: [usize; 3] = [1, 5, 8];
const MOMENTUM: f64 = 0.99;
const EPSILON: f64 = 0.001;
const START_MAGNITUDE: f64 = 10.0;
/// Bounds of the per-channel operands: beta (or the output gradient),
/// gamma, mean and variance.
const MAX_SHIFT_VAL: f64 = 4.0;
const MAX_GAMMA_VAL: f64 = 5.0;
const MAX_MEAN_VAL: f64 = 6.0;
const MAX_VAR_VAL: f64 = 7.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BatchNormDirection {
    Forward,
    Gradient,
}

impl fmt::Display for BatchNormDirection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchNormCase {
    pub direction: BatchNormDirection,
    pub is_training: bool,
}

impl BatchNormCase {
    fn operation(&self) -> &'static str {
        if self.is_training { "Training" } else { "Frozen" }
    }

    fn op(&self) -> BatchNorm {
        BatchNorm::new(EPSILON, MOMENTUM, self.is_training)
    }

    fn forward(&self, shape: &[usize]) -> RefResult<(BatchNormForward, f64)> {
        let channels = shape[shape.len() - 1];
        let per_channel = |max| Array1::from(iota_data(channels, max));
        MagnitudeSearch::new().starting_at(START_MAGNITUDE).run(|max| {
            self.op().forward(
                &iota_tensor(shape, max)?,
                &per_channel(MAX_SHIFT_VAL),
                &per_channel(MAX_GAMMA_VAL),
                &per_channel(MAX_MEAN_VAL),
                &per_channel(MAX_VAR_VAL),
            )
        })
    }

    fn gradient(&self, shape: &[usize]) -> RefResult<(BatchNormGradient, f64)> {
        let channels = shape[shape.len() - 1];
        let per_channel = |max| Array1::from(iota_data(channels, max));
        MagnitudeSearch::new().starting_at(START_MAGNITUDE).run(|max| {
            self.op().gradient(
                &iota_tensor(shape, MAX_SHIFT_VAL)?,
                &iota_tensor(shape, max)?,
                &per_channel(MAX_GAMMA_VAL),
                &per_channel(MAX_MEAN_VAL),
                &per_channel(MAX_VAR_VAL),
            )
        })
    }

    fn test_vars(&self, shape: &[usize; 4], max_input_val: f64) -> Vars {
        Vars::new()
            .with("test_name", dims_name(shape))
            .with("in_shape", format_shape(shape))
            .with("is_training", to_lower_case_str(self.is_training))
            .with("momentum", MOMENTUM)
            .with("epsilon", EPSILON)
            .with("max_input_val", format_magnitude(max_input_val))
            .with("max_gamma_val", format_magnitude(MAX_GAMMA_VAL))
            .with("max_mean_val", format_magnitude(MAX_MEAN_VAL))
            .with("max_var_val", format_magnitude(MAX_VAR_VAL))
    }
}

impl Fixture for BatchNormCase {
    fn filename(&self) -> String {
        format!(
            "batchnorm/batchnorm_{}_{}.cc",
            to_lower_case_str(self.direction),
            to_lower_case_str(self.operation())
        )
    }

    fn render(&self) -> RefResult<String> {
        let test_case = format!("Batchnorm{}{}", self.direction, self.operation());
        let mut file = file_with_preamble("batchnorm", &[INCLUDES, TEST_TYPES]);
        file.render(
            &Template::parse(SUITE_DECL)?,
            &Vars::new().with("test_case", &test_case).with("direction", self.direction),
        )?;
        let test = Template::parse(match self.direction {
            BatchNormDirection::Forward => FORWARD_TEST,
            BatchNormDirection::Gradient => GRADIENT_TEST,
        })?;
        for (n, h, w, c) in iproduct!(BATCHES, SIZES, SIZES, CHANNELS) {
            let shape = [n, h, w, c];
            let vars = match self.direction {
                BatchNormDirection::Forward => {
                    let (fwd, max_input_val) = self.forward(&shape)?;
                    self.test_vars(&shape, max_input_val)
                        .with("running_mean", format_tensor(fwd.running_mean.iter())?)
                        .with("running_var", format_tensor(fwd.running_var.iter())?)
                        .with("exp_out", format_tensor(fwd.output.iter())?)
                        .with("max_beta_val", format_magnitude(MAX_SHIFT_VAL))
                }
                BatchNormDirection::Gradient => {
                    let (grad, max_input_val) = self.gradient(&shape)?;
                    self.test_vars(&shape, max_input_val)
                        .with("input_grad", format_tensor(grad.input.iter())?)
                        .with("offset_grad", format_tensor(grad.offset.iter())?)
                        .with("scale_grad", format_tensor(grad.scale.iter())?)
                        .with("max_gradient_val", format_magnitude(MAX_SHIFT_VAL))
                }
            };
            file.render(&test, &vars.with("test_case", &test_case))?;
        }
        file.push("\n");
        Ok(file.finish())
    }
}

pub fn suite() -> RefResult<FixtureSuite> {
    let mut suite = FixtureSuite::default();
    let directions = [BatchNormDirection::Forward, BatchNormDirection::Gradient];
    for (direction, is_training) in iproduct!(directions, [true, false]) {
        suite.add(BatchNormCase { direction, is_training })?;
    }
    Ok(suite)
}
