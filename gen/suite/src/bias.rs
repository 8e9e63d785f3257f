use itertools::iproduct;
use refgen_core::internal::*;
use refgen_core::ops::bias::bias_add;
use refgen_infra::{Fixture, FixtureSuite, Template, Vars};

use crate::common::{dims_name, file_with_preamble};

const INCLUDES: &str = r#"
#include <gtest/gtest.h>

#include "test/types/cartesian_product.h"
#include "test/types/kernel_data_types.h"
#include "test/types/test_backend_types.h"
#include "test/types/to_gtest_types.h"

#include "test/bias/bias_fixture.h"

#include <array>
#include <vector>"#;

const DATA_TYPES: &str = r"
using namespace sycldnn; // NOLINT(google-build-using-namespace)
using DataTypeList = sycldnn::types::KernelDataTypes;
using Backends = sycldnn::types::DefaultBackendTypes;

using SNNTypePairs =
    sycldnn::types::CartesianProduct<DataTypeList, Backends>::type;
using GTestTypePairs = sycldnn::types::ToGTestTypes<SNNTypePairs>::type;";

const SUITE_DECL: &str = r"
template <typename Pair>
using {{ test_case }} =
        BiasFixture<typename Pair::FirstType, typename Pair::SecondType>;
TYPED_TEST_SUITE({{ test_case }}, GTestTypePairs);";

const TEST: &str = r"TYPED_TEST({{ test_case }}, {{ test_name }}) {
  using DataType = typename TestFixture::DataType;
  const std::vector<DataType> exp_out = {{ exp_out }};
  const std::array<int, 4> in_shape = {{ in_shape }};
  const auto params = getBiasParams(in_shape);
  const DataType max_input_val = {{ max_input_val }};
  this->test_bias(exp_out, params, max_input_val);
}";

const TEST_CASE: &str = "Bias";
const BATCHES: [usize; 3] = [1, 2, 4];
const SIZES: [usize; 3] = [1, 2, 4];
const CHANNELS: [usize; 3] = [1, 2, 4];

/// Bias add over NHWC inputs: the whole family fits in one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BiasCase;

impl BiasCase {
    fn expected(&self, shape: &[usize; 4]) -> RefResult<(ArrayD<f64>, f64)> {
        result_and_magnitude(|max| bias_add(&iota_tensor(shape, max)?, &iota_tensor(&[shape[3]], max)?))
    }
}

impl Fixture for BiasCase {
    fn filename(&self) -> String {
        "bias/test_bias.cc".to_string()
    }

    fn render(&self) -> RefResult<String> {
        let mut file = file_with_preamble("bias", &[INCLUDES, DATA_TYPES]);
        file.render(&Template::parse(SUITE_DECL)?, &Vars::new().with("test_case", TEST_CASE))?;
        let test = Template::parse(TEST)?;
        for (n, h, w, c) in iproduct!(BATCHES, SIZES, SIZES, CHANNELS) {
            let shape = [n, h, w, c];
            let (output, max_input_val) = self.expected(&shape)?;
            let vars = Vars::new()
                .with("test_case", TEST_CASE)
                .with("test_name", dims_name(&shape))
                .with("exp_out", format_tensor(output.iter())?)
                .with("in_shape", format_shape(&shape))
                .with("max_input_val", format_magnitude(max_input_val));
            file.render(&test, &vars)?;
        }
        file.push("\n");
        Ok(file.finish())
    }
}

pub fn suite() -> RefResult<FixtureSuite> {
    let mut suite = FixtureSuite::default();
    suite.add(BiasCase)?;
    Ok(suite)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bias_follows_channels() {
        let (out, max) = BiasCase.expected(&[2, 1, 1, 2]).unwrap();
        assert_eq!(max, REQUIRED_MAX);
        assert_eq!(out.iter().copied().collect::<Vec<_>>(), vec![2., 4., 4., 6.]);
    }

    #[test]
    fn rendering() {
        let text = BiasCase.render().unwrap();
        assert!(text.contains("using Bias =\n        BiasFixture<"));
        assert!(text.contains("TYPED_TEST(Bias, 4x2x1x4) {"));
        assert!(text.contains("  const std::array<int, 4> in_shape = { 4, 2, 1, 4 };"));
        assert_eq!(text.matches("TYPED_TEST(").count(), 81);
        assert!(text.ends_with("}\n\n"));
    }
}
