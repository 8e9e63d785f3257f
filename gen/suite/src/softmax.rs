use itertools::iproduct;
use refgen_core::internal::*;
use refgen_core::ops::softmax::{softmax, softmax_gradient};
use refgen_infra::{Fixture, FixtureSuite, Template, Vars};

use crate::common::{Direction, dims_name, file_with_preamble};

const INCLUDES: &str = r#"
#include <gtest/gtest.h>

#include "portdnn/data_format.h"

#include "portdnn/softmax/direction.h"
#include "portdnn/softmax/params.h"

#include "test/softmax/softmax_fixture.h"
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
template <typename Tripe>
using {{ test_case }} = SoftmaxFixture<Tripe, {{ direction }}>;
TYPED_TEST_CASE({{ test_case }}, GTestTypeTriples);";

const TEST: &str = r"TYPED_TEST({{ test_case }}, {{ test_name }}) {
  using DataType = typename TestFixture::DataType;
  const std::vector<DataType> exp_out = {{ exp_out }};
  const std::array<int, 4> in_shape = {{ in_shape }};
  const auto params = getSoftmaxParams(in_shape);
  const DataType max_input_val = {{ max_input_val }};
  this->test_softmax(exp_out, params, max_input_val);
}";

const BATCHES: [usize; 2] = [1, 3];
const SIZES: [usize; 3] = [1, 8, 9];
const CHANNELS: [usize; 3] = [1, 5, 8];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoftmaxCase {
    pub direction: Direction,
}

impl SoftmaxCase {
    fn expected(&self, shape: &[usize]) -> RefResult<(ArrayD<f64>, f64)> {
        MagnitudeSearch::new().floor_div().run(|max| {
            let input = iota_tensor(shape, max)?;
            match self.direction {
                Direction::Forward => softmax(&input),
                Direction::Grad => softmax_gradient(&input, &iota_tensor(shape, max)?),
            }
        })
    }
}

impl Fixture for SoftmaxCase {
    fn filename(&self) -> String {
        format!("softmax/softmax_{}.cc", self.direction)
    }

    fn render(&self) -> RefResult<String> {
        let test_case = format!("Softmax{}", to_camel_case(&self.direction.to_string()));
        let direction = match self.direction {
            Direction::Forward => "softmax::Forward",
            Direction::Grad => "softmax::Gradient",
        };
        let mut file = file_with_preamble("softmax", &[INCLUDES, TEST_TYPES]);
        file.render(
            &Template::parse(SUITE_DECL)?,
            &Vars::new().with("test_case", &test_case).with("direction", direction),
        )?;
        let test = Template::parse(TEST)?;
        for (n, h, w, c) in iproduct!(BATCHES, SIZES, SIZES, CHANNELS) {
            let shape = [n, h, w, c];
            let (output, max_input_val) = self.expected(&shape)?;
            let vars = Vars::new()
                .with("test_case", &test_case)
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
    for direction in Direction::ALL {
        suite.add(SoftmaxCase { direction })?;
    }
    Ok(suite)
}
