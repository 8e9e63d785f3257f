use itertools::iproduct;
use refgen_core::internal::*;
use refgen_core::ops::pointwise::PointwiseOp;
use refgen_infra::{Fixture, FixtureSuite, Template, Vars};

use crate::common::{Direction, file_with_preamble};

const INCLUDES: &str = r#"
#include <gtest/gtest.h>

#include "sycldnn/pointwise/operators.h"
#include "sycldnn/pointwise/direction.h"

#include "test/pointwise/pointwise_fixture.h"
#include "test/types/kernel_data_types.h"

#include <vector>"#;

const SUITE_DECL: &str = r"
using namespace sycldnn; // NOLINT(google-build-using-namespace)
template <typename DataType>
using {{ test_case }} = PointwiseFixture<DataType, {{ operation }}, {{ direction }}>;
TYPED_TEST_CASE({{ test_case }}, types::GTestKernelDataTypes);";

const TEST: &str = r"TYPED_TEST({{ test_case }}, {{ test_name }}) {
  using DataType = typename TestFixture::DataType;
  const std::vector<DataType> exp_out = {{ exp_out }};
  this->test_pointwise(exp_out);
}";

const OPERATIONS: [PointwiseOp; 2] = [PointwiseOp::Relu, PointwiseOp::Tanh];
const SIZES: [usize; 4] = [1, 8, 9, 10];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointwiseCase {
    pub op: PointwiseOp,
    pub direction: Direction,
}

impl PointwiseCase {
    /// Inputs (and output gradients) are the signed iota the library
    /// generates on its side, centred on zero.
    fn expected(&self, size: usize) -> RefResult<ArrayD<f64>> {
        let (output, _) = MagnitudeSearch::new().starting_at(size as f64).floor_div().run(|_| {
            let input = iota_signed_tensor(&[size])?;
            match self.direction {
                Direction::Forward => Ok(self.op.forward(&input)),
                Direction::Grad => self.op.gradient(&input, &input),
            }
        })?;
        Ok(output)
    }
}

impl Fixture for PointwiseCase {
    fn filename(&self) -> String {
        format!("pointwise/{}_{}.cc", self.op, self.direction)
    }

    fn render(&self) -> RefResult<String> {
        let test_case = format!(
            "{}{}",
            to_camel_case(&self.op.to_string()),
            to_camel_case(&self.direction.to_string())
        );
        let operation = match self.op {
            PointwiseOp::Relu => "pointwise::Relu",
            PointwiseOp::Tanh => "pointwise::Tanh",
        };
        let direction = match self.direction {
            Direction::Forward => "pointwise::Forward",
            Direction::Grad => "pointwise::Gradient",
        };
        let mut file = file_with_preamble("pointwise", &[INCLUDES]);
        file.render(
            &Template::parse(SUITE_DECL)?,
            &Vars::new()
                .with("test_case", &test_case)
                .with("operation", operation)
                .with("direction", direction),
        )?;
        let test = Template::parse(TEST)?;
        for size in SIZES {
            let vars = Vars::new()
                .with("test_case", &test_case)
                .with("test_name", format!("Shape_{size}x1"))
                .with("exp_out", format_tensor(self.expected(size)?.iter())?);
            file.render(&test, &vars)?;
        }
        file.push("\n");
        Ok(file.finish())
    }
}

pub fn suite() -> RefResult<FixtureSuite> {
    let mut suite = FixtureSuite::default();
    for (op, direction) in iproduct!(OPERATIONS, Direction::ALL) {
        suite.add(PointwiseCase { op, direction })?;
    }
    Ok(suite)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn relu_values() {
        let case = PointwiseCase { op: PointwiseOp::Relu, direction: Direction::Forward };
        let out = case.expected(8).unwrap();
        assert_eq!(format_tensor(out.iter()).unwrap(), "{0., 0., 0., 0., 0., 1., 2., 3.}");
        assert_eq!(case.filename(), "pointwise/relu_forward.cc");
    }

    #[test]
    fn tanh_gradient() {
        let case = PointwiseCase { op: PointwiseOp::Tanh, direction: Direction::Grad };
        let out = case.expected(1).unwrap();
        // single value -1
        let y = (-1f64).tanh();
        assert_abs_diff_eq!(out[[0]], -(1.0 - y * y), epsilon = 1e-12);
    }

    #[test]
    fn rendering() {
        let case = PointwiseCase { op: PointwiseOp::Relu, direction: Direction::Grad };
        let text = case.render().unwrap();
        assert!(text.contains("using ReluGrad = PointwiseFixture<DataType, pointwise::Relu, pointwise::Gradient>;"));
        assert!(text.contains("TYPED_TEST(ReluGrad, Shape_10x1) {"));
        assert!(text.ends_with("}\n\n"));
        assert_eq!(suite().unwrap().len(), 4);
    }
}
