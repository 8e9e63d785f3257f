use itertools::Itertools;
use refgen_core::internal::*;
use refgen_core::ops::binary::BinaryOp;
use refgen_infra::{Fixture, FixtureSuite, Template, Vars};

use crate::common::file_with_preamble;

const INCLUDES: &str = r#"
#include <gtest/gtest.h>
#include <vector>

#include "portdnn/binaryop/operators.h"
#include "test/binaryop/fixture.h"
#include "test/types/cartesian_product.h"
#include "test/types/kernel_data_types.h"
#include "test/types/test_backend_types.h"
#include "test/types/to_gtest_types.h"
"#;

const DATA_TYPES: &str = r"
using DataTypeList = sycldnn::types::KernelDataTypes;
using Backends = sycldnn::types::AllBackendTypes;

using TypeBackendPairs =
    sycldnn::types::CartesianProduct<DataTypeList, Backends>::type;

using GTestTypePair = sycldnn::types::ToGTestTypes<TypeBackendPairs>::type;
";

const SUITE_DECL: &str = r"
template <typename Pair>
using {{ test_case }} = BinaryOpFixture<Pair, sycldnn::binaryop::{{ op }}>;

TYPED_TEST_SUITE({{ test_case }}, GTestTypePair);
";

const TEST: &str = r"TYPED_TEST({{ test_case }}, {{ test_name }}) {
  using DataType = typename TestFixture::DataType;
  const std::vector<DataType> exp_out = {{ exp_out }};
  sycldnn::binaryop::BinaryParams params;
  params.lhs_dims = {{ lhs_dims }};
  params.rhs_dims = {{ rhs_dims }};
  const DataType max_input_val = {{ max_input_val }};
  this->run(exp_out, params, max_input_val);
}";

/// Operand shapes, covering scalars, trailing and leading broadcasts, and
/// both operands broadcasting at once.
const SHAPES: [(&[usize], &[usize]); 13] = [
    (&[1], &[1]),
    (&[1], &[12]),
    (&[12], &[1]),
    (&[1, 3], &[1]),
    (&[2, 3, 4, 5], &[1]),
    (&[2, 3, 4, 5], &[5]),
    (&[4, 5], &[2, 3, 4, 5]),
    (&[1, 4, 5], &[2, 3, 1, 1]),
    (&[3, 4, 5], &[2, 1, 1, 1]),
    (&[10, 1, 64], &[10, 3, 64]),
    (&[10, 3, 64], &[10, 1, 64]),
    (&[3, 1, 8], &[2, 1, 7, 1]),
    (&[2, 1, 1], &[2, 3, 1]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinaryOpCase {
    pub op: BinaryOp,
}

impl BinaryOpCase {
    fn expected(&self, lhs: &[usize], rhs: &[usize]) -> RefResult<(ArrayD<f64>, f64)> {
        result_and_magnitude(|max| self.op.eval(&iota_tensor(lhs, max)?, &iota_tensor(rhs, max)?))
    }
}

impl Fixture for BinaryOpCase {
    fn filename(&self) -> String {
        format!("binaryop/binaryop_{}.cc", to_lower_case_str(self.op))
    }

    fn render(&self) -> RefResult<String> {
        let test_case = format!("Binary{}", self.op);
        let mut file = file_with_preamble("binaryop", &[INCLUDES, DATA_TYPES]);
        file.render(
            &Template::parse(SUITE_DECL)?,
            &Vars::new().with("test_case", &test_case).with("op", self.op),
        )?;
        let test = Template::parse(TEST)?;
        for (lhs, rhs) in SHAPES {
            let (output, max_input_val) = self.expected(lhs, rhs)?;
            let vars = Vars::new()
                .with("test_case", &test_case)
                .with("test_name", format!("lhs_{}_rhs_{}", lhs.iter().join("_"), rhs.iter().join("_")))
                .with("exp_out", format_tensor(output.iter())?)
                .with("lhs_dims", format_indices(lhs))
                .with("rhs_dims", format_indices(rhs))
                .with("max_input_val", format_magnitude(max_input_val));
            file.render(&test, &vars)?;
        }
        Ok(file.finish())
    }
}

pub fn suite() -> RefResult<FixtureSuite> {
    let mut suite = FixtureSuite::default();
    for op in BinaryOp::ALL {
        suite.add(BinaryOpCase { op })?;
    }
    Ok(suite)
}

#[cfg(test)]
mod tests {
    use super::*;
    use refgen_core::ops::binary::broadcast_shape;

    #[test]
    fn every_pair_broadcasts() {
        for (lhs, rhs) in SHAPES {
            assert!(broadcast_shape(lhs, rhs).is_ok(), "{lhs:?} {rhs:?}");
        }
    }

    #[test]
    fn division_is_not_bounded() {
        let (out, max) = BinaryOpCase { op: BinaryOp::Div }.expected(&[2, 1, 1], &[2, 3, 1]).unwrap();
        assert_eq!(max, REQUIRED_MAX);
        assert_eq!(out.shape(), &[2, 3, 1]);
        assert_eq!(out.iter().copied().collect::<Vec<_>>(), vec![1., 0.5, 1. / 3., 0.5, 0.4, 2. / 6.]);
    }

    #[test]
    fn rendering() {
        let case = BinaryOpCase { op: BinaryOp::Sub };
        assert_eq!(case.filename(), "binaryop/binaryop_sub.cc");
        let text = case.render().unwrap();
        assert!(text.contains("using BinarySub = BinaryOpFixture<Pair, sycldnn::binaryop::Sub>;\n\n"));
        assert!(text.contains("TYPED_TEST(BinarySub, lhs_4_5_rhs_2_3_4_5) {"));
        assert!(text.contains("  params.rhs_dims = {2, 3, 4, 5};"));
        assert_eq!(text.matches("TYPED_TEST(").count(), SHAPES.len());
    }
}
