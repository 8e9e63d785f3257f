use itertools::iproduct;
use refgen_core::internal::*;
use refgen_core::ops::matmul::BatchMatMul;
use refgen_infra::{Fixture, FixtureSuite, Template, Vars};

use crate::common::file_with_preamble;

const INCLUDES: &str = r#"
#include <gtest/gtest.h>
#include <vector>

#include "test/matmul/fixture.h"
#include "test/types/cartesian_product.h"
#include "test/types/kernel_data_types.h"
#include "test/types/test_backend_types.h"
#include "test/types/to_gtest_types.h"
"#;

const DATA_TYPES: &str = r"
using DataTypeList = sycldnn::types::KernelDataTypes;
using BackendTypeList = sycldnn::types::DefaultBackendTypes;
using TypePairList =
    sycldnn::types::CartesianProduct<DataTypeList, BackendTypeList>::type;
using GTestTypeList = sycldnn::types::ToGTestTypes<TypePairList>::type;
";

const SUITE_DECL: &str = r"
template <typename DataType>
using {{ test_case }} = MatmulFixture<DataType, {{ trans_lhs }}, {{ trans_rhs }}>;
TYPED_TEST_SUITE({{ test_case }}, GTestTypeList);";

const TEST: &str = r"TYPED_TEST({{ test_case }}, {{ test_name }}) {
  using DataType = typename TestFixture::DataType;
  const std::vector<DataType> exp_out = {{ exp_out }};
  const int batches = {{ batch }};
  const int m = {{ m }};
  const int k = {{ k }};
  const int n = {{ n }};
  const auto beta = static_cast<DataType>({{ beta }});
  const DataType max_input_val = {{ max_input_val }};
  this->run(exp_out, batches, m, k, n, beta, 0, 0, 0, max_input_val);
}";

const BATCHES: [usize; 2] = [1, 3];
const BETAS: [usize; 2] = [0, 1];
const TRANSPOSES: [bool; 2] = [true, false];
/// Divisible by 4, by 2 only, odd.
const SIZES: [usize; 3] = [14, 15, 16];

/// All the matrix sizes for one batch, beta and transposition combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatmulCase {
    pub batch: usize,
    pub beta: usize,
    pub trans_lhs: bool,
    pub trans_rhs: bool,
}

impl MatmulCase {
    fn test_case(&self) -> String {
        format!(
            "MatmulBatch{}Beta{}{}{}",
            self.batch,
            self.beta,
            to_camel_case(&self.trans_lhs.to_string()),
            to_camel_case(&self.trans_rhs.to_string())
        )
    }
}

impl Fixture for MatmulCase {
    fn filename(&self) -> String {
        format!(
            "matmul/matmul_batch{}_beta{}_{}_{}.cc",
            self.batch,
            self.beta,
            to_lower_case_str(self.trans_lhs),
            to_lower_case_str(self.trans_rhs)
        )
    }

    fn render(&self) -> RefResult<String> {
        let test_case = self.test_case();
        let mut file = file_with_preamble("matmul", &[INCLUDES, DATA_TYPES]);
        file.render(
            &Template::parse(SUITE_DECL)?,
            &Vars::new()
                .with("test_case", &test_case)
                .with("trans_lhs", to_lower_case_str(self.trans_lhs))
                .with("trans_rhs", to_lower_case_str(self.trans_rhs)),
        )?;
        let test = Template::parse(TEST)?;
        for (m, k, n) in iproduct!(SIZES, SIZES, SIZES) {
            let op = BatchMatMul::new(
                self.batch,
                m,
                k,
                n,
                self.beta as f64,
                self.trans_lhs,
                self.trans_rhs,
            );
            let (output, max_input_val) = result_and_magnitude(|max| op.reference(max))?;
            let vars = Vars::new()
                .with("test_case", &test_case)
                .with("test_name", format!("M{m}xK{k}xN{n}"))
                .with("exp_out", format_tensor(output.iter())?)
                .with("batch", self.batch)
                .with("m", m)
                .with("k", k)
                .with("n", n)
                .with("beta", self.beta)
                .with("max_input_val", format_magnitude(max_input_val));
            file.render(&test, &vars)?;
        }
        Ok(file.finish())
    }
}

pub fn suite() -> RefResult<FixtureSuite> {
    let mut suite = FixtureSuite::default();
    for (batch, beta, trans_lhs, trans_rhs) in iproduct!(BATCHES, BETAS, TRANSPOSES, TRANSPOSES) {
        suite.add(MatmulCase { batch, beta, trans_lhs, trans_rhs })?;
    }
    Ok(suite)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names() {
        let case = MatmulCase { batch: 3, beta: 1, trans_lhs: true, trans_rhs: false };
        assert_eq!(case.test_case(), "MatmulBatch3Beta1TrueFalse");
        assert_eq!(case.filename(), "matmul/matmul_batch3_beta1_true_false.cc");
        assert_eq!(suite().unwrap().len(), 16);
    }

    #[test]
    fn small_product_is_exact() {
        let op = BatchMatMul::new(1, 14, 14, 14, 0.0, false, false);
        let (out, max) = result_and_magnitude(|m| op.reference(m)).unwrap();
        assert_eq!(max, REQUIRED_MAX);
        // first row of lhs is 1..=14, first column of rhs is 1, 15, 29...
        let expected: f64 = (0..14).map(|i| (i + 1) as f64 * (1 + 14 * i) as f64).sum();
        assert_eq!(out[[0, 0, 0]], expected);
    }
}
