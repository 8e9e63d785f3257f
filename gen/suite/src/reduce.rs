use itertools::iproduct;
use refgen_core::internal::*;
use refgen_core::ops::reduce::ReduceOp;
use refgen_infra::{Fixture, FixtureSuite, Template, Vars};

use crate::common::file_with_preamble;

const INCLUDES: &str = r#"
#include <gtest/gtest.h>
#include <vector>

#include "portdnn/reduce/operators.h"
#include "test/reduce/fixture.h"
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
using {{ test_case }} = ReduceFixture<Pair, sycldnn::reduce::{{ op }}>;
TYPED_TEST_SUITE({{ test_case }}, GTestTypePair);";

const TEST: &str = r"TYPED_TEST({{ test_case }}, {{ test_name }}) {
  using DataType = typename TestFixture::DataType;
  const std::vector<DataType> exp_out = {{ exp_out }};
  const int batches = {{ batch }};
  const int outer = {{ outer }};
  const int inner = {{ inner }};
  const DataType max_input_val = {{ max_input_val }};
  this->run(exp_out, batches, outer, inner, max_input_val);
}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReduceCase {
    pub op: ReduceOp,
}

impl ReduceCase {
    /// Sums and means get the full size grid, the other reductions a
    /// couple of sizes.
    fn grid(&self) -> (&'static [usize], &'static [usize]) {
        match self.op {
            ReduceOp::Add | ReduceOp::Mean => (&[1, 3], &[1, 6, 8, 33, 512, 1037]),
            ReduceOp::Max | ReduceOp::Min => (&[1, 2], &[1, 11]),
        }
    }

    fn expected(&self, batch: usize, outer: usize, inner: usize) -> RefResult<(ArrayD<f64>, f64)> {
        result_and_magnitude(|max| self.op.reduce_outer(&iota_tensor(&[batch, outer, inner], max)?))
    }
}

impl Fixture for ReduceCase {
    fn filename(&self) -> String {
        format!("reduce/reduce_{}.cc", to_lower_case_str(self.op))
    }

    fn render(&self) -> RefResult<String> {
        let test_case = format!("Reduce{}", self.op);
        let mut file = file_with_preamble("reduce", &[INCLUDES, DATA_TYPES]);
        file.render(
            &Template::parse(SUITE_DECL)?,
            &Vars::new().with("test_case", &test_case).with("op", self.op),
        )?;
        let test = Template::parse(TEST)?;
        let (batches, sizes) = self.grid();
        for (&batch, &outer, &inner) in iproduct!(batches, sizes, sizes) {
            let (output, max_input_val) = self.expected(batch, outer, inner)?;
            let vars = Vars::new()
                .with("test_case", &test_case)
                .with("test_name", format!("Batch{batch}Outer{outer}Inner{inner}"))
                .with("exp_out", format_tensor(output.iter())?)
                .with("batch", batch)
                .with("outer", outer)
                .with("inner", inner)
                .with("max_input_val", format_magnitude(max_input_val));
            file.render(&test, &vars)?;
        }
        Ok(file.finish())
    }
}

pub fn suite() -> RefResult<FixtureSuite> {
    let mut suite = FixtureSuite::default();
    for op in ReduceOp::ALL {
        suite.add(ReduceCase { op })?;
    }
    Ok(suite)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn files() {
        let names = suite().unwrap().filenames().into_iter().map(String::from).collect::<Vec<_>>();
        assert_eq!(
            names,
            vec![
                "reduce/reduce_add.cc",
                "reduce/reduce_max.cc",
                "reduce/reduce_mean.cc",
                "reduce/reduce_min.cc"
            ]
        );
    }

    #[test]
    fn mean_of_columns() {
        let (out, max) = ReduceCase { op: ReduceOp::Mean }.expected(1, 3, 2).unwrap();
        assert_eq!(max, REQUIRED_MAX);
        assert_eq!(out.iter().copied().collect::<Vec<_>>(), vec![3., 4.]);
    }

    #[test]
    fn rendering() {
        let text = ReduceCase { op: ReduceOp::Min }.render().unwrap();
        assert!(text.contains("using ReduceMin = ReduceFixture<Pair, sycldnn::reduce::Min>;"));
        assert!(text.contains("TYPED_TEST(ReduceMin, Batch2Outer11Inner1) {"));
        assert_eq!(text.matches("TYPED_TEST(").count(), 8);
        assert!(text.ends_with("}\n"));
    }
}
