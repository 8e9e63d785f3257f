use itertools::Itertools;
use refgen_core::internal::*;
use refgen_core::ops::transpose::transpose;
use refgen_infra::{Fixture, FixtureSuite, Template, Vars};

use crate::common::file_with_preamble;

const INCLUDES: &str = r#"
#include <gtest/gtest.h>
#include <vector>

#include "test/transpose/transpose_fixture.h"
#include "test/types/cartesian_product.h"
#include "test/types/kernel_data_types.h"
#include "test/types/test_backend_types.h"
#include "test/types/to_gtest_types.h"
"#;

const DATA_TYPES: &str = r"
using DataTypeList = sycldnn::types::KernelDataTypes;
using Backends = sycldnn::types::DefaultBackendTypes;

using TypeBackendPairs =
    sycldnn::types::CartesianProduct<DataTypeList, Backends>::type;

using GTestTypePairs = sycldnn::types::ToGTestTypes<TypeBackendPairs>::type;
";

const SUITE_DECL: &str = r"
template <typename Pair>
using {{ test_case }} = TransposeFixture<Pair>;
TYPED_TEST_SUITE({{ test_case }}, GTestTypePairs);";

const TEST: &str = r"TYPED_TEST({{ test_case }}, {{ test_name }}) {
  using DataType = typename TestFixture::DataType;
  const std::vector<DataType> exp_out = {{ exp_out }};
  const std::vector<int> sizes = {{ sizes }};
  const std::vector<int> perm = {{ perm }};
  const DataType max_input_val = {{ max_input_val }};
  this->run(exp_out, sizes, perm, max_input_val, 0, 0);
}";

const RANKS: [usize; 3] = [2, 3, 4];
/// Divisible by 4, by 2 only, odd.
const SIZES: [usize; 3] = [2, 3, 4];

/// `{ 2,3,4 }`
fn spaced_list(values: &[usize]) -> String {
    format!("{{ {} }}", values.iter().join(","))
}

/// Every shape of a given rank drawn from [`SIZES`], with every
/// permutation of its axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransposeCase {
    pub rank: usize,
}

impl TransposeCase {
    fn shapes(&self) -> impl Iterator<Item = Vec<usize>> {
        (0..self.rank).map(|_| SIZES).multi_cartesian_product()
    }

    fn permutations(&self) -> impl Iterator<Item = Vec<usize>> {
        (0..self.rank).permutations(self.rank)
    }
}

impl Fixture for TransposeCase {
    fn filename(&self) -> String {
        format!("transpose/transpose_{}d.cc", self.rank)
    }

    fn render(&self) -> RefResult<String> {
        let test_case = format!("Transpose{}D", self.rank);
        let mut file = file_with_preamble("transpose", &[INCLUDES, DATA_TYPES]);
        file.render(&Template::parse(SUITE_DECL)?, &Vars::new().with("test_case", &test_case))?;
        let test = Template::parse(TEST)?;
        for shape in self.shapes() {
            for perm in self.permutations() {
                let (output, max_input_val) =
                    result_and_magnitude(|max| transpose(&iota_tensor(&shape, max)?, &perm))?;
                let test_name =
                    format!("T{}D_{}_{}", self.rank, shape.iter().join("x"), perm.iter().join("x"));
                let vars = Vars::new()
                    .with("test_case", &test_case)
                    .with("test_name", test_name)
                    .with("exp_out", format_tensor(output.iter())?)
                    .with("sizes", spaced_list(&shape))
                    .with("perm", spaced_list(&perm))
                    .with("max_input_val", format_magnitude(max_input_val));
                file.render(&test, &vars)?;
            }
        }
        Ok(file.finish())
    }
}

pub fn suite() -> RefResult<FixtureSuite> {
    let mut suite = FixtureSuite::default();
    for rank in RANKS {
        suite.add(TransposeCase { rank })?;
    }
    Ok(suite)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid() {
        let case = TransposeCase { rank: 3 };
        assert_eq!(case.shapes().count(), 27);
        assert_eq!(case.shapes().next().unwrap(), vec![2, 2, 2]);
        let perms = case.permutations().collect::<Vec<_>>();
        assert_eq!(perms.len(), 6);
        assert_eq!(perms[0], vec![0, 1, 2]);
        assert_eq!(perms[1], vec![0, 2, 1]);
        assert_eq!(perms[5], vec![2, 1, 0]);
    }

    #[test]
    fn rendering() {
        let text = TransposeCase { rank: 2 }.render().unwrap();
        assert!(text.contains("using Transpose2D = TransposeFixture<Pair>;"));
        assert!(text.contains("TYPED_TEST(Transpose2D, T2D_2x3_1x0) {"));
        assert!(text.contains("  const std::vector<DataType> exp_out = {1., 4., 2., 5., 3., 6.};"));
        assert!(text.contains("  const std::vector<int> sizes = { 2,3 };"));
        assert_eq!(text.matches("TYPED_TEST(").count(), 18);
        assert!(text.ends_with("}\n"));
    }
}
