use itertools::Itertools;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use refgen_core::internal::*;
use refgen_core::ops::gather::gather;
use refgen_infra::{Fixture, FixtureSuite, Template, Vars};

use crate::common::{file_with_preamble, packed_dims};

const INCLUDES: &str = r#"
#include <gtest/gtest.h>

#include <vector>

#include "test/gather/gather_fixture.h"
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

using namespace sycldnn;
using GTestTypePairs = sycldnn::types::ToGTestTypes<TypeBackendPairs>::type;

using IndexDataType = int32_t;  // or int64_t";

const SUITE_DECL: &str = r"
template <typename Pair>
using {{ test_case }} = GatherFixture<Pair, IndexDataType>;
TYPED_TEST_SUITE({{ test_case }}, GTestTypePairs);
";

const TEST: &str = r"TYPED_TEST({{ test_case }}, {{ test_name }}) {
  using DataType = typename TestFixture::DataType;
  const std::vector<DataType> exp_out = {{ exp_out }};
  const std::vector<IndexDataType> indices = {{ indices }};
  gather::GatherParams params;
  params.axis = {{ axis }};
  params.indices_dims = {{ indices_dims }};
  params.input_dims = {{ input_dims }};
  this->test_gather(exp_out, params, indices);
}";

const RANKS: [usize; 3] = [1, 2, 3];
/// Input shapes are prefixes of this one.
const FULL_SHAPE: [usize; 3] = [5, 4, 3];
const SEED: u64 = 123;

/// One gather test: the input shape, a possibly negative axis and the
/// indices along with their shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatherParams {
    pub input_shape: Vec<usize>,
    pub axis: isize,
    pub indices: Vec<usize>,
    pub indices_shape: Vec<usize>,
}

impl GatherParams {
    fn test_name(&self) -> String {
        let axis = if self.axis < 0 { format!("Neg{}", -self.axis) } else { self.axis.to_string() };
        format!(
            "G{}D_Axis_{axis}_Inp{}_Ind{}",
            self.input_shape.len(),
            self.input_shape.iter().join("x"),
            self.indices_shape.iter().join("x")
        )
    }
}

/// Every axis of a rank, counted from both ends, gathered with a single
/// index, as many indices as the axis is long, and twice that laid out as
/// a matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatherCase {
    pub rank: usize,
}

impl GatherCase {
    /// Indices are drawn with replacement from a generator seeded once per
    /// file, so a file always holds the same tests.
    pub fn params(&self) -> Vec<GatherParams> {
        let mut rng = SmallRng::seed_from_u64(SEED);
        let input_shape = FULL_SHAPE[..self.rank].to_vec();
        let rank = self.rank as isize;
        let mut params = vec![];
        for axis in -rank..rank {
            let dim = input_shape[axis.rem_euclid(rank) as usize];
            for len in [1, dim, 2 * dim] {
                let indices = (0..len).map(|_| rng.gen_range(0..dim)).collect();
                let indices_shape = if len <= dim { vec![len] } else { vec![len / 2, 2] };
                params.push(GatherParams { input_shape: input_shape.clone(), axis, indices, indices_shape });
            }
        }
        params
    }
}

impl Fixture for GatherCase {
    fn filename(&self) -> String {
        format!("gather/gather_{}d.cc", self.rank)
    }

    fn render(&self) -> RefResult<String> {
        let test_case = format!("Gather{}D", self.rank);
        let mut file = file_with_preamble("gather", &[INCLUDES, DATA_TYPES]);
        file.render(&Template::parse(SUITE_DECL)?, &Vars::new().with("test_case", &test_case))?;
        let test = Template::parse(TEST)?;
        for p in self.params() {
            let (output, _) = result_and_magnitude(|max| {
                gather(&iota_tensor(&p.input_shape, max)?, p.axis, &p.indices, &p.indices_shape)
            })?;
            let vars = Vars::new()
                .with("test_case", &test_case)
                .with("test_name", p.test_name())
                .with("exp_out", format_tensor(output.iter())?)
                .with("indices", format_indices(&p.indices))
                .with("axis", p.axis)
                .with("indices_dims", packed_dims(&p.indices_shape, ","))
                .with("input_dims", packed_dims(&p.input_shape, ","));
            file.render(&test, &vars)?;
        }
        Ok(file.finish())
    }
}

pub fn suite() -> RefResult<FixtureSuite> {
    let mut suite = FixtureSuite::default();
    for rank in RANKS {
        suite.add(GatherCase { rank })?;
    }
    Ok(suite)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_grid() {
        let params = GatherCase { rank: 2 }.params();
        assert_eq!(params.len(), 12);
        assert_eq!(params, GatherCase { rank: 2 }.params());
        assert_eq!(params[0].axis, -2);
        assert_eq!(params[0].indices_shape, vec![1]);
        assert_eq!(params[1].indices_shape, vec![5]);
        assert_eq!(params[2].indices_shape, vec![5, 2]);
        assert_eq!(params[5].indices_shape, vec![4, 2]);
        for p in &params {
            let dim = p.input_shape[p.axis.rem_euclid(2) as usize];
            assert!(p.indices.iter().all(|&i| i < dim));
            assert_eq!(p.indices.len(), p.indices_shape.iter().product::<usize>());
        }
    }

    #[test]
    fn names() {
        let params = GatherCase { rank: 3 }.params();
        assert_eq!(params[0].test_name(), "G3D_Axis_Neg3_Inp5x4x3_Ind1");
        assert_eq!(params.last().unwrap().test_name(), "G3D_Axis_2_Inp5x4x3_Ind3x2");
    }

    #[test]
    fn rendering() {
        let text = GatherCase { rank: 1 }.render().unwrap();
        assert!(text.contains("using IndexDataType = int32_t;  // or int64_t\n"));
        assert!(text.contains("TYPED_TEST(Gather1D, G1D_Axis_Neg1_Inp5_Ind5x2) {"));
        assert!(text.contains("  params.input_dims = {5};"));
        assert_eq!(text.matches("TYPED_TEST(").count(), 6);
        assert!(text.ends_with("}\n"));
    }
}
