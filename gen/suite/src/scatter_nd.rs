use itertools::iproduct;
use rand::rngs::SmallRng;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use refgen_core::internal::*;
use refgen_core::ops::scatter_nd::ScatterNdOp;
use refgen_infra::{Fixture, FixtureSuite, Template, Vars};

use crate::common::{dims_name, file_with_preamble};

const INCLUDES: &str = r#"
#include <gtest/gtest.h>

#include "portdnn/scatter_nd/operators.h"
#include "portdnn/scatter_nd/params.h"

#include "test/scatter_nd/scatter_nd_fixture.h"
#include "test/types/cartesian_product.h"
#include "test/types/kernel_data_types.h"
#include "test/types/test_backend_types.h"
#include "test/types/to_gtest_types.h"

#include <vector>"#;

const SUITE_DECL: &str = r"
using DataTypeList = sycldnn::types::KernelDataTypes;
using Backends = sycldnn::types::DefaultBackendTypes;

using TypeBackendPairs =
    sycldnn::types::CartesianProduct<DataTypeList, Backends>::type;

using GTestTypePairs = sycldnn::types::ToGTestTypes<TypeBackendPairs>::type;

using namespace sycldnn; // NOLINT(google-build-using-namespace)
template <typename Pair>
using {{ test_case }} = ScatterNDFixture<Pair, int, {{ operator }}>;
TYPED_TEST_CASE({{ test_case }}, GTestTypePairs);";

const TEST: &str = r"TYPED_TEST({{ test_case }}, {{ test_name }}) {
  using DataType = typename TestFixture::DataType;
  const std::vector<DataType> exp_out = {{ exp_out }};
  const std::array<int, 4> in_shape = {{ in_shape }};
  const std::array<int, 2> ind_shape = {{ ind_shape }};
  const auto params = getScatterNDParams(in_shape, ind_shape);
  const std::vector<DataType> input = {{ input }};
  const std::vector<int> indices = {{ indices }};
  const std::vector<DataType> updates = {{ updates }};
  this->test_scatter_nd(input, indices, updates, exp_out, params);
}";

const BATCHES: [usize; 2] = [1, 3];
const ROWS: [usize; 3] = [1, 2, 8];
const COLUMNS: [usize; 3] = [1, 2, 8];
const CHANNELS: [usize; 3] = [1, 5, 8];
/// Slice kind addressed by each index depth, from 1 to 4.
const SLICE_KINDS: [&str; 4] = ["tensor_slice", "matrix_slice", "vector_slice", "elementwise"];
const SEED: u64 = 12345;
/// Inputs and updates are drawn from `0..MAX_VALUE`.
const MAX_VALUE: u32 = 10;

/// Randomly drawn operands of one scatter test, and the expected output.
#[derive(Debug, Clone, PartialEq)]
pub struct ScatterNdData {
    pub input: ArrayD<f64>,
    pub indices: Array2<usize>,
    pub updates: ArrayD<f64>,
    pub output: ArrayD<f64>,
}

/// Row-major coordinates of `flat` in `shape`.
fn unravel(mut flat: usize, shape: &[usize]) -> Vec<usize> {
    let mut coords = vec![0; shape.len()];
    for (coord, &dim) in coords.iter_mut().zip(shape).rev() {
        *coord = flat % dim;
        flat /= dim;
    }
    coords
}

fn random_tensor(rng: &mut SmallRng, shape: &[usize]) -> RefResult<ArrayD<f64>> {
    let size = shape.iter().product();
    let values = (0..size).map(|_| rng.gen_range(0..MAX_VALUE) as f64).collect();
    Ok(ArrayD::from_shape_vec(shape.to_vec(), values)?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScatterNdCase {
    pub op: ScatterNdOp,
}

impl ScatterNdCase {
    /// Draws up to a bit more than half of the slices addressed at
    /// `depth`, each at most once, and scatters random updates into a random
    /// input. Every test starts from a freshly seeded generator.
    pub fn data(&self, shape: &[usize], depth: usize) -> RefResult<ScatterNdData> {
        ensure!(depth >= 1 && depth <= shape.len(), "Index depth {} out of range for {:?}", depth, shape);
        let mut rng = SmallRng::seed_from_u64(SEED);
        let outer = &shape[..depth];
        let num_slices: usize = outer.iter().product();
        let num_updates = rng.gen_range(0..num_slices / 2 + 1) + 1;
        let flat = sample(&mut rng, num_slices, num_updates);
        let coords = flat.iter().flat_map(|ix| unravel(ix, outer)).collect();
        let indices = Array2::from_shape_vec((num_updates, depth), coords)?;
        let mut updates_shape = vec![num_updates];
        updates_shape.extend_from_slice(&shape[depth..]);
        let updates = random_tensor(&mut rng, &updates_shape)?;
        let input = random_tensor(&mut rng, shape)?;
        let output = self.op.eval(&input, &indices, &updates)?;
        Ok(ScatterNdData { input, indices, updates, output })
    }

    fn library_operator(&self) -> &'static str {
        match self.op {
            ScatterNdOp::Assign => "scatter_nd::Assign",
            ScatterNdOp::Add => "scatter_nd::Add",
        }
    }
}

impl Fixture for ScatterNdCase {
    fn filename(&self) -> String {
        format!("scatter_nd/{}.cc", self.op)
    }

    fn render(&self) -> RefResult<String> {
        let test_case = to_camel_case(&self.op.to_string());
        let mut file = file_with_preamble("scatter_nd", &[INCLUDES]);
        file.render(
            &Template::parse(SUITE_DECL)?,
            &Vars::new().with("test_case", &test_case).with("operator", self.library_operator()),
        )?;
        let test = Template::parse(TEST)?;
        for (n, r, c, ch) in iproduct!(BATCHES, ROWS, COLUMNS, CHANNELS) {
            let shape = [n, r, c, ch];
            for (depth, kind) in (1..).zip(SLICE_KINDS) {
                let data = self
                    .data(&shape, depth)
                    .with_context(|| format!("Scattering into {shape:?} at depth {depth}"))?;
                let vars = Vars::new()
                    .with("test_case", &test_case)
                    .with("test_name", format!("{}_{kind}", dims_name(&shape)))
                    .with("exp_out", format_tensor(data.output.iter())?)
                    .with("in_shape", format_shape(&shape))
                    .with("ind_shape", format_indices(data.indices.shape()))
                    .with("input", format_tensor(data.input.iter())?)
                    .with("indices", format_indices(data.indices.iter()))
                    .with("updates", format_tensor(data.updates.iter())?);
                file.render(&test, &vars)?;
            }
        }
        file.push("\n");
        Ok(file.finish())
    }
}

pub fn suite() -> RefResult<FixtureSuite> {
    let mut suite = FixtureSuite::default();
    for op in [ScatterNdOp::Assign, ScatterNdOp::Add] {
        suite.add(ScatterNdCase { op })?;
    }
    Ok(suite)
}
