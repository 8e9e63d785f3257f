use itertools::iproduct;
use refgen_core::internal::*;
use refgen_core::ops::pool::{Pool2d, PoolOp};
use refgen_infra::{Fixture, FixtureSuite, SourceFile, Template, Vars};

use crate::common::{Direction, dims_name, file_with_preamble, input_sizes};

const INCLUDES: &str = r#"
#include <gtest/gtest.h>

#include "portdnn/padding_mode.h"

#include "portdnn/pooling/operators.h"

#include "test/types/cartesian_product.h"
#include "test/types/data_format_types.h"
#include "test/types/kernel_data_types.h"
#include "test/types/test_backend_types.h"
#include "test/types/nested_pairs_to_triple.h"
#include "test/types/to_gtest_types.h"

#include "test/pooling/pooling_fixture.h"

#include <array>
#include <vector>"#;

const DATA_TYPES: &str = r"
using namespace sycldnn; // NOLINT(google-build-using-namespace)
using DataTypeList = sycldnn::types::KernelDataTypes;
using DataFormatList = sycldnn::types::DataFormatTypes;
using BackendList = sycldnn::types::DefaultBackendTypes;

using SNNTypePairs =
    sycldnn::types::CartesianProduct<DataTypeList, DataFormatList>::type;
using SNNTypeBackendPairs =
    sycldnn::types::CartesianProduct<SNNTypePairs, BackendList>::type;
using TestTriples =
    sycldnn::types::NestedPairsToTriple<SNNTypeBackendPairs>::type;
using GTestTypeTriples = sycldnn::types::ToGTestTypes<TestTriples>::type;";

const SUITE_DECL: &str = r"
template <typename Triple>
using {{ test_case }} =
    PoolingFixture<typename Triple::FirstType, typename Triple::SecondType,
                   typename Triple::ThirdType, {{ operation }}, {{ direction }}>;
TYPED_TEST_SUITE({{ test_case }}, GTestTypeTriples);";

const TEST: &str = r"TYPED_TEST({{ test_case }}, {{ test_name }}) {
  using DataType = typename TestFixture::DataType;
  const std::vector<DataType> exp_out = {{ exp_out }};
  const std::array<int, 4> in_shape = {{ in_shape }};
  const auto padding = PaddingMode::{{ padding }};
  const auto params = getPoolingParams<{{ window }}, {{ stride }}>(in_shape, padding);
  const DataType max_input_val = {{ max_input_val }};
  this->test_pool(exp_out, params, max_input_val);
}";

pub const WINDOW_STRIDES: [(usize, usize); 9] =
    [(1, 1), (3, 1), (3, 2), (5, 1), (5, 2), (7, 1), (7, 4), (11, 1), (11, 4)];
/// Pooling kinds as the library names them. `maxwithnan` computes like
/// `max` and only differs by how the library handles NaN.
pub const OPERATIONS: [&str; 3] = ["maxwithnan", "max", "avg"];
const BATCHES: [usize; 2] = [1, 3];
const CHANNELS: [usize; 3] = [1, 2, 4];
const FASTDIV_CHANNELS: [usize; 3] = [5, 6, 8];

/// Which shapes a pooling test case covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeGrid {
    Full,
    /// A single batch and image size, with channel counts exercising the
    /// fast integer division kernels.
    FastDiv,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolingCase {
    pub operation: &'static str,
    pub window: usize,
    pub stride: usize,
    pub direction: Direction,
}

impl PoolingCase {
    fn test_case(&self) -> String {
        format!(
            "{}Window{}Stride{}{}",
            to_camel_case(self.operation),
            self.window,
            self.stride,
            to_camel_case(&self.direction.to_string())
        )
    }

    fn library_operation(&self) -> RefResult<&'static str> {
        Ok(match self.operation {
            "maxwithnan" => "pooling::MaxWithNan",
            "max" => "pooling::Max",
            "avg" => "pooling::Average",
            other => bail!("Unrecognized pooling op {:?}", other),
        })
    }

    fn shapes(&self, grid: ShapeGrid) -> Vec<[usize; 4]> {
        match grid {
            ShapeGrid::Full => {
                let sizes = input_sizes(self.window, self.stride);
                iproduct!(BATCHES, sizes, sizes, CHANNELS).map(|(n, h, w, c)| [n, h, w, c]).collect()
            }
            ShapeGrid::FastDiv => {
                let size = self.window + self.stride + 2;
                FASTDIV_CHANNELS.iter().map(|&c| [1, size, size, c]).collect()
            }
        }
    }

    fn expected(
        &self,
        op: PoolOp,
        shape: &[usize; 4],
        padding: PaddingMode,
    ) -> RefResult<(ArrayD<f64>, f64)> {
        let pool = Pool2d::new(op, Window2d::square(self.window, self.stride, padding));
        result_and_magnitude(|max| {
            let input = iota_tensor(shape, max)?;
            match self.direction {
                Direction::Forward => pool.forward(&input),
                Direction::Grad => {
                    let errors = iota_tensor(&pool.output_shape(shape)?, max)?;
                    pool.backward(&input, &errors)
                }
            }
        })
    }

    /// Suite declaration, every test, then a blank separator.
    fn render_into(&self, file: &mut SourceFile, grid: ShapeGrid) -> RefResult<()> {
        let test_case = self.test_case();
        let op: PoolOp = self.operation.parse()?;
        let direction = match self.direction {
            Direction::Forward => "pooling::Forward",
            Direction::Grad => "pooling::Backpropagate",
        };
        file.render(
            &Template::parse(SUITE_DECL)?,
            &Vars::new()
                .with("test_case", &test_case)
                .with("operation", self.library_operation()?)
                .with("direction", direction),
        )?;
        let test = Template::parse(TEST)?;
        for shape in self.shapes(grid) {
            for padding in PaddingMode::ALL {
                let (output, max_input_val) = self.expected(op, &shape, padding)?;
                let vars = Vars::new()
                    .with("test_case", &test_case)
                    .with("test_name", format!("{padding}{}", dims_name(&shape)))
                    .with("exp_out", format_tensor(output.iter())?)
                    .with("in_shape", format_shape(&shape))
                    .with("padding", padding)
                    .with("window", self.window)
                    .with("stride", self.stride)
                    .with("max_input_val", format_magnitude(max_input_val));
                file.render(&test, &vars)?;
            }
        }
        file.push("\n");
        Ok(())
    }
}

impl Fixture for PoolingCase {
    fn filename(&self) -> String {
        format!(
            "pooling/{}_window{}_stride{}_{}.cc",
            self.operation, self.window, self.stride, self.direction
        )
    }

    fn render(&self) -> RefResult<String> {
        let mut file = file_with_preamble("pooling", &[INCLUDES, DATA_TYPES]);
        self.render_into(&mut file, ShapeGrid::Full)?;
        Ok(file.finish())
    }
}

/// Every pooling test case in one file, on small shapes only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastDivCases(pub Vec<PoolingCase>);

impl Fixture for FastDivCases {
    fn filename(&self) -> String {
        "pooling/pooling_fastdiv.cc".to_string()
    }

    fn render(&self) -> RefResult<String> {
        let mut file = file_with_preamble("pooling", &[INCLUDES, DATA_TYPES]);
        for case in &self.0 {
            case.render_into(&mut file, ShapeGrid::FastDiv)
                .with_context(|| format!("Rendering fast division tests for {}", case.test_case()))?;
        }
        Ok(file.finish())
    }
}

pub fn cases() -> Vec<PoolingCase> {
    iproduct!(WINDOW_STRIDES, OPERATIONS, Direction::ALL)
        .map(|((window, stride), operation, direction)| PoolingCase {
            operation,
            window,
            stride,
            direction,
        })
        .collect()
}

pub fn suite() -> RefResult<FixtureSuite> {
    let mut suite = FixtureSuite::default();
    for case in cases() {
        suite.add(case)?;
    }
    suite.add(FastDivCases(cases()))?;
    Ok(suite)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(operation: &'static str, direction: Direction) -> PoolingCase {
        PoolingCase { operation, window: 3, stride: 2, direction }
    }

    #[test]
    fn names() {
        let c = case("maxwithnan", Direction::Grad);
        assert_eq!(c.test_case(), "MaxwithnanWindow3Stride2Grad");
        assert_eq!(c.filename(), "pooling/maxwithnan_window3_stride2_grad.cc");
        assert_eq!(suite().unwrap().len(), 9 * 3 * 2 + 1);
    }

    #[test]
    fn shape_grids() {
        let c = case("avg", Direction::Forward);
        assert_eq!(c.shapes(ShapeGrid::Full).len(), 2 * 3 * 3 * 3);
        assert_eq!(c.shapes(ShapeGrid::FastDiv), vec![[1, 7, 7, 5], [1, 7, 7, 6], [1, 7, 7, 8]]);
    }

    #[test]
    fn small_average() {
        let (out, max) = case("avg", Direction::Forward)
            .expected(PoolOp::Average, &[1, 5, 5, 1], PaddingMode::Valid)
            .unwrap();
        assert_eq!(max, REQUIRED_MAX);
        // windows centred on 7, 9, 17 and 19 of a 1..=25 image
        assert_eq!(out.iter().copied().collect::<Vec<_>>(), vec![7., 9., 17., 19.]);
    }

    #[test]
    fn max_gradient_conserves_errors() {
        let (grad, _) = case("max", Direction::Grad)
            .expected(PoolOp::Max, &[1, 6, 6, 2], PaddingMode::Same)
            .unwrap();
        // errors are 1..=18 over the 3x3x2 output, each routed once
        assert_eq!(grad.sum(), (1..=18).sum::<usize>() as f64);
    }

    #[test]
    fn unknown_operation() {
        assert!(case("median", Direction::Forward).render().is_err());
    }
}
