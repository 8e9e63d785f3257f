//! The fixture generators, one module per operator family.
//!
//! Each module exposes a `suite()` building the fixtures of its family;
//! [`suites`] registers them all by name.
use refgen_core::internal::*;
use refgen_infra::FixtureSuite;

pub mod batchnorm;
pub mod bias;
pub mod binaryop;
pub mod common;
pub mod conv2d;
pub mod depthwise_conv2d;
pub mod gather;
pub mod grouped_conv2d;
pub mod matmul;
pub mod pointwise;
pub mod pooling;
pub mod reduce;
pub mod scatter_nd;
pub mod softmax;
pub mod transpose;

pub type SuiteBuilder = fn() -> RefResult<FixtureSuite>;

/// Every generator, by name, in generation order.
pub const SUITES: [(&str, SuiteBuilder); 14] = [
    ("matmul", matmul::suite),
    ("pooling", pooling::suite),
    ("conv2d", conv2d::suite),
    ("grouped_conv2d", grouped_conv2d::suite),
    ("depthwise_conv2d", depthwise_conv2d::suite),
    ("pointwise", pointwise::suite),
    ("softmax", softmax::suite),
    ("reduce", reduce::suite),
    ("binaryop", binaryop::suite),
    ("bias", bias::suite),
    ("transpose", transpose::suite),
    ("gather", gather::suite),
    ("scatter_nd", scatter_nd::suite),
    ("batchnorm", batchnorm::suite),
];

pub fn suites() -> RefResult<Vec<(&'static str, FixtureSuite)>> {
    select(&[])
}

/// The named suites, or all of them when `only` is empty. Unknown names
/// are an error.
pub fn select(only: &[String]) -> RefResult<Vec<(&'static str, FixtureSuite)>> {
    for name in only {
        ensure!(
            SUITES.iter().any(|(known, _)| *known == name.as_str()),
            "Unknown suite {:?} (known: {})",
            name,
            SUITES.iter().map(|(known, _)| *known).collect::<Vec<_>>().join(", ")
        );
    }
    SUITES
        .iter()
        .filter(|(name, _)| only.is_empty() || only.iter().any(|o| o.as_str() == *name))
        .map(|(name, build)| {
            debug!("Building suite {name}");
            Ok((*name, build().with_context(|| format!("Building suite {name}"))?))
        })
        .collect()
}
