//! # refgen-core
//!
//! Reference operators and helpers used to compute the expected values
//! embedded in generated DNN test fixtures.
//!
//! Every value a fixture carries goes through the same pipeline: inputs are
//! built with [`data::iota_data`] (the library under test regenerates the
//! exact same inputs at test time), the reference operator in [`ops`]
//! computes the outputs in `f64`, and [`magnitude::MagnitudeSearch`] halves
//! the input magnitude until every output stays exactly representable in
//! `f32`. The outputs are finally serialized with [`format::format_tensor`].
//!
//! ```
//! use refgen_core::internal::*;
//! use refgen_core::ops::binary::BinaryOp;
//!
//! let (out, magnitude) = MagnitudeSearch::new()
//!     .run(|max| {
//!         let lhs = iota_tensor(&[2, 2], max)?;
//!         let rhs = iota_tensor(&[2], max)?;
//!         BinaryOp::Mul.eval(&lhs, &rhs)
//!     })
//!     .unwrap();
//! assert_eq!(magnitude, REQUIRED_MAX);
//! assert_eq!(format_tensor(out.iter()).unwrap(), "{1., 4., 3., 8.}");
//! ```

#[macro_use]
extern crate derive_new;

pub mod data;
pub mod format;
pub mod geometry;
pub mod magnitude;
pub mod ops;

pub use anyhow;
pub use ndarray;

pub type RefResult<T> = anyhow::Result<T>;

/// This prelude is meant for code extending refgen (like the fixture suites).
pub mod internal {
    pub use crate::RefResult;
    pub use crate::data::*;
    pub use crate::format::*;
    pub use crate::geometry::*;
    pub use crate::magnitude::*;
    pub use anyhow::{Context as _, anyhow, bail, ensure, format_err};
    pub use log::{debug, info, trace, warn};
    pub use ndarray::{Array1, Array2, Array3, Array4, ArrayD, ArrayViewD, Axis, IxDyn};
}

#[cfg(test)]
#[allow(dead_code)]
fn setup_test_logger() {
    let _ = env_logger::Builder::from_env("REFGEN_LOG").try_init();
}
