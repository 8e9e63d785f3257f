//! Deterministic input data.
//!
//! The library under test rebuilds its inputs with `iota_initialised_data`
//! and `iota_initialised_signed_data`, so these generators must produce the
//! very same sequences: only the outputs are shipped in the fixtures.

use crate::internal::*;

/// `1, 2, ..., max_val, 1, 2, ...` repeated up to `size` values.
///
/// A `max_val` under 1 means "no bound": the values are then `1..=size`.
pub fn iota_data(size: usize, max_val: f64) -> Vec<f64> {
    if max_val < 1.0 {
        return (1..=size).map(|v| v as f64).collect();
    }
    let period = (max_val - 1.0).floor() as usize + 1;
    (0..size).map(|i| (i % period + 1) as f64).collect()
}

/// `-n, ..., size - 1 - n` with `n = ceil(size / 2)`.
pub fn iota_signed_data(size: usize) -> Vec<f64> {
    let offset = size.div_ceil(2) as f64;
    (0..size).map(|i| i as f64 - offset).collect()
}

/// [`iota_data`] laid out in row-major order in a tensor of the given shape.
pub fn iota_tensor(shape: &[usize], max_val: f64) -> RefResult<ArrayD<f64>> {
    let size = shape.iter().product();
    Ok(ArrayD::from_shape_vec(shape.to_vec(), iota_data(size, max_val))?)
}

/// [`iota_signed_data`] laid out in row-major order.
pub fn iota_signed_tensor(shape: &[usize]) -> RefResult<ArrayD<f64>> {
    let size = shape.iter().product();
    Ok(ArrayD::from_shape_vec(shape.to_vec(), iota_signed_data(size))?)
}

/// A tensor filled with a single value.
pub fn constant_tensor(shape: &[usize], value: f64) -> ArrayD<f64> {
    ArrayD::from_elem(shape.to_vec(), value)
}
