//! Rendering of values as C++ literals.
use std::fmt::Display;

use itertools::Itertools;

use crate::internal::*;

/// A float as a C++ literal: at most 8 fractional digits, no exponent, and a
/// trailing dot for integral values (`1.`, `0.5`, `-3.25`).
pub fn format_float(value: f64) -> RefResult<String> {
    ensure!(value.is_finite(), "Can not render non-finite value {} as a literal", value);
    let mut s = format!("{value:.8}");
    while s.ends_with('0') {
        s.pop();
    }
    if s == "-0." {
        s.remove(0);
    }
    Ok(s)
}

/// Flattened values as a braced initializer list: `{1., 2.5, 3.}`.
pub fn format_tensor<'a>(values: impl IntoIterator<Item = &'a f64>) -> RefResult<String> {
    let items = values.into_iter().map(|v| format_float(*v)).collect::<RefResult<Vec<_>>>()?;
    Ok(format!("{{{}}}", items.join(", ")))
}

/// Integers as a braced initializer list: `{0, 3, 1}`.
pub fn format_indices<T: Display>(values: impl IntoIterator<Item = T>) -> String {
    format!("{{{}}}", values.into_iter().join(", "))
}

/// Shapes rendered with inner spaces, as the suite templates show them:
/// `{ 1, 4, 4, 2 }`.
pub fn format_shape(shape: &[usize]) -> String {
    format!("{{ {} }}", shape.iter().join(", "))
}

pub fn format_magnitude(magnitude: f64) -> String {
    format!("{magnitude:.1}")
}

/// `input_backprop` -> `InputBackprop`
pub fn to_camel_case(s: &str) -> String {
    s.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect()
}

/// `true` -> `"true"`, `"Add"` -> `"add"`.
pub fn to_lower_case_str(value: impl Display) -> String {
    value.to_string().to_lowercase()
}
