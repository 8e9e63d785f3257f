//! Pieces shared by the generators.
use std::fmt;
use std::str::FromStr;

use itertools::Itertools;
use refgen_core::internal::*;
use refgen_infra::SourceFile;

/// Forward pass or gradient, for the families testing both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Forward,
    Grad,
}

impl Direction {
    pub const ALL: [Direction; 2] = [Direction::Forward, Direction::Grad];
}

impl FromStr for Direction {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> RefResult<Direction> {
        match s {
            "forward" => Ok(Direction::Forward),
            "grad" => Ok(Direction::Grad),
            _ => bail!("Direction {:?} not recognised", s),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Direction::Forward => "forward",
            Direction::Grad => "grad",
        })
    }
}

/// Window and stride pairs of the convolution families.
pub const CONV_WINDOW_STRIDES: [(usize, usize); 10] =
    [(1, 1), (1, 2), (3, 1), (3, 2), (5, 1), (5, 2), (7, 1), (7, 4), (11, 1), (11, 4)];

/// Image sizes for a window: one divisible by 4, one by 2 only and one odd,
/// all large enough to get at least two outputs.
pub fn input_sizes(window: usize, stride: usize) -> [usize; 3] {
    let start = window + stride;
    if start % 2 == 1 { [start, start + 1, start + 3] } else { [start, start + 1, start + 2] }
}

/// `[1, 4, 4, 2]` -> `1x4x4x2`
pub fn dims_name(shape: &[usize]) -> String {
    shape.iter().join("x")
}

/// `[2, 3]` -> `{2,3}`, as the gather and transpose parameters are written.
pub fn packed_dims(dims: &[usize], separator: &str) -> String {
    format!("{{{}}}", dims.iter().join(separator))
}

/// Header of a generated file: license, warning, then each chunk of
/// boilerplate in order.
pub fn file_with_preamble(generator: &str, chunks: &[&str]) -> SourceFile {
    let mut file = SourceFile::generated_by(generator);
    for chunk in chunks {
        file.push(*chunk);
    }
    file
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_cover_parities() {
        assert_eq!(input_sizes(1, 1), [2, 3, 4]);
        assert_eq!(input_sizes(3, 2), [5, 6, 8]);
        assert_eq!(input_sizes(11, 4), [15, 16, 18]);
        for (w, s) in CONV_WINDOW_STRIDES {
            let sizes = input_sizes(w, s);
            assert!(sizes.iter().any(|s| s % 4 == 0));
            assert!(sizes.iter().any(|s| s % 2 == 1));
            assert!(sizes.iter().any(|s| s % 4 == 2));
        }
    }

    #[test]
    fn names() {
        assert_eq!(dims_name(&[3, 9, 9, 5]), "3x9x9x5");
        assert_eq!(packed_dims(&[5, 4], ","), "{5,4}");
        assert_eq!(packed_dims(&[2, 3, 4], ", "), "{2, 3, 4}");
    }

    #[test]
    fn directions() {
        assert_eq!("grad".parse::<Direction>().unwrap(), Direction::Grad);
        assert_eq!(to_camel_case(&Direction::Forward.to_string()), "Forward");
        assert!("backward".parse::<Direction>().is_err());
    }
}
