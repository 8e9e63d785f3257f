//! Adaptive input magnitude.
//!
//! Fixtures are checked in `f32` (and sometimes `f16`) on the other side, so
//! every expected value must be an integer-exact `f32`. The search computes
//! an operator with inputs bounded by a candidate magnitude and halves that
//! magnitude until the largest output falls under [`REQUIRED_MAX`].

use ndarray::{ArrayBase, Data, Dimension};

use crate::internal::*;

/// Largest range of integers exactly representable in `f32`.
pub const REQUIRED_MAX: f64 = 16_777_216.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Halving {
    /// `m / 2`
    #[default]
    Float,
    /// `floor(m / 2)`
    Floor,
}

impl Halving {
    pub fn next(&self, magnitude: f64) -> f64 {
        match self {
            Halving::Float => magnitude / 2.0,
            Halving::Floor => (magnitude / 2.0).floor(),
        }
    }
}

/// Largest absolute value of a computation result. NaN are ignored,
/// infinities are kept.
pub trait MaxAbs {
    fn max_abs(&self) -> f64;
}

impl<S: Data<Elem = f64>, D: Dimension> MaxAbs for ArrayBase<S, D> {
    fn max_abs(&self) -> f64 {
        self.iter().fold(0.0, |acc, v| acc.max(v.abs()))
    }
}

impl<T: MaxAbs + ?Sized> MaxAbs for &T {
    fn max_abs(&self) -> f64 {
        (**self).max_abs()
    }
}

impl<T: MaxAbs> MaxAbs for [T] {
    fn max_abs(&self) -> f64 {
        self.iter().fold(0.0, |acc, t| acc.max(t.max_abs()))
    }
}

impl<T: MaxAbs> MaxAbs for Vec<T> {
    fn max_abs(&self) -> f64 {
        self.as_slice().max_abs()
    }
}

impl<A: MaxAbs, B: MaxAbs> MaxAbs for (A, B) {
    fn max_abs(&self) -> f64 {
        self.0.max_abs().max(self.1.max_abs())
    }
}

impl<A: MaxAbs, B: MaxAbs, C: MaxAbs> MaxAbs for (A, B, C) {
    fn max_abs(&self) -> f64 {
        self.0.max_abs().max(self.1.max_abs()).max(self.2.max_abs())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MagnitudeSearch {
    pub start: f64,
    pub halving: Halving,
    pub ceiling: f64,
}

impl Default for MagnitudeSearch {
    fn default() -> MagnitudeSearch {
        MagnitudeSearch { start: REQUIRED_MAX, halving: Halving::Float, ceiling: REQUIRED_MAX }
    }
}

impl MagnitudeSearch {
    pub fn new() -> MagnitudeSearch {
        MagnitudeSearch::default()
    }

    pub fn starting_at(self, start: f64) -> MagnitudeSearch {
        MagnitudeSearch { start, ..self }
    }

    pub fn floor_div(self) -> MagnitudeSearch {
        MagnitudeSearch { halving: Halving::Floor, ..self }
    }

    pub fn with_ceiling(self, ceiling: f64) -> MagnitudeSearch {
        MagnitudeSearch { ceiling, ..self }
    }

    /// Runs `compute` with decreasing magnitudes and returns the first result
    /// within bounds, along with the magnitude that produced it.
    ///
    /// Magnitudes under 1 are not representable by the fixtures: reaching
    /// one is an error.
    pub fn run<T, F>(&self, mut compute: F) -> RefResult<(T, f64)>
    where
        T: MaxAbs,
        F: FnMut(f64) -> RefResult<T>,
    {
        ensure!(self.start >= 1.0, "Magnitude search must start at 1 or more (got {})", self.start);
        let mut magnitude = self.start;
        loop {
            let result = compute(magnitude)
                .with_context(|| format!("Computing reference for magnitude {magnitude}"))?;
            let max = result.max_abs();
            if max <= self.ceiling {
                debug!("Settled on magnitude {magnitude} (output max {max})");
                return Ok((result, magnitude));
            }
            let next = self.halving.next(magnitude);
            trace!("Output max {max} exceeds {} for magnitude {magnitude}, trying {next}", self.ceiling);
            if next < 1.0 {
                bail!(
                    "Magnitude search exhausted: output max {} still exceeds {} with input magnitude {}",
                    max,
                    self.ceiling,
                    magnitude
                );
            }
            magnitude = next;
        }
    }
}

/// Default search: start at [`REQUIRED_MAX`], halve as floats.
pub fn result_and_magnitude<T: MaxAbs>(
    compute: impl FnMut(f64) -> RefResult<T>,
) -> RefResult<(T, f64)> {
    MagnitudeSearch::new().run(compute)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr1;
    use proptest::prelude::*;

    #[test]
    fn accepts_first_magnitude() {
        let (r, m) = result_and_magnitude(|m| Ok(arr1(&[m]))).unwrap();
        assert_eq!(m, REQUIRED_MAX);
        assert_eq!(r[0], REQUIRED_MAX);
    }

    #[test]
    fn halves_until_bounded() {
        let mut seen = vec![];
        let (_, m) = MagnitudeSearch::new()
            .run(|m| {
                seen.push(m);
                Ok(arr1(&[m * 3.0]))
            })
            .unwrap();
        assert_eq!(m, REQUIRED_MAX / 4.0);
        assert_eq!(seen, vec![REQUIRED_MAX, REQUIRED_MAX / 2.0, REQUIRED_MAX / 4.0]);
    }

    #[test]
    fn floor_division() {
        let mut seen = vec![];
        let (_, m) = MagnitudeSearch::new()
            .starting_at(9.0)
            .floor_div()
            .with_ceiling(2.0)
            .run(|m| {
                seen.push(m);
                Ok(arr1(&[m]))
            })
            .unwrap();
        assert_eq!(seen, vec![9.0, 4.0, 2.0]);
        assert_eq!(m, 2.0);
    }

    #[test]
    fn exhausted_search_fails() {
        crate::setup_test_logger();
        let err = MagnitudeSearch::new().starting_at(8.0).run(|_| Ok(arr1(&[f64::INFINITY])));
        assert!(err.is_err());
    }

    #[test]
    fn bad_start_fails() {
        assert!(MagnitudeSearch::new().starting_at(0.5).run(|m| Ok(arr1(&[m]))).is_err());
    }

    #[test]
    fn compute_errors_propagate() {
        let r: RefResult<(ArrayD<f64>, f64)> = result_and_magnitude(|_| bail!("boom"));
        assert!(r.is_err());
    }

    #[test]
    fn nan_is_ignored() {
        let (_, m) = result_and_magnitude(|m| Ok(arr1(&[f64::NAN, m]))).unwrap();
        assert_eq!(m, REQUIRED_MAX);
    }

    #[test]
    fn composite_results() {
        let a = arr1(&[1.0, -5.0]).into_dyn();
        let b = arr1(&[3.0]).into_dyn();
        assert_eq!((a.clone(), b.clone()).max_abs(), 5.0);
        assert_eq!((b.clone(), b.clone(), a.clone()).max_abs(), 5.0);
        assert_eq!(vec![b.clone(), a].max_abs(), 5.0);
        assert_eq!(Vec::<ArrayD<f64>>::new().max_abs(), 0.0);
    }

    proptest! {
        #[test]
        fn magnitudes_strictly_decrease(
            start in 1.0f64..1e8,
            factor in 0.0f64..64.0,
            floor in any::<bool>(),
        ) {
            let search = MagnitudeSearch::new().starting_at(start);
            let search = if floor { search.floor_div() } else { search };
            let mut seen = vec![];
            let result = search.run(|m| {
                seen.push(m);
                Ok(arr1(&[m * factor]))
            });
            prop_assert!(seen.windows(2).all(|w| w[1] < w[0]));
            prop_assert!(seen.iter().all(|&m| m >= 1.0));
            match result {
                Ok((out, m)) => {
                    prop_assert_eq!(Some(&m), seen.last());
                    prop_assert!(out[0] <= REQUIRED_MAX);
                    for earlier in &seen[..seen.len() - 1] {
                        prop_assert!(earlier * factor > REQUIRED_MAX);
                    }
                }
                Err(_) => {
                    prop_assert!(seen.iter().all(|m| m * factor > REQUIRED_MAX));
                }
            }
        }
    }
}
