use itertools::Itertools;

use crate::internal::*;

/// Output axis `i` is input axis `permutation[i]`.
pub fn transpose(input: &ArrayD<f64>, permutation: &[usize]) -> RefResult<ArrayD<f64>> {
    ensure!(
        permutation.len() == input.ndim()
            && permutation.iter().sorted().copied().eq(0..input.ndim()),
        "{:?} is not a permutation of the {} axes of the input",
        permutation,
        input.ndim()
    );
    Ok(input.view().permuted_axes(permutation.to_vec()).as_standard_layout().into_owned())
}
