use super::resolve_axis;
use crate::internal::*;

/// Gathers slices along `axis` (negative values count from the end).
///
/// The output shape is the input shape with the gathered axis replaced by
/// `indices_shape`, whose volume must be the number of indices.
pub fn gather(
    input: &ArrayD<f64>,
    axis: isize,
    indices: &[usize],
    indices_shape: &[usize],
) -> RefResult<ArrayD<f64>> {
    let axis = resolve_axis(axis, input.ndim())?;
    let dim = input.shape()[axis];
    if let Some(bad) = indices.iter().find(|&&i| i >= dim) {
        bail!("Index {} out of bounds for axis {} of size {}", bad, axis, dim);
    }
    ensure!(
        indices_shape.iter().product::<usize>() == indices.len(),
        "Indices shape {:?} does not hold {} indices",
        indices_shape,
        indices.len()
    );
    let mut shape = input.shape()[..axis].to_vec();
    shape.extend_from_slice(indices_shape);
    shape.extend_from_slice(&input.shape()[axis + 1..]);
    let gathered = input.select(Axis(axis), indices);
    Ok(gathered.as_standard_layout().into_owned().into_shape_with_order(shape)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows() {
        let input = iota_tensor(&[3, 2], 0.0).unwrap();
        let out = gather(&input, 0, &[2, 0, 2], &[3]).unwrap();
        assert_eq!(out.iter().copied().collect::<Vec<_>>(), vec![5., 6., 1., 2., 5., 6.]);
    }

    #[test]
    fn negative_axis_and_matrix_indices() {
        let input = iota_tensor(&[2, 2], 0.0).unwrap();
        let out = gather(&input, -1, &[1, 1, 0, 1], &[2, 2]).unwrap();
        assert_eq!(out.shape(), &[2, 2, 2]);
        assert_eq!(out.iter().copied().collect::<Vec<_>>(), vec![2., 2., 1., 2., 4., 4., 3., 4.]);
    }

    #[test]
    fn errors() {
        let input = iota_tensor(&[2, 2], 0.0).unwrap();
        assert!(gather(&input, 0, &[2], &[1]).is_err());
        assert!(gather(&input, 2, &[0], &[1]).is_err());
        assert!(gather(&input, 0, &[0, 1], &[3]).is_err());
    }
}
