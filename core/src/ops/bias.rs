use crate::internal::*;

/// Adds a per-channel bias along the last axis.
pub fn bias_add(input: &ArrayD<f64>, bias: &ArrayD<f64>) -> RefResult<ArrayD<f64>> {
    ensure!(input.ndim() > 0, "Bias add needs a channel axis");
    let channels = input.shape()[input.ndim() - 1];
    ensure!(
        bias.shape() == [channels],
        "Bias of shape {:?} does not match {} channels",
        bias.shape(),
        channels
    );
    Ok(input + bias)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_channel() {
        let input = iota_tensor(&[1, 2, 1, 2], 0.0).unwrap();
        let bias = iota_tensor(&[2], 0.0).unwrap();
        let out = bias_add(&input, &bias).unwrap();
        assert_eq!(out.iter().copied().collect::<Vec<_>>(), vec![2., 4., 4., 6.]);
    }

    #[test]
    fn wrong_bias() {
        let input = iota_tensor(&[1, 2, 1, 2], 0.0).unwrap();
        assert!(bias_add(&input, &iota_tensor(&[3], 0.0).unwrap()).is_err());
        assert!(bias_add(&input, &iota_tensor(&[2, 1], 0.0).unwrap()).is_err());
    }
}
