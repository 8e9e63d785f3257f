use crate::internal::*;

/// Softmax over the last axis.
pub fn softmax(input: &ArrayD<f64>) -> RefResult<ArrayD<f64>> {
    ensure!(input.ndim() > 0, "Softmax needs at least one axis");
    let axis = Axis(input.ndim() - 1);
    let mut output = input.clone();
    for mut lane in output.lanes_mut(axis) {
        let max = lane.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
        lane.mapv_inplace(|v| (v - max).exp());
        let sum = lane.sum();
        lane.mapv_inplace(|v| v / sum);
    }
    Ok(output)
}

/// Input gradient of the softmax given its output gradient `errors`:
/// `(dy - sum(dy * y)) * y`, the sum running over the last axis.
pub fn softmax_gradient(input: &ArrayD<f64>, errors: &ArrayD<f64>) -> RefResult<ArrayD<f64>> {
    ensure!(
        input.shape() == errors.shape(),
        "Softmax gradient needs errors shaped like the input ({:?} vs {:?})",
        input.shape(),
        errors.shape()
    );
    let y = softmax(input)?;
    let axis = Axis(input.ndim() - 1);
    let dot = (errors * &y).sum_axis(axis).insert_axis(axis);
    Ok((errors - &dot) * &y)
}
