use std::fmt;
use std::str::FromStr;

use ndarray::Ix3;

use crate::internal::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReduceOp {
    Add,
    Mean,
    Max,
    Min,
}

impl ReduceOp {
    pub const ALL: [ReduceOp; 4] = [ReduceOp::Add, ReduceOp::Mean, ReduceOp::Max, ReduceOp::Min];

    pub fn reduce(&self, input: &ArrayD<f64>, axis: usize) -> RefResult<ArrayD<f64>> {
        ensure!(axis < input.ndim(), "Can not reduce axis {} of {:?}", axis, input.shape());
        ensure!(input.shape()[axis] > 0, "Can not reduce an empty axis");
        let axis = Axis(axis);
        Ok(match self {
            ReduceOp::Add => input.sum_axis(axis),
            ReduceOp::Mean => input.sum_axis(axis) / input.len_of(axis) as f64,
            ReduceOp::Max => input.fold_axis(axis, f64::NEG_INFINITY, |m, &v| m.max(v)),
            ReduceOp::Min => input.fold_axis(axis, f64::INFINITY, |m, &v| m.min(v)),
        })
    }

    /// Reduces the middle axis of a `[batch, outer, inner]` tensor.
    pub fn reduce_outer(&self, input: &ArrayD<f64>) -> RefResult<ArrayD<f64>> {
        input
            .view()
            .into_dimensionality::<Ix3>()
            .with_context(|| format!("Expected [batch, outer, inner], got {:?}", input.shape()))?;
        self.reduce(input, 1)
    }
}

impl FromStr for ReduceOp {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> RefResult<ReduceOp> {
        match s {
            "Add" => Ok(ReduceOp::Add),
            "Mean" => Ok(ReduceOp::Mean),
            "Max" => Ok(ReduceOp::Max),
            "Min" => Ok(ReduceOp::Min),
            _ => bail!("Unrecognized reduction {:?}", s),
        }
    }
}

impl fmt::Display for ReduceOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(t: ArrayD<f64>) -> Vec<f64> {
        t.iter().copied().collect()
    }

    #[test]
    fn reductions() {
        // [[1, 2, 3], [4, 5, 6]] for each of 2 batches
        let x = iota_tensor(&[2, 2, 3], 6.0).unwrap();
        assert_eq!(flat(ReduceOp::Add.reduce_outer(&x).unwrap()), vec![5., 7., 9., 5., 7., 9.]);
        assert_eq!(
            flat(ReduceOp::Mean.reduce_outer(&x).unwrap()),
            vec![2.5, 3.5, 4.5, 2.5, 3.5, 4.5]
        );
        assert_eq!(flat(ReduceOp::Max.reduce_outer(&x).unwrap()), vec![4., 5., 6., 4., 5., 6.]);
        assert_eq!(flat(ReduceOp::Min.reduce_outer(&x).unwrap()), vec![1., 2., 3., 1., 2., 3.]);
    }

    #[test]
    fn shapes() {
        let x = iota_tensor(&[3, 4, 5], 0.0).unwrap();
        assert_eq!(ReduceOp::Add.reduce_outer(&x).unwrap().shape(), &[3, 5]);
        assert!(ReduceOp::Add.reduce_outer(&iota_tensor(&[3, 4], 0.0).unwrap()).is_err());
        assert!(ReduceOp::Add.reduce(&x, 3).is_err());
    }

    #[test]
    fn names() {
        for op in ReduceOp::ALL {
            assert_eq!(op.to_string().parse::<ReduceOp>().unwrap(), op);
        }
        assert!("Prod".parse::<ReduceOp>().is_err());
    }
}
