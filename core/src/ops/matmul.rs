use ndarray::{Array3, Ix3};

use crate::internal::*;

/// `beta * out + op(lhs) x op(rhs)` for each matrix of a batch, `op` being
/// an optional transposition.
#[derive(Debug, Clone, Copy, new, PartialEq)]
pub struct BatchMatMul {
    pub batch: usize,
    pub m: usize,
    pub k: usize,
    pub n: usize,
    pub beta: f64,
    pub trans_lhs: bool,
    pub trans_rhs: bool,
}

impl BatchMatMul {
    pub fn lhs_shape(&self) -> [usize; 3] {
        if self.trans_lhs { [self.batch, self.k, self.m] } else { [self.batch, self.m, self.k] }
    }

    pub fn rhs_shape(&self) -> [usize; 3] {
        if self.trans_rhs { [self.batch, self.n, self.k] } else { [self.batch, self.k, self.n] }
    }

    pub fn output_shape(&self) -> [usize; 3] {
        [self.batch, self.m, self.n]
    }

    pub fn eval(
        &self,
        lhs: &ArrayD<f64>,
        rhs: &ArrayD<f64>,
        out: &ArrayD<f64>,
    ) -> RefResult<ArrayD<f64>> {
        ensure!(lhs.shape() == self.lhs_shape(), "Wrong lhs shape {:?}", lhs.shape());
        ensure!(rhs.shape() == self.rhs_shape(), "Wrong rhs shape {:?}", rhs.shape());
        ensure!(out.shape() == self.output_shape(), "Wrong output shape {:?}", out.shape());
        let lhs = lhs.view().into_dimensionality::<Ix3>()?;
        let rhs = rhs.view().into_dimensionality::<Ix3>()?;
        let out = out.view().into_dimensionality::<Ix3>()?;
        let mut result = Array3::<f64>::zeros((self.batch, self.m, self.n));
        for b in 0..self.batch {
            let a = lhs.index_axis(Axis(0), b);
            let a = if self.trans_lhs { a.reversed_axes() } else { a };
            let c = rhs.index_axis(Axis(0), b);
            let c = if self.trans_rhs { c.reversed_axes() } else { c };
            let product = a.dot(&c) + &(&out.index_axis(Axis(0), b) * self.beta);
            result.index_axis_mut(Axis(0), b).assign(&product);
        }
        Ok(result.into_dyn())
    }

    /// Evaluates on the iota inputs the fixtures use, bounded by `max_val`.
    pub fn reference(&self, max_val: f64) -> RefResult<ArrayD<f64>> {
        let lhs = iota_tensor(&self.lhs_shape(), max_val)?;
        let rhs = iota_tensor(&self.rhs_shape(), max_val)?;
        let out = iota_tensor(&self.output_shape(), max_val)?;
        self.eval(&lhs, &rhs, &out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr3;

    #[test]
    fn plain() {
        let op = BatchMatMul::new(1, 2, 2, 2, 0.0, false, false);
        let r = op.reference(0.0).unwrap();
        assert_eq!(r, arr3(&[[[7.0, 10.0], [15.0, 22.0]]]).into_dyn());
    }

    #[test]
    fn beta_accumulates_output() {
        let op = BatchMatMul::new(1, 2, 2, 2, 1.0, false, false);
        let r = op.reference(0.0).unwrap();
        assert_eq!(r, arr3(&[[[8.0, 12.0], [18.0, 26.0]]]).into_dyn());
    }

    #[test]
    fn transposes() {
        let op = BatchMatMul::new(1, 2, 2, 2, 0.0, true, false);
        // lhs^T = [[1, 3], [2, 4]]
        let r = op.reference(0.0).unwrap();
        assert_eq!(r, arr3(&[[[10.0, 14.0], [14.0, 20.0]]]).into_dyn());
        let op = BatchMatMul::new(1, 2, 2, 2, 0.0, false, true);
        // rhs^T = [[1, 3], [2, 4]]
        let r = op.reference(0.0).unwrap();
        assert_eq!(r, arr3(&[[[5.0, 11.0], [11.0, 25.0]]]).into_dyn());
    }

    #[test]
    fn batches_are_independent() {
        let op = BatchMatMul::new(2, 1, 1, 1, 0.0, false, false);
        let r = op.reference(0.0).unwrap();
        assert_eq!(r, arr3(&[[[1.0]], [[4.0]]]).into_dyn());
    }

    #[test]
    fn shapes_are_checked() {
        let op = BatchMatMul::new(1, 2, 3, 4, 0.0, false, false);
        let wrong = iota_tensor(&[1, 3, 2], 0.0).unwrap();
        let rhs = iota_tensor(&[1, 3, 4], 0.0).unwrap();
        let out = iota_tensor(&[1, 2, 4], 0.0).unwrap();
        assert!(op.eval(&wrong, &rhs, &out).is_err());
    }
}
