use std::fmt;
use std::str::FromStr;

use ndarray::Zip;

use crate::internal::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    pub const ALL: [BinaryOp; 4] = [BinaryOp::Add, BinaryOp::Sub, BinaryOp::Mul, BinaryOp::Div];

    fn apply(&self, a: f64, b: f64) -> f64 {
        match self {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
        }
    }

    /// Elementwise evaluation with numpy broadcasting.
    pub fn eval(&self, lhs: &ArrayD<f64>, rhs: &ArrayD<f64>) -> RefResult<ArrayD<f64>> {
        let shape = broadcast_shape(lhs.shape(), rhs.shape())?;
        let lhs = lhs
            .broadcast(shape.clone())
            .with_context(|| format!("Broadcasting lhs {:?} to {:?}", lhs.shape(), shape))?;
        let rhs = rhs
            .broadcast(shape.clone())
            .with_context(|| format!("Broadcasting rhs {:?} to {:?}", rhs.shape(), shape))?;
        Ok(Zip::from(&lhs).and(&rhs).map_collect(|&a, &b| self.apply(a, b)))
    }
}

/// Numpy broadcasting rules: shapes are aligned on their last axis, and each
/// pair of dimensions must be equal or contain a 1.
pub fn broadcast_shape(lhs: &[usize], rhs: &[usize]) -> RefResult<Vec<usize>> {
    let rank = lhs.len().max(rhs.len());
    let dim = |shape: &[usize], ix: usize| {
        (ix + shape.len()).checked_sub(rank).map(|i| shape[i]).unwrap_or(1)
    };
    (0..rank)
        .map(|ix| match (dim(lhs, ix), dim(rhs, ix)) {
            (a, b) if a == b => Ok(a),
            (1, b) => Ok(b),
            (a, 1) => Ok(a),
            _ => bail!("Shapes {:?} and {:?} can not be broadcast together", lhs, rhs),
        })
        .collect()
}

impl FromStr for BinaryOp {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> RefResult<BinaryOp> {
        match s {
            "Add" => Ok(BinaryOp::Add),
            "Sub" => Ok(BinaryOp::Sub),
            "Mul" => Ok(BinaryOp::Mul),
            "Div" => Ok(BinaryOp::Div),
            _ => bail!("Unrecognized binary op {:?}", s),
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self:?}")
    }
}
