use std::fmt;
use std::str::FromStr;

use ndarray::Array2;

use crate::internal::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScatterNdOp {
    Assign,
    Add,
}

impl ScatterNdOp {
    /// Scatters `updates` into a copy of `input`.
    ///
    /// Each row of `indices` addresses a slice of `input` through its first
    /// `indices.ncols()` coordinates; `updates` holds one such slice per row.
    pub fn eval(
        &self,
        input: &ArrayD<f64>,
        indices: &Array2<usize>,
        updates: &ArrayD<f64>,
    ) -> RefResult<ArrayD<f64>> {
        let depth = indices.ncols();
        ensure!(
            depth > 0 && depth <= input.ndim(),
            "Index depth {} invalid for a rank {} input",
            depth,
            input.ndim()
        );
        let mut slice_shape = vec![indices.nrows()];
        slice_shape.extend_from_slice(&input.shape()[depth..]);
        ensure!(
            updates.shape() == &*slice_shape,
            "Updates shape {:?} does not match {:?}",
            updates.shape(),
            slice_shape
        );
        let mut output = input.clone();
        for (row, update) in indices.outer_iter().zip(updates.outer_iter()) {
            let mut slot = output.view_mut();
            for (axis, &ix) in row.iter().enumerate() {
                ensure!(
                    ix < input.shape()[axis],
                    "Index {} out of bounds for axis {} of {:?}",
                    ix,
                    axis,
                    input.shape()
                );
                slot = slot.index_axis_move(Axis(0), ix);
            }
            match self {
                ScatterNdOp::Assign => slot.assign(&update),
                ScatterNdOp::Add => slot += &update,
            }
        }
        Ok(output)
    }
}

impl FromStr for ScatterNdOp {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> RefResult<ScatterNdOp> {
        match s {
            "scatter_nd_assign" => Ok(ScatterNdOp::Assign),
            "scatter_nd_add" => Ok(ScatterNdOp::Add),
            _ => bail!("Unrecognized scatter op {:?}", s),
        }
    }
}

impl fmt::Display for ScatterNdOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            ScatterNdOp::Assign => "scatter_nd_assign",
            ScatterNdOp::Add => "scatter_nd_add",
        })
    }
}
