use ndarray::{Array1, Array2, ArrayView2};

use crate::internal::*;

/// Batch normalization over the channel (last) axis.
#[derive(Debug, Clone, Copy, new, PartialEq)]
pub struct BatchNorm {
    pub epsilon: f64,
    pub momentum: f64,
    pub is_training: bool,
}

/// Normalized output and updated running statistics. Running statistics
/// are only produced while training; they are empty otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchNormForward {
    pub output: ArrayD<f64>,
    pub running_mean: Array1<f64>,
    pub running_var: Array1<f64>,
}

impl MaxAbs for BatchNormForward {
    fn max_abs(&self) -> f64 {
        (&self.output, &self.running_mean, &self.running_var).max_abs()
    }
}

/// Gradients with respect to the input, the scale (gamma) and the offset
/// (beta).
#[derive(Debug, Clone, PartialEq)]
pub struct BatchNormGradient {
    pub input: ArrayD<f64>,
    pub scale: Array1<f64>,
    pub offset: Array1<f64>,
}

impl MaxAbs for BatchNormGradient {
    fn max_abs(&self) -> f64 {
        (&self.input, &self.scale, &self.offset).max_abs()
    }
}

fn channels_last(input: &ArrayD<f64>) -> RefResult<ArrayView2<'_, f64>> {
    ensure!(input.ndim() > 0, "Batch norm needs a channel axis");
    let channels = input.shape()[input.ndim() - 1];
    let rows = input.len() / channels.max(1);
    let view = input.as_slice().context("Batch norm input must be in standard layout")?;
    Ok(ArrayView2::from_shape((rows, channels), view)?)
}

fn check_channels(what: &str, t: &Array1<f64>, channels: usize) -> RefResult<()> {
    ensure!(t.len() == channels, "{} has {} values for {} channels", what, t.len(), channels);
    Ok(())
}

impl BatchNorm {
    /// Normalizes `input` with the provided `mean` and `variance`, as
    /// `tf.nn.batch_normalization` does, and folds the batch statistics into
    /// the running ones when training.
    pub fn forward(
        &self,
        input: &ArrayD<f64>,
        offset: &Array1<f64>,
        scale: &Array1<f64>,
        mean: &Array1<f64>,
        variance: &Array1<f64>,
    ) -> RefResult<BatchNormForward> {
        let x = channels_last(input)?;
        let channels = x.ncols();
        let params = [("offset", offset), ("scale", scale), ("mean", mean), ("variance", variance)];
        for (what, t) in params {
            check_channels(what, t, channels)?;
        }
        let inv = variance.mapv(|v| 1.0 / (v + self.epsilon).sqrt()) * scale;
        let shift = offset - &(mean * &inv);
        let output = (&x * &inv + &shift).to_shape(input.shape())?.into_owned();
        let (running_mean, running_var) = if self.is_training {
            let batch_mean = x.mean_axis(Axis(0)).context("Empty batch")?;
            let batch_var = x.var_axis(Axis(0), 0.0);
            (
                mean * self.momentum + batch_mean * (1.0 - self.momentum),
                variance * self.momentum + batch_var * (1.0 - self.momentum),
            )
        } else {
            (Array1::zeros(0), Array1::zeros(0))
        };
        Ok(BatchNormForward { output, running_mean, running_var })
    }

    /// Gradients of the batch norm given the output gradient `errors`.
    ///
    /// Training uses the batch statistics of `input`; frozen mode uses the
    /// population statistics instead.
    pub fn gradient(
        &self,
        errors: &ArrayD<f64>,
        input: &ArrayD<f64>,
        scale: &Array1<f64>,
        pop_mean: &Array1<f64>,
        pop_var: &Array1<f64>,
    ) -> RefResult<BatchNormGradient> {
        ensure!(
            errors.shape() == input.shape(),
            "Errors {:?} and input {:?} shapes differ",
            errors.shape(),
            input.shape()
        );
        let x = channels_last(input)?;
        let dy = channels_last(errors)?;
        check_channels("scale", scale, x.ncols())?;
        let offset_grad = dy.sum_axis(Axis(0));
        let (input_grad, scale_grad): (Array2<f64>, Array1<f64>) = if self.is_training {
            let mean_dy = dy.mean_axis(Axis(0)).context("Empty batch")?;
            let mean_x = x.mean_axis(Axis(0)).context("Empty batch")?;
            let var_x = x.var_axis(Axis(0), 0.0);
            let rsqrt = var_x.mapv(|v| 1.0 / (v + self.epsilon).sqrt());
            let x_offset = &x - &mean_x;
            let dy_offset = &dy - &mean_dy;
            let dy_x = &dy * &x_offset;
            let mean = dy_x.mean_axis(Axis(0)).context("Empty batch")?;
            let correction = var_x.mapv(|v| 1.0 / (v + self.epsilon)) * &mean;
            let input_grad = (dy_offset - &(&x_offset * &correction)) * &(scale * &rsqrt);
            (input_grad, rsqrt * &dy_x.sum_axis(Axis(0)))
        } else {
            check_channels("population mean", pop_mean, x.ncols())?;
            check_channels("population variance", pop_var, x.ncols())?;
            let rsqrt = pop_var.mapv(|v| 1.0 / (v + self.epsilon).sqrt());
            let scale_grad = (&dy * &(&x - pop_mean) * &rsqrt).sum_axis(Axis(0));
            (&dy * &(scale * &rsqrt), scale_grad)
        };
        Ok(BatchNormGradient {
            input: input_grad.to_shape(input.shape())?.into_owned(),
            scale: scale_grad,
            offset: offset_grad,
        })
    }
}
