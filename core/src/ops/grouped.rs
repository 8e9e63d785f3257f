use std::fmt;
use std::str::FromStr;

use ndarray::{Array4, Axis, s};

use super::as_nhwc;
use super::conv::Conv2d;
use crate::internal::*;

/// How the outputs of the groups are laid out along the channel axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupFormat {
    /// All the features of group 0, then all of group 1, ...
    Strided,
    /// Feature 0 of every group, then feature 1 of every group, ...
    Interleaved,
}

impl FromStr for GroupFormat {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> RefResult<GroupFormat> {
        match s {
            "STRIDED" => Ok(GroupFormat::Strided),
            "INTERLEAVED" => Ok(GroupFormat::Interleaved),
            _ => bail!("Unrecognized group format {:?}", s),
        }
    }
}

impl fmt::Display for GroupFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            GroupFormat::Strided => "STRIDED",
            GroupFormat::Interleaved => "INTERLEAVED",
        })
    }
}

/// Grouped convolution: channels and features are split in `groups` equal
/// parts, part `g` of the input only feeding part `g` of the output.
///
/// The filter is HWCF with `C = input channels / groups`.
#[derive(Debug, Clone, Copy, new, PartialEq, Eq)]
pub struct GroupedConv2d {
    pub conv: Conv2d,
    pub groups: usize,
    pub format: GroupFormat,
}

impl GroupedConv2d {
    pub fn forward(&self, input: &ArrayD<f64>, filter: &ArrayD<f64>) -> RefResult<ArrayD<f64>> {
        let (n, _, _, c) = nhwc(input.shape())?;
        ensure!(filter.ndim() == 4, "Expected a HWCF filter, got {:?}", filter.shape());
        let features = filter.shape()[3];
        ensure!(
            self.groups > 0 && c % self.groups == 0 && features % self.groups == 0,
            "{} groups do not divide {} channels and {} features",
            self.groups,
            c,
            features
        );
        let c_per_g = c / self.groups;
        let f_per_g = features / self.groups;
        ensure!(
            filter.shape()[2] == c_per_g,
            "Filter {:?} does not match {} channels per group",
            filter.shape(),
            c_per_g
        );
        let input = as_nhwc(input, "grouped convolution input")?;
        let filter = as_nhwc(filter, "grouped convolution filter")?;
        let mut output: Option<Array4<f64>> = None;
        for g in 0..self.groups {
            let input_g = input.slice(s![.., .., .., g * c_per_g..(g + 1) * c_per_g]).to_owned();
            let filter_g = filter.slice(s![.., .., .., g * f_per_g..(g + 1) * f_per_g]).to_owned();
            let result = self
                .conv
                .forward(&input_g.into_dyn(), &filter_g.into_dyn())?
                .into_dimensionality::<ndarray::Ix4>()?;
            let (_, oh, ow, _) = result.dim();
            let out = output.get_or_insert_with(|| Array4::zeros((n, oh, ow, features)));
            for f in 0..f_per_g {
                let channel = match self.format {
                    GroupFormat::Strided => g * f_per_g + f,
                    GroupFormat::Interleaved => f * self.groups + g,
                };
                out.index_axis_mut(Axis(3), channel).assign(&result.index_axis(Axis(3), f));
            }
        }
        output.map(|o| o.into_dyn()).ok_or_else(|| format_err!("No group to convolve"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(groups: usize, format: GroupFormat) -> GroupedConv2d {
        GroupedConv2d::new(Conv2d::new((1, 1), PaddingMode::Valid), groups, format)
    }

    #[test]
    fn one_group_is_a_convolution() {
        let input = iota_tensor(&[1, 4, 4, 3], 0.0).unwrap();
        let filter = iota_tensor(&[3, 3, 3, 2], 0.0).unwrap();
        let conv = Conv2d::new((1, 1), PaddingMode::Valid);
        assert_eq!(
            op(1, GroupFormat::Strided).forward(&input, &filter).unwrap(),
            conv.forward(&input, &filter).unwrap()
        );
    }

    #[test]
    fn orderings() {
        // 1x1 image, 2 channels, 2 groups of 2 features
        let input = ArrayD::from_shape_vec(vec![1, 1, 1, 2], vec![1.0, 10.0]).unwrap();
        let filter = ArrayD::from_shape_vec(vec![1, 1, 1, 4], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let strided = op(2, GroupFormat::Strided).forward(&input, &filter).unwrap();
        assert_eq!(strided.iter().copied().collect::<Vec<_>>(), vec![1.0, 2.0, 30.0, 40.0]);
        let interleaved = op(2, GroupFormat::Interleaved).forward(&input, &filter).unwrap();
        assert_eq!(interleaved.iter().copied().collect::<Vec<_>>(), vec![1.0, 30.0, 2.0, 40.0]);
    }

    #[test]
    fn groups_must_divide() {
        let input = iota_tensor(&[1, 2, 2, 3], 0.0).unwrap();
        let filter = iota_tensor(&[1, 1, 1, 2], 0.0).unwrap();
        assert!(op(2, GroupFormat::Strided).forward(&input, &filter).is_err());
    }

    #[test]
    fn formats() {
        assert_eq!("INTERLEAVED".parse::<GroupFormat>().unwrap(), GroupFormat::Interleaved);
        assert!("NCHW".parse::<GroupFormat>().is_err());
    }
}
