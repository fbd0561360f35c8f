//! Full and single-axis reductions, cumulative sums and axis edits

use scirs2_core::ndarray_ext::{ArrayD, Axis as NdAxis};
use tenq_core::Tensor;

use super::functions::EngineError;
use crate::ops::{AxisOp, AxisSel, ReduceOp, Reduction};

fn axis_out_of_range(axis: usize, rank: usize) -> EngineError {
    EngineError::Shape(format!(
        "axis {} out of range for tensor with {} dimensions",
        axis, rank
    ))
}

fn fold_max<'a>(values: impl Iterator<Item = &'a f64>) -> f64 {
    values.fold(f64::NEG_INFINITY, |acc, &v| if v > acc { v } else { acc })
}

fn fold_min<'a>(values: impl Iterator<Item = &'a f64>) -> f64 {
    values.fold(f64::INFINITY, |acc, &v| if v < acc { v } else { acc })
}

fn population_variance(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n
}

/// Position of the first extremum; `better(candidate, best)` decides.
fn arg_extremum<'a>(values: impl Iterator<Item = &'a f64>, better: fn(f64, f64) -> bool) -> f64 {
    let mut best_idx = 0usize;
    let mut best = f64::NAN;
    for (i, &v) in values.enumerate() {
        if i == 0 || better(v, best) {
            best_idx = i;
            best = v;
        }
    }
    best_idx as f64
}

/// Reduce over every axis or a single one.
pub fn reduce(op: ReduceOp, reduction: Reduction, x: &Tensor) -> Result<Tensor, EngineError> {
    match reduction {
        Reduction::All => reduce_all(op, x),
        Reduction::Along(axis) => reduce_axis(op, axis, x),
    }
}

fn reduce_all(op: ReduceOp, x: &Tensor) -> Result<Tensor, EngineError> {
    let data = x.data();
    if data.is_empty() && op != ReduceOp::Sum {
        return Err(EngineError::Shape(format!(
            "cannot compute {} of an empty tensor",
            op.name()
        )));
    }
    let value = match op {
        ReduceOp::Sum => data.iter().sum(),
        ReduceOp::Mean => data.iter().sum::<f64>() / data.len() as f64,
        ReduceOp::Var => population_variance(data),
        ReduceOp::Std => population_variance(data).sqrt(),
        ReduceOp::Max => fold_max(data.iter()),
        ReduceOp::Min => fold_min(data.iter()),
    };
    Ok(Tensor::scalar(value))
}

fn reduce_axis(op: ReduceOp, axis: usize, x: &Tensor) -> Result<Tensor, EngineError> {
    let rank = x.rank();
    if axis >= rank {
        return Err(axis_out_of_range(axis, rank));
    }
    if x.shape()[axis] == 0 && op != ReduceOp::Sum {
        return Err(EngineError::Shape(format!(
            "cannot compute {} along empty axis {}",
            op.name(),
            axis
        )));
    }
    let arr = x.to_array()?;
    let nd_axis = NdAxis(axis);
    let result: ArrayD<f64> = match op {
        ReduceOp::Sum => arr.sum_axis(nd_axis),
        ReduceOp::Mean => arr
            .mean_axis(nd_axis)
            .ok_or_else(|| EngineError::Shape(format!("mean along empty axis {}", axis)))?,
        ReduceOp::Var => arr.map_axis(nd_axis, |lane| population_variance(&lane.to_vec())),
        ReduceOp::Std => arr.map_axis(nd_axis, |lane| population_variance(&lane.to_vec()).sqrt()),
        ReduceOp::Max => arr.map_axis(nd_axis, |lane| fold_max(lane.iter())),
        ReduceOp::Min => arr.map_axis(nd_axis, |lane| fold_min(lane.iter())),
    };
    Ok(Tensor::from_array(result))
}

fn extent_of(x: &Tensor, axis: usize) -> Result<usize, EngineError> {
    x.shape()
        .get(axis)
        .copied()
        .ok_or_else(|| axis_out_of_range(axis, x.rank()))
}

/// Run a single-axis operation.
pub fn along_axis(op: AxisOp, sel: AxisSel, x: &Tensor) -> Result<Tensor, EngineError> {
    let axis = sel.index();
    match op {
        AxisOp::Expand => {
            if axis > x.rank() {
                return Err(axis_out_of_range(axis, x.rank() + 1));
            }
            let mut shape = x.shape().to_vec();
            shape.insert(axis, 1);
            Ok(x.reshaped(&shape)?)
        }
        AxisOp::Compress => {
            let extent = extent_of(x, axis)?;
            if extent != 1 {
                return Err(EngineError::Shape(format!(
                    "cannot compress axis {} of size {}",
                    axis, extent
                )));
            }
            let mut shape = x.shape().to_vec();
            shape.remove(axis);
            Ok(x.reshaped(&shape)?)
        }
        AxisOp::Accumulate => {
            extent_of(x, axis)?;
            let mut arr = x.to_array()?;
            arr.accumulate_axis_inplace(NdAxis(axis), |&prev, curr| *curr += prev);
            Ok(Tensor::from_array(arr))
        }
        AxisOp::ArgMax | AxisOp::ArgMin | AxisOp::AxisMax | AxisOp::AxisMin => {
            if extent_of(x, axis)? == 0 {
                return Err(EngineError::Shape(format!(
                    "cannot compute {} along empty axis {}",
                    op.name(),
                    axis
                )));
            }
            let arr = x.to_array()?;
            let nd_axis = NdAxis(axis);
            let keep_dims = matches!(op, AxisOp::AxisMax | AxisOp::AxisMin);
            let result = match op {
                AxisOp::ArgMax => {
                    arr.map_axis(nd_axis, |lane| arg_extremum(lane.iter(), |a, b| a > b))
                }
                AxisOp::ArgMin => {
                    arr.map_axis(nd_axis, |lane| arg_extremum(lane.iter(), |a, b| a < b))
                }
                AxisOp::AxisMax => arr.map_axis(nd_axis, |lane| fold_max(lane.iter())),
                _ => arr.map_axis(nd_axis, |lane| fold_min(lane.iter())),
            };
            let reduced = Tensor::from_array(result);
            if keep_dims {
                let mut kept = x.shape().to_vec();
                kept[axis] = 1;
                Ok(reduced.into_reshaped(&kept)?)
            } else {
                Ok(reduced)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> Tensor {
        Tensor::from_vec(vec![1.0, 5.0, 3.0, 4.0, 2.0, 6.0], &[2, 3]).unwrap()
    }

    #[test]
    fn test_reduce_all() {
        let x = grid();
        assert_eq!(reduce(ReduceOp::Sum, Reduction::All, &x).unwrap().item(), Some(21.0));
        assert_eq!(reduce(ReduceOp::Max, Reduction::All, &x).unwrap().item(), Some(6.0));
        assert_eq!(reduce(ReduceOp::Mean, Reduction::All, &x).unwrap().item(), Some(3.5));
        let var = reduce(ReduceOp::Var, Reduction::All, &x).unwrap().item().unwrap();
        assert!((var - 17.5 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_reduce_along_axis() {
        let x = grid();
        let s = reduce(ReduceOp::Sum, Reduction::Along(0), &x).unwrap();
        assert_eq!(s.shape(), &[3]);
        assert_eq!(s.data(), &[5.0, 7.0, 9.0]);
        let m = reduce(ReduceOp::Min, Reduction::Along(1), &x).unwrap();
        assert_eq!(m.data(), &[1.0, 2.0]);
        assert!(reduce(ReduceOp::Sum, Reduction::Along(2), &x).is_err());
    }

    #[test]
    fn test_empty_reductions() {
        let empty = Tensor::zeros(&[0]);
        assert_eq!(reduce(ReduceOp::Sum, Reduction::All, &empty).unwrap().item(), Some(0.0));
        assert!(reduce(ReduceOp::Mean, Reduction::All, &empty).is_err());
    }

    #[test]
    fn test_accumulate() {
        let x = grid();
        let c = along_axis(AxisOp::Accumulate, AxisSel::At(1), &x).unwrap();
        assert_eq!(c.data(), &[1.0, 6.0, 9.0, 4.0, 6.0, 12.0]);
        let c0 = along_axis(AxisOp::Accumulate, AxisSel::First, &x).unwrap();
        assert_eq!(c0.data(), &[1.0, 5.0, 3.0, 5.0, 7.0, 9.0]);
    }

    #[test]
    fn test_arg_extrema_take_first_occurrence() {
        let x = Tensor::from_vec(vec![3.0, 1.0, 3.0, 2.0, 2.0, 0.0], &[2, 3]).unwrap();
        let am = along_axis(AxisOp::ArgMax, AxisSel::At(1), &x).unwrap();
        assert_eq!(am.shape(), &[2]);
        assert_eq!(am.data(), &[0.0, 0.0]);
        let an = along_axis(AxisOp::ArgMin, AxisSel::At(1), &x).unwrap();
        assert_eq!(an.data(), &[1.0, 2.0]);
    }

    #[test]
    fn test_axis_extrema_keep_dims() {
        let x = grid();
        let m = along_axis(AxisOp::AxisMax, AxisSel::At(1), &x).unwrap();
        assert_eq!(m.shape(), &[2, 1]);
        assert_eq!(m.data(), &[5.0, 6.0]);
    }

    #[test]
    fn test_compress_and_expand() {
        let x = Tensor::zeros(&[1, 4]);
        let c = along_axis(AxisOp::Compress, AxisSel::First, &x).unwrap();
        assert_eq!(c.shape(), &[4]);
        let e = along_axis(AxisOp::Expand, AxisSel::At(1), &c).unwrap();
        assert_eq!(e.shape(), &[4, 1]);
        assert!(along_axis(AxisOp::Compress, AxisSel::First, &c).is_err());
        assert!(along_axis(AxisOp::Expand, AxisSel::At(3), &c).is_err());
    }
}
