//! Softmax and loss functions

use scirs2_core::ndarray_ext::{Axis as NdAxis, Zip};
use tenq_core::Tensor;

use super::functions::EngineError;

fn require_same_shape(op: &str, a: &Tensor, b: &Tensor) -> Result<(), EngineError> {
    if a.shape() != b.shape() {
        return Err(EngineError::Shape(format!(
            "{} expects equal shapes, got {:?} and {:?}",
            op,
            a.shape(),
            b.shape()
        )));
    }
    if a.is_empty() {
        return Err(EngineError::Shape(format!("{} of empty tensors", op)));
    }
    Ok(())
}

/// Numerically stable softmax along `axis`.
pub fn softmax(x: &Tensor, axis: usize) -> Result<Tensor, EngineError> {
    let ndim = x.rank();
    if axis >= ndim {
        return Err(EngineError::Shape(format!(
            "axis {} out of range for tensor with {} dimensions",
            axis, ndim
        )));
    }
    let axis_obj = NdAxis(axis);
    let mut exp_vals = x.to_array()?;
    let max_vals = exp_vals.map_axis(axis_obj, |view| {
        view.iter()
            .cloned()
            .max_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .unwrap_or(0.0)
    });
    Zip::from(exp_vals.lanes_mut(axis_obj))
        .and(max_vals.view())
        .for_each(|mut lane, &max_val| {
            lane.mapv_inplace(|v| (v - max_val).exp());
        });
    let sum_exp = exp_vals.sum_axis(axis_obj);
    let mut result = exp_vals;
    Zip::from(result.lanes_mut(axis_obj))
        .and(sum_exp.view())
        .for_each(|mut lane, &sum_val| {
            lane.mapv_inplace(|v| v / sum_val);
        });
    Ok(Tensor::from_array(result))
}

/// Mean of squared differences.
pub fn mean_squared_error(pred: &Tensor, target: &Tensor) -> Result<Tensor, EngineError> {
    require_same_shape("mse", pred, target)?;
    let sum: f64 = pred
        .data()
        .iter()
        .zip(target.data())
        .map(|(p, t)| (p - t) * (p - t))
        .sum();
    Ok(Tensor::scalar(sum / pred.len() as f64))
}

/// `-Σ target·ln(max(pred, eps))` divided by the batch size.
///
/// The batch size is the leading extent for rank ≥ 2 inputs and 1
/// otherwise.
pub fn cross_entropy(pred: &Tensor, target: &Tensor, eps: f64) -> Result<Tensor, EngineError> {
    require_same_shape("cross_entropy", pred, target)?;
    if eps.is_nan() || eps <= 0.0 {
        return Err(EngineError::InvalidParameter(format!(
            "log epsilon must be positive, got {}",
            eps
        )));
    }
    let batch = if pred.rank() >= 2 { pred.shape()[0] } else { 1 };
    let total: f64 = pred
        .data()
        .iter()
        .zip(target.data())
        .map(|(&p, &t)| t * p.max(eps).ln())
        .sum();
    Ok(Tensor::scalar(-total / batch as f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_softmax_rows_sum_to_one() {
        let x = Tensor::from_vec(vec![1.0, 2.0, 3.0, 1000.0, 1000.0, 1000.0], &[2, 3]).unwrap();
        let s = softmax(&x, 1).unwrap();
        let d = s.data();
        assert!((d[0] + d[1] + d[2] - 1.0).abs() < 1e-12);
        assert!(d[2] > d[1] && d[1] > d[0]);
        for v in &d[3..] {
            assert!((v - 1.0 / 3.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_softmax_axis_out_of_range() {
        assert!(softmax(&Tensor::vector(&[1.0, 2.0]), 1).is_err());
        assert!(softmax(&Tensor::vector(&[1.0, 2.0]), 0).is_ok());
    }

    #[test]
    fn test_mse() {
        let p = Tensor::vector(&[1.0, 2.0, 3.0]);
        let t = Tensor::vector(&[1.0, 0.0, 6.0]);
        assert_eq!(mean_squared_error(&p, &t).unwrap().item(), Some(13.0 / 3.0));
        assert!(mean_squared_error(&p, &Tensor::vector(&[1.0])).is_err());
    }

    #[test]
    fn test_cross_entropy_batch_mean() {
        let p = Tensor::from_vec(vec![0.5, 0.5, 0.25, 0.75], &[2, 2]).unwrap();
        let t = Tensor::from_vec(vec![1.0, 0.0, 0.0, 1.0], &[2, 2]).unwrap();
        let loss = cross_entropy(&p, &t, 1e-12).unwrap().item().unwrap();
        let expected = -(0.5f64.ln() + 0.75f64.ln()) / 2.0;
        assert!((loss - expected).abs() < 1e-12);
    }

    #[test]
    fn test_cross_entropy_clamps_zero_probability() {
        let p = Tensor::vector(&[0.0, 1.0]);
        let t = Tensor::vector(&[1.0, 0.0]);
        let loss = cross_entropy(&p, &t, 1e-12).unwrap().item().unwrap();
        assert!(loss.is_finite());
        assert!((loss + 1e-12f64.ln()).abs() < 1e-9);
    }
}
