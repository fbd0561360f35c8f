//! NumPy-style broadcasting with per-operand permission flags

use scirs2_core::ndarray_ext::{ArrayD, IxDyn, Zip};
use tenq_core::Tensor;

use super::functions::{EngineError, Operand};

/// Compute broadcast shape for two shapes
pub fn broadcast_shapes(x_shape: &[usize], y_shape: &[usize]) -> Result<Vec<usize>, EngineError> {
    let max_ndim = x_shape.len().max(y_shape.len());
    let mut result_shape = Vec::with_capacity(max_ndim);
    for i in 0..max_ndim {
        let x_dim = if i < x_shape.len() {
            x_shape[x_shape.len() - 1 - i]
        } else {
            1
        };
        let y_dim = if i < y_shape.len() {
            y_shape[y_shape.len() - 1 - i]
        } else {
            1
        };
        if x_dim == y_dim || x_dim == 1 || y_dim == 1 {
            result_shape.push(x_dim.max(y_dim));
        } else {
            return Err(EngineError::Shape(format!(
                "shapes {:?} and {:?} are not broadcast-compatible at dimension {}",
                x_shape, y_shape, i
            )));
        }
    }
    result_shape.reverse();
    Ok(result_shape)
}

/// Map output index to input index with broadcasting
pub fn broadcast_index(out_idx: &[usize], in_shape: &[usize], out_shape: &[usize]) -> Vec<usize> {
    let ndim_diff = out_shape.len() - in_shape.len();
    in_shape
        .iter()
        .enumerate()
        .map(|(i, &in_dim)| if in_dim == 1 { 0 } else { out_idx[i + ndim_diff] })
        .collect()
}

/// Row-major flat offset of a multi-dimensional index.
pub fn flat_offset(idx: &[usize], shape: &[usize]) -> usize {
    let mut flat = 0;
    let mut multiplier = 1;
    for i in (0..shape.len()).rev() {
        flat += idx[i] * multiplier;
        multiplier *= shape[i];
    }
    flat
}

/// Multi-dimensional index of a row-major flat offset.
pub fn unravel(flat: usize, shape: &[usize]) -> Vec<usize> {
    let mut idx = vec![0; shape.len()];
    let mut remaining = flat;
    for (slot, &dim) in idx.iter_mut().zip(shape.iter()).rev() {
        if dim > 0 {
            *slot = remaining % dim;
            remaining /= dim;
        }
    }
    idx
}

/// Reject operands that would be stretched without permission.
///
/// Only applies in strict mode; an operand whose shape already equals the
/// output shape never needs the flag.
pub fn check_broadcast_flags(
    operands: &[Operand<'_>],
    out_shape: &[usize],
    strict: bool,
) -> Result<(), EngineError> {
    if !strict {
        return Ok(());
    }
    for operand in operands {
        if operand.shape() != out_shape && !operand.broadcastable {
            return Err(EngineError::Shape(format!(
                "operand {} with shape {:?} is not flagged broadcastable to {:?}",
                operand.label,
                operand.shape(),
                out_shape
            )));
        }
    }
    Ok(())
}

/// Apply `f` elementwise over two tensors broadcast to `out_shape`.
pub fn zip_broadcast<F>(
    x: &Tensor,
    y: &Tensor,
    out_shape: &[usize],
    f: F,
) -> Result<Tensor, EngineError>
where
    F: Fn(f64, f64) -> f64,
{
    let x_arr = x.to_array()?;
    let y_arr = y.to_array()?;
    let x_view = x_arr.broadcast(IxDyn(out_shape)).ok_or_else(|| {
        EngineError::Shape(format!("cannot broadcast {:?} to {:?}", x.shape(), out_shape))
    })?;
    let y_view = y_arr.broadcast(IxDyn(out_shape)).ok_or_else(|| {
        EngineError::Shape(format!("cannot broadcast {:?} to {:?}", y.shape(), out_shape))
    })?;
    let mut out = ArrayD::<f64>::zeros(IxDyn(out_shape));
    Zip::from(&mut out)
        .and(&x_view)
        .and(&y_view)
        .for_each(|o, &a, &b| *o = f(a, b));
    Ok(Tensor::from_array(out))
}
