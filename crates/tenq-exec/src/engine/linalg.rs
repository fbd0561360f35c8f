//! Transpose, dot, batched matmul and affine

use scirs2_core::ndarray_ext::{Array2, ArrayView2};
use tenq_core::Tensor;

use super::broadcast::{broadcast_index, broadcast_shapes, flat_offset, unravel, zip_broadcast};
use super::functions::EngineError;
use crate::ops::{AxisIndex, TransposeAxes};

/// Swap two axes; the default swaps axis 0 with the last axis.
pub fn transpose(x: &Tensor, axes: TransposeAxes) -> Result<Tensor, EngineError> {
    let rank = x.rank();
    let (i, j) = match axes {
        TransposeAxes::Default => {
            if rank < 2 {
                return Ok(x.clone());
            }
            (0, rank - 1)
        }
        TransposeAxes::Swap(a, b) => {
            let resolve = |idx: AxisIndex| {
                idx.resolve(rank).ok_or_else(|| {
                    EngineError::Shape(format!(
                        "transpose axis {:?} out of range for tensor with {} dimensions",
                        idx, rank
                    ))
                })
            };
            (resolve(a)?, resolve(b)?)
        }
    };
    if i == j {
        return Ok(x.clone());
    }
    let mut arr = x.to_array()?;
    arr.swap_axes(i, j);
    Ok(Tensor::from_array(arr))
}

fn matrix_view(
    data: &[f64],
    rows: usize,
    cols: usize,
) -> Result<ArrayView2<'_, f64>, EngineError> {
    ArrayView2::from_shape((rows, cols), data)
        .map_err(|e| EngineError::Internal(format!("matrix view: {}", e)))
}

fn dot_rank_error(side: &str, t: &Tensor) -> EngineError {
    EngineError::Shape(format!(
        "dot expects rank 1 or 2 operands, {} operand has shape {:?}",
        side,
        t.shape()
    ))
}

/// Product of rank-1 or rank-2 operands.
///
/// A vector on the left is treated as a row, on the right as a column; the
/// promoted axes are dropped from the result.
pub fn dot(a: &Tensor, b: &Tensor) -> Result<Tensor, EngineError> {
    let (m, k) = match *a.shape() {
        [k] => (1, k),
        [m, k] => (m, k),
        _ => return Err(dot_rank_error("left", a)),
    };
    let (k2, n) = match *b.shape() {
        [k] => (k, 1),
        [k, n] => (k, n),
        _ => return Err(dot_rank_error("right", b)),
    };
    if k != k2 {
        return Err(EngineError::Shape(format!(
            "dot inner dimensions differ: {:?} and {:?}",
            a.shape(),
            b.shape()
        )));
    }
    let product: Array2<f64> = matrix_view(a.data(), m, k)?.dot(&matrix_view(b.data(), k, n)?);

    let mut shape = Vec::with_capacity(2);
    if a.rank() == 2 {
        shape.push(m);
    }
    if b.rank() == 2 {
        shape.push(n);
    }
    Ok(Tensor::from_vec(product.iter().copied().collect(), &shape)?)
}

/// Batched matrix product over the last two axes.
///
/// Leading (batch) axes broadcast against each other.
pub fn matmul(a: &Tensor, b: &Tensor) -> Result<Tensor, EngineError> {
    if a.rank() < 2 || b.rank() < 2 {
        return Err(EngineError::Shape(format!(
            "matmul expects rank >= 2 operands, got {:?} and {:?}",
            a.shape(),
            b.shape()
        )));
    }
    let (a_batch, a_mat) = a.shape().split_at(a.rank() - 2);
    let (b_batch, b_mat) = b.shape().split_at(b.rank() - 2);
    let (m, k) = (a_mat[0], a_mat[1]);
    let (k2, n) = (b_mat[0], b_mat[1]);
    if k != k2 {
        return Err(EngineError::Shape(format!(
            "matmul inner dimensions differ: {:?} and {:?}",
            a.shape(),
            b.shape()
        )));
    }
    let batch = broadcast_shapes(a_batch, b_batch)?;
    let batch_count: usize = batch.iter().product();

    let mut data = Vec::with_capacity(batch_count * m * n);
    for flat in 0..batch_count {
        let idx = unravel(flat, &batch);
        let a_off = flat_offset(&broadcast_index(&idx, a_batch, &batch), a_batch) * m * k;
        let b_off = flat_offset(&broadcast_index(&idx, b_batch, &batch), b_batch) * k * n;
        let lhs = matrix_view(&a.data()[a_off..a_off + m * k], m, k)?;
        let rhs = matrix_view(&b.data()[b_off..b_off + k * n], k, n)?;
        data.extend(lhs.dot(&rhs).iter().copied());
    }

    let mut shape = batch;
    shape.extend([m, n]);
    Ok(Tensor::from_vec(data, &shape)?)
}

/// `matmul(a, b) + bias`, with `bias` broadcast over the product rows.
pub fn affine(a: &Tensor, b: &Tensor, bias: &Tensor) -> Result<Tensor, EngineError> {
    let product = matmul(a, b)?;
    let out_shape = product.shape();
    if bias.rank() == 0 || bias.shape().last() != out_shape.last() {
        return Err(EngineError::Shape(format!(
            "bias shape {:?} does not match product columns of {:?}",
            bias.shape(),
            out_shape
        )));
    }
    if broadcast_shapes(out_shape, bias.shape())? != out_shape {
        return Err(EngineError::Shape(format!(
            "bias shape {:?} would enlarge product shape {:?}",
            bias.shape(),
            out_shape
        )));
    }
    let out_shape = out_shape.to_vec();
    zip_broadcast(&product, bias, &out_shape, |p, c| p + c)
}
