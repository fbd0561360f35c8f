//! Tensor value type.
//!
//! A [`Tensor`] is a flat, row-major coefficient buffer paired with an
//! ordered shape descriptor. It carries no behaviour beyond construction,
//! inspection and conversion to the `scirs2_core` array types used by the
//! compute engine.

use scirs2_core::ndarray_ext::{Array, ArrayD, IxDyn};
use smallvec::SmallVec;

use crate::error::{ArgumentError, Result, TenqError};

/// Shape type using SmallVec to avoid heap allocation for common ranks.
///
/// # Examples
///
/// ```
/// use tenq_core::{Shape, Tensor};
///
/// let t = Tensor::zeros(&[2, 3, 4]);
/// let shape: &Shape = t.shape_vec();
/// assert_eq!(&shape[..], &[2, 3, 4]);
/// ```
pub type Shape = SmallVec<[usize; 6]>;

/// Dense tensor value: `data.len() == product(shape)`.
///
/// An empty shape denotes a scalar holding exactly one coefficient.
///
/// # Examples
///
/// ```
/// use tenq_core::Tensor;
///
/// let t = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
/// assert_eq!(t.shape(), &[2, 2]);
/// assert_eq!(t.len(), 4);
///
/// let s = Tensor::scalar(8.0);
/// assert!(s.is_scalar());
/// assert_eq!(s.item(), Some(8.0));
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawTensor"))]
pub struct Tensor {
    data: Vec<f64>,
    shape: Shape,
}

/// Unchecked wire form; deserialization goes through [`Tensor::from_vec`].
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawTensor {
    data: Vec<f64>,
    shape: Shape,
}

#[cfg(feature = "serde")]
impl TryFrom<RawTensor> for Tensor {
    type Error = TenqError;

    fn try_from(raw: RawTensor) -> Result<Self> {
        Tensor::from_vec(raw.data, &raw.shape)
    }
}

impl Tensor {
    /// Create a tensor from row-major data and a shape.
    ///
    /// # Errors
    ///
    /// Returns [`TenqError::ShapeMismatch`] when the element count of
    /// `shape` differs from `data.len()`.
    pub fn from_vec(data: Vec<f64>, shape: &[usize]) -> Result<Self> {
        let expected = element_count(shape);
        if data.len() != expected {
            return Err(TenqError::ShapeMismatch {
                op: "tensor".to_string(),
                reason: format!(
                    "shape {:?} requires {} elements, but got {}",
                    shape,
                    expected,
                    data.len()
                ),
            });
        }
        Ok(Self {
            data,
            shape: SmallVec::from_slice(shape),
        })
    }

    /// Rank-0 tensor holding a single value.
    pub fn scalar(value: f64) -> Self {
        Self {
            data: vec![value],
            shape: SmallVec::new(),
        }
    }

    /// One-dimensional tensor over `values`.
    pub fn vector(values: &[f64]) -> Self {
        Self {
            data: values.to_vec(),
            shape: SmallVec::from_slice(&[values.len()]),
        }
    }

    /// Tensor of the given shape filled with `value`.
    pub fn from_elem(shape: &[usize], value: f64) -> Self {
        Self {
            data: vec![value; element_count(shape)],
            shape: SmallVec::from_slice(shape),
        }
    }

    /// Tensor of the given shape filled with zeros.
    pub fn zeros(shape: &[usize]) -> Self {
        Self::from_elem(shape, 0.0)
    }

    /// Tensor of the given shape filled with ones.
    pub fn ones(shape: &[usize]) -> Self {
        Self::from_elem(shape, 1.0)
    }

    /// Build a tensor from an `f64` dynamic-rank array.
    ///
    /// Elements are read in logical (row-major) order regardless of the
    /// array's memory layout.
    pub fn from_array(array: ArrayD<f64>) -> Self {
        let shape = SmallVec::from_slice(array.shape());
        let data = array.iter().copied().collect();
        Self { data, shape }
    }

    /// Copy this tensor into an owned dynamic-rank array.
    pub fn to_array(&self) -> anyhow::Result<ArrayD<f64>> {
        let array = Array::from_shape_vec(IxDyn(&self.shape), self.data.clone())?;
        Ok(array)
    }

    /// Shape as a slice.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Shape as the owned small-vector descriptor.
    pub fn shape_vec(&self) -> &Shape {
        &self.shape
    }

    /// Coefficients in row-major order.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Number of axes.
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Total number of coefficients.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when the tensor has zero coefficients (some axis has size 0).
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// True for rank-0 tensors.
    pub fn is_scalar(&self) -> bool {
        self.shape.is_empty()
    }

    /// The single coefficient of a one-element tensor.
    pub fn item(&self) -> Option<f64> {
        match self.data.as_slice() {
            [value] => Some(*value),
            _ => None,
        }
    }

    /// Return a copy with a different shape over the same data.
    ///
    /// # Errors
    ///
    /// Fails when the element counts differ.
    pub fn reshaped(&self, shape: &[usize]) -> Result<Self> {
        self.clone().into_reshaped(shape)
    }

    /// Consuming variant of [`Tensor::reshaped`].
    pub fn into_reshaped(self, shape: &[usize]) -> Result<Self> {
        let expected = element_count(shape);
        if expected != self.data.len() {
            return Err(TenqError::ShapeMismatch {
                op: "reshape".to_string(),
                reason: format!(
                    "cannot reshape {:?} ({} elements) into {:?} ({} elements)",
                    self.shape(),
                    self.data.len(),
                    shape,
                    expected
                ),
            });
        }
        Ok(Self {
            data: self.data,
            shape: SmallVec::from_slice(shape),
        })
    }

    /// Bitwise equality of shape and coefficients (NaN-aware).
    pub fn bit_eq(&self, other: &Self) -> bool {
        self.shape == other.shape
            && self.data.len() == other.data.len()
            && self
                .data
                .iter()
                .zip(other.data.iter())
                .all(|(a, b)| a.to_bits() == b.to_bits())
    }
}

impl From<f64> for Tensor {
    fn from(value: f64) -> Self {
        Self::scalar(value)
    }
}

/// Optional tensors are how callers express an absent registration value.
pub(crate) fn require_tensor(tensor: Option<Tensor>) -> Result<Tensor> {
    tensor.ok_or(TenqError::InvalidArgument(ArgumentError::MissingTensor))
}

/// Product of the dimension sizes; 1 for a scalar shape.
pub fn element_count(shape: &[usize]) -> usize {
    shape.iter().product()
}
