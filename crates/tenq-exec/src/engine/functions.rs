//! Engine trait and the operand/error types crossing it

use thiserror::Error;

use tenq_core::{ArgumentError, Tensor, TenqError};

use crate::device::{Device, EngineStatus};
use crate::ops::Op;

/// A resolved operand passed to an engine.
#[derive(Clone, Copy, Debug)]
pub struct Operand<'a> {
    pub tensor: &'a Tensor,
    /// Whether the tensor may be stretched to a larger output shape
    pub broadcastable: bool,
    /// Display label used in error messages
    pub label: &'a str,
}

impl<'a> Operand<'a> {
    pub fn new(tensor: &'a Tensor, broadcastable: bool, label: &'a str) -> Self {
        Self {
            tensor,
            broadcastable,
            label,
        }
    }

    pub fn shape(&self) -> &'a [usize] {
        self.tensor.shape()
    }
}

/// Failures reported by an engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Incompatible operand shapes
    #[error("{0}")]
    Shape(String),

    /// A parameter outside its valid range
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Operand count disagrees with the operation
    #[error("expected {expected} operand(s), got {got}")]
    Arity { expected: usize, got: usize },

    /// Operation not supported by this engine
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Device selection or execution failure
    #[error("device error: {0}")]
    Device(String),

    /// Internal array construction failure
    #[error("internal: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for EngineError {
    fn from(err: anyhow::Error) -> Self {
        EngineError::Internal(err.to_string())
    }
}

impl From<TenqError> for EngineError {
    fn from(err: TenqError) -> Self {
        match err {
            TenqError::ShapeMismatch { reason, .. } => EngineError::Shape(reason),
            other => EngineError::Internal(other.to_string()),
        }
    }
}

impl EngineError {
    /// Attach the operation name, producing the crate-wide error type.
    pub fn into_tenq(self, op: &str) -> TenqError {
        match self {
            EngineError::Shape(reason) => TenqError::ShapeMismatch {
                op: op.to_string(),
                reason,
            },
            EngineError::InvalidParameter(reason) => ArgumentError::Parameter {
                op: op.to_string(),
                reason,
            }
            .into(),
            other => TenqError::Engine {
                op: op.to_string(),
                reason: other.to_string(),
            },
        }
    }
}

/// A native compute engine.
///
/// The dispatcher resolves operands, then calls [`NativeEngine::execute`]
/// exactly once per operation. Engines never see names or usage counts,
/// only tensors and their broadcast flags.
pub trait NativeEngine {
    /// Engine name for status reports
    fn name(&self) -> &'static str;

    /// Run one operation over resolved operands
    fn execute(&mut self, op: &Op, operands: &[Operand<'_>]) -> Result<Tensor, EngineError>;

    /// Request a compute device
    fn select_device(&mut self, device: Device);

    /// Current device state
    fn status(&self) -> EngineStatus;
}

impl<E: NativeEngine + ?Sized> NativeEngine for Box<E> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn execute(&mut self, op: &Op, operands: &[Operand<'_>]) -> Result<Tensor, EngineError> {
        (**self).execute(op, operands)
    }

    fn select_device(&mut self, device: Device) {
        (**self).select_device(device)
    }

    fn status(&self) -> EngineStatus {
        (**self).status()
    }
}

/// Fail unless `operands` matches the operation's arity.
pub fn check_arity(op: &Op, operands: &[Operand<'_>]) -> Result<(), EngineError> {
    if operands.len() != op.arity() {
        return Err(EngineError::Arity {
            expected: op.arity(),
            got: operands.len(),
        });
    }
    Ok(())
}
