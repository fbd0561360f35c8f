//! # CpuEngine - Trait Implementations
//!
//! This module contains trait implementations for `CpuEngine`.
//!
//! ## Implemented Traits
//!
//! - `Default`
//! - `NativeEngine`

use tenq_core::Tensor;

use super::functions::{check_arity, EngineError, NativeEngine, Operand};
use super::types::CpuEngine;
use super::{conv_lowering, elementwise, linalg, losses, reductions};
use crate::device::{Device, EngineStatus};
use crate::ops::{LossOp, Op};

impl Default for CpuEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuEngine {
    fn run(&self, op: &Op, operands: &[Operand<'_>]) -> Result<Tensor, EngineError> {
        let x = operands[0].tensor;
        match *op {
            Op::Unary(u) => elementwise::unary(u, x),
            Op::Binary(b) => {
                elementwise::binary(b, operands[0], operands[1], self.hints.strict_broadcast)
            }
            Op::Reduce { op, reduction } => reductions::reduce(op, reduction, x),
            Op::Axis { op, axis } => reductions::along_axis(op, axis, x),
            Op::Transpose(axes) => linalg::transpose(x, axes),
            Op::Dot => linalg::dot(x, operands[1].tensor),
            Op::MatMul => linalg::matmul(x, operands[1].tensor),
            Op::Affine => linalg::affine(x, operands[1].tensor, operands[2].tensor),
            Op::Loss(LossOp::MeanSquaredError) => {
                losses::mean_squared_error(x, operands[1].tensor)
            }
            Op::Loss(LossOp::CrossEntropy) => {
                losses::cross_entropy(x, operands[1].tensor, self.hints.log_epsilon)
            }
            Op::Softmax { axis } => losses::softmax(x, axis),
            Op::Lower { rank, params } => {
                conv_lowering::lower(rank, params, x, operands[1].tensor)
            }
            Op::Unlower {
                rank,
                params,
                target,
            } => conv_lowering::unlower(rank, params, target, x, operands[1].tensor),
        }
    }
}

impl NativeEngine for CpuEngine {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn execute(&mut self, op: &Op, operands: &[Operand<'_>]) -> Result<Tensor, EngineError> {
        check_arity(op, operands)?;
        tracing::trace!(
            op = op.name(),
            device = %self.device.active(),
            operands = operands.len(),
            "executing"
        );
        match self.run(op, operands) {
            Ok(out) => {
                self.executed += 1;
                Ok(out)
            }
            Err(err) => {
                self.failed += 1;
                tracing::debug!(op = op.name(), error = %err, "engine rejected operation");
                Err(err)
            }
        }
    }

    fn select_device(&mut self, device: Device) {
        self.device.request(device);
        tracing::debug!(requested = %device, active = %self.device.active(), "device selected");
    }

    fn status(&self) -> EngineStatus {
        self.device.status(self.name())
    }
}
