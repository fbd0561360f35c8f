//! # tenq-exec
//!
//! Operation set and native engine contract for TenQ.
//!
//! This crate provides:
//! - [`Op`] and its families (unary, binary, reductions, single-axis,
//!   matrix algebra, losses, softmax, convolution lowering)
//! - The [`NativeEngine`] trait the dispatcher calls exactly once per
//!   operation
//! - [`CpuEngine`], a host reference engine built on `scirs2-core` arrays
//! - Device selection ([`Device`], [`EngineStatus`]) and [`ExecHints`]
//!
//! # Example
//!
//! ```
//! use tenq_core::Tensor;
//! use tenq_exec::{BinaryOp, CpuEngine, NativeEngine, Op, Operand};
//!
//! let mut engine = CpuEngine::new();
//! let a = Tensor::vector(&[1.0, 2.0, 3.0]);
//! let b = Tensor::scalar(10.0);
//! let out = engine
//!     .execute(
//!         &Op::Binary(BinaryOp::Mul),
//!         &[Operand::new(&a, false, "a"), Operand::new(&b, true, "b")],
//!     )
//!     .unwrap();
//! assert_eq!(out.data(), &[10.0, 20.0, 30.0]);
//! ```
//!
//! ## Broadcasting
//!
//! Binary operations follow NumPy broadcasting. With
//! [`ExecHints::strict_broadcast`] set (the default), every operand whose
//! shape differs from the output shape must carry the broadcast flag.
//!
//! ## Features
//!
//! - `serde`: Serialize device and status types

#![deny(warnings)]

pub mod device;
pub mod engine;
pub mod hints;
pub mod ops;


// Re-exports
pub use device::{Device, DeviceSelector, EngineStatus};
pub use engine::*;
pub use hints::*;
pub use ops::*;
