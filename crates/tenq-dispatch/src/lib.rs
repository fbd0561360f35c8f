//! # tenq-dispatch
//!
//! The TenQ dispatcher: one generic operation protocol over a named tensor
//! queue, exposed through three calling conventions.
//!
//! - **Chain tier** ([`Dispatcher::run`] and shortcuts such as
//!   [`Dispatcher::add`]): returns `&mut Dispatcher`; failures are logged,
//!   counted and kept in [`Dispatcher::last_error`]
//! - **Immediate tier** ([`Dispatcher::eval`]): returns the output tensor
//!   directly; the output never becomes a caller-visible entry
//! - **Value tier**: any operand can be an ad-hoc tensor
//!   ([`OperandRef::Value`]), registered for the duration of the call
//!
//! All three go through [`Dispatcher::dispatch`].
//!
//! ## Quick Start
//!
//! ```
//! use tenq_core::Tensor;
//! use tenq_dispatch::{Call, Dispatcher};
//! use tenq_exec::Reduction;
//!
//! let mut tq = Dispatcher::new();
//! tq.put("a", Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0], &[2, 2]).unwrap())
//!     .unwrap();
//! tq.put("b", Tensor::from_vec(vec![1.0, 0.0, 0.0, 1.0], &[2, 2]).unwrap())
//!     .unwrap();
//!
//! // Chain: a·b, then scale by a preloaded constant
//! tq.matmul("a", "b", "ab").mul("ab", "_half", "scaled");
//! assert!(tq.last_error().is_none());
//!
//! // Immediate: reduce the named result
//! let total = tq.eval(Call::sum("scaled", Reduction::All)).unwrap();
//! assert_eq!(total.item(), Some(5.0));
//! ```
//!
//! ## Usage Counting
//!
//! Every reference an operation makes to an entry consumes one use of it;
//! single-use entries are gone after one operation. Constants (names
//! starting with `_`) are never consumed away.
//!
//! ## Features
//!
//! - `tracing` (default): [`tracing_support::init_tracing`] installs a
//!   `tracing-subscriber` formatter
//! - `serde`: serialization of tensors, handles and engine status

#![deny(warnings)]

pub mod call;
pub mod config;
pub mod diagnostics;
pub mod dispatcher;
pub mod operand;
pub mod tracing_support;


pub use call::{Call, Operands};
pub use config::DispatcherConfig;
pub use diagnostics::Failure;
pub use dispatcher::Dispatcher;
pub use operand::{OperandRef, Output};
pub use tracing_support::{init_tracing, TracingConfig, TracingFormat};
