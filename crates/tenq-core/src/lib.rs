//! # tenq-core
//!
//! Tensor values, the named entry store and the result buffer for TenQ.
//!
//! This crate provides the lifecycle layer that every TenQ operation runs
//! against:
//!
//! - **Tensor value** ([`Tensor`]): flat row-major coefficients plus a shape
//! - **Named entry store** ([`Queue`]): name → tensor bindings with usage
//!   budgets, broadcast flags and insertion order
//! - **Result buffer** ([`ResultBuffer`]): single slot holding the most
//!   recent operation output until it is retrieved
//! - **Slot arena** ([`SlotTable`], [`Handle`]): generational handles for
//!   anonymous entries
//! - **Error taxonomy** ([`TenqError`])
//!
//! ## Lifecycle
//!
//! An entry is created by registration. Each consuming reference
//! decrements its usage; at zero the entry is evicted. Constants (usage
//! `-1`, names starting with `_`) are never evicted by consumption.
//!
//! ```
//! use tenq_core::{Queue, Selector, Tensor};
//!
//! let mut queue = Queue::new();
//! queue.register("w", Tensor::ones(&[2, 2]), 1, false).unwrap();
//! queue.register("_scale", Tensor::scalar(0.5), -1, true).unwrap();
//!
//! // Single-use entries disappear after one consumption
//! queue.consume(&Selector::from("w")).unwrap();
//! assert!(!queue.contains("w"));
//!
//! // Constants stay
//! for _ in 0..100 {
//!     queue.consume(&Selector::from("_scale")).unwrap();
//! }
//! assert!(queue.contains("_scale"));
//! ```
//!
//! ## Error Handling
//!
//! Fallible operations return [`Result`], never panic:
//!
//! ```
//! use tenq_core::{Queue, Tensor};
//!
//! let mut queue = Queue::new();
//! // Negative usage requires the constant prefix
//! assert!(queue.register("x", Tensor::scalar(1.0), -1, false).is_err());
//! // Names are unique among live entries
//! queue.register("x", Tensor::scalar(1.0), 1, false).unwrap();
//! assert!(queue.register("x", Tensor::scalar(2.0), 1, false).is_err());
//! ```
//!
//! ## Features
//!
//! - `serde`: Enable serialization/deserialization of tensors and handles

#![deny(warnings)]

pub mod buffer;
pub mod constants;
pub mod error;
pub mod slots;
pub mod store;
pub mod tensor;

#[cfg(test)]
mod property_tests;

pub use buffer::{retrieve, ResultBuffer, Staged};
pub use error::{ArgumentError, Result, Selector, TenqError};
pub use slots::{Handle, SlotTable};
pub use store::{is_constant_name, Entry, Origin, Queue, Usage, CONSTANT_PREFIX};
pub use tensor::{element_count, Shape, Tensor};
