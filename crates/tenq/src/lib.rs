//! # TenQ - Named Tensor Queue
//!
//! A host-side facade in front of a tensor-compute engine: about sixty
//! operations (elementwise math, reductions, matrix algebra, convolution
//! lowering, losses, softmax) behind one dispatch protocol over a named
//! tensor store.
//!
//! This is the **meta crate** that re-exports all TenQ components.
//!
//! ## Quick Start
//!
//! ```
//! use tenq::prelude::*;
//!
//! let mut tq = Dispatcher::new();
//! tq.put("x", Tensor::scalar(5.0))?;
//! tq.put("y", Tensor::scalar(3.0))?;
//! tq.add("x", "y", "z");
//! assert_eq!(tq.retrieve("z")?.item(), Some(8.0));
//! # Ok::<(), TenqError>(())
//! ```
//!
//! ## Components
//!
//! ### Entry Store ([`core`])
//!
//! Tensor values, the usage-counted named entry queue, the single-slot
//! result buffer and the preloaded constants.
//!
//! ```
//! use tenq::core::{Queue, Selector, Tensor};
//!
//! let mut queue = Queue::new();
//! queue.register("w", Tensor::ones(&[2, 2]), 2, false).unwrap();
//! queue.consume(&Selector::from("w")).unwrap();
//! assert!(queue.contains("w"));
//! ```
//!
//! ### Operations and Engines ([`exec`])
//!
//! Operation identifiers with typed axis selectors, the [`NativeEngine`]
//! contract and the reference [`CpuEngine`].
//!
//! ```
//! use tenq::exec::{AxisSel, Reduction};
//!
//! // Integer sentinels: -1 means "all axes" for reductions...
//! assert_eq!(Reduction::from_sentinel(-1).unwrap(), Reduction::All);
//! // ...but "axis 0" for single-axis operations
//! assert_eq!(AxisSel::from_sentinel(-1).unwrap().index(), 0);
//! ```
//!
//! ### Dispatch ([`dispatch`])
//!
//! The [`Dispatcher`] with its chain, immediate and value tiers.
//!
//! ```
//! use tenq::prelude::*;
//!
//! let mut tq = Dispatcher::new();
//! let m = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
//! let t = tq.eval(Call::transpose(m)).unwrap();
//! assert_eq!(t.data(), &[1.0, 3.0, 2.0, 4.0]);
//! ```
//!
//! ## Features
//!
//! - `tracing` (default): subscriber setup via `init_tracing`
//! - `serde`: serialization of tensors, handles and engine status
//! - `full`: everything
//!
//! [`NativeEngine`]: crate::exec::NativeEngine
//! [`CpuEngine`]: crate::exec::CpuEngine
//! [`Dispatcher`]: crate::dispatch::Dispatcher

#![deny(warnings)]

pub use tenq_core as core;
pub use tenq_dispatch as dispatch;
pub use tenq_exec as exec;

pub mod prelude {
    //! Prelude module for convenient imports
    //!
    //! # Example
    //!
    //! ```
    //! use tenq::prelude::*;
    //!
    //! let mut tq = Dispatcher::new();
    //! let y = tq.eval(Call::sqrt(Tensor::vector(&[4.0, 9.0]))).unwrap();
    //! assert_eq!(y.data(), &[2.0, 3.0]);
    //! ```

    // Values and store
    pub use crate::core::{Handle, Queue, Selector, Tensor, TenqError, Usage};

    // Operations
    pub use crate::exec::{
        AxisIndex, AxisSel, ConvParams, CpuEngine, Device, ExecHints, NativeEngine, Reduction,
        TransposeAxes,
    };

    // Dispatch
    pub use crate::dispatch::{Call, Dispatcher, DispatcherConfig, OperandRef, Output};
}
