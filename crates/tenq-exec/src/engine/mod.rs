//! Engine trait and the reference CPU engine

pub mod broadcast;
pub mod conv_lowering;
pub mod cpuengine_traits;
pub mod elementwise;
pub mod functions;
#[cfg(test)]
mod functions_tests;
pub mod linalg;
pub mod losses;
pub mod reductions;
pub mod types;

pub use functions::*;
pub use types::*;
