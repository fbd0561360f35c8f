//! Error taxonomy for the TenQ stack.
//!
//! Every fallible operation in the queue, buffer and dispatcher reports one
//! of four categories:
//!
//! - **`InvalidArgument`**: the request itself is malformed (absent tensor,
//!   bad name, bad usage count, wrong operand count, bad parameter)
//! - **`NotFound`**: an operand selector does not resolve to a live entry
//! - **`ShapeMismatch`**: operand shapes violate an operation's contract
//! - **`Engine`**: any other failure reported by the compute engine
//!
//! # Examples
//!
//! ```
//! use tenq_core::{ArgumentError, TenqError};
//!
//! let err = TenqError::from(ArgumentError::EmptyName);
//! assert!(err.is_invalid_argument());
//! assert_eq!(err.to_string(), "invalid argument: entry name must not be empty");
//! ```

use thiserror::Error;

use crate::slots::Handle;

/// Result alias used throughout TenQ.
pub type Result<T> = std::result::Result<T, TenqError>;

/// How an operand or retrieval target is addressed.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Selector {
    /// Let the queue pick the most suitable live entry.
    Auto,
    /// A caller-registered entry by name.
    Name(String),
    /// A generated entry by arena handle.
    Slot(Handle),
}

impl Selector {
    /// Build a name selector; the empty string maps to [`Selector::Auto`].
    pub fn name(name: impl Into<String>) -> Self {
        let name = name.into();
        if name.is_empty() {
            Selector::Auto
        } else {
            Selector::Name(name)
        }
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Selector::Auto => write!(f, "<auto>"),
            Selector::Name(name) => write!(f, "'{}'", name),
            Selector::Slot(handle) => write!(f, "{}", handle),
        }
    }
}

impl From<&str> for Selector {
    fn from(name: &str) -> Self {
        Selector::name(name)
    }
}

impl From<String> for Selector {
    fn from(name: String) -> Self {
        Selector::name(name)
    }
}

impl From<Handle> for Selector {
    fn from(handle: Handle) -> Self {
        Selector::Slot(handle)
    }
}

/// Top-level error type.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TenqError {
    /// Malformed request
    #[error("invalid argument: {0}")]
    InvalidArgument(#[from] ArgumentError),

    /// Selector did not resolve to a live entry
    #[error("no live entry for {0}")]
    NotFound(Selector),

    /// Operand shapes incompatible with the operation
    #[error("shape or broadcast mismatch in {op}: {reason}")]
    ShapeMismatch { op: String, reason: String },

    /// Any other engine-side failure
    #[error("engine failure in {op}: {reason}")]
    Engine { op: String, reason: String },
}

impl TenqError {
    /// True for [`TenqError::InvalidArgument`].
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, TenqError::InvalidArgument(_))
    }

    /// True for [`TenqError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, TenqError::NotFound(_))
    }

    /// True for [`TenqError::ShapeMismatch`].
    pub fn is_shape_mismatch(&self) -> bool {
        matches!(self, TenqError::ShapeMismatch { .. })
    }

    /// True for [`TenqError::Engine`].
    pub fn is_engine_failure(&self) -> bool {
        matches!(self, TenqError::Engine { .. })
    }
}

/// Detail for [`TenqError::InvalidArgument`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArgumentError {
    #[error("tensor value is absent")]
    MissingTensor,

    #[error("entry name must not be empty")]
    EmptyName,

    #[error("entry '{0}' already exists")]
    DuplicateName(String),

    #[error("usage count must not be zero")]
    ZeroUsage,

    #[error("usage count {0} is invalid (expected > 0 or exactly -1)")]
    InvalidUsage(i64),

    #[error("constant '{name}' must use the '{prefix}' prefix")]
    ConstantWithoutPrefix { name: String, prefix: &'static str },

    #[error("'{name}' uses the reserved '{prefix}' prefix but is not a constant")]
    PrefixWithoutConstant { name: String, prefix: &'static str },

    #[error("usage of constant '{0}' cannot be changed")]
    ConstantUsage(String),

    #[error("{op} expects {expected} operand(s), got {got}")]
    Arity {
        op: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("entry {entry} has {remaining} use(s) left but {op} references it {needed} time(s)")]
    UsageExhausted {
        op: &'static str,
        entry: String,
        remaining: u64,
        needed: u64,
    },

    #[error("invalid sentinel {value} for {what}")]
    Sentinel { what: &'static str, value: i64 },

    #[error("invalid parameter for {op}: {reason}")]
    Parameter { op: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_empty_name_is_auto() {
        assert_eq!(Selector::from(""), Selector::Auto);
        assert_eq!(Selector::from("x"), Selector::Name("x".to_string()));
    }

    #[test]
    fn test_error_categories() {
        let nf = TenqError::NotFound(Selector::Auto);
        assert!(nf.is_not_found());
        assert_eq!(nf.to_string(), "no live entry for <auto>");

        let shape = TenqError::ShapeMismatch {
            op: "add".into(),
            reason: "[2] vs [3]".into(),
        };
        assert!(shape.is_shape_mismatch());
        assert!(!shape.is_engine_failure());
    }

    #[test]
    fn test_argument_error_messages() {
        let err = ArgumentError::DuplicateName("x".into());
        assert_eq!(err.to_string(), "entry 'x' already exists");
        let err = ArgumentError::Arity {
            op: "add",
            expected: 2,
            got: 1,
        };
        assert_eq!(err.to_string(), "add expects 2 operand(s), got 1");
    }
}
