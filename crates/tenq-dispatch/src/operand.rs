//! Operand and output addressing

use std::fmt;

use tenq_core::{Handle, Selector, Tensor};

/// How an operation names one of its inputs.
#[derive(Clone, Debug, PartialEq)]
pub enum OperandRef {
    /// Most recent eligible entry in the queue.
    Auto,
    /// A named entry.
    Name(String),
    /// An anonymous entry by handle.
    Slot(Handle),
    /// An ad-hoc tensor, registered for the duration of the call.
    Value { tensor: Tensor, broadcastable: bool },
}

impl OperandRef {
    /// Ad-hoc tensor that must match the output shape.
    pub fn value(tensor: Tensor) -> Self {
        OperandRef::Value {
            tensor,
            broadcastable: false,
        }
    }

    /// Ad-hoc tensor allowed to broadcast.
    pub fn broadcast(tensor: Tensor) -> Self {
        OperandRef::Value {
            tensor,
            broadcastable: true,
        }
    }

    /// Queue selector for reference operands; `None` for values.
    pub(crate) fn selector(&self) -> Option<Selector> {
        match self {
            OperandRef::Auto => Some(Selector::Auto),
            OperandRef::Name(name) => Some(Selector::name(name.as_str())),
            OperandRef::Slot(handle) => Some(Selector::Slot(*handle)),
            OperandRef::Value { .. } => None,
        }
    }
}

impl From<&str> for OperandRef {
    fn from(name: &str) -> Self {
        if name.is_empty() {
            OperandRef::Auto
        } else {
            OperandRef::Name(name.to_string())
        }
    }
}

impl From<String> for OperandRef {
    fn from(name: String) -> Self {
        if name.is_empty() {
            OperandRef::Auto
        } else {
            OperandRef::Name(name)
        }
    }
}

impl From<&String> for OperandRef {
    fn from(name: &String) -> Self {
        OperandRef::from(name.as_str())
    }
}

impl From<Handle> for OperandRef {
    fn from(handle: Handle) -> Self {
        OperandRef::Slot(handle)
    }
}

impl From<Tensor> for OperandRef {
    fn from(tensor: Tensor) -> Self {
        OperandRef::value(tensor)
    }
}

/// Plain numbers become broadcastable scalars.
impl From<f64> for OperandRef {
    fn from(value: f64) -> Self {
        OperandRef::broadcast(Tensor::scalar(value))
    }
}

impl fmt::Display for OperandRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperandRef::Auto => f.write_str("<auto>"),
            OperandRef::Name(name) => f.write_str(name),
            OperandRef::Slot(handle) => write!(f, "{}", handle),
            OperandRef::Value { tensor, .. } => write!(f, "<value {:?}>", tensor.shape()),
        }
    }
}

/// Where an operation's result goes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Output {
    /// Anonymous entry, eligible for auto-selection.
    #[default]
    Auto,
    /// A new named entry.
    Named(String),
    /// Ephemeral entry, never auto-selected.
    Scratch,
}

impl From<&str> for Output {
    fn from(name: &str) -> Self {
        if name.is_empty() {
            Output::Auto
        } else {
            Output::Named(name.to_string())
        }
    }
}

impl From<String> for Output {
    fn from(name: String) -> Self {
        if name.is_empty() {
            Output::Auto
        } else {
            Output::Named(name)
        }
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Output::Auto => f.write_str("<auto>"),
            Output::Named(name) => f.write_str(name),
            Output::Scratch => f.write_str("<scratch>"),
        }
    }
}
