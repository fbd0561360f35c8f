//! Named entry store ("Queue").
//!
//! The queue owns every live tensor binding. Each entry carries a usage
//! budget: a positive count that is decremented by every consuming
//! reference (the entry is evicted when it reaches zero), or
//! [`Usage::Constant`] for entries that are never evicted by consumption.
//!
//! Constants are recognised by name: an entry is a constant if and only if
//! its name starts with [`CONSTANT_PREFIX`].
//!
//! # Examples
//!
//! ```
//! use tenq_core::{Queue, Selector, Tensor};
//!
//! let mut queue = Queue::new();
//! queue.register("x", Tensor::scalar(1.0), 2, false).unwrap();
//!
//! queue.consume(&Selector::from("x")).unwrap();
//! assert!(queue.contains("x"));
//! queue.consume(&Selector::from("x")).unwrap();
//! assert!(!queue.contains("x"));
//! ```

use std::collections::HashMap;

use crate::error::{ArgumentError, Result, Selector, TenqError};
use crate::slots::{Handle, SlotTable};
use crate::tensor::{require_tensor, Tensor};

/// Reserved name prefix for constant entries.
pub const CONSTANT_PREFIX: &str = "_";

/// True if `name` is reserved for constants.
pub fn is_constant_name(name: &str) -> bool {
    name.starts_with(CONSTANT_PREFIX)
}

/// Remaining consumption budget of an entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Usage {
    /// Never evicted by consumption (integer form: -1).
    Constant,
    /// Evicted after this many further consumptions.
    Remaining(u64),
}

impl Usage {
    /// Validate an integer usage count against the entry name.
    ///
    /// `-1` is accepted only for prefixed names, positive counts only for
    /// unprefixed names.
    pub fn for_name(name: &str, count: i64) -> Result<Self> {
        let constant_name = is_constant_name(name);
        match count {
            0 => Err(ArgumentError::ZeroUsage.into()),
            -1 if constant_name => Ok(Usage::Constant),
            -1 => Err(ArgumentError::ConstantWithoutPrefix {
                name: name.to_string(),
                prefix: CONSTANT_PREFIX,
            }
            .into()),
            c if c < -1 => Err(ArgumentError::InvalidUsage(c).into()),
            _ if constant_name => Err(ArgumentError::PrefixWithoutConstant {
                name: name.to_string(),
                prefix: CONSTANT_PREFIX,
            }
            .into()),
            c => Ok(Usage::Remaining(c as u64)),
        }
    }

    /// Integer form used by the registration contract.
    pub fn as_count(&self) -> i64 {
        match self {
            Usage::Constant => -1,
            Usage::Remaining(n) => *n as i64,
        }
    }

    /// True for [`Usage::Constant`].
    pub fn is_constant(&self) -> bool {
        matches!(self, Usage::Constant)
    }
}

/// Where an entry came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    /// Registered by a caller under an explicit name.
    User,
    /// Registered by the dispatcher for a value operand or an auto-named output.
    Generated,
    /// Throwaway output of an immediate call.
    Scratch,
}

/// A live tensor binding.
#[derive(Clone, Debug)]
pub struct Entry {
    name: Option<String>,
    tensor: Tensor,
    usage: Usage,
    broadcastable: bool,
    origin: Origin,
    order: u64,
}

impl Entry {
    /// Caller-visible name; `None` for generated and scratch entries.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Bound tensor.
    pub fn tensor(&self) -> &Tensor {
        &self.tensor
    }

    /// Remaining usage.
    pub fn usage(&self) -> Usage {
        self.usage
    }

    /// Broadcast eligibility flag.
    pub fn is_broadcastable(&self) -> bool {
        self.broadcastable
    }

    /// Origin of the entry.
    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Insertion counter; larger means more recent.
    pub fn order(&self) -> u64 {
        self.order
    }

    /// True for constants.
    pub fn is_constant(&self) -> bool {
        self.usage.is_constant()
    }

    /// Diagnostic label: the name, or a marked slot index for anonymous entries.
    pub fn label(&self, handle: Handle) -> String {
        match (&self.name, self.origin) {
            (Some(name), _) => name.clone(),
            (None, Origin::Scratch) => format!("~{}", handle.index()),
            (None, _) => format!("#{}", handle.index()),
        }
    }
}

/// Ordered store of live named entries.
#[derive(Debug, Default)]
pub struct Queue {
    slots: SlotTable<Entry>,
    names: HashMap<String, Handle>,
    next_order: u64,
}

impl Queue {
    /// Empty queue (no constants).
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `tensor` under `name`.
    ///
    /// # Errors
    ///
    /// [`TenqError::InvalidArgument`] when the tensor is absent, the name is
    /// empty or taken, or the usage count violates the constant rules. The
    /// queue is unchanged on failure.
    pub fn register(
        &mut self,
        name: &str,
        tensor: impl Into<Option<Tensor>>,
        usage: i64,
        broadcastable: bool,
    ) -> Result<Handle> {
        let tensor = require_tensor(tensor.into())?;
        if name.is_empty() {
            return Err(ArgumentError::EmptyName.into());
        }
        let usage = Usage::for_name(name, usage)?;
        if self.names.contains_key(name) {
            return Err(ArgumentError::DuplicateName(name.to_string()).into());
        }
        let handle = self.insert(Some(name.to_string()), tensor, usage, broadcastable, Origin::User);
        tracing::debug!(name, usage = usage.as_count(), broadcastable, "entry registered");
        Ok(handle)
    }

    /// Register an anonymous single-use entry addressed by handle.
    pub fn register_generated(
        &mut self,
        tensor: Tensor,
        broadcastable: bool,
        origin: Origin,
    ) -> Handle {
        let handle = self.insert(None, tensor, Usage::Remaining(1), broadcastable, origin);
        tracing::trace!(%handle, ?origin, "generated entry registered");
        handle
    }

    fn insert(
        &mut self,
        name: Option<String>,
        tensor: Tensor,
        usage: Usage,
        broadcastable: bool,
        origin: Origin,
    ) -> Handle {
        let order = self.next_order;
        self.next_order += 1;
        let handle = self.slots.insert(Entry {
            name: name.clone(),
            tensor,
            usage,
            broadcastable,
            origin,
            order,
        });
        if let Some(name) = name {
            self.names.insert(name, handle);
        }
        handle
    }

    /// Resolve a selector to a live handle.
    ///
    /// [`Selector::Auto`] picks the most recently inserted live entry that
    /// is neither a constant nor a scratch output and is not in `exclude`.
    pub fn resolve(&self, selector: &Selector, exclude: &[Handle]) -> Result<Handle> {
        let found = match selector {
            Selector::Auto => self.auto_select(exclude),
            Selector::Name(name) => self.names.get(name).copied(),
            Selector::Slot(handle) => Some(*handle).filter(|h| self.slots.contains(*h)),
        };
        tracing::trace!(%selector, resolved = ?found, "resolve");
        found.ok_or_else(|| TenqError::NotFound(selector.clone()))
    }

    fn auto_select(&self, exclude: &[Handle]) -> Option<Handle> {
        self.slots
            .iter()
            .filter(|(handle, entry)| {
                !entry.is_constant() && entry.origin != Origin::Scratch && !exclude.contains(handle)
            })
            .max_by_key(|(_, entry)| entry.order)
            .map(|(handle, _)| handle)
    }

    /// Consume one use of the selected entry and return its tensor.
    pub fn consume(&mut self, selector: &Selector) -> Result<Tensor> {
        let handle = self.resolve(selector, &[])?;
        self.consume_handle(handle)
    }

    /// Consume one use of the entry behind `handle`.
    ///
    /// Positive usage is decremented and the entry evicted at zero;
    /// constants are left untouched.
    pub fn consume_handle(&mut self, handle: Handle) -> Result<Tensor> {
        let usage = self.entry_mut(handle)?.usage;
        match usage {
            Usage::Constant => Ok(self.entry_mut(handle)?.tensor.clone()),
            Usage::Remaining(n) if n > 1 => {
                let entry = self.entry_mut(handle)?;
                entry.usage = Usage::Remaining(n - 1);
                Ok(entry.tensor.clone())
            }
            Usage::Remaining(_) => self.evict(handle).map(|entry| entry.tensor),
        }
    }

    fn evict(&mut self, handle: Handle) -> Result<Entry> {
        let entry = self
            .slots
            .remove(handle)
            .ok_or(TenqError::NotFound(Selector::Slot(handle)))?;
        if let Some(name) = &entry.name {
            self.names.remove(name);
        }
        tracing::debug!(entry = %entry.label(handle), "entry evicted");
        Ok(entry)
    }

    /// Remove the selected entry regardless of its usage.
    pub fn remove(&mut self, selector: &Selector) -> Result<Tensor> {
        let handle = self.resolve(selector, &[])?;
        self.evict(handle).map(|entry| entry.tensor)
    }

    /// Rebind the usage counter of a non-constant entry.
    pub fn set_usage(&mut self, selector: &Selector, count: i64) -> Result<()> {
        if count < 1 {
            return Err(ArgumentError::InvalidUsage(count).into());
        }
        let handle = self.resolve(selector, &[])?;
        let entry = self.entry_mut(handle)?;
        if entry.is_constant() {
            return Err(ArgumentError::ConstantUsage(entry.label(handle)).into());
        }
        entry.usage = Usage::Remaining(count as u64);
        Ok(())
    }

    /// Toggle the broadcast flag of an entry.
    pub fn set_broadcastable(&mut self, selector: &Selector, flag: bool) -> Result<()> {
        let handle = self.resolve(selector, &[])?;
        self.entry_mut(handle)?.broadcastable = flag;
        Ok(())
    }

    /// Replace the shape descriptor of an entry.
    ///
    /// # Errors
    ///
    /// [`TenqError::ShapeMismatch`] if `shape` does not describe the same
    /// number of elements.
    pub fn reshape(&mut self, selector: &Selector, shape: &[usize]) -> Result<()> {
        let handle = self.resolve(selector, &[])?;
        let entry = self.entry_mut(handle)?;
        entry.tensor = entry.tensor.reshaped(shape)?;
        Ok(())
    }

    fn entry_mut(&mut self, handle: Handle) -> Result<&mut Entry> {
        self.slots
            .get_mut(handle)
            .ok_or(TenqError::NotFound(Selector::Slot(handle)))
    }

    /// Entry behind a handle.
    pub fn get(&self, handle: Handle) -> Option<&Entry> {
        self.slots.get(handle)
    }

    /// Entry registered under `name`.
    pub fn entry(&self, name: &str) -> Option<&Entry> {
        self.names.get(name).and_then(|h| self.slots.get(*h))
    }

    /// Handle of the entry registered under `name`.
    pub fn handle_of(&self, name: &str) -> Option<Handle> {
        self.names.get(name).copied()
    }

    /// True if a live entry is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// Number of live entries, constants included.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True when no entries are live.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Live entries in insertion order.
    pub fn entries(&self, include_constants: bool) -> Vec<(Handle, &Entry)> {
        let mut entries: Vec<(Handle, &Entry)> = self
            .slots
            .iter()
            .filter(|(_, entry)| include_constants || !entry.is_constant())
            .collect();
        entries.sort_by_key(|(_, entry)| entry.order);
        entries
    }

    /// Drop every non-constant entry.
    pub fn clear(&mut self) {
        self.slots.retain(Entry::is_constant);
        self.names.retain(|name, _| is_constant_name(name));
        tracing::debug!(remaining = self.slots.len(), "queue cleared");
    }

    /// Drop every entry, constants included.
    pub fn clear_all(&mut self) {
        self.slots.clear();
        self.names.clear();
    }
}
