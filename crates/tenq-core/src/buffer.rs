//! Single-slot result buffer.
//!
//! Every successful operation stages its output here in addition to
//! registering it in the [`Queue`]. The slot is cleared when the staged
//! output is retrieved.

use crate::error::{Result, Selector, TenqError};
use crate::slots::Handle;
use crate::store::Queue;
use crate::tensor::Tensor;

/// Output staged by the most recent operation.
#[derive(Clone, Debug)]
pub struct Staged {
    handle: Handle,
    name: Option<String>,
    tensor: Tensor,
}

impl Staged {
    /// Queue handle the output was registered under.
    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// Output name, if the operation wrote to a named entry.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Staged tensor.
    pub fn tensor(&self) -> &Tensor {
        &self.tensor
    }

    fn matches(&self, selector: &Selector) -> bool {
        match selector {
            Selector::Auto => true,
            Selector::Name(name) => self.name.as_deref() == Some(name.as_str()),
            Selector::Slot(handle) => self.handle == *handle,
        }
    }
}

/// Holds at most one pending output.
#[derive(Clone, Debug, Default)]
pub struct ResultBuffer {
    staged: Option<Staged>,
}

impl ResultBuffer {
    /// Empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage an output, replacing whatever was pending.
    pub fn stage(&mut self, handle: Handle, name: Option<String>, tensor: Tensor) {
        if let Some(previous) = &self.staged {
            tracing::trace!(replaced = %previous.handle, "buffer overwritten");
        }
        self.staged = Some(Staged {
            handle,
            name,
            tensor,
        });
    }

    /// Pending output, if any.
    pub fn peek(&self) -> Option<&Staged> {
        self.staged.as_ref()
    }

    /// True if the pending output matches `selector`.
    pub fn holds(&self, selector: &Selector) -> bool {
        self.staged.as_ref().is_some_and(|s| s.matches(selector))
    }

    /// Take the pending output.
    pub fn take(&mut self) -> Option<Staged> {
        self.staged.take()
    }

    /// Clear the slot; returns whether anything was pending.
    pub fn clear(&mut self) -> bool {
        self.staged.take().is_some()
    }

    /// True when nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.staged.is_none()
    }
}

/// Retrieve a tensor by selector.
///
/// A live queue entry is consumed (one use). If the selector matches the
/// staged output the buffer is cleared as well, whether or not the queue
/// entry still exists; when it does not, the staged copy is returned.
/// [`Selector::Auto`] targets the staged output when there is one.
///
/// # Errors
///
/// [`TenqError::NotFound`] when neither the queue nor the buffer holds the
/// selected tensor.
pub fn retrieve(queue: &mut Queue, buffer: &mut ResultBuffer, selector: &Selector) -> Result<Tensor> {
    let target = match (selector, buffer.peek()) {
        (Selector::Auto, Some(staged)) => Selector::Slot(staged.handle),
        _ => selector.clone(),
    };
    let staged = if buffer.holds(&target) {
        buffer.take()
    } else {
        None
    };
    match queue.resolve(&target, &[]) {
        Ok(handle) => queue.consume_handle(handle),
        Err(err) => staged.map(|s| s.tensor).ok_or(match err {
            TenqError::NotFound(_) => TenqError::NotFound(selector.clone()),
            other => other,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Origin;

    #[test]
    fn test_stage_replaces_previous() {
        let mut queue = Queue::new();
        let a = queue.register_generated(Tensor::scalar(1.0), false, Origin::Generated);
        let b = queue.register_generated(Tensor::scalar(2.0), false, Origin::Generated);
        let mut buffer = ResultBuffer::new();
        buffer.stage(a, None, Tensor::scalar(1.0));
        buffer.stage(b, None, Tensor::scalar(2.0));
        assert_eq!(buffer.peek().unwrap().handle(), b);
        assert!(buffer.holds(&Selector::Slot(b)));
        assert!(!buffer.holds(&Selector::Slot(a)));
    }

    #[test]
    fn test_retrieve_consumes_queue_and_clears_buffer() {
        let mut queue = Queue::new();
        let mut buffer = ResultBuffer::new();
        let h = queue.register("z", Tensor::scalar(8.0), 1, false).unwrap();
        buffer.stage(h, Some("z".into()), Tensor::scalar(8.0));

        let t = retrieve(&mut queue, &mut buffer, &Selector::from("z")).unwrap();
        assert_eq!(t.item(), Some(8.0));
        assert!(buffer.is_empty());
        assert!(!queue.contains("z"));
    }

    #[test]
    fn test_retrieve_falls_back_to_staged_copy() {
        let mut queue = Queue::new();
        let mut buffer = ResultBuffer::new();
        let h = queue.register("z", Tensor::scalar(3.0), 1, false).unwrap();
        buffer.stage(h, Some("z".into()), Tensor::scalar(3.0));
        queue.consume(&Selector::from("z")).unwrap();

        let t = retrieve(&mut queue, &mut buffer, &Selector::from("z")).unwrap();
        assert_eq!(t.item(), Some(3.0));
        assert!(buffer.is_empty());
        assert!(retrieve(&mut queue, &mut buffer, &Selector::from("z"))
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_retrieve_unstaged_entry_leaves_buffer() {
        let mut queue = Queue::new();
        let mut buffer = ResultBuffer::new();
        queue.register("x", Tensor::scalar(1.0), 1, false).unwrap();
        let h = queue.register("y", Tensor::scalar(2.0), 1, false).unwrap();
        buffer.stage(h, Some("y".into()), Tensor::scalar(2.0));

        retrieve(&mut queue, &mut buffer, &Selector::from("x")).unwrap();
        assert!(!buffer.is_empty());
    }
}
