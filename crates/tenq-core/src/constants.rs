//! Preloaded scalar constants.
//!
//! A fresh dispatcher registers these under [`CONSTANT_PREFIX`]-ed names
//! with usage `-1`, so they can be referenced by any number of operations.
//! They are flagged broadcastable so scalar arithmetic against them works
//! out of the box.
//!
//! [`CONSTANT_PREFIX`]: crate::store::CONSTANT_PREFIX

use crate::error::Result;
use crate::store::Queue;
use crate::tensor::Tensor;

/// Name/value pairs registered by [`preload`].
pub const PRELOADED: &[(&str, f64)] = &[
    ("_one", 1.0),
    ("_two", 2.0),
    ("_three", 3.0),
    ("_zero", 0.0),
    ("_half", 0.5),
    ("_hundred", 100.0),
    ("_max_pixel", 255.0),
    ("_neg_one", -1.0),
    ("_epsilon", f64::EPSILON),
    ("_learning_rate", 1e-3),
    ("_pi", std::f64::consts::PI),
    ("_e", std::f64::consts::E),
];

/// Register every preloaded constant that is not already present.
pub fn preload(queue: &mut Queue) -> Result<()> {
    for (name, value) in PRELOADED {
        if !queue.contains(name) {
            queue.register(name, Tensor::scalar(*value), -1, true)?;
        }
    }
    tracing::debug!(count = PRELOADED.len(), "constants preloaded");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{is_constant_name, Usage};

    #[test]
    fn test_preload_registers_constants() {
        let mut queue = Queue::new();
        preload(&mut queue).unwrap();
        assert_eq!(queue.len(), PRELOADED.len());
        let pi = queue.entry("_pi").unwrap();
        assert_eq!(pi.usage(), Usage::Constant);
        assert!(pi.is_broadcastable());
        assert_eq!(pi.tensor().item(), Some(std::f64::consts::PI));
    }

    #[test]
    fn test_preload_is_idempotent() {
        let mut queue = Queue::new();
        preload(&mut queue).unwrap();
        preload(&mut queue).unwrap();
        assert_eq!(queue.len(), PRELOADED.len());
    }

    #[test]
    fn test_all_names_are_prefixed() {
        assert!(PRELOADED.iter().all(|(name, _)| is_constant_name(name)));
    }
}
