//! Property-based tests for the entry store
//!
//! This module uses proptest to verify the lifecycle invariants of the
//! queue across randomly generated names, usage counts and consumption
//! sequences.

#[cfg(test)]
mod tests {
    use crate::{Queue, Selector, Tensor, Usage};
    use proptest::prelude::*;

    fn plain_name() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9]{0,7}"
    }

    fn constant_name() -> impl Strategy<Value = String> {
        "_[a-z0-9]{1,7}"
    }

    proptest! {
        #[test]
        fn prop_usage_decrements_until_eviction(usage in 1i64..40, taken in 0i64..40) {
            let mut queue = Queue::new();
            queue.register("x", Tensor::scalar(1.0), usage, false).unwrap();
            let k = taken.min(usage);
            for _ in 0..k {
                queue.consume(&Selector::from("x")).unwrap();
            }
            if k == usage {
                prop_assert!(!queue.contains("x"));
            } else {
                let entry = queue.entry("x").unwrap();
                prop_assert_eq!(entry.usage(), Usage::Remaining((usage - k) as u64));
            }
        }

        #[test]
        fn prop_negative_usage_requires_prefix(name in plain_name(), usage in -50i64..0) {
            let mut queue = Queue::new();
            prop_assert!(queue.register(&name, Tensor::scalar(0.0), usage, false).is_err());
            prop_assert!(queue.is_empty());
        }

        #[test]
        fn prop_constant_iff_minus_one(name in constant_name(), usage in -50i64..50) {
            let mut queue = Queue::new();
            let ok = queue.register(&name, Tensor::scalar(0.0), usage, false).is_ok();
            prop_assert_eq!(ok, usage == -1);
        }

        #[test]
        fn prop_duplicate_never_overwrites(name in plain_name(), first in -10.0f64..10.0, second in -10.0f64..10.0) {
            let mut queue = Queue::new();
            queue.register(&name, Tensor::scalar(first), 2, false).unwrap();
            prop_assert!(queue.register(&name, Tensor::scalar(second), 1, true).is_err());
            let entry = queue.entry(&name).unwrap();
            prop_assert_eq!(entry.tensor().item(), Some(first));
            prop_assert_eq!(entry.usage(), Usage::Remaining(2));
            prop_assert!(!entry.is_broadcastable());
        }

        #[test]
        fn prop_insertion_order_is_preserved(count in 1usize..20) {
            let mut queue = Queue::new();
            for i in 0..count {
                queue.register(&format!("t{}", i), Tensor::scalar(i as f64), 1, false).unwrap();
            }
            let values: Vec<f64> = queue
                .entries(false)
                .iter()
                .filter_map(|(_, e)| e.tensor().item())
                .collect();
            let expected: Vec<f64> = (0..count).map(|i| i as f64).collect();
            prop_assert_eq!(values, expected);
        }
    }
}
