//! Integration tests for tenq-core
//!
//! These tests exercise the queue, buffer and retrieval path together.

use tenq_core::constants::{preload, PRELOADED};
use tenq_core::{retrieve, Origin, Queue, ResultBuffer, Selector, Tensor, Usage};

#[test]
fn test_register_consume_evict_lifecycle() {
    let mut queue = Queue::new();
    queue
        .register("w", Tensor::from_vec(vec![1.0, 2.0, 3.0], &[3]).unwrap(), 3, false)
        .unwrap();

    for remaining in (1..3).rev() {
        let t = queue.consume(&Selector::from("w")).unwrap();
        assert_eq!(t.data(), &[1.0, 2.0, 3.0]);
        assert_eq!(
            queue.entry("w").unwrap().usage(),
            Usage::Remaining(remaining)
        );
    }
    queue.consume(&Selector::from("w")).unwrap();
    assert!(!queue.contains("w"));
}

#[test]
fn test_constants_survive_many_reads() {
    let mut queue = Queue::new();
    preload(&mut queue).unwrap();
    for _ in 0..10_000 {
        let one = queue.consume(&Selector::from("_one")).unwrap();
        assert_eq!(one.item(), Some(1.0));
    }
    assert_eq!(queue.len(), PRELOADED.len());
}

#[test]
fn test_generated_entries_are_anonymous() {
    let mut queue = Queue::new();
    let h = queue.register_generated(Tensor::scalar(1.0), true, Origin::Generated);
    let entry = queue.get(h).unwrap();
    assert_eq!(entry.name(), None);
    assert!(entry.is_broadcastable());
    assert_eq!(entry.usage(), Usage::Remaining(1));

    queue.consume(&Selector::Slot(h)).unwrap();
    assert!(queue.get(h).is_none());
}

#[test]
fn test_auto_retrieval_prefers_staged_output() {
    let mut queue = Queue::new();
    let mut buffer = ResultBuffer::new();
    queue.register("older", Tensor::scalar(1.0), 1, false).unwrap();
    let staged = queue.register_generated(Tensor::scalar(2.0), false, Origin::Generated);
    buffer.stage(staged, None, Tensor::scalar(2.0));
    queue.register("newer", Tensor::scalar(3.0), 1, false).unwrap();

    let t = retrieve(&mut queue, &mut buffer, &Selector::Auto).unwrap();
    assert_eq!(t.item(), Some(2.0));
    assert!(buffer.is_empty());

    // With the buffer empty, auto falls back to the most recent entry
    let t = retrieve(&mut queue, &mut buffer, &Selector::Auto).unwrap();
    assert_eq!(t.item(), Some(3.0));
}

#[test]
fn test_clear_keeps_constants_only() {
    let mut queue = Queue::new();
    preload(&mut queue).unwrap();
    queue.register("a", Tensor::scalar(1.0), 1, false).unwrap();
    queue.register_generated(Tensor::scalar(1.0), false, Origin::Generated);
    queue.clear();
    assert_eq!(queue.len(), PRELOADED.len());
    assert!(queue.entries(false).is_empty());

    queue.clear_all();
    assert!(queue.is_empty());
}
