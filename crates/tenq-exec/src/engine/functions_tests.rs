//! Engine-level tests running every family through `NativeEngine::execute`

use super::*;
use crate::device::Device;
use crate::ops::*;
use tenq_core::Tensor;

fn exec(engine: &mut CpuEngine, op: Op, tensors: &[&Tensor]) -> Result<Tensor, EngineError> {
    let labels: Vec<String> = (0..tensors.len()).map(|i| format!("#{}", i)).collect();
    let operands: Vec<Operand<'_>> = tensors
        .iter()
        .zip(&labels)
        .map(|(t, l)| Operand::new(t, true, l))
        .collect();
    engine.execute(&op, &operands)
}

#[test]
fn test_every_unary_op_preserves_shape() {
    let mut engine = CpuEngine::new();
    let x = Tensor::from_vec(vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6], &[2, 3]).unwrap();
    for op in UnaryOp::ALL {
        let out = exec(&mut engine, Op::Unary(op), &[&x]).unwrap();
        assert_eq!(out.shape(), x.shape(), "{}", op.name());
    }
    assert_eq!(engine.executed_ops(), UnaryOp::ALL.len() as u64);
}

#[test]
fn test_every_binary_op_broadcasts_scalars() {
    let mut engine = CpuEngine::new();
    let x = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
    let s = Tensor::scalar(2.0);
    for op in BinaryOp::ALL {
        let out = exec(&mut engine, Op::Binary(op), &[&x, &s]).unwrap();
        assert_eq!(out.shape(), &[2, 2], "{}", op.name());
    }
}

#[test]
fn test_arity_is_checked() {
    let mut engine = CpuEngine::new();
    let x = Tensor::scalar(1.0);
    let err = exec(&mut engine, Op::Binary(BinaryOp::Add), &[&x]).unwrap_err();
    assert_eq!(
        err,
        EngineError::Arity {
            expected: 2,
            got: 1
        }
    );
    assert_eq!(engine.executed_ops(), 0);
}

#[test]
fn test_strict_broadcast_uses_operand_flags() {
    let mut engine = CpuEngine::new();
    let a = Tensor::ones(&[2, 3]);
    let b = Tensor::vector(&[1.0, 2.0, 3.0]);
    let operands = [Operand::new(&a, false, "a"), Operand::new(&b, false, "b")];
    let err = engine
        .execute(&Op::Binary(BinaryOp::Add), &operands)
        .unwrap_err();
    assert!(err.to_string().contains("b"));
    assert_eq!(engine.failed_ops(), 1);

    let mut lenient = CpuEngine::new().with_strict_broadcast(false);
    let out = lenient
        .execute(&Op::Binary(BinaryOp::Add), &operands)
        .unwrap();
    assert_eq!(out.data(), &[2.0, 3.0, 4.0, 2.0, 3.0, 4.0]);
}

#[test]
fn test_reduction_families() {
    let mut engine = CpuEngine::new();
    let x = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
    let all = exec(
        &mut engine,
        Op::Reduce {
            op: ReduceOp::Sum,
            reduction: Reduction::All,
        },
        &[&x],
    )
    .unwrap();
    assert!(all.is_scalar());
    assert_eq!(all.item(), Some(10.0));

    let cum = exec(
        &mut engine,
        Op::Axis {
            op: AxisOp::Accumulate,
            axis: AxisSel::First,
        },
        &[&x],
    )
    .unwrap();
    assert_eq!(cum.data(), &[1.0, 2.0, 4.0, 6.0]);
}

#[test]
fn test_linear_algebra() {
    let mut engine = CpuEngine::new();
    let a = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
    let b = Tensor::from_vec(vec![5.0, 6.0, 7.0, 8.0], &[2, 2]).unwrap();
    let c = exec(&mut engine, Op::MatMul, &[&a, &b]).unwrap();
    assert_eq!(c.data(), &[19.0, 22.0, 43.0, 50.0]);

    let d = exec(&mut engine, Op::Dot, &[&a, &b]).unwrap();
    assert_eq!(d, c);

    let bias = Tensor::vector(&[1.0, -1.0]);
    let f = exec(&mut engine, Op::Affine, &[&a, &b, &bias]).unwrap();
    assert_eq!(f.data(), &[20.0, 21.0, 44.0, 49.0]);

    let t = exec(&mut engine, Op::Transpose(TransposeAxes::Default), &[&a]).unwrap();
    assert_eq!(t.data(), &[1.0, 3.0, 2.0, 4.0]);
}

#[test]
fn test_softmax_and_losses() {
    let mut engine = CpuEngine::new();
    let logits = Tensor::from_vec(vec![0.0, 0.0, 1.0, 1.0], &[2, 2]).unwrap();
    let p = exec(
        &mut engine,
        Op::Softmax {
            axis: Op::SOFTMAX_DEFAULT_AXIS,
        },
        &[&logits],
    )
    .unwrap();
    assert_eq!(p.data(), &[0.5, 0.5, 0.5, 0.5]);

    let target = Tensor::from_vec(vec![1.0, 0.0, 0.0, 1.0], &[2, 2]).unwrap();
    let ce = exec(
        &mut engine,
        Op::Loss(LossOp::CrossEntropy),
        &[&p, &target],
    )
    .unwrap();
    assert!((ce.item().unwrap() - 2f64.ln()).abs() < 1e-12);

    let mse = exec(
        &mut engine,
        Op::Loss(LossOp::MeanSquaredError),
        &[&p, &target],
    )
    .unwrap();
    assert_eq!(mse.item(), Some(0.25));
}

#[test]
fn test_lowering_round_trip() {
    let mut engine = CpuEngine::new();
    let x = Tensor::from_vec((0..18u32).map(f64::from).collect(), &[1, 2, 3, 3]).unwrap();
    let k = Tensor::zeros(&[1, 2, 2, 2]);
    let params = ConvParams::symmetric(1, 1);
    let cols = exec(
        &mut engine,
        Op::Lower {
            rank: ConvRank::Two,
            params,
        },
        &[&x, &k],
    )
    .unwrap();
    assert_eq!(cols.shape(), &[1, 4, 4, 8]);
    let back = exec(
        &mut engine,
        Op::Unlower {
            rank: ConvRank::Two,
            params,
            target: None,
        },
        &[&cols, &k],
    )
    .unwrap();
    assert_eq!(back, x);
}

#[test]
fn test_device_requests_fall_back_to_cpu() {
    let mut engine = CpuEngine::new();
    assert_eq!(engine.status().active, Device::Cpu);
    engine.select_device(Device::Gpu);
    let status = engine.status();
    assert_eq!(status.requested, Device::Gpu);
    assert_eq!(status.active, Device::Cpu);
    assert!(!status.gpu_available);
    assert_eq!(status.engine, "cpu");
}

#[test]
fn test_boxed_engine_delegates() {
    let mut engine: Box<dyn NativeEngine> = Box::new(CpuEngine::new());
    let x = Tensor::scalar(-2.0);
    let labels = "x";
    let out = engine
        .execute(&Op::Unary(UnaryOp::Abs), &[Operand::new(&x, false, labels)])
        .unwrap();
    assert_eq!(out.item(), Some(2.0));
    assert_eq!(engine.name(), "cpu");
}
