//! Elementwise unary and binary kernels

use tenq_core::Tensor;

use super::broadcast::{broadcast_shapes, check_broadcast_flags, zip_broadcast};
use super::functions::{EngineError, Operand};
use crate::ops::{BinaryOp, UnaryOp};

const GELU_COEFF: f64 = 0.044_715;
const SELU_ALPHA: f64 = 1.673_263_242_354_377_3;
const SELU_SCALE: f64 = 1.050_700_987_355_480_5;

fn truth(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

fn sigmoid(v: f64) -> f64 {
    if v >= 0.0 {
        1.0 / (1.0 + (-v).exp())
    } else {
        let e = v.exp();
        e / (1.0 + e)
    }
}

fn gelu(v: f64) -> f64 {
    let inner = (2.0 / std::f64::consts::PI).sqrt() * (v + GELU_COEFF * v.powi(3));
    0.5 * v * (1.0 + inner.tanh())
}

fn softplus(v: f64) -> f64 {
    // ln(1 + e^v) without overflow for large v
    v.max(0.0) + (-v.abs()).exp().ln_1p()
}

fn sign(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        v
    }
}

/// Scalar kernel for a unary operation.
pub fn unary_kernel(op: UnaryOp) -> fn(f64) -> f64 {
    match op {
        UnaryOp::Abs => f64::abs,
        UnaryOp::Neg => |v| -v,
        UnaryOp::Sqrt => f64::sqrt,
        UnaryOp::Square => |v| v * v,
        UnaryOp::Cube => |v| v * v * v,
        UnaryOp::Exp => f64::exp,
        UnaryOp::Log => f64::ln,
        UnaryOp::Log2 => f64::log2,
        UnaryOp::Log10 => f64::log10,
        UnaryOp::Sin => f64::sin,
        UnaryOp::Cos => f64::cos,
        UnaryOp::Tan => f64::tan,
        UnaryOp::Asin => f64::asin,
        UnaryOp::Acos => f64::acos,
        UnaryOp::Atan => f64::atan,
        UnaryOp::Sinh => f64::sinh,
        UnaryOp::Cosh => f64::cosh,
        UnaryOp::Tanh => f64::tanh,
        UnaryOp::Sigmoid => sigmoid,
        UnaryOp::ReLU => |v| if v > 0.0 { v } else { 0.0 },
        UnaryOp::Gelu => gelu,
        UnaryOp::Elu => |v| if v > 0.0 { v } else { v.exp_m1() },
        UnaryOp::Selu => |v| {
            if v > 0.0 {
                SELU_SCALE * v
            } else {
                SELU_SCALE * SELU_ALPHA * v.exp_m1()
            }
        },
        UnaryOp::Softplus => softplus,
        UnaryOp::Sign => sign,
        UnaryOp::Floor => f64::floor,
        UnaryOp::Ceil => f64::ceil,
        UnaryOp::Round => f64::round,
        UnaryOp::Reciprocal => f64::recip,
        UnaryOp::Not => |v| truth(v == 0.0),
    }
}

/// Scalar kernel for a binary operation.
pub fn binary_kernel(op: BinaryOp) -> fn(f64, f64) -> f64 {
    match op {
        BinaryOp::Add => |a, b| a + b,
        BinaryOp::Sub => |a, b| a - b,
        BinaryOp::Mul => |a, b| a * b,
        BinaryOp::Div => |a, b| a / b,
        BinaryOp::Pow => f64::powf,
        BinaryOp::Maximum => |a, b| if a > b { a } else { b },
        BinaryOp::Minimum => |a, b| if a < b { a } else { b },
        BinaryOp::Mod => |a, b| a % b,
        BinaryOp::Atan2 => f64::atan2,
        BinaryOp::Eq => |a, b| truth(a == b),
        BinaryOp::Ne => |a, b| truth(a != b),
        BinaryOp::Lt => |a, b| truth(a < b),
        BinaryOp::Le => |a, b| truth(a <= b),
        BinaryOp::Gt => |a, b| truth(a > b),
        BinaryOp::Ge => |a, b| truth(a >= b),
        BinaryOp::And => |a, b| truth(a != 0.0 && b != 0.0),
        BinaryOp::Or => |a, b| truth(a != 0.0 || b != 0.0),
        BinaryOp::Xor => |a, b| truth((a != 0.0) != (b != 0.0)),
    }
}

/// Apply a unary operation to every element.
pub fn unary(op: UnaryOp, x: &Tensor) -> Result<Tensor, EngineError> {
    let kernel = unary_kernel(op);
    let result = x.to_array()?.mapv(kernel);
    Ok(Tensor::from_array(result))
}

/// Apply a binary operation with broadcasting.
pub fn binary(
    op: BinaryOp,
    x: Operand<'_>,
    y: Operand<'_>,
    strict: bool,
) -> Result<Tensor, EngineError> {
    let out_shape = broadcast_shapes(x.shape(), y.shape())?;
    check_broadcast_flags(&[x, y], &out_shape, strict)?;
    let kernel = binary_kernel(op);

    if x.shape() == y.shape() {
        let data = x
            .tensor
            .data()
            .iter()
            .zip(y.tensor.data())
            .map(|(&a, &b)| kernel(a, b))
            .collect();
        return Ok(Tensor::from_vec(data, &out_shape)?);
    }
    zip_broadcast(x.tensor, y.tensor, &out_shape, kernel)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_activation_values() {
        assert!(close(unary_kernel(UnaryOp::Sigmoid)(0.0), 0.5));
        assert!(close(unary_kernel(UnaryOp::Gelu)(0.0), 0.0));
        assert!(close(unary_kernel(UnaryOp::Softplus)(0.0), 2f64.ln()));
        assert!(close(unary_kernel(UnaryOp::Elu)(-1.0), (-1f64).exp() - 1.0));
        assert!(close(unary_kernel(UnaryOp::Selu)(1.0), SELU_SCALE));
        assert_eq!(unary_kernel(UnaryOp::ReLU)(-3.0), 0.0);
    }

    #[test]
    fn test_sigmoid_is_stable_for_large_inputs() {
        let k = unary_kernel(UnaryOp::Sigmoid);
        assert!(close(k(1000.0), 1.0));
        assert!(close(k(-1000.0), 0.0));
        assert!(unary_kernel(UnaryOp::Softplus)(1000.0).is_finite());
    }

    #[test]
    fn test_sign_and_not() {
        let sign = unary_kernel(UnaryOp::Sign);
        assert_eq!(sign(-2.5), -1.0);
        assert_eq!(sign(0.0), 0.0);
        assert_eq!(sign(7.0), 1.0);
        let not = unary_kernel(UnaryOp::Not);
        assert_eq!(not(0.0), 1.0);
        assert_eq!(not(-0.5), 0.0);
    }

    #[test]
    fn test_comparison_and_logic() {
        assert_eq!(binary_kernel(BinaryOp::Lt)(1.0, 2.0), 1.0);
        assert_eq!(binary_kernel(BinaryOp::Ge)(1.0, 2.0), 0.0);
        assert_eq!(binary_kernel(BinaryOp::Xor)(1.0, 0.0), 1.0);
        assert_eq!(binary_kernel(BinaryOp::Xor)(3.0, 2.0), 0.0);
        assert_eq!(binary_kernel(BinaryOp::Mod)(-7.0, 3.0), -1.0);
    }

    #[test]
    fn test_binary_same_shape() {
        let a = Tensor::vector(&[1.0, 2.0, 3.0]);
        let b = Tensor::vector(&[4.0, 5.0, 6.0]);
        let out = binary(
            BinaryOp::Mul,
            Operand::new(&a, false, "a"),
            Operand::new(&b, false, "b"),
            true,
        )
        .unwrap();
        assert_eq!(out.data(), &[4.0, 10.0, 18.0]);
    }

    #[test]
    fn test_binary_requires_flag_in_strict_mode() {
        let a = Tensor::ones(&[2, 2]);
        let s = Tensor::scalar(2.0);
        let err = binary(
            BinaryOp::Add,
            Operand::new(&a, false, "a"),
            Operand::new(&s, false, "s"),
            true,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Shape(_)));

        let out = binary(
            BinaryOp::Add,
            Operand::new(&a, false, "a"),
            Operand::new(&s, true, "s"),
            true,
        )
        .unwrap();
        assert_eq!(out.data(), &[3.0; 4]);
    }
}
