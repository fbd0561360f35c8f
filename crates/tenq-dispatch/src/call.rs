//! Operation calls: an [`Op`] plus its operand references
//!
//! Every operation has a constructor here. Axis-taking families use the
//! typed selectors from `tenq_exec`; the integer `-1` convention is
//! available through their `from_sentinel` constructors.
//!
//! ```
//! use tenq_dispatch::Call;
//! use tenq_exec::{AxisSel, Reduction};
//!
//! let total = Call::sum("x", Reduction::All);
//! let running = Call::accumulate("x", AxisSel::from_sentinel(-1).unwrap());
//! assert_eq!(total.op().name(), "sum");
//! assert_eq!(running.op().name(), "accumulate");
//! ```

use smallvec::{smallvec, SmallVec};

use tenq_exec::{
    AxisOp, AxisSel, BinaryOp, ConvParams, ConvRank, LossOp, Op, ReduceOp, Reduction,
    SpatialSize, TransposeAxes, UnaryOp,
};

use crate::operand::OperandRef;

/// Operand list; no operation takes more than three.
pub type Operands = SmallVec<[OperandRef; 3]>;

/// A single operation request.
#[derive(Clone, Debug, PartialEq)]
pub struct Call {
    pub(crate) op: Op,
    pub(crate) operands: Operands,
}

impl Call {
    /// Build a call from parts. Arity is checked at dispatch.
    pub fn new(op: Op, operands: impl IntoIterator<Item = OperandRef>) -> Self {
        Self {
            op,
            operands: operands.into_iter().collect(),
        }
    }

    pub fn op(&self) -> &Op {
        &self.op
    }

    pub fn operands(&self) -> &[OperandRef] {
        &self.operands
    }

    pub fn unary(op: UnaryOp, x: impl Into<OperandRef>) -> Self {
        Self {
            op: Op::Unary(op),
            operands: smallvec![x.into()],
        }
    }

    pub fn binary(op: BinaryOp, a: impl Into<OperandRef>, b: impl Into<OperandRef>) -> Self {
        Self {
            op: Op::Binary(op),
            operands: smallvec![a.into(), b.into()],
        }
    }

    pub fn reduce(op: ReduceOp, x: impl Into<OperandRef>, reduction: Reduction) -> Self {
        Self {
            op: Op::Reduce { op, reduction },
            operands: smallvec![x.into()],
        }
    }

    pub fn along(op: AxisOp, x: impl Into<OperandRef>, axis: AxisSel) -> Self {
        Self {
            op: Op::Axis { op, axis },
            operands: smallvec![x.into()],
        }
    }

    fn pair(op: Op, a: impl Into<OperandRef>, b: impl Into<OperandRef>) -> Self {
        Self {
            op,
            operands: smallvec![a.into(), b.into()],
        }
    }

    /// Swap axis 0 and the last axis.
    pub fn transpose(x: impl Into<OperandRef>) -> Self {
        Self::transpose_axes(x, TransposeAxes::Default)
    }

    pub fn transpose_axes(x: impl Into<OperandRef>, axes: TransposeAxes) -> Self {
        Self {
            op: Op::Transpose(axes),
            operands: smallvec![x.into()],
        }
    }

    pub fn dot(a: impl Into<OperandRef>, b: impl Into<OperandRef>) -> Self {
        Self::pair(Op::Dot, a, b)
    }

    pub fn matmul(a: impl Into<OperandRef>, b: impl Into<OperandRef>) -> Self {
        Self::pair(Op::MatMul, a, b)
    }

    /// `matmul(a, b) + bias`
    pub fn affine(
        a: impl Into<OperandRef>,
        b: impl Into<OperandRef>,
        bias: impl Into<OperandRef>,
    ) -> Self {
        Self {
            op: Op::Affine,
            operands: smallvec![a.into(), b.into(), bias.into()],
        }
    }

    /// Mean-squared error
    pub fn mse(pred: impl Into<OperandRef>, target: impl Into<OperandRef>) -> Self {
        Self::pair(Op::Loss(LossOp::MeanSquaredError), pred, target)
    }

    pub fn cross_entropy(pred: impl Into<OperandRef>, target: impl Into<OperandRef>) -> Self {
        Self::pair(Op::Loss(LossOp::CrossEntropy), pred, target)
    }

    /// Softmax along axis 1.
    pub fn softmax(x: impl Into<OperandRef>) -> Self {
        Self::softmax_along(x, Op::SOFTMAX_DEFAULT_AXIS)
    }

    pub fn softmax_along(x: impl Into<OperandRef>, axis: usize) -> Self {
        Self {
            op: Op::Softmax { axis },
            operands: smallvec![x.into()],
        }
    }

    /// im2col over `[N, C, L]` input with a `[F, C, K]` kernel.
    pub fn lower_1d(
        input: impl Into<OperandRef>,
        kernel: impl Into<OperandRef>,
        params: ConvParams,
    ) -> Self {
        let op = Op::Lower {
            rank: ConvRank::One,
            params,
        };
        Self::pair(op, input, kernel)
    }

    /// im2col over `[N, C, H, W]` input with a `[F, C, KH, KW]` kernel.
    pub fn lower_2d(
        input: impl Into<OperandRef>,
        kernel: impl Into<OperandRef>,
        params: ConvParams,
    ) -> Self {
        let op = Op::Lower {
            rank: ConvRank::Two,
            params,
        };
        Self::pair(op, input, kernel)
    }

    /// Inverse of [`Call::lower_1d`]; `length` defaults to the smallest
    /// input length consistent with the lowered shape.
    ///
    /// Input positions read by no patch come back as zero. That happens
    /// when the stride exceeds the kernel extent, or when `length` leaves
    /// a tail the last patch does not reach; the round trip through
    /// [`Call::lower_1d`] is exact only where every position is covered.
    pub fn unlower_1d(
        cols: impl Into<OperandRef>,
        kernel: impl Into<OperandRef>,
        params: ConvParams,
        length: Option<usize>,
    ) -> Self {
        let op = Op::Unlower {
            rank: ConvRank::One,
            params,
            target: length.map(SpatialSize::Length),
        };
        Self::pair(op, cols, kernel)
    }

    /// Inverse of [`Call::lower_2d`]. Uncovered input positions are zero,
    /// as for [`Call::unlower_1d`].
    pub fn unlower_2d(
        cols: impl Into<OperandRef>,
        kernel: impl Into<OperandRef>,
        params: ConvParams,
        plane: Option<(usize, usize)>,
    ) -> Self {
        let op = Op::Unlower {
            rank: ConvRank::Two,
            params,
            target: plane.map(|(h, w)| SpatialSize::Plane(h, w)),
        };
        Self::pair(op, cols, kernel)
    }
}

macro_rules! unary_calls {
    ($($name:ident => $op:ident),* $(,)?) => {
        impl Call {
            $(
                pub fn $name(x: impl Into<OperandRef>) -> Self {
                    Self::unary(UnaryOp::$op, x)
                }
            )*
        }
    };
}

macro_rules! binary_calls {
    ($($name:ident => $op:ident),* $(,)?) => {
        impl Call {
            $(
                pub fn $name(a: impl Into<OperandRef>, b: impl Into<OperandRef>) -> Self {
                    Self::binary(BinaryOp::$op, a, b)
                }
            )*
        }
    };
}

macro_rules! reduce_calls {
    ($($name:ident => $op:ident),* $(,)?) => {
        impl Call {
            $(
                pub fn $name(x: impl Into<OperandRef>, reduction: Reduction) -> Self {
                    Self::reduce(ReduceOp::$op, x, reduction)
                }
            )*
        }
    };
}

macro_rules! axis_calls {
    ($($name:ident => $op:ident),* $(,)?) => {
        impl Call {
            $(
                pub fn $name(x: impl Into<OperandRef>, axis: AxisSel) -> Self {
                    Self::along(AxisOp::$op, x, axis)
                }
            )*
        }
    };
}

unary_calls! {
    abs => Abs,
    neg => Neg,
    sqrt => Sqrt,
    square => Square,
    cube => Cube,
    exp => Exp,
    log => Log,
    log2 => Log2,
    log10 => Log10,
    sin => Sin,
    cos => Cos,
    tan => Tan,
    asin => Asin,
    acos => Acos,
    atan => Atan,
    sinh => Sinh,
    cosh => Cosh,
    tanh => Tanh,
    sigmoid => Sigmoid,
    relu => ReLU,
    gelu => Gelu,
    elu => Elu,
    selu => Selu,
    softplus => Softplus,
    sign => Sign,
    floor => Floor,
    ceil => Ceil,
    round => Round,
    reciprocal => Reciprocal,
    logical_not => Not,
}

binary_calls! {
    add => Add,
    sub => Sub,
    mul => Mul,
    div => Div,
    pow => Pow,
    maximum => Maximum,
    minimum => Minimum,
    modulo => Mod,
    atan2 => Atan2,
    equal => Eq,
    not_equal => Ne,
    less => Lt,
    less_equal => Le,
    greater => Gt,
    greater_equal => Ge,
    logical_and => And,
    logical_or => Or,
    logical_xor => Xor,
}

reduce_calls! {
    sum => Sum,
    mean => Mean,
    var => Var,
    std => Std,
    max => Max,
    min => Min,
}

axis_calls! {
    accumulate => Accumulate,
    compress => Compress,
    expand => Expand,
    argmax => ArgMax,
    argmin => ArgMin,
    axis_max => AxisMax,
    axis_min => AxisMin,
}
