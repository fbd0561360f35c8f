//! Operation identifiers and per-family parameters.
//!
//! Every operation the engine understands is one [`Op`] value. Families
//! that take an axis use explicit enums instead of a `-1` sentinel; the
//! `from_sentinel` constructors translate the integer convention where
//! callers still use it.

use tenq_core::ArgumentError;

/// Tensor axis index (zero-based).
pub type Axis = usize;

/// Elementwise single-operand operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Abs,
    Neg,
    Sqrt,
    Square,
    Cube,
    Exp,
    /// Natural logarithm
    Log,
    Log2,
    Log10,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Sigmoid,
    ReLU,
    /// Tanh approximation of GELU
    Gelu,
    Elu,
    Selu,
    Softplus,
    /// -1, 0 or 1
    Sign,
    Floor,
    Ceil,
    Round,
    Reciprocal,
    /// Logical not: 1 for zero, 0 otherwise
    Not,
}

impl UnaryOp {
    /// Every unary operation.
    pub const ALL: [UnaryOp; 30] = [
        UnaryOp::Abs,
        UnaryOp::Neg,
        UnaryOp::Sqrt,
        UnaryOp::Square,
        UnaryOp::Cube,
        UnaryOp::Exp,
        UnaryOp::Log,
        UnaryOp::Log2,
        UnaryOp::Log10,
        UnaryOp::Sin,
        UnaryOp::Cos,
        UnaryOp::Tan,
        UnaryOp::Asin,
        UnaryOp::Acos,
        UnaryOp::Atan,
        UnaryOp::Sinh,
        UnaryOp::Cosh,
        UnaryOp::Tanh,
        UnaryOp::Sigmoid,
        UnaryOp::ReLU,
        UnaryOp::Gelu,
        UnaryOp::Elu,
        UnaryOp::Selu,
        UnaryOp::Softplus,
        UnaryOp::Sign,
        UnaryOp::Floor,
        UnaryOp::Ceil,
        UnaryOp::Round,
        UnaryOp::Reciprocal,
        UnaryOp::Not,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            UnaryOp::Abs => "abs",
            UnaryOp::Neg => "neg",
            UnaryOp::Sqrt => "sqrt",
            UnaryOp::Square => "square",
            UnaryOp::Cube => "cube",
            UnaryOp::Exp => "exp",
            UnaryOp::Log => "log",
            UnaryOp::Log2 => "log2",
            UnaryOp::Log10 => "log10",
            UnaryOp::Sin => "sin",
            UnaryOp::Cos => "cos",
            UnaryOp::Tan => "tan",
            UnaryOp::Asin => "asin",
            UnaryOp::Acos => "acos",
            UnaryOp::Atan => "atan",
            UnaryOp::Sinh => "sinh",
            UnaryOp::Cosh => "cosh",
            UnaryOp::Tanh => "tanh",
            UnaryOp::Sigmoid => "sigmoid",
            UnaryOp::ReLU => "relu",
            UnaryOp::Gelu => "gelu",
            UnaryOp::Elu => "elu",
            UnaryOp::Selu => "selu",
            UnaryOp::Softplus => "softplus",
            UnaryOp::Sign => "sign",
            UnaryOp::Floor => "floor",
            UnaryOp::Ceil => "ceil",
            UnaryOp::Round => "round",
            UnaryOp::Reciprocal => "reciprocal",
            UnaryOp::Not => "not",
        }
    }
}

/// Elementwise two-operand operations (math, comparison, logic).
///
/// Comparison and logic operations produce `1.0` for true and `0.0` for
/// false; logic operations treat any non-zero value as true.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Maximum,
    Minimum,
    /// Remainder with the sign of the dividend
    Mod,
    Atan2,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Xor,
}

impl BinaryOp {
    /// Every binary operation.
    pub const ALL: [BinaryOp; 18] = [
        BinaryOp::Add,
        BinaryOp::Sub,
        BinaryOp::Mul,
        BinaryOp::Div,
        BinaryOp::Pow,
        BinaryOp::Maximum,
        BinaryOp::Minimum,
        BinaryOp::Mod,
        BinaryOp::Atan2,
        BinaryOp::Eq,
        BinaryOp::Ne,
        BinaryOp::Lt,
        BinaryOp::Le,
        BinaryOp::Gt,
        BinaryOp::Ge,
        BinaryOp::And,
        BinaryOp::Or,
        BinaryOp::Xor,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Div => "div",
            BinaryOp::Pow => "pow",
            BinaryOp::Maximum => "maximum",
            BinaryOp::Minimum => "minimum",
            BinaryOp::Mod => "mod",
            BinaryOp::Atan2 => "atan2",
            BinaryOp::Eq => "eq",
            BinaryOp::Ne => "ne",
            BinaryOp::Lt => "lt",
            BinaryOp::Le => "le",
            BinaryOp::Gt => "gt",
            BinaryOp::Ge => "ge",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Xor => "xor",
        }
    }
}

/// Full reducers: may collapse one axis or every axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReduceOp {
    Sum,
    Mean,
    /// Population variance
    Var,
    /// Population standard deviation
    Std,
    Max,
    Min,
}

impl ReduceOp {
    pub fn name(&self) -> &'static str {
        match self {
            ReduceOp::Sum => "sum",
            ReduceOp::Mean => "mean",
            ReduceOp::Var => "var",
            ReduceOp::Std => "std",
            ReduceOp::Max => "max",
            ReduceOp::Min => "min",
        }
    }
}

/// Reduction extent for [`ReduceOp`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Reduction {
    /// Collapse every axis into a scalar.
    #[default]
    All,
    /// Collapse a single axis.
    Along(Axis),
}

impl Reduction {
    /// `-1` means every axis; non-negative values name an axis.
    ///
    /// ```
    /// use tenq_exec::Reduction;
    ///
    /// assert_eq!(Reduction::from_sentinel(-1).unwrap(), Reduction::All);
    /// assert_eq!(Reduction::from_sentinel(2).unwrap(), Reduction::Along(2));
    /// assert!(Reduction::from_sentinel(-3).is_err());
    /// ```
    pub fn from_sentinel(axis: i64) -> Result<Self, ArgumentError> {
        match axis {
            -1 => Ok(Reduction::All),
            a if a >= 0 => Ok(Reduction::Along(a as Axis)),
            value => Err(ArgumentError::Sentinel {
                what: "reduction axis",
                value,
            }),
        }
    }
}

/// Single-axis operations: cumulative, positional and shape-editing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AxisOp {
    /// Cumulative sum along the axis
    Accumulate,
    /// Remove a size-1 axis
    Compress,
    /// Insert a size-1 axis
    Expand,
    /// Index of the first maximum; the axis is dropped
    ArgMax,
    /// Index of the first minimum; the axis is dropped
    ArgMin,
    /// Maximum along the axis, kept with size 1
    AxisMax,
    /// Minimum along the axis, kept with size 1
    AxisMin,
}

impl AxisOp {
    pub fn name(&self) -> &'static str {
        match self {
            AxisOp::Accumulate => "accumulate",
            AxisOp::Compress => "compress",
            AxisOp::Expand => "expand",
            AxisOp::ArgMax => "argmax",
            AxisOp::ArgMin => "argmin",
            AxisOp::AxisMax => "axis_max",
            AxisOp::AxisMin => "axis_min",
        }
    }
}

/// Axis selection for [`AxisOp`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AxisSel {
    /// Axis 0.
    #[default]
    First,
    /// An explicit axis.
    At(Axis),
}

impl AxisSel {
    /// `-1` means axis 0; non-negative values name an axis.
    pub fn from_sentinel(axis: i64) -> Result<Self, ArgumentError> {
        match axis {
            -1 => Ok(AxisSel::First),
            a if a >= 0 => Ok(AxisSel::At(a as Axis)),
            value => Err(ArgumentError::Sentinel {
                what: "single-axis selection",
                value,
            }),
        }
    }

    /// Concrete axis index.
    pub fn index(&self) -> Axis {
        match self {
            AxisSel::First => 0,
            AxisSel::At(axis) => *axis,
        }
    }
}

/// One endpoint of a transpose swap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AxisIndex {
    Index(Axis),
    /// The last axis of the operand.
    Last,
}

impl AxisIndex {
    /// `-1` means the last axis.
    pub fn from_sentinel(axis: i64) -> Result<Self, ArgumentError> {
        match axis {
            -1 => Ok(AxisIndex::Last),
            a if a >= 0 => Ok(AxisIndex::Index(a as Axis)),
            value => Err(ArgumentError::Sentinel {
                what: "transpose axis",
                value,
            }),
        }
    }

    /// Resolve against a rank; `None` if out of range.
    pub fn resolve(&self, rank: usize) -> Option<Axis> {
        match self {
            AxisIndex::Index(axis) if *axis < rank => Some(*axis),
            AxisIndex::Index(_) => None,
            AxisIndex::Last => rank.checked_sub(1),
        }
    }
}

/// Axes exchanged by a transpose.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TransposeAxes {
    /// Swap axis 0 and the last axis.
    #[default]
    Default,
    Swap(AxisIndex, AxisIndex),
}

impl TransposeAxes {
    /// Build from the integer pair convention (`-1` = last axis).
    pub fn from_sentinels(first: i64, second: i64) -> Result<Self, ArgumentError> {
        Ok(TransposeAxes::Swap(
            AxisIndex::from_sentinel(first)?,
            AxisIndex::from_sentinel(second)?,
        ))
    }
}

/// Loss functions; both produce a single-element result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LossOp {
    MeanSquaredError,
    CrossEntropy,
}

impl LossOp {
    pub fn name(&self) -> &'static str {
        match self {
            LossOp::MeanSquaredError => "mse",
            LossOp::CrossEntropy => "cross_entropy",
        }
    }
}

/// Spatial rank of a convolution lowering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConvRank {
    /// `[N, C, L]` inputs
    One,
    /// `[N, C, H, W]` inputs
    Two,
}

/// Padding and stride for convolution lowering.
///
/// Components are `(height, width)`. One-dimensional lowering reads the
/// width component.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConvParams {
    pub padding: (usize, usize),
    pub stride: (usize, usize),
}

impl Default for ConvParams {
    fn default() -> Self {
        Self::symmetric(0, 1)
    }
}

impl ConvParams {
    /// Same padding and stride on every spatial axis.
    pub fn symmetric(padding: usize, stride: usize) -> Self {
        Self {
            padding: (padding, padding),
            stride: (stride, stride),
        }
    }

    /// Per-axis padding and stride.
    pub fn per_dim(padding: (usize, usize), stride: (usize, usize)) -> Self {
        Self { padding, stride }
    }
}

/// Explicit output size for un-lowering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpatialSize {
    Length(usize),
    Plane(usize, usize),
}

/// A single engine operation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Op {
    Unary(UnaryOp),
    Binary(BinaryOp),
    Reduce {
        op: ReduceOp,
        reduction: Reduction,
    },
    Axis {
        op: AxisOp,
        axis: AxisSel,
    },
    Transpose(TransposeAxes),
    /// Rank ≤ 2 product; 1-D operands are promoted
    Dot,
    /// Batched matrix product, rank ≥ 2
    MatMul,
    /// `matmul(a, b) + bias`
    Affine,
    Loss(LossOp),
    Softmax {
        axis: Axis,
    },
    /// Patch extraction (im2col) from input and kernel
    Lower {
        rank: ConvRank,
        params: ConvParams,
    },
    /// Inverse of [`Op::Lower`]
    Unlower {
        rank: ConvRank,
        params: ConvParams,
        target: Option<SpatialSize>,
    },
}

impl Op {
    /// Default softmax axis.
    pub const SOFTMAX_DEFAULT_AXIS: Axis = 1;

    /// Number of tensor operands.
    pub fn arity(&self) -> usize {
        match self {
            Op::Unary(_)
            | Op::Reduce { .. }
            | Op::Axis { .. }
            | Op::Transpose(_)
            | Op::Softmax { .. } => 1,
            Op::Binary(_)
            | Op::Dot
            | Op::MatMul
            | Op::Loss(_)
            | Op::Lower { .. }
            | Op::Unlower { .. } => 2,
            Op::Affine => 3,
        }
    }

    /// Short operation name used in logs and diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Op::Unary(op) => op.name(),
            Op::Binary(op) => op.name(),
            Op::Reduce { op, .. } => op.name(),
            Op::Axis { op, .. } => op.name(),
            Op::Transpose(_) => "transpose",
            Op::Dot => "dot",
            Op::MatMul => "matmul",
            Op::Affine => "affine",
            Op::Loss(op) => op.name(),
            Op::Softmax { .. } => "softmax",
            Op::Lower {
                rank: ConvRank::One,
                ..
            } => "lower_1d",
            Op::Lower {
                rank: ConvRank::Two,
                ..
            } => "lower_2d",
            Op::Unlower {
                rank: ConvRank::One,
                ..
            } => "unlower_1d",
            Op::Unlower {
                rank: ConvRank::Two,
                ..
            } => "unlower_2d",
        }
    }
}
