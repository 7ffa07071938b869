//! Block kinds stored in the model arena.
//!
//! Every block is one of a small set of shapes:
//! - **Leaves**: constants, variables, parameters (no inputs, no bookkeeping)
//! - **Expressions**: 1-3 inputs combined by an operation
//! - **Adaptors**: reshape between the scalar and vector domains
//! - **Integrators**: produce accumulated state, never pull their input on read
//!
//! Inputs are held as a short sequence of references rather than through
//! per-arity types, so any shape plugs in wherever its domain is expected.

use core::cell::Cell;
use core::fmt;

use vf_core::{Axis, BlockId, FeedId, Vector3};

use crate::reference::{ScalarRef, VectorRef};

/// Most inputs an expression block may hold.
pub const MAX_INPUTS: usize = 3;

/// Per-epoch evaluation state used for algebraic loop detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvalState {
    /// Not yet pulled in the current epoch.
    #[default]
    Unevaluated,
    /// Evaluation is in progress; re-entry is an algebraic loop.
    Evaluating,
    /// Pulled at least once in the current epoch.
    Evaluated,
}

/// Combining function of a user-defined vector block.
pub type VectorFn = Box<dyn Fn(&[Vector3]) -> Vector3>;

/// Combining function of a user-defined scalar block.
pub type ScalarFn = Box<dyn Fn(&[f64]) -> f64>;

/// Operation of a vector expression block over its vector inputs.
pub enum VectorOp {
    /// Pass the single input through.
    Identity,
    Negate,
    Sum,
    Difference,
    /// Componentwise product.
    Product,
    /// `v / |v|`.
    Unit,
    Custom(VectorFn),
}

impl VectorOp {
    pub(crate) fn apply(&self, inputs: &[Vector3]) -> Vector3 {
        match (self, inputs) {
            (VectorOp::Identity, [a]) => *a,
            (VectorOp::Negate, [a]) => -*a,
            (VectorOp::Sum, [a, b]) => *a + *b,
            (VectorOp::Difference, [a, b]) => *a - *b,
            (VectorOp::Product, [a, b]) => *a * *b,
            (VectorOp::Unit, [a]) => a.unit(),
            (VectorOp::Custom(f), values) => f(values),
            // Arity is fixed when the block is allocated.
            (op, values) => unreachable!("{op:?} applied to {} inputs", values.len()),
        }
    }

    pub(crate) fn name(&self) -> &'static str {
        match self {
            VectorOp::Identity => "Expression",
            VectorOp::Negate => "Negate",
            VectorOp::Sum => "Sum",
            VectorOp::Difference => "Difference",
            VectorOp::Product => "Product",
            VectorOp::Unit => "UnitVector",
            VectorOp::Custom(_) => "Custom",
        }
    }
}

impl fmt::Debug for VectorOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Operation of a scalar expression block over its scalar inputs.
pub enum ScalarOp {
    Negate,
    Sum,
    Difference,
    Product,
    Quotient,
    Custom(ScalarFn),
}

impl ScalarOp {
    pub(crate) fn apply(&self, inputs: &[f64]) -> f64 {
        match (self, inputs) {
            (ScalarOp::Negate, [a]) => -a,
            (ScalarOp::Sum, [a, b]) => a + b,
            (ScalarOp::Difference, [a, b]) => a - b,
            (ScalarOp::Product, [a, b]) => a * b,
            (ScalarOp::Quotient, [a, b]) => a / b,
            (ScalarOp::Custom(f), values) => f(values),
            (op, values) => unreachable!("{op:?} applied to {} inputs", values.len()),
        }
    }

    pub(crate) fn name(&self) -> &'static str {
        match self {
            ScalarOp::Negate => "Negate",
            ScalarOp::Sum => "Sum",
            ScalarOp::Difference => "Difference",
            ScalarOp::Product => "Product",
            ScalarOp::Quotient => "Quotient",
            ScalarOp::Custom(_) => "Custom",
        }
    }
}

impl fmt::Debug for ScalarOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a vector is combined with a scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleOp {
    Multiply,
    Divide,
}

/// How a vector integrator's feed splits one vector pull into three axis pulls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedSync {
    /// Cache the upstream vector per evaluation epoch; any pull order works.
    #[default]
    Epoch,
    /// Phase counter expecting exactly x, y, z pulls in that order.
    ///
    /// Out-of-order pulls return the wrong axis.
    CallCount,
}

#[derive(Debug)]
pub(crate) enum VectorKind {
    Constant(Vector3),
    Variable(Vector3),
    Parameter(Vector3),
    Expression {
        op: VectorOp,
        inputs: Vec<VectorRef>,
    },
    Scaled {
        op: ScaleOp,
        vector: VectorRef,
        scalar: ScalarRef,
    },
    Adaptor([ScalarRef; 3]),
    Integrator {
        axes: [BlockId; 3],
        feed: FeedId,
    },
}

impl VectorKind {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            VectorKind::Constant(_) => "Constant",
            VectorKind::Variable(_) => "Variable",
            VectorKind::Parameter(_) => "Parameter",
            VectorKind::Expression { op, .. } => op.name(),
            VectorKind::Scaled {
                op: ScaleOp::Multiply,
                ..
            } => "Scale",
            VectorKind::Scaled {
                op: ScaleOp::Divide,
                ..
            } => "Divide",
            VectorKind::Adaptor(_) => "Adaptor",
            VectorKind::Integrator { .. } => "Integrator",
        }
    }

    /// Leaves answer directly without loop bookkeeping.
    pub(crate) fn leaf_value(&self) -> Option<Vector3> {
        match self {
            VectorKind::Constant(v) | VectorKind::Variable(v) | VectorKind::Parameter(v) => {
                Some(*v)
            }
            _ => None,
        }
    }
}

#[derive(Debug)]
pub(crate) enum ScalarKind {
    Constant(f64),
    Variable(f64),
    Parameter(f64),
    Time,
    Expression {
        op: ScalarOp,
        inputs: Vec<ScalarRef>,
    },
    Component {
        vector: VectorRef,
        axis: Axis,
    },
    Norm(VectorRef),
    Dot([VectorRef; 2]),
    Integrator {
        input: ScalarRef,
        state: f64,
    },
    /// One axis of a vector integrator's split feed.
    AxisFeed {
        feed: FeedId,
        axis: Axis,
    },
}

impl ScalarKind {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            ScalarKind::Constant(_) => "Constant",
            ScalarKind::Variable(_) => "Variable",
            ScalarKind::Parameter(_) => "Parameter",
            ScalarKind::Time => "Time",
            ScalarKind::Expression { op, .. } => op.name(),
            ScalarKind::Component { axis, .. } => match axis {
                Axis::X => "Xpart",
                Axis::Y => "Ypart",
                Axis::Z => "Zpart",
            },
            ScalarKind::Norm(_) => "Abs",
            ScalarKind::Dot(_) => "ScalarProduct",
            ScalarKind::Integrator { .. } => "Integrator",
            ScalarKind::AxisFeed { .. } => "IntegratorFeed",
        }
    }
}

/// Arena slot: the block plus its loop-detection state.
#[derive(Debug)]
pub(crate) struct Node<K> {
    pub kind: K,
    pub state: Cell<EvalState>,
    pub label: Option<String>,
}

impl<K> Node<K> {
    pub fn new(kind: K) -> Self {
        Self {
            kind,
            state: Cell::new(EvalState::Unevaluated),
            label: None,
        }
    }
}

/// Splits one vector input into three scalar pulls for a vector integrator.
#[derive(Debug)]
pub(crate) struct SplitFeed {
    pub input: VectorRef,
    pub sync: FeedSync,
    /// Next axis expected in call-count mode (0, 1, 2).
    pub phase: Cell<u8>,
    pub cached: Cell<Vector3>,
    /// Epoch at which `cached` was produced (epoch mode).
    pub cached_epoch: Cell<Option<u64>>,
    /// Number of upstream evaluations performed so far.
    pub pulls: Cell<u64>,
}

impl SplitFeed {
    pub fn new(input: VectorRef, sync: FeedSync) -> Self {
        Self {
            input,
            sync,
            phase: Cell::new(0),
            cached: Cell::new(Vector3::zero()),
            cached_epoch: Cell::new(None),
            pulls: Cell::new(0),
        }
    }
}
