//! The block arena and its evaluation protocol.
//!
//! A [`Model`] owns every block, including the anonymous nodes created by the
//! composition operators, for its whole lifetime. Evaluation takes `&Model`;
//! the only state it touches is per-block [`EvalState`] and integrator feed
//! caches, both held in `Cell`s. Wiring and value assignment take
//! `&mut Model`, so they can never interleave with an evaluation.
//!
//! # Evaluation protocol
//!
//! Within one epoch a block moves `Unevaluated -> Evaluating -> Evaluated`.
//! Pulling a block that is still `Evaluating` means its value depends on
//! itself, which is reported as [`BlockError::AlgebraicLoop`] instead of
//! recursing. Blocks do not cache their value: an `Evaluated` block simply
//! recomputes from its inputs, which cannot change within an epoch.
//! [`Model::begin_epoch`] is the step boundary that resets every state.

use core::cell::Cell;
use std::io::{self, Write};

use tracing::{debug, trace};
use vf_core::{BlockId, FeedId, Vector3, format_g};

use crate::block::{
    EvalState, FeedSync, MAX_INPUTS, Node, ScalarKind, ScaleOp, SplitFeed, VectorKind,
};
use crate::error::{BlockError, BlockResult};
use crate::reference::{
    BlockRef, Parameter, Parameter3, ScalarRef, Variable, Variable3, VectorRef,
};

/// Value produced by either kind of block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BlockValue {
    Vector(Vector3),
    Scalar(f64),
}

impl core::fmt::Display for BlockValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            BlockValue::Vector(v) => write!(f, "{v}"),
            BlockValue::Scalar(s) => write!(f, " {} ", format_g(*s)),
        }
    }
}

/// Arena owning a graph of vector and scalar blocks.
#[derive(Debug, Default)]
pub struct Model {
    pub(crate) vectors: Vec<Node<VectorKind>>,
    pub(crate) scalars: Vec<Node<ScalarKind>>,
    pub(crate) feeds: Vec<SplitFeed>,
    /// Scalar integrators in registration order (the simulation state order).
    pub(crate) integrators: Vec<BlockId>,
    pub(crate) feed_sync: FeedSync,
    epoch: u64,
    time: f64,
    running: bool,
}

impl Model {
    /// Create an empty model using epoch-keyed integrator feeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty model whose vector integrators use `sync`.
    pub fn with_feed_sync(sync: FeedSync) -> Self {
        Self {
            feed_sync: sync,
            ..Self::default()
        }
    }

    /// Feed synchronisation used by vector integrators created from now on.
    pub fn set_feed_sync(&mut self, sync: FeedSync) {
        self.feed_sync = sync;
    }

    pub fn feed_sync(&self) -> FeedSync {
        self.feed_sync
    }

    pub fn vector_count(&self) -> usize {
        self.vectors.len()
    }

    pub fn scalar_count(&self) -> usize {
        self.scalars.len()
    }

    // ---------------------------------------------------------------------
    // Run state, time and epochs
    // ---------------------------------------------------------------------

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Mark the simulation run as started or stopped. Parameters are locked
    /// while running.
    pub fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn set_time(&mut self, t: f64) {
        self.time = t;
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Step boundary: start a new evaluation epoch and clear every block's
    /// evaluation state.
    pub fn begin_epoch(&mut self) {
        self.epoch += 1;
        for node in &mut self.vectors {
            *node.state.get_mut() = EvalState::Unevaluated;
        }
        for node in &mut self.scalars {
            *node.state.get_mut() = EvalState::Unevaluated;
        }
    }

    // ---------------------------------------------------------------------
    // Allocation
    // ---------------------------------------------------------------------

    pub(crate) fn push_vector(&mut self, kind: VectorKind) -> VectorRef {
        let id = BlockId::next(self.vectors.len());
        trace!(block = %id, kind = kind.name(), "allocated vector block");
        self.vectors.push(Node::new(kind));
        VectorRef(id)
    }

    pub(crate) fn push_scalar(&mut self, kind: ScalarKind) -> ScalarRef {
        let id = BlockId::next(self.scalars.len());
        trace!(block = %id, kind = kind.name(), "allocated scalar block");
        self.scalars.push(Node::new(kind));
        ScalarRef(id)
    }

    pub(crate) fn push_feed(&mut self, feed: SplitFeed) -> FeedId {
        let id = FeedId::next(self.feeds.len());
        self.feeds.push(feed);
        id
    }

    /// Vector value that never changes.
    pub fn constant3(&mut self, value: Vector3) -> VectorRef {
        self.push_vector(VectorKind::Constant(value))
    }

    /// Vector value assignable at any time, including during a run.
    pub fn variable3(&mut self, value: Vector3) -> Variable3 {
        Variable3(self.push_vector(VectorKind::Variable(value)).0)
    }

    /// Vector value that may only change before the run starts.
    pub fn parameter3(&mut self, value: Vector3) -> Parameter3 {
        Parameter3(self.push_vector(VectorKind::Parameter(value)).0)
    }

    pub fn constant(&mut self, value: f64) -> ScalarRef {
        self.push_scalar(ScalarKind::Constant(value))
    }

    pub fn variable(&mut self, value: f64) -> Variable {
        Variable(self.push_scalar(ScalarKind::Variable(value)).0)
    }

    pub fn parameter(&mut self, value: f64) -> Parameter {
        Parameter(self.push_scalar(ScalarKind::Parameter(value)).0)
    }

    /// Current model time as a scalar block.
    pub fn time_block(&mut self) -> ScalarRef {
        self.push_scalar(ScalarKind::Time)
    }

    /// Attach a diagnostic name used in error reports and traces.
    pub fn label(
        &mut self,
        block: impl Into<BlockRef>,
        name: impl Into<String>,
    ) -> BlockResult<()> {
        let name = Some(name.into());
        match block.into() {
            BlockRef::Vector(r) => self.vector_node_mut(r)?.label = name,
            BlockRef::Scalar(r) => self.scalar_node_mut(r)?.label = name,
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Assignment and rewiring
    // ---------------------------------------------------------------------

    pub fn set_variable3(&mut self, var: Variable3, value: Vector3) -> BlockResult<()> {
        let r = var.output();
        let block = self.describe(r.into());
        match &mut self.vector_node_mut(r)?.kind {
            VectorKind::Variable(v) => {
                *v = value;
                Ok(())
            }
            _ => Err(BlockError::WrongKind {
                operation: "set_variable3",
                block,
            }),
        }
    }

    /// Assign a vector parameter. Rejected once the run has started.
    pub fn set_parameter3(&mut self, param: Parameter3, value: Vector3) -> BlockResult<()> {
        let r = param.output();
        let block = self.describe(r.into());
        if self.running {
            return Err(BlockError::LockedParameter { block });
        }
        match &mut self.vector_node_mut(r)?.kind {
            VectorKind::Parameter(v) => {
                *v = value;
                Ok(())
            }
            _ => Err(BlockError::WrongKind {
                operation: "set_parameter3",
                block,
            }),
        }
    }

    pub fn set_variable(&mut self, var: Variable, value: f64) -> BlockResult<()> {
        let r = var.output();
        let block = self.describe(r.into());
        match &mut self.scalar_node_mut(r)?.kind {
            ScalarKind::Variable(v) => {
                *v = value;
                Ok(())
            }
            _ => Err(BlockError::WrongKind {
                operation: "set_variable",
                block,
            }),
        }
    }

    pub fn set_parameter(&mut self, param: Parameter, value: f64) -> BlockResult<()> {
        let r = param.output();
        let block = self.describe(r.into());
        if self.running {
            return Err(BlockError::LockedParameter { block });
        }
        match &mut self.scalar_node_mut(r)?.kind {
            ScalarKind::Parameter(v) => {
                *v = value;
                Ok(())
            }
            _ => Err(BlockError::WrongKind {
                operation: "set_parameter",
                block,
            }),
        }
    }

    /// Rewire input `slot` of a vector block, returning the previous input.
    ///
    /// Slots count the block's vector inputs in construction order.
    pub fn set_input(
        &mut self,
        block: VectorRef,
        slot: usize,
        input: impl Into<VectorRef>,
    ) -> BlockResult<VectorRef> {
        let input = input.into();
        let described = self.describe(block.into());
        let target = match &mut self.vector_node_mut(block)?.kind {
            VectorKind::Expression { inputs, .. } => inputs.get_mut(slot),
            VectorKind::Scaled { vector, .. } if slot == 0 => Some(vector),
            VectorKind::Scaled { .. } => None,
            _ => {
                return Err(BlockError::WrongKind {
                    operation: "set_input",
                    block: described,
                });
            }
        };
        match target {
            Some(current) => Ok(current.set(input)),
            None => Err(BlockError::InvalidArg {
                what: format!("{described} has no vector input slot {slot}"),
            }),
        }
    }

    /// Rewire input `slot` of a scalar expression block, returning the
    /// previous input.
    pub fn set_scalar_input(
        &mut self,
        block: ScalarRef,
        slot: usize,
        input: impl Into<ScalarRef>,
    ) -> BlockResult<ScalarRef> {
        let input = input.into();
        let described = self.describe(block.into());
        match &mut self.scalar_node_mut(block)?.kind {
            ScalarKind::Expression { inputs, .. } => match inputs.get_mut(slot) {
                Some(current) => Ok(current.set(input)),
                None => Err(BlockError::InvalidArg {
                    what: format!("{described} has no scalar input slot {slot}"),
                }),
            },
            _ => Err(BlockError::WrongKind {
                operation: "set_scalar_input",
                block: described,
            }),
        }
    }

    // ---------------------------------------------------------------------
    // Evaluation
    // ---------------------------------------------------------------------

    /// Current value of a vector block, with algebraic loop detection.
    pub fn value(&self, r: VectorRef) -> BlockResult<Vector3> {
        let node = self.vector_node(r)?;
        if let Some(v) = node.kind.leaf_value() {
            return Ok(v);
        }
        self.guarded(&node.state, r.into(), || self.compute_vector(&node.kind))
    }

    /// Current value of a scalar block, with algebraic loop detection.
    pub fn scalar_value(&self, r: ScalarRef) -> BlockResult<f64> {
        let node = self.scalar_node(r)?;
        match &node.kind {
            ScalarKind::Constant(v)
            | ScalarKind::Variable(v)
            | ScalarKind::Parameter(v)
            | ScalarKind::Integrator { state: v, .. } => return Ok(*v),
            ScalarKind::Time => return Ok(self.time),
            _ => {}
        }
        self.guarded(&node.state, r.into(), || self.compute_scalar(&node.kind))
    }

    /// Current value of either kind of block.
    pub fn read(&self, r: impl Into<BlockRef>) -> BlockResult<BlockValue> {
        match r.into() {
            BlockRef::Vector(v) => self.value(v).map(BlockValue::Vector),
            BlockRef::Scalar(s) => self.scalar_value(s).map(BlockValue::Scalar),
        }
    }

    /// Evaluation state of a block in the current epoch.
    pub fn evaluation_state(&self, r: impl Into<BlockRef>) -> BlockResult<EvalState> {
        match r.into() {
            BlockRef::Vector(v) => Ok(self.vector_node(v)?.state.get()),
            BlockRef::Scalar(s) => Ok(self.scalar_node(s)?.state.get()),
        }
    }

    /// Write the current value of a block to `sink` in trace format.
    pub fn print<W: Write + ?Sized>(
        &self,
        r: impl Into<BlockRef>,
        sink: &mut W,
    ) -> BlockResult<()> {
        let value = self.read(r)?;
        write!(sink, "{value}")?;
        Ok(())
    }

    /// Write the current value of a block to stdout.
    pub fn print_stdout(&self, r: impl Into<BlockRef>) -> BlockResult<()> {
        self.print(r, &mut io::stdout().lock())
    }

    fn guarded<T>(
        &self,
        state: &Cell<EvalState>,
        block: BlockRef,
        compute: impl FnOnce() -> BlockResult<T>,
    ) -> BlockResult<T> {
        if state.get() == EvalState::Evaluating {
            let block = self.describe(block);
            debug!(%block, epoch = self.epoch, "algebraic loop detected");
            return Err(BlockError::AlgebraicLoop { block });
        }
        state.set(EvalState::Evaluating);
        let result = compute();
        // A failed pull leaves the block re-enterable for a retry after rewiring.
        state.set(if result.is_ok() {
            EvalState::Evaluated
        } else {
            EvalState::Unevaluated
        });
        result
    }

    fn compute_vector(&self, kind: &VectorKind) -> BlockResult<Vector3> {
        match kind {
            VectorKind::Constant(v) | VectorKind::Variable(v) | VectorKind::Parameter(v) => Ok(*v),
            VectorKind::Expression { op, inputs } => {
                let mut values = [Vector3::zero(); MAX_INPUTS];
                for (slot, input) in values.iter_mut().zip(inputs) {
                    *slot = self.value(*input)?;
                }
                Ok(op.apply(&values[..inputs.len()]))
            }
            VectorKind::Scaled { op, vector, scalar } => {
                let v = self.value(*vector)?;
                let s = self.scalar_value(*scalar)?;
                Ok(match op {
                    ScaleOp::Multiply => v * s,
                    ScaleOp::Divide => v / s,
                })
            }
            VectorKind::Adaptor([x, y, z]) => Ok(Vector3::new(
                self.scalar_value(*x)?,
                self.scalar_value(*y)?,
                self.scalar_value(*z)?,
            )),
            VectorKind::Integrator { axes, .. } => {
                let [x, y, z] = *axes;
                Ok(Vector3::new(
                    self.integrator_state(x)?,
                    self.integrator_state(y)?,
                    self.integrator_state(z)?,
                ))
            }
        }
    }

    fn compute_scalar(&self, kind: &ScalarKind) -> BlockResult<f64> {
        match kind {
            ScalarKind::Constant(v)
            | ScalarKind::Variable(v)
            | ScalarKind::Parameter(v)
            | ScalarKind::Integrator { state: v, .. } => Ok(*v),
            ScalarKind::Time => Ok(self.time),
            ScalarKind::Expression { op, inputs } => {
                let mut values = [0.0; MAX_INPUTS];
                for (slot, input) in values.iter_mut().zip(inputs) {
                    *slot = self.scalar_value(*input)?;
                }
                Ok(op.apply(&values[..inputs.len()]))
            }
            ScalarKind::Component { vector, axis } => Ok(self.value(*vector)?.component(*axis)),
            ScalarKind::Norm(vector) => Ok(self.value(*vector)?.abs()),
            ScalarKind::Dot([a, b]) => Ok(self.value(*a)?.dot(self.value(*b)?)),
            ScalarKind::AxisFeed { feed, axis } => self.pull_feed(*feed, *axis),
        }
    }

    // ---------------------------------------------------------------------
    // Arena access
    // ---------------------------------------------------------------------

    pub(crate) fn vector_node(&self, r: VectorRef) -> BlockResult<&Node<VectorKind>> {
        self.vectors
            .get(r.0.slot())
            .ok_or_else(|| unknown(BlockRef::Vector(r)))
    }

    pub(crate) fn vector_node_mut(&mut self, r: VectorRef) -> BlockResult<&mut Node<VectorKind>> {
        self.vectors
            .get_mut(r.0.slot())
            .ok_or_else(|| unknown(BlockRef::Vector(r)))
    }

    pub(crate) fn scalar_node(&self, r: ScalarRef) -> BlockResult<&Node<ScalarKind>> {
        self.scalars
            .get(r.0.slot())
            .ok_or_else(|| unknown(BlockRef::Scalar(r)))
    }

    pub(crate) fn scalar_node_mut(&mut self, r: ScalarRef) -> BlockResult<&mut Node<ScalarKind>> {
        self.scalars
            .get_mut(r.0.slot())
            .ok_or_else(|| unknown(BlockRef::Scalar(r)))
    }

    /// Human-readable identity of a block, e.g. `vector block #4 (Sum "drag")`.
    pub fn describe(&self, block: BlockRef) -> String {
        let (kind, label) = match block {
            BlockRef::Vector(r) => match self.vectors.get(r.0.slot()) {
                Some(node) => (node.kind.name(), node.label.as_deref()),
                None => return format!("{block} (unknown)"),
            },
            BlockRef::Scalar(r) => match self.scalars.get(r.0.slot()) {
                Some(node) => (node.kind.name(), node.label.as_deref()),
                None => return format!("{block} (unknown)"),
            },
        };
        match label {
            Some(label) => format!("{block} ({kind} \"{label}\")"),
            None => format!("{block} ({kind})"),
        }
    }
}

fn unknown(block: BlockRef) -> BlockError {
    BlockError::UnknownBlock {
        what: block.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_returns_value_in_every_epoch() {
        let mut model = Model::new();
        let c = model.constant3(Vector3::new(1.0, 2.0, 3.0));

        for _ in 0..3 {
            model.begin_epoch();
            for _ in 0..4 {
                assert_eq!(model.value(c).unwrap(), Vector3::new(1.0, 2.0, 3.0));
            }
        }
        assert_eq!(model.evaluation_state(c).unwrap(), EvalState::Unevaluated);
    }

    #[test]
    fn variable_assignment_is_observed_on_next_pull() {
        let mut model = Model::new();
        let v = model.variable3(Vector3::zero());
        model.set_variable3(v, Vector3::new(1.0, 2.0, 3.0)).unwrap();
        assert_eq!(model.value(v.into()).unwrap(), Vector3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn parameter_is_locked_while_running() {
        let mut model = Model::new();
        let p = model.parameter3(Vector3::zero());
        model.set_parameter3(p, Vector3::new(0.0, 0.0, 1.0)).unwrap();

        model.set_running(true);
        let err = model.set_parameter3(p, Vector3::new(9.0, 9.0, 9.0)).unwrap_err();
        assert!(matches!(err, BlockError::LockedParameter { .. }));
        assert_eq!(model.value(p.into()).unwrap(), Vector3::new(0.0, 0.0, 1.0));

        let s = model.parameter(1.0);
        assert!(model.set_parameter(s, 2.0).is_err());
        model.set_running(false);
        model.set_parameter(s, 2.0).unwrap();
        assert_eq!(model.scalar_value(s.into()).unwrap(), 2.0);
    }

    #[test]
    fn variables_stay_writable_while_running() {
        let mut model = Model::new();
        let v = model.variable(1.0);
        model.set_running(true);
        model.set_variable(v, 4.0).unwrap();
        assert_eq!(model.scalar_value(v.into()).unwrap(), 4.0);
    }

    #[test]
    fn wrong_kind_is_reported() {
        let mut model = Model::new();
        let c = model.constant3(Vector3::zero());
        let err = model.set_variable3(Variable3(c.id()), Vector3::zero()).unwrap_err();
        assert!(matches!(
            err,
            BlockError::WrongKind {
                operation: "set_variable3",
                ..
            }
        ));
    }

    #[test]
    fn foreign_reference_is_unknown() {
        let mut other = Model::new();
        other.constant3(Vector3::zero());
        let foreign = other.constant3(Vector3::zero());

        let model = Model::new();
        assert!(matches!(
            model.value(foreign).unwrap_err(),
            BlockError::UnknownBlock { .. }
        ));
    }

    #[test]
    fn time_block_reads_model_time() {
        let mut model = Model::new();
        let t = model.time_block();
        model.set_time(2.5);
        assert_eq!(model.scalar_value(t).unwrap(), 2.5);
    }

    #[test]
    fn print_uses_trace_format() {
        let mut model = Model::new();
        let c = model.constant3(Vector3::new(1.0, 0.25, -2.0));
        let s = model.constant(0.5);

        let mut out = Vec::new();
        model.print(c, &mut out).unwrap();
        model.print(s, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), " 1 0.25 -2  0.5 ");
    }

    #[test]
    fn describe_includes_label() {
        let mut model = Model::new();
        let c = model.constant3(Vector3::zero());
        model.label(c, "origin").unwrap();
        assert_eq!(model.describe(c.into()), "vector block #0 (Constant \"origin\")");
    }
}
