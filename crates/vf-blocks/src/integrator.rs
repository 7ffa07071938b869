//! Scalar and vector integrators.
//!
//! A scalar integrator's value is its accumulated state; reading it never
//! pulls its input, which is what lets feedback loops pass through an
//! integrator. The simulation driver pulls every integrator input once per
//! evaluation epoch via [`Model::integrator_derivatives`] and writes the new
//! states back with [`Model::load_integrator_states`].
//!
//! A vector integrator is three scalar integrators (x, y, z, registered
//! consecutively) fed by one [`SplitFeed`]. The feed evaluates the upstream
//! vector once and hands out its components, so the upstream expression runs
//! once per epoch rather than once per axis.

use tracing::warn;
use vf_core::{Axis, BlockId, FeedId, Vector3};

use crate::block::{FeedSync, ScalarKind, SplitFeed, VectorKind};
use crate::error::{BlockError, BlockResult};
use crate::model::Model;
use crate::reference::{Integrator3, ScalarIntegrator, ScalarRef, VectorRef};

impl Model {
    // ---------------------------------------------------------------------
    // Scalar integrators
    // ---------------------------------------------------------------------

    /// Scalar integrator of `input` starting at `initial`.
    pub fn integrator(&mut self, input: impl Into<ScalarRef>, initial: f64) -> ScalarIntegrator {
        let r = self.push_scalar(ScalarKind::Integrator {
            input: input.into(),
            state: initial,
        });
        self.integrators.push(r.id());
        ScalarIntegrator(r.id())
    }

    /// Rewire a scalar integrator's input, returning the previous one.
    pub fn set_integrator_input(
        &mut self,
        integrator: ScalarIntegrator,
        input: impl Into<ScalarRef>,
    ) -> BlockResult<ScalarRef> {
        let input = input.into();
        let r = integrator.output();
        let block = self.describe(r.into());
        match &mut self.scalar_node_mut(r)?.kind {
            ScalarKind::Integrator { input: current, .. } => Ok(current.set(input)),
            _ => Err(BlockError::WrongKind {
                operation: "set_integrator_input",
                block,
            }),
        }
    }

    /// Set a scalar integrator's state directly, bypassing integration.
    pub fn init_integrator(&mut self, integrator: ScalarIntegrator, value: f64) -> BlockResult<()> {
        self.set_integrator_state(integrator.id(), value)
    }

    pub(crate) fn integrator_state(&self, id: BlockId) -> BlockResult<f64> {
        let r = ScalarRef(id);
        match self.scalar_node(r)?.kind {
            ScalarKind::Integrator { state, .. } => Ok(state),
            _ => Err(BlockError::WrongKind {
                operation: "integrator_state",
                block: self.describe(r.into()),
            }),
        }
    }

    fn set_integrator_state(&mut self, id: BlockId, value: f64) -> BlockResult<()> {
        let r = ScalarRef(id);
        let block = self.describe(r.into());
        match &mut self.scalar_node_mut(r)?.kind {
            ScalarKind::Integrator { state, .. } => {
                *state = value;
                Ok(())
            }
            _ => Err(BlockError::WrongKind {
                operation: "init_integrator",
                block,
            }),
        }
    }

    // ---------------------------------------------------------------------
    // Simulation state vector
    // ---------------------------------------------------------------------

    /// Number of scalar integrators (the length of the state vector).
    pub fn integrator_count(&self) -> usize {
        self.integrators.len()
    }

    /// Current integrator states in registration order.
    pub fn integrator_states(&self) -> BlockResult<Vec<f64>> {
        self.integrators
            .iter()
            .map(|&id| self.integrator_state(id))
            .collect()
    }

    /// Overwrite every integrator state, in registration order.
    pub fn load_integrator_states(&mut self, states: &[f64]) -> BlockResult<()> {
        if states.len() != self.integrators.len() {
            return Err(BlockError::InvalidArg {
                what: format!(
                    "expected {} integrator states, got {}",
                    self.integrators.len(),
                    states.len()
                ),
            });
        }
        for (id, &value) in self.integrators.clone().into_iter().zip(states) {
            self.set_integrator_state(id, value)?;
        }
        Ok(())
    }

    /// Pull every integrator's input once, in registration order.
    ///
    /// The three axes of a vector integrator are consecutive, so call-count
    /// feeds see their x, y, z pulls in order.
    pub fn integrator_derivatives(&self) -> BlockResult<Vec<f64>> {
        self.integrators
            .iter()
            .map(|&id| {
                let r = ScalarRef(id);
                match self.scalar_node(r)?.kind {
                    ScalarKind::Integrator { input, .. } => self.scalar_value(input),
                    _ => Err(BlockError::WrongKind {
                        operation: "integrator_derivatives",
                        block: self.describe(r.into()),
                    }),
                }
            })
            .collect()
    }

    // ---------------------------------------------------------------------
    // Vector integrators
    // ---------------------------------------------------------------------

    /// Vector integrator with an implicit zero input and zero state.
    pub fn integrator3(&mut self) -> Integrator3 {
        let zero = self.constant3(Vector3::zero());
        self.integrator3_with(zero, Vector3::zero())
    }

    /// Vector integrator of `input` starting at zero.
    pub fn integrator3_from(&mut self, input: impl Into<VectorRef>) -> Integrator3 {
        self.integrator3_with(input, Vector3::zero())
    }

    /// Vector integrator of `input` starting at `initial`.
    pub fn integrator3_with(
        &mut self,
        input: impl Into<VectorRef>,
        initial: Vector3,
    ) -> Integrator3 {
        let feed = self.push_feed(SplitFeed::new(input.into(), self.feed_sync));
        let axes = Axis::ALL.map(|axis| {
            let tap = self.push_scalar(ScalarKind::AxisFeed { feed, axis });
            self.integrator(tap, initial.component(axis)).id()
        });
        let r = self.push_vector(VectorKind::Integrator { axes, feed });
        Integrator3(r.id())
    }

    /// Vector integrator of `upstream`'s output.
    ///
    /// The initial condition is `initial` when given, otherwise a copy of
    /// `upstream`'s current value.
    pub fn integrator3_chained(
        &mut self,
        upstream: Integrator3,
        initial: Option<Vector3>,
    ) -> BlockResult<Integrator3> {
        let initial = match initial {
            Some(v) => v,
            None => self.value(upstream.output())?,
        };
        Ok(self.integrator3_with(upstream, initial))
    }

    /// Rewire a vector integrator's input, returning the previous one.
    ///
    /// The feed's cached vector is dropped, so the next pull evaluates the
    /// new input even within the current epoch.
    pub fn set_integrator3_input(
        &mut self,
        integrator: Integrator3,
        input: impl Into<VectorRef>,
    ) -> BlockResult<VectorRef> {
        let (_, feed) = self.integrator3_parts(integrator, "set_integrator3_input")?;
        let feed = self.feed_mut(feed)?;
        feed.cached_epoch.set(None);
        Ok(feed.input.set(input))
    }

    /// Set all three axis states directly, bypassing integration.
    pub fn init_integrator3(&mut self, integrator: Integrator3, value: Vector3) -> BlockResult<()> {
        let (axes, _) = self.integrator3_parts(integrator, "init_integrator3")?;
        for (id, axis) in axes.into_iter().zip(Axis::ALL) {
            self.set_integrator_state(id, value.component(axis))?;
        }
        Ok(())
    }

    /// The three scalar integrators (x, y, z) behind a vector integrator.
    pub fn integrator3_axes(&self, integrator: Integrator3) -> BlockResult<[ScalarIntegrator; 3]> {
        let (axes, _) = self.integrator3_parts(integrator, "integrator3_axes")?;
        Ok(axes.map(ScalarIntegrator))
    }

    /// How many times the feed has evaluated its upstream vector.
    pub fn feed_pulls(&self, integrator: Integrator3) -> BlockResult<u64> {
        let (_, feed) = self.integrator3_parts(integrator, "feed_pulls")?;
        Ok(self.feed(feed)?.pulls.get())
    }

    fn integrator3_parts(
        &self,
        integrator: Integrator3,
        operation: &'static str,
    ) -> BlockResult<([BlockId; 3], FeedId)> {
        let r = integrator.output();
        match self.vector_node(r)?.kind {
            VectorKind::Integrator { axes, feed } => Ok((axes, feed)),
            _ => Err(BlockError::WrongKind {
                operation,
                block: self.describe(r.into()),
            }),
        }
    }

    fn feed(&self, id: FeedId) -> BlockResult<&SplitFeed> {
        self.feeds
            .get(id.slot())
            .ok_or_else(|| BlockError::UnknownBlock {
                what: format!("integrator feed #{id}"),
            })
    }

    fn feed_mut(&mut self, id: FeedId) -> BlockResult<&mut SplitFeed> {
        self.feeds
            .get_mut(id.slot())
            .ok_or_else(|| BlockError::UnknownBlock {
                what: format!("integrator feed #{id}"),
            })
    }

    /// One axis pull from a split feed.
    pub(crate) fn pull_feed(&self, id: FeedId, axis: Axis) -> BlockResult<f64> {
        let feed = self.feed(id)?;
        match feed.sync {
            FeedSync::Epoch => {
                if feed.cached_epoch.get() != Some(self.epoch()) {
                    let v = self.value(feed.input)?;
                    feed.cached.set(v);
                    feed.cached_epoch.set(Some(self.epoch()));
                    feed.pulls.set(feed.pulls.get() + 1);
                }
                Ok(feed.cached.get().component(axis))
            }
            FeedSync::CallCount => {
                let phase = feed.phase.get();
                let served = Axis::from_phase(phase);
                if served != axis {
                    warn!(
                        feed = %id,
                        requested = axis.name(),
                        served = served.name(),
                        "integrator feed pulled out of x, y, z order"
                    );
                }
                if phase == 0 {
                    let v = self.value(feed.input)?;
                    feed.cached.set(v);
                    feed.pulls.set(feed.pulls.get() + 1);
                }
                feed.phase.set((phase + 1) % 3);
                Ok(feed.cached.get().component(served))
            }
        }
    }
}
