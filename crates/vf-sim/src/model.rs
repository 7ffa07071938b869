//! TransientModel trait for pluggable dynamic systems.

use vf_blocks::Model;

use crate::error::{SimError, SimResult};

/// Trait for transient (dynamic) system models.
///
/// A TransientModel must implement:
/// - State type (Clone, for snapshots)
/// - Initial state
/// - RHS (right-hand side) computation: x_dot = f(t, x)
/// - Scalar field arithmetic for integration: add states, scale by scalar
pub trait TransientModel {
    /// State type (must be Clone).
    type State: Clone;

    /// Return the state the next step starts from.
    fn initial_state(&self) -> SimResult<Self::State>;

    /// Compute state derivative dxdt = f(t, x).
    ///
    /// Takes &mut self because evaluating a block model opens a new
    /// evaluation epoch.
    fn rhs(&mut self, t: f64, x: &Self::State) -> SimResult<Self::State>;

    /// Add two states element-wise: result = a + b.
    fn add(&self, a: &Self::State, b: &Self::State) -> Self::State;

    /// Scale a state by a scalar: result = scale * a.
    fn scale(&self, a: &Self::State, scale: f64) -> Self::State;
}

/// A block [`Model`] viewed as an ODE system.
///
/// The state is the vector of scalar integrator states in registration
/// order. Every `rhs` call loads a candidate state, sets the model time,
/// opens a fresh evaluation epoch and pulls each integrator's input once.
pub struct BlockSystem<'a> {
    model: &'a mut Model,
}

impl<'a> BlockSystem<'a> {
    pub fn new(model: &'a mut Model) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &Model {
        &*self.model
    }
}

impl TransientModel for BlockSystem<'_> {
    type State = Vec<f64>;

    fn initial_state(&self) -> SimResult<Self::State> {
        self.model
            .integrator_states()
            .map_err(SimError::block_at(self.model.time()))
    }

    fn rhs(&mut self, t: f64, x: &Self::State) -> SimResult<Self::State> {
        let wrap = SimError::block_at(t);
        self.model.load_integrator_states(x).map_err(wrap)?;
        self.model.set_time(t);
        self.model.begin_epoch();
        self.model.integrator_derivatives().map_err(wrap)
    }

    fn add(&self, a: &Self::State, b: &Self::State) -> Self::State {
        a.iter().zip(b).map(|(a, b)| a + b).collect()
    }

    fn scale(&self, a: &Self::State, scale: f64) -> Self::State {
        a.iter().map(|a| a * scale).collect()
    }
}
