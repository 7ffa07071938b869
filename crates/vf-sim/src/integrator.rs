//! Fixed-step time integrators.

use crate::error::SimResult;
use crate::model::TransientModel;

/// One fixed step of an explicit integration scheme.
pub trait Integrator {
    /// Number of `rhs` evaluations (and so evaluation epochs) per step.
    const STAGES: usize;

    /// Advance `x` from `t` to `t + dt`.
    fn step<M: TransientModel>(
        &self,
        model: &mut M,
        t: f64,
        x: &M::State,
        dt: f64,
    ) -> SimResult<M::State>;
}

/// Classical fourth-order Runge-Kutta.
#[derive(Clone, Copy, Debug, Default)]
pub struct RK4;

impl Integrator for RK4 {
    const STAGES: usize = 4;

    fn step<M: TransientModel>(
        &self,
        model: &mut M,
        t: f64,
        x: &M::State,
        dt: f64,
    ) -> SimResult<M::State> {
        let half = 0.5 * dt;

        let k1 = model.rhs(t, x)?;
        let x2 = model.add(x, &model.scale(&k1, half));
        let k2 = model.rhs(t + half, &x2)?;
        let x3 = model.add(x, &model.scale(&k2, half));
        let k3 = model.rhs(t + half, &x3)?;
        let x4 = model.add(x, &model.scale(&k3, dt));
        let k4 = model.rhs(t + dt, &x4)?;

        // x + dt/6 * (k1 + 2 k2 + 2 k3 + k4)
        let inner = model.add(&k2, &k3);
        let outer = model.add(&k1, &k4);
        let k_sum = model.add(&outer, &model.scale(&inner, 2.0));
        Ok(model.add(x, &model.scale(&k_sum, dt / 6.0)))
    }
}

/// Explicit first-order Euler: one `rhs` call per step.
#[derive(Clone, Copy, Debug, Default)]
pub struct ForwardEuler;

impl Integrator for ForwardEuler {
    const STAGES: usize = 1;

    fn step<M: TransientModel>(
        &self,
        model: &mut M,
        t: f64,
        x: &M::State,
        dt: f64,
    ) -> SimResult<M::State> {
        let xdot = model.rhs(t, x)?;
        Ok(model.add(x, &model.scale(&xdot, dt)))
    }
}
