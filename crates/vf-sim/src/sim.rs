//! Simulation runner and result recording.

use tracing::{debug, info, trace, warn};
use vf_blocks::{BlockRef, BlockValue, Model};
use vf_core::ensure_finite;

use crate::error::{SimError, SimResult};
use crate::integrator::{ForwardEuler, Integrator, RK4};
use crate::model::{BlockSystem, TransientModel};

/// Integrator selection for simulation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IntegratorType {
    /// 4th-order Runge-Kutta (default, 4 epochs per step).
    #[default]
    RK4,
    /// Forward Euler (1 epoch per step).
    ForwardEuler,
}

/// Options for simulation runs.
#[derive(Clone, Debug, PartialEq)]
pub struct SimOptions {
    /// Fixed time step (seconds)
    pub dt: f64,
    /// Final simulation time (seconds)
    pub t_end: f64,
    /// Maximum number of steps (safety limit)
    pub max_steps: usize,
    /// Record every N-th step (decimation)
    pub record_every: usize,
    pub integrator: IntegratorType,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            dt: 1e-3,
            t_end: 1.0,
            max_steps: 100_000,
            record_every: 10,
            integrator: IntegratorType::default(),
        }
    }
}

impl SimOptions {
    pub fn validate(&self) -> SimResult<()> {
        if !(self.dt > 0.0) || !self.dt.is_finite() {
            return Err(SimError::InvalidArg {
                what: "dt must be positive",
            });
        }
        if !(self.t_end >= 0.0) || !self.t_end.is_finite() {
            return Err(SimError::InvalidArg {
                what: "t_end must be non-negative",
            });
        }
        if self.max_steps == 0 {
            return Err(SimError::InvalidArg {
                what: "max_steps must be positive",
            });
        }
        if self.record_every == 0 {
            return Err(SimError::InvalidArg {
                what: "record_every must be positive",
            });
        }
        Ok(())
    }
}

/// A named block whose value is recorded during a run.
#[derive(Clone, Debug, PartialEq)]
pub struct Probe {
    pub name: String,
    pub block: BlockRef,
}

impl Probe {
    pub fn new(name: impl Into<String>, block: impl Into<BlockRef>) -> Self {
        Self {
            name: name.into(),
            block: block.into(),
        }
    }
}

/// One probe reading.
pub type Sample = BlockValue;

/// Recorded probe values over time.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SimRecord {
    /// Probe names, in column order.
    pub names: Vec<String>,
    /// Time points (seconds)
    pub t: Vec<f64>,
    /// One row per time point, one sample per probe.
    pub samples: Vec<Vec<Sample>>,
}

impl SimRecord {
    fn new(probes: &[Probe]) -> Self {
        Self {
            names: probes.iter().map(|p| p.name.clone()).collect(),
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    /// Every recorded sample of the named probe.
    pub fn series(&self, name: &str) -> Option<Vec<Sample>> {
        let col = self.names.iter().position(|n| n == name)?;
        Some(self.samples.iter().map(|row| row[col]).collect())
    }

    /// The last recorded sample of the named probe.
    pub fn final_sample(&self, name: &str) -> Option<Sample> {
        let col = self.names.iter().position(|n| n == name)?;
        self.samples.last().map(|row| row[col])
    }
}

/// A run in progress over a borrowed block model.
///
/// Parameters are locked from [`Simulation::start`] until the run is
/// finished or dropped.
pub struct Simulation<'a> {
    model: &'a mut Model,
    opts: SimOptions,
    x: Vec<f64>,
    t0: f64,
    t: f64,
    steps: usize,
}

impl<'a> Simulation<'a> {
    /// Validate `opts`, lock parameters and capture the initial state.
    pub fn start(model: &'a mut Model, opts: SimOptions) -> SimResult<Self> {
        opts.validate()?;
        let t = model.time();
        let x = model
            .integrator_states()
            .map_err(SimError::block_at(t))?;
        model.set_running(true);
        info!(
            states = x.len(),
            dt = opts.dt,
            t_end = opts.t_end,
            integrator = ?opts.integrator,
            "simulation started"
        );
        Ok(Self {
            model,
            opts,
            x,
            t0: t,
            t,
            steps: 0,
        })
    }

    pub fn time(&self) -> f64 {
        self.t
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn options(&self) -> &SimOptions {
        &self.opts
    }

    pub fn model(&self) -> &Model {
        &*self.model
    }

    /// Mutable access for variable writes between steps. Parameter writes
    /// fail while the run is active.
    pub fn model_mut(&mut self) -> &mut Model {
        &mut *self.model
    }

    /// True once `t_end` (within half a step) or `max_steps` is reached.
    pub fn is_done(&self) -> bool {
        self.t + 0.5 * self.opts.dt >= self.opts.t_end || self.steps >= self.opts.max_steps
    }

    /// Advance one fixed step and write the new state back into the model.
    ///
    /// On failure the model is put back to the last accepted state and time,
    /// and the step is not counted.
    pub fn step(&mut self) -> SimResult<()> {
        let t = self.t0 + (self.steps + 1) as f64 * self.opts.dt;
        match self.advance(t) {
            Ok(x) => {
                self.steps += 1;
                self.x = x;
                self.t = t;
                trace!(step = self.steps, t, "step complete");
                Ok(())
            }
            Err(err) => {
                self.model
                    .load_integrator_states(&self.x)
                    .map_err(SimError::block_at(self.t))?;
                self.model.set_time(self.t);
                Err(err)
            }
        }
    }

    /// Integrate to `t` (recomputed from the step count, since accumulating
    /// `dt` drifts) and load the result.
    fn advance(&mut self, t: f64) -> SimResult<Vec<f64>> {
        let dt = self.opts.dt;
        let mut system = BlockSystem::new(&mut *self.model);
        let x = match self.opts.integrator {
            IntegratorType::RK4 => RK4.step(&mut system, self.t, &self.x, dt)?,
            IntegratorType::ForwardEuler => {
                ForwardEuler.step(&mut system, self.t, &self.x, dt)?
            }
        };
        for &value in &x {
            ensure_finite(value, "integrator state").map_err(|source| {
                warn!(t, step = self.steps + 1, "integration diverged");
                SimError::Diverged { t, source }
            })?;
        }
        self.model
            .load_integrator_states(&x)
            .map_err(SimError::block_at(t))?;
        self.model.set_time(t);
        Ok(x)
    }

    /// Sample every probe in a fresh epoch.
    pub fn sample(&mut self, probes: &[Probe]) -> SimResult<Vec<Sample>> {
        if probes.is_empty() {
            return Ok(Vec::new());
        }
        self.model.begin_epoch();
        probes
            .iter()
            .map(|p| self.model.read(p.block).map_err(SimError::block_at(self.t)))
            .collect()
    }

    /// Run to completion, recording every `record_every` steps plus the
    /// initial and final states.
    pub fn run(&mut self, probes: &[Probe]) -> SimResult<SimRecord> {
        let mut record = SimRecord::new(probes);
        self.record(probes, &mut record)?;

        while !self.is_done() {
            self.step()?;
            if self.steps % self.opts.record_every == 0 {
                self.record(probes, &mut record)?;
            }
        }

        if self.steps % self.opts.record_every != 0 {
            self.record(probes, &mut record)?;
        }

        info!(
            steps = self.steps,
            t = self.t,
            points = record.len(),
            "simulation complete"
        );
        Ok(record)
    }

    fn record(&mut self, probes: &[Probe], record: &mut SimRecord) -> SimResult<()> {
        let row = self.sample(probes)?;
        debug!(t = self.t, step = self.steps, "recorded");
        record.t.push(self.t);
        record.samples.push(row);
        Ok(())
    }

    /// End the run, unlocking parameters.
    pub fn finish(self) {
        info!(steps = self.steps, t = self.t, "simulation finished");
    }
}

impl Drop for Simulation<'_> {
    fn drop(&mut self) {
        self.model.set_running(false);
    }
}

/// Run a block model from its current state to `opts.t_end`.
///
/// Parameters are unlocked again whether or not the run succeeds.
pub fn run_sim(model: &mut Model, opts: &SimOptions, probes: &[Probe]) -> SimResult<SimRecord> {
    let mut sim = Simulation::start(model, opts.clone())?;
    let record = sim.run(probes)?;
    sim.finish();
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vf_core::Vector3;

    #[test]
    fn sim_options_defaults() {
        let opts = SimOptions::default();
        assert_eq!(opts.dt, 1e-3);
        assert_eq!(opts.t_end, 1.0);
        assert_eq!(opts.max_steps, 100_000);
        assert_eq!(opts.record_every, 10);
        assert_eq!(opts.integrator, IntegratorType::RK4);
    }

    #[test]
    fn sim_options_invalid() {
        let bad = [
            SimOptions {
                dt: 0.0,
                ..SimOptions::default()
            },
            SimOptions {
                dt: f64::NAN,
                ..SimOptions::default()
            },
            SimOptions {
                t_end: -1.0,
                ..SimOptions::default()
            },
            SimOptions {
                max_steps: 0,
                ..SimOptions::default()
            },
            SimOptions {
                record_every: 0,
                ..SimOptions::default()
            },
        ];
        for opts in bad {
            assert!(matches!(opts.validate(), Err(SimError::InvalidArg { .. })));
        }
    }

    #[test]
    fn record_keeps_first_and_last_points() {
        let mut model = Model::new();
        let rate = model.constant3(Vector3::new(1.0, 0.0, 0.0));
        let x = model.integrator3_from(rate);
        let opts = SimOptions {
            dt: 0.1,
            t_end: 1.0,
            record_every: 3,
            integrator: IntegratorType::ForwardEuler,
            ..SimOptions::default()
        };

        let record = run_sim(&mut model, &opts, &[Probe::new("x", x)]).unwrap();
        // t = 0, 0.3, 0.6, 0.9 and the final 1.0
        assert_eq!(record.len(), 5);
        assert!((record.t[4] - 1.0).abs() < 1e-12);
        match record.final_sample("x") {
            Some(BlockValue::Vector(v)) => assert!((v.x() - 1.0).abs() < 1e-12),
            other => panic!("unexpected sample {other:?}"),
        }
        assert!(!model.is_running());
    }

    #[test]
    fn zero_duration_records_initial_state_only() {
        let mut model = Model::new();
        let x = model.integrator3();
        let opts = SimOptions {
            t_end: 0.0,
            ..SimOptions::default()
        };
        let record = run_sim(&mut model, &opts, &[Probe::new("x", x)]).unwrap();
        assert_eq!(record.t, vec![0.0]);
    }
}
