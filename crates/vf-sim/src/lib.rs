//! Fixed-step simulation of vectorflow block models.
//!
//! Provides:
//! - A [`TransientModel`] view of a block [`Model`](vf_blocks::Model)
//! - Forward Euler and RK4 integrators
//! - A step-wise [`Simulation`] runner with decimated probe recording

pub mod error;
pub mod integrator;
pub mod model;
pub mod sim;

pub use error::{SimError, SimResult};
pub use integrator::{ForwardEuler, Integrator, RK4};
pub use model::{BlockSystem, TransientModel};
pub use sim::{IntegratorType, Probe, Sample, SimOptions, SimRecord, Simulation, run_sim};
