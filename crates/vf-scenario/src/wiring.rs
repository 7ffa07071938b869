//! Turn a validated scenario into a block model.

use tracing::debug;
use vf_blocks::{BlockResult, Integrator3, Model};
use vf_core::Vector3;
use vf_sim::{Probe, SimOptions};

use crate::schema::{ModelDef, Scenario};

/// A wired block model ready to simulate.
pub struct BuiltScenario {
    pub model: Model,
    pub probes: Vec<Probe>,
    pub options: SimOptions,
}

/// Position and velocity integrators, with the velocity input left on a
/// zero placeholder until the acceleration is built.
fn point_mass(
    model: &mut Model,
    position: Vector3,
    velocity: Vector3,
) -> BlockResult<(Integrator3, Integrator3)> {
    let placeholder = model.constant3(Vector3::zero());
    let vel = model.integrator3_with(placeholder, velocity);
    let pos = model.integrator3_with(vel, position);
    model.label(vel, "velocity")?;
    model.label(pos, "position")?;
    Ok((pos, vel))
}

pub(crate) fn build(scenario: &Scenario) -> BlockResult<BuiltScenario> {
    let mut model = Model::with_feed_sync(scenario.feed_sync.into());

    let probes = match scenario.model {
        ModelDef::Ballistic {
            position,
            velocity,
            gravity,
            drag,
        } => {
            let (pos, vel) = point_mass(&mut model, position, velocity)?;
            let g = model.parameter3(gravity);
            let k = model.parameter(drag);
            model.label(g, "gravity")?;
            model.label(k, "drag")?;

            // a = g - k |v| v
            let speed = model.abs(vel);
            let k_speed = model.scalar_mul(k, speed);
            let resistance = model.scale(vel, k_speed);
            let accel = model.sub(g, resistance);
            model.set_integrator3_input(vel, accel)?;

            vec![
                Probe::new("position", pos),
                Probe::new("velocity", vel),
                Probe::new("speed", speed),
            ]
        }
        ModelDef::Orbit {
            position,
            velocity,
            mu,
        } => {
            let (pos, vel) = point_mass(&mut model, position, velocity)?;
            let mu = model.parameter(mu);
            model.label(mu, "mu")?;

            // a = -mu r_hat / |r|^2
            let radius = model.abs(pos);
            let r2 = model.scalar_mul(radius, radius);
            let strength = model.scalar_div(mu, r2);
            let r_hat = model.unit_vector(pos);
            let pull = model.scale(r_hat, strength);
            let accel = model.neg(pull);
            model.set_integrator3_input(vel, accel)?;

            vec![
                Probe::new("position", pos),
                Probe::new("velocity", vel),
                Probe::new("radius", radius),
            ]
        }
        ModelDef::ConstantRate { initial, rate } => {
            let rate = model.parameter3(rate);
            let state = model.integrator3_with(rate, initial);
            model.label(rate, "rate")?;
            model.label(state, "state")?;
            vec![Probe::new("state", state)]
        }
    };

    debug!(
        scenario = %scenario.name,
        kind = scenario.model.kind_name(),
        vectors = model.vector_count(),
        scalars = model.scalar_count(),
        states = model.integrator_count(),
        "scenario wired"
    );

    Ok(BuiltScenario {
        model,
        probes,
        options: scenario.sim.options(),
    })
}
