//! Scenario validation logic.

use vf_core::Vector3;

use crate::schema::{LATEST_VERSION, ModelDef, Scenario, SimDef};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

pub fn validate_scenario(scenario: &Scenario) -> Result<(), ValidationError> {
    if scenario.version == 0 || scenario.version > LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: scenario.version,
        });
    }
    validate_sim(&scenario.sim)?;
    validate_model(&scenario.model)
}

fn validate_sim(sim: &SimDef) -> Result<(), ValidationError> {
    if !(sim.dt > 0.0) || !sim.dt.is_finite() {
        return Err(invalid("sim.dt", sim.dt, "must be positive and finite"));
    }
    if !(sim.t_end >= 0.0) || !sim.t_end.is_finite() {
        return Err(invalid("sim.t_end", sim.t_end, "must be non-negative and finite"));
    }
    if sim.record_every == 0 {
        return Err(invalid("sim.record_every", 0, "must be at least 1"));
    }
    if sim.max_steps == Some(0) {
        return Err(invalid("sim.max_steps", 0, "must be at least 1"));
    }
    Ok(())
}

fn finite_vector(field: &str, v: Vector3) -> Result<(), ValidationError> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(invalid(field, format!("[{}, {}, {}]", v.x(), v.y(), v.z()), "must be finite"))
    }
}

fn validate_model(model: &ModelDef) -> Result<(), ValidationError> {
    match *model {
        ModelDef::Ballistic {
            position,
            velocity,
            gravity,
            drag,
        } => {
            finite_vector("model.position", position)?;
            finite_vector("model.velocity", velocity)?;
            finite_vector("model.gravity", gravity)?;
            if !(drag >= 0.0) || !drag.is_finite() {
                return Err(invalid("model.drag", drag, "must be non-negative and finite"));
            }
        }
        ModelDef::Orbit {
            position,
            velocity,
            mu,
        } => {
            finite_vector("model.position", position)?;
            finite_vector("model.velocity", velocity)?;
            if !(mu > 0.0) || !mu.is_finite() {
                return Err(invalid("model.mu", mu, "must be positive and finite"));
            }
            if position.abs() == 0.0 {
                return Err(invalid(
                    "model.position",
                    "[0, 0, 0]",
                    "orbit cannot start at the central body",
                ));
            }
        }
        ModelDef::ConstantRate { initial, rate } => {
            finite_vector("model.initial", initial)?;
            finite_vector("model.rate", rate)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FeedSyncDef;

    fn drift() -> Scenario {
        Scenario {
            version: 1,
            name: "drift".to_string(),
            sim: SimDef::default(),
            feed_sync: FeedSyncDef::default(),
            model: ModelDef::ConstantRate {
                initial: Vector3::zero(),
                rate: Vector3::new(1.0, 0.0, 0.0),
            },
        }
    }

    #[test]
    fn accepts_defaults() {
        validate_scenario(&drift()).unwrap();
    }

    #[test]
    fn rejects_future_version() {
        let mut s = drift();
        s.version = LATEST_VERSION + 1;
        assert_eq!(
            validate_scenario(&s),
            Err(ValidationError::UnsupportedVersion { version: 2 })
        );
    }

    #[test]
    fn rejects_bad_step_settings() {
        let mut s = drift();
        s.sim.dt = 0.0;
        assert!(validate_scenario(&s).is_err());

        let mut s = drift();
        s.sim.t_end = -1.0;
        assert!(validate_scenario(&s).is_err());

        let mut s = drift();
        s.sim.record_every = 0;
        let err = validate_scenario(&s).unwrap_err();
        assert!(err.to_string().contains("sim.record_every"));
    }

    #[test]
    fn rejects_nan_rate() {
        let mut s = drift();
        s.model = ModelDef::ConstantRate {
            initial: Vector3::zero(),
            rate: Vector3::new(0.0, f64::NAN, 0.0),
        };
        let err = validate_scenario(&s).unwrap_err();
        assert!(err.to_string().contains("model.rate"));
    }

    #[test]
    fn rejects_orbit_at_origin() {
        let mut s = drift();
        s.model = ModelDef::Orbit {
            position: Vector3::zero(),
            velocity: Vector3::new(0.0, 1.0, 0.0),
            mu: 1.0,
        };
        assert!(validate_scenario(&s).is_err());
    }
}
