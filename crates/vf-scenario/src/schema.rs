//! Scenario schema definitions.

use serde::{Deserialize, Serialize};
use vf_blocks::FeedSync;
use vf_core::Vector3;
use vf_sim::{IntegratorType, SimOptions};

/// Newest scenario file version this crate reads.
pub const LATEST_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Scenario {
    pub version: u32,
    pub name: String,
    #[serde(default)]
    pub sim: SimDef,
    #[serde(default)]
    pub feed_sync: FeedSyncDef,
    pub model: ModelDef,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimDef {
    pub dt: f64,
    pub t_end: f64,
    #[serde(default)]
    pub integrator: IntegratorDef,
    #[serde(default = "default_record_every")]
    pub record_every: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_steps: Option<usize>,
}

fn default_record_every() -> usize {
    SimOptions::default().record_every
}

impl Default for SimDef {
    fn default() -> Self {
        let opts = SimOptions::default();
        Self {
            dt: opts.dt,
            t_end: opts.t_end,
            integrator: IntegratorDef::default(),
            record_every: opts.record_every,
            max_steps: None,
        }
    }
}

impl SimDef {
    pub fn options(&self) -> SimOptions {
        let defaults = SimOptions::default();
        SimOptions {
            dt: self.dt,
            t_end: self.t_end,
            max_steps: self.max_steps.unwrap_or(defaults.max_steps),
            record_every: self.record_every,
            integrator: self.integrator.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IntegratorDef {
    #[default]
    Rk4,
    Euler,
}

impl From<IntegratorDef> for IntegratorType {
    fn from(def: IntegratorDef) -> Self {
        match def {
            IntegratorDef::Rk4 => IntegratorType::RK4,
            IntegratorDef::Euler => IntegratorType::ForwardEuler,
        }
    }
}

/// How vector integrators hand out their input's components.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FeedSyncDef {
    #[default]
    Epoch,
    CallCount,
}

impl From<FeedSyncDef> for FeedSync {
    fn from(def: FeedSyncDef) -> Self {
        match def {
            FeedSyncDef::Epoch => FeedSync::Epoch,
            FeedSyncDef::CallCount => FeedSync::CallCount,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ModelDef {
    /// Point mass under uniform gravity with quadratic drag:
    /// `a = g - k |v| v`.
    Ballistic {
        position: Vector3,
        velocity: Vector3,
        gravity: Vector3,
        #[serde(default)]
        drag: f64,
    },
    /// Two-body orbit around a fixed central mass: `a = -mu r_hat / |r|^2`.
    Orbit {
        position: Vector3,
        velocity: Vector3,
        mu: f64,
    },
    /// Straight-line drift: `x' = rate`.
    ConstantRate {
        #[serde(default)]
        initial: Vector3,
        rate: Vector3,
    },
}

impl ModelDef {
    pub fn kind_name(&self) -> &'static str {
        match self {
            ModelDef::Ballistic { .. } => "Ballistic",
            ModelDef::Orbit { .. } => "Orbit",
            ModelDef::ConstantRate { .. } => "ConstantRate",
        }
    }
}
