//! vf-scenario: scenario file format, validation and model wiring.

pub mod schema;
pub mod validate;
mod wiring;

use std::path::Path;

use tracing::info;
use vf_blocks::BlockError;
use vf_sim::{SimError, SimRecord, run_sim};

pub use schema::*;
pub use validate::{ValidationError, validate_scenario};
pub use wiring::BuiltScenario;

pub type ScenarioResult<T> = Result<T, ScenarioError>;

#[derive(thiserror::Error, Debug)]
pub enum ScenarioError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Model error: {0}")]
    Block(#[from] BlockError),

    #[error("Simulation error: {0}")]
    Sim(#[from] SimError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Scenario {
    /// Validate, then wire the block model and the probes to record.
    pub fn build(&self) -> ScenarioResult<BuiltScenario> {
        validate_scenario(self)?;
        Ok(wiring::build(self)?)
    }

    /// Build and run to `sim.t_end`.
    pub fn run(&self) -> ScenarioResult<SimRecord> {
        let BuiltScenario {
            mut model,
            probes,
            options,
        } = self.build()?;
        info!(scenario = %self.name, kind = self.model.kind_name(), "running scenario");
        Ok(run_sim(&mut model, &options, &probes)?)
    }
}

pub fn parse_yaml(content: &str) -> ScenarioResult<Scenario> {
    let scenario: Scenario = serde_yaml::from_str(content)?;
    validate_scenario(&scenario)?;
    Ok(scenario)
}

pub fn parse_json(content: &str) -> ScenarioResult<Scenario> {
    let scenario: Scenario = serde_json::from_str(content)?;
    validate_scenario(&scenario)?;
    Ok(scenario)
}

pub fn load_yaml(path: &Path) -> ScenarioResult<Scenario> {
    parse_yaml(&std::fs::read_to_string(path)?)
}

pub fn load_json(path: &Path) -> ScenarioResult<Scenario> {
    parse_json(&std::fs::read_to_string(path)?)
}

/// Load by extension: `.json` is JSON, anything else YAML.
pub fn load(path: &Path) -> ScenarioResult<Scenario> {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => load_json(path),
        _ => load_yaml(path),
    }
}

pub fn save_yaml(path: &Path, scenario: &Scenario) -> ScenarioResult<()> {
    validate_scenario(scenario)?;
    std::fs::write(path, serde_yaml::to_string(scenario)?)?;
    Ok(())
}

pub fn save_json(path: &Path, scenario: &Scenario) -> ScenarioResult<()> {
    validate_scenario(scenario)?;
    std::fs::write(path, serde_json::to_string_pretty(scenario)?)?;
    Ok(())
}
