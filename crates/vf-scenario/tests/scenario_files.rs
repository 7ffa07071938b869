use std::path::{Path, PathBuf};

use vf_blocks::BlockValue;
use vf_scenario::{FeedSyncDef, IntegratorDef, ModelDef};

fn scenarios_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../scenarios")
}

#[test]
fn bundled_scenarios_load_and_build() {
    let files = ["cannonball.yaml", "circular_orbit.yaml", "drift.json"];

    for name in files {
        let path = scenarios_dir().join(name);
        let scenario =
            vf_scenario::load(&path).unwrap_or_else(|e| panic!("Failed to load {}: {}", name, e));
        let built = scenario
            .build()
            .unwrap_or_else(|e| panic!("Failed to build {}: {}", name, e));
        assert!(!built.probes.is_empty(), "{name} has no probes");
    }
}

#[test]
fn cannonball_fields() {
    let scenario = vf_scenario::load_yaml(&scenarios_dir().join("cannonball.yaml")).unwrap();
    assert_eq!(scenario.name, "cannonball");
    assert_eq!(scenario.sim.integrator, IntegratorDef::Rk4);
    assert_eq!(scenario.sim.record_every, 10);
    assert_eq!(scenario.feed_sync, FeedSyncDef::Epoch);
    assert!(matches!(scenario.model, ModelDef::Ballistic { drag, .. } if drag == 0.05));
}

#[test]
fn circular_orbit_returns_to_start() {
    let scenario = vf_scenario::load_yaml(&scenarios_dir().join("circular_orbit.yaml")).unwrap();
    let record = scenario.run().unwrap();

    let Some(BlockValue::Vector(end)) = record.final_sample("position") else {
        panic!("position probe missing");
    };
    // The run stops within half a step of one period.
    assert!((end.x() - 1.0).abs() < 1e-6, "end = {end}");
    assert!(end.y().abs() < 1e-3, "end = {end}");

    for sample in record.series("radius").unwrap() {
        let BlockValue::Scalar(r) = sample else {
            panic!("radius should be scalar");
        };
        assert!((r - 1.0).abs() < 1e-9);
    }
}

#[test]
fn drift_json_uses_call_count_feed() {
    let scenario = vf_scenario::load_json(&scenarios_dir().join("drift.json")).unwrap();
    assert_eq!(scenario.feed_sync, FeedSyncDef::CallCount);

    let record = scenario.run().unwrap();
    // 10 steps recorded every 2, plus the initial point
    assert_eq!(record.len(), 6);
    assert_eq!(
        record.final_sample("state"),
        Some(BlockValue::Vector(vf_core::Vector3::new(1.0, 7.0, 3.0)))
    );
}

#[test]
fn cannonball_lands_short_of_vacuum_range() {
    let scenario = vf_scenario::load_yaml(&scenarios_dir().join("cannonball.yaml")).unwrap();
    let record = scenario.run().unwrap();
    let Some(BlockValue::Vector(end)) = record.final_sample("position") else {
        panic!("position probe missing");
    };
    // Without drag x(2) = 20.
    assert!(end.x() > 0.0 && end.x() < 20.0);
}
