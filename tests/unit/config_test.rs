//! Tests for configuration validation and loading

use std::collections::HashMap;
use std::time::Duration;

use dining_table::config::{DelayRange, SimulationConfig};

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_config_validation() {
    assert!(SimulationConfig::default().validate().is_ok());
    assert!(SimulationConfig::new().with_philosophers(2).validate().is_ok());
}

#[test]
fn test_config_rejects_small_tables() {
    assert!(SimulationConfig::new().with_philosophers(0).validate().is_err());
    assert!(SimulationConfig::new().with_philosophers(1).validate().is_err());
}

#[test]
fn test_config_rejects_zero_duration() {
    let cfg = SimulationConfig::new().with_run_duration(Some(Duration::ZERO));
    assert!(cfg.validate().is_err());
}

#[test]
fn test_config_rejects_inverted_ranges() {
    let cfg = SimulationConfig::new().with_think(DelayRange::new(5, 1));
    let err = cfg.validate().unwrap_err();
    assert!(err.starts_with("think:"), "{err}");
}

#[test]
fn test_gate_capacity_is_one_less_than_seats() {
    assert_eq!(SimulationConfig::new().with_philosophers(2).gate_capacity(), 1);
    assert_eq!(SimulationConfig::new().with_philosophers(9).gate_capacity(), 8);
}

#[test]
fn test_config_from_json() {
    let cfg = SimulationConfig::from_json_str(
        r#"{
            "philosophers": 7,
            "run_duration_ms": null,
            "think": { "min_ms": 1, "max_ms": 5 },
            "seed": 99
        }"#,
    )
    .unwrap();
    assert_eq!(cfg.philosophers, 7);
    assert_eq!(cfg.run_duration(), None);
    assert_eq!(cfg.think, DelayRange::new(1, 5));
    assert_eq!(cfg.eat, DelayRange::default());
    assert_eq!(cfg.seed, Some(99));
}

#[test]
fn test_config_from_json_rejects_invalid() {
    assert!(SimulationConfig::from_json_str(r#"{ "philosophers": 1 }"#).is_err());
    assert!(SimulationConfig::from_json_str("not json").is_err());
}

#[test]
fn test_config_from_missing_file() {
    let err = SimulationConfig::from_json_file("/nonexistent/dining.json").unwrap_err();
    assert!(err.contains("cannot read"), "{err}");
}

#[test]
fn test_config_from_lookup() {
    let cfg = SimulationConfig::from_lookup(lookup(&[
        ("DINING_PHILOSOPHERS", "3"),
        ("DINING_RUN_MS", "1500"),
        ("DINING_THINK_MS", "1-5"),
        ("DINING_EAT_MS", "4"),
        ("DINING_SEED", "12"),
    ]))
    .unwrap();
    assert_eq!(cfg.philosophers, 3);
    assert_eq!(cfg.run_duration(), Some(Duration::from_millis(1500)));
    assert_eq!(cfg.think, DelayRange::new(1, 5));
    assert_eq!(cfg.eat, DelayRange::new(4, 4));
    assert_eq!(cfg.seed, Some(12));
}

#[test]
fn test_config_from_lookup_zero_duration_runs_until_stopped() {
    let cfg = SimulationConfig::from_lookup(lookup(&[("DINING_RUN_MS", "0")])).unwrap();
    assert_eq!(cfg.run_duration(), None);
}

#[test]
fn test_config_from_lookup_errors_name_the_variable() {
    let err =
        SimulationConfig::from_lookup(lookup(&[("DINING_PHILOSOPHERS", "five")])).unwrap_err();
    assert!(err.contains("DINING_PHILOSOPHERS"), "{err}");

    let err = SimulationConfig::from_lookup(lookup(&[("DINING_EAT_MS", "9-1")])).unwrap_err();
    assert!(err.contains("DINING_EAT_MS"), "{err}");

    assert!(SimulationConfig::from_lookup(lookup(&[("DINING_PHILOSOPHERS", "1")])).is_err());
}

#[test]
fn test_config_from_empty_lookup_is_default() {
    let cfg = SimulationConfig::from_lookup(|_| None).unwrap();
    assert_eq!(cfg, SimulationConfig::default());
}
