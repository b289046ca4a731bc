//! Tests for error types

use std::error::Error as _;

use dining_table::core::{Cancelled, SimulationError};

#[test]
fn test_cancelled_display() {
    assert_eq!(Cancelled.to_string(), "cancelled");
}

#[test]
fn test_invalid_config_display() {
    let err = SimulationError::InvalidConfig("at least 2 philosophers are required, got 1".into());
    assert_eq!(
        err.to_string(),
        "invalid configuration: at least 2 philosophers are required, got 1"
    );
    assert!(err.source().is_none());
}

#[test]
fn test_spawn_error_keeps_source() {
    let err = SimulationError::Spawn {
        name: "philosopher-3".into(),
        source: std::io::Error::other("no threads left"),
    };
    assert!(err.to_string().starts_with("failed to spawn philosopher-3"));
    assert_eq!(err.source().unwrap().to_string(), "no threads left");
}

#[test]
fn test_errors_convert_to_anyhow() {
    fn fails() -> dining_table::core::AppResult<()> {
        Err(SimulationError::InvalidConfig("bad".into()))?
    }
    let err = fails().unwrap_err();
    assert!(err.downcast_ref::<SimulationError>().is_some());
}
