//! Builders to construct tables and philosophers from configuration.

pub mod table_builder;

pub use table_builder::{build_table, philosopher_rng};
