//! Simulation configuration structures.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Environment variable holding the number of philosophers.
pub const ENV_PHILOSOPHERS: &str = "DINING_PHILOSOPHERS";
/// Environment variable holding the run duration in milliseconds (`0` = until stopped).
pub const ENV_RUN_MS: &str = "DINING_RUN_MS";
/// Environment variable holding the think delay range, written `min-max` in ms.
pub const ENV_THINK_MS: &str = "DINING_THINK_MS";
/// Environment variable holding the eat delay range, written `min-max` in ms.
pub const ENV_EAT_MS: &str = "DINING_EAT_MS";
/// Environment variable holding the delay seed.
pub const ENV_SEED: &str = "DINING_SEED";

/// Inclusive range of milliseconds a simulated phase lasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    /// Shortest delay in milliseconds.
    pub min_ms: u64,
    /// Longest delay in milliseconds.
    pub max_ms: u64,
}

impl DelayRange {
    /// Range `[min_ms, max_ms]`.
    #[must_use]
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    /// Validate that the range is not inverted.
    pub fn validate(&self) -> Result<(), String> {
        if self.min_ms > self.max_ms {
            return Err(format!(
                "min_ms ({}) must not exceed max_ms ({})",
                self.min_ms, self.max_ms
            ));
        }
        Ok(())
    }

    /// Lower bound as a duration.
    #[must_use]
    pub const fn min(&self) -> Duration {
        Duration::from_millis(self.min_ms)
    }

    /// Upper bound as a duration.
    #[must_use]
    pub const fn max(&self) -> Duration {
        Duration::from_millis(self.max_ms)
    }

    /// Parse `"min-max"` or a single `"n"` (meaning `n-n`).
    pub fn parse(input: &str) -> Result<Self, String> {
        let parse_ms = |s: &str| {
            s.trim()
                .parse::<u64>()
                .map_err(|e| format!("invalid milliseconds `{s}`: {e}"))
        };
        let range = match input.split_once('-') {
            Some((min, max)) => Self::new(parse_ms(min)?, parse_ms(max)?),
            None => {
                let ms = parse_ms(input)?;
                Self::new(ms, ms)
            }
        };
        range.validate()?;
        Ok(range)
    }
}

impl Default for DelayRange {
    fn default() -> Self {
        Self::new(500, 2000)
    }
}

/// Root simulation configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of philosophers (and forks) around the table.
    pub philosophers: usize,
    /// How long to run before cancelling; `None` runs until stopped.
    pub run_duration_ms: Option<u64>,
    /// Think phase duration range.
    pub think: DelayRange,
    /// Eat phase duration range.
    pub eat: DelayRange,
    /// Seed for the per-philosopher delay generators; random when unset.
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            philosophers: 5,
            run_duration_ms: Some(30_000),
            think: DelayRange::default(),
            eat: DelayRange::default(),
            seed: None,
        }
    }
}

impl SimulationConfig {
    /// Create a config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of philosophers.
    #[must_use]
    pub const fn with_philosophers(mut self, philosophers: usize) -> Self {
        self.philosophers = philosophers;
        self
    }

    /// Set the run duration; `None` runs until [`stop`](crate::runtime::Simulation::stop).
    #[must_use]
    pub fn with_run_duration(mut self, duration: Option<Duration>) -> Self {
        self.run_duration_ms =
            duration.map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Set the think delay range.
    #[must_use]
    pub const fn with_think(mut self, think: DelayRange) -> Self {
        self.think = think;
        self
    }

    /// Set the eat delay range.
    #[must_use]
    pub const fn with_eat(mut self, eat: DelayRange) -> Self {
        self.eat = eat;
        self
    }

    /// Seed the delay generators for reproducible runs.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Configured run duration.
    #[must_use]
    pub fn run_duration(&self) -> Option<Duration> {
        self.run_duration_ms.map(Duration::from_millis)
    }

    /// Capacity of the admission gate: one less than the number of philosophers.
    #[must_use]
    pub const fn gate_capacity(&self) -> usize {
        self.philosophers.saturating_sub(1)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.philosophers < 2 {
            return Err(format!(
                "at least 2 philosophers are required, got {}",
                self.philosophers
            ));
        }
        if self.run_duration_ms == Some(0) {
            return Err(
                "run_duration_ms must be greater than 0 (use null to run until stopped)".into(),
            );
        }
        self.think.validate().map_err(|e| format!("think: {e}"))?;
        self.eat.validate().map_err(|e| format!("eat: {e}"))?;
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read and parse a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, String> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
        Self::from_json_str(&input)
    }

    /// Build configuration from `DINING_*` environment variables over defaults.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup over defaults.
    ///
    /// A run duration of `0` means "run until stopped".
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(v) = lookup(ENV_PHILOSOPHERS) {
            cfg.philosophers = v
                .trim()
                .parse()
                .map_err(|e| format!("{ENV_PHILOSOPHERS}: {e}"))?;
        }
        if let Some(v) = lookup(ENV_RUN_MS) {
            let ms: u64 = v.trim().parse().map_err(|e| format!("{ENV_RUN_MS}: {e}"))?;
            cfg.run_duration_ms = (ms > 0).then_some(ms);
        }
        if let Some(v) = lookup(ENV_THINK_MS) {
            cfg.think = DelayRange::parse(&v).map_err(|e| format!("{ENV_THINK_MS}: {e}"))?;
        }
        if let Some(v) = lookup(ENV_EAT_MS) {
            cfg.eat = DelayRange::parse(&v).map_err(|e| format!("{ENV_EAT_MS}: {e}"))?;
        }
        if let Some(v) = lookup(ENV_SEED) {
            cfg.seed = Some(v.trim().parse().map_err(|e| format!("{ENV_SEED}: {e}"))?);
        }
        cfg.validate()?;
        Ok(cfg)
    }
}
