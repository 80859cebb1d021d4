use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::WaveNumber;

const DEFAULT_INTERMISSION_MS: u64 = 10_000;
const DEFAULT_BASE_UNITS_PER_WAVE: f64 = 5.0;
const DEFAULT_PER_WAVE_INCREMENT: f64 = 2.0;
const DEFAULT_BASE_SPAWN_INTERVAL_MS: u64 = 800;
const DEFAULT_MIN_SPAWN_INTERVAL_MS: u64 = 200;
const DEFAULT_SPAWN_ACCEL_PER_WAVE_MS: u64 = 50;

/// Tuning parameters that shape every wave of a run.
///
/// Values are trusted: nothing here is range checked. A minimum spawn interval
/// larger than the base interval simply pins every wave to the minimum.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchedulerConfig {
    intermission_ms: u64,
    base_units_per_wave: f64,
    per_wave_increment: f64,
    base_spawn_interval_ms: u64,
    min_spawn_interval_ms: u64,
    spawn_accel_per_wave_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            intermission_ms: DEFAULT_INTERMISSION_MS,
            base_units_per_wave: DEFAULT_BASE_UNITS_PER_WAVE,
            per_wave_increment: DEFAULT_PER_WAVE_INCREMENT,
            base_spawn_interval_ms: DEFAULT_BASE_SPAWN_INTERVAL_MS,
            min_spawn_interval_ms: DEFAULT_MIN_SPAWN_INTERVAL_MS,
            spawn_accel_per_wave_ms: DEFAULT_SPAWN_ACCEL_PER_WAVE_MS,
        }
    }
}

impl SchedulerConfig {
    /// Parses a configuration from TOML. Missing keys fall back to defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(ConfigError::Parse)
    }

    /// Reads and parses a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Overrides the pause between a completed wave and the next one.
    #[must_use]
    pub const fn with_intermission_ms(mut self, value: u64) -> Self {
        self.intermission_ms = value;
        self
    }

    /// Overrides the unit count of the first wave.
    #[must_use]
    pub const fn with_base_units_per_wave(mut self, value: f64) -> Self {
        self.base_units_per_wave = value;
        self
    }

    /// Overrides how many extra units each subsequent wave adds.
    #[must_use]
    pub const fn with_per_wave_increment(mut self, value: f64) -> Self {
        self.per_wave_increment = value;
        self
    }

    /// Overrides the spawn cadence of the first wave.
    #[must_use]
    pub const fn with_base_spawn_interval_ms(mut self, value: u64) -> Self {
        self.base_spawn_interval_ms = value;
        self
    }

    /// Overrides the floor the spawn cadence never drops below.
    #[must_use]
    pub const fn with_min_spawn_interval_ms(mut self, value: u64) -> Self {
        self.min_spawn_interval_ms = value;
        self
    }

    /// Overrides how much faster the cadence becomes each wave.
    #[must_use]
    pub const fn with_spawn_accel_per_wave_ms(mut self, value: u64) -> Self {
        self.spawn_accel_per_wave_ms = value;
        self
    }

    /// Pause between a completed wave and the start of the next one.
    #[must_use]
    pub const fn intermission(&self) -> Duration {
        Duration::from_millis(self.intermission_ms)
    }

    /// Unit count of the first wave.
    #[must_use]
    pub const fn base_units_per_wave(&self) -> f64 {
        self.base_units_per_wave
    }

    /// Extra units added by each subsequent wave.
    #[must_use]
    pub const fn per_wave_increment(&self) -> f64 {
        self.per_wave_increment
    }

    /// Spawn cadence of the first wave.
    #[must_use]
    pub const fn base_spawn_interval(&self) -> Duration {
        Duration::from_millis(self.base_spawn_interval_ms)
    }

    /// Lowest cadence any wave can reach.
    #[must_use]
    pub const fn min_spawn_interval(&self) -> Duration {
        Duration::from_millis(self.min_spawn_interval_ms)
    }

    /// Cadence reduction applied per wave.
    #[must_use]
    pub const fn spawn_accel_per_wave(&self) -> Duration {
        Duration::from_millis(self.spawn_accel_per_wave_ms)
    }

    /// Number of units wave `wave` spawns: `max(1, floor(base + increment * (wave - 1)))`.
    ///
    /// The float-to-integer conversion saturates, so absurdly late waves report
    /// `u64::MAX` rather than wrapping.
    #[must_use]
    pub fn units_for_wave(&self, wave: WaveNumber) -> u64 {
        let grown =
            self.base_units_per_wave + self.per_wave_increment * wave.waves_elapsed() as f64;
        grown.floor().max(1.0) as u64
    }

    /// Spawn cadence of wave `wave`: `max(min, base - accel * (wave - 1))`.
    #[must_use]
    pub fn spawn_interval_for_wave(&self, wave: WaveNumber) -> Duration {
        let reduction = self
            .spawn_accel_per_wave_ms
            .saturating_mul(wave.waves_elapsed());
        let millis = self
            .base_spawn_interval_ms
            .saturating_sub(reduction)
            .max(self.min_spawn_interval_ms);
        Duration::from_millis(millis)
    }
}

/// Errors raised while loading a [`SchedulerConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("could not read scheduler config '{}'", path.display())]
    Io {
        /// File that failed to load.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The configuration contents were not valid TOML for the schema.
    #[error("could not parse scheduler config: {0}")]
    Parse(#[source] toml::de::Error),
}
