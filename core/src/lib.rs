#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Endless Waves scheduler.
//!
//! This crate defines the vocabulary that connects the wave scheduler with the
//! host game loop. Hosts drive the scheduler with [`Command`] values (or the
//! equivalent method calls), the scheduler consults a [`SchedulerConfig`] to
//! decide how large and how fast each wave is, and lifecycle notifications can
//! be captured as [`Event`] values for logging or deterministic replay.

mod config;

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use config::{ConfigError, SchedulerConfig};

/// One-based index of a wave. Zero means no wave has started yet.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct WaveNumber(u64);

impl WaveNumber {
    /// Sentinel used before the first wave begins.
    pub const NONE: Self = Self(0);

    /// The first wave of a run.
    pub const FIRST: Self = Self(1);

    /// Creates a wave number from its numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the wave.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }

    /// Returns the wave that follows this one, saturating at `u64::MAX`.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Number of waves that precede this one, i.e. `w - 1` for wave `w`.
    #[must_use]
    pub const fn waves_elapsed(self) -> u64 {
        self.0.saturating_sub(1)
    }
}

impl fmt::Display for WaveNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Information handed to the host each time a unit is spawned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpawnContext {
    /// Wave the unit belongs to.
    pub wave: WaveNumber,
    /// One-based position of the unit within its wave.
    pub index: u64,
    /// Units still to be spawned in the wave after this one.
    pub remaining_to_spawn: u64,
    /// Scheduler clock reading at which the spawn tick fired.
    pub spawned_at: Duration,
}

/// Failure reported by a host when it could not materialise a unit.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
#[error("unit spawn failed: {reason}")]
pub struct SpawnError {
    reason: String,
}

impl SpawnError {
    /// Creates a spawn error with a human readable reason.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Reason supplied by the host.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Commands accepted by the scheduler from the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Begins the run at wave one. Ignored while already running.
    Start,
    /// Halts the run and revokes every pending timer.
    Stop,
    /// Suspends the spawn cadence.
    Pause,
    /// Re-arms the spawn cadence after a pause.
    Resume,
    /// Reports that one active unit stopped counting towards the wave.
    UnitKilled,
    /// Advances the scheduler clock by the provided delta time.
    Tick {
        /// Duration of time that elapsed since the previous tick.
        dt: Duration,
    },
}

/// Lifecycle notifications emitted by the scheduler, expressed as plain data.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Event {
    /// A wave began spawning.
    WaveStarted {
        /// Wave that started.
        wave: WaveNumber,
        /// Number of units the wave will spawn.
        count: u64,
        /// Cadence between successive spawns.
        spawn_interval: Duration,
    },
    /// A spawn tick was issued.
    UnitSpawned {
        /// Context passed to the spawn hook.
        context: SpawnContext,
        /// Failure returned by the spawn hook, if any.
        failure: Option<SpawnError>,
    },
    /// Every unit of the wave was spawned and cleared.
    WaveCompleted {
        /// Wave that completed.
        wave: WaveNumber,
    },
    /// The pause before the next wave began counting down.
    IntermissionBegun {
        /// Wave that just completed.
        wave_just_completed: WaveNumber,
        /// Length of the intermission.
        duration: Duration,
    },
}

/// Coarse state of the scheduler's wave cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Not running.
    #[default]
    Idle,
    /// Units remain to be spawned in the current wave.
    Spawning,
    /// Every unit was spawned but some are still active.
    Cleanup,
    /// Waiting for the next wave to begin.
    Intermission,
}

/// Read-only snapshot of the scheduler used by hosts and user interfaces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveStatus {
    /// Current wave, or [`WaveNumber::NONE`] before the first start.
    pub wave: WaveNumber,
    /// Phase derived from the counters and pending timers.
    pub phase: Phase,
    /// Whether the run is active.
    pub running: bool,
    /// Whether spawning is suspended.
    pub paused: bool,
    /// Units spawned so far in the current wave.
    pub spawned: u64,
    /// Units the current wave will spawn in total.
    pub target: u64,
    /// Spawned units not yet reported killed.
    pub active: u64,
    /// Cadence of the current wave.
    pub spawn_interval: Duration,
    /// Time left before the next wave, while an intermission is pending.
    pub intermission_remaining: Option<Duration>,
    /// Total time the scheduler clock has advanced.
    pub elapsed: Duration,
}
