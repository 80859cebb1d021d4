//! Headless session that stands in for a real game: every spawned unit lives
//! for a random span and is then reported killed.

use std::{
    ops::RangeInclusive,
    thread,
    time::{Duration, Instant},
};

use endless_waves_core::{Event, SchedulerConfig, SpawnContext, SpawnError, WaveNumber, WaveStatus};
use endless_waves_system_wave_scheduler::{WaveHooks, WaveScheduler};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Parameters of a headless session.
#[derive(Clone, Debug)]
pub(crate) struct SessionOptions {
    /// Number of waves to clear before the session ends.
    pub(crate) waves: u64,
    /// Seed for unit lifetimes.
    pub(crate) seed: u64,
    /// Simulation step handed to the scheduler each iteration.
    pub(crate) tick: Duration,
    /// Range unit lifetimes are drawn from, in milliseconds.
    pub(crate) lifetime_ms: RangeInclusive<u64>,
    /// Whether to sleep so the session follows the wall clock.
    pub(crate) realtime: bool,
}

/// Outcome of a headless session.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub(crate) struct SessionReport {
    /// Scheduler snapshot taken just before the scheduler was stopped.
    pub(crate) status: WaveStatus,
    /// Every lifecycle notification the host received, in order.
    pub(crate) events: Vec<Event>,
}

/// Identifier the demo host hands back for each unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct UnitId(u64);

#[derive(Debug)]
struct DemoHost {
    rng: ChaCha8Rng,
    lifetime_ms: RangeInclusive<u64>,
    next_unit: u64,
    deaths: Vec<Duration>,
    completed_waves: u64,
    events: Vec<Event>,
}

impl DemoHost {
    fn new(options: &SessionOptions) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(options.seed),
            lifetime_ms: options.lifetime_ms.clone(),
            next_unit: 0,
            deaths: Vec::new(),
            completed_waves: 0,
            events: Vec::new(),
        }
    }

    /// Removes units whose lifetime ended by `now`, returning how many died.
    fn reap(&mut self, now: Duration) -> usize {
        let before = self.deaths.len();
        self.deaths.retain(|death| *death > now);
        before - self.deaths.len()
    }
}

impl WaveHooks for DemoHost {
    type Handle = UnitId;

    fn spawn_unit(&mut self, context: &SpawnContext) -> Result<UnitId, SpawnError> {
        if self.lifetime_ms.is_empty() {
            return Err(SpawnError::new(format!(
                "empty lifetime range for unit {} of wave {}",
                context.index, context.wave
            )));
        }

        let lifetime = Duration::from_millis(self.rng.gen_range(self.lifetime_ms.clone()));
        self.deaths.push(context.spawned_at.saturating_add(lifetime));
        let unit = UnitId(self.next_unit);
        self.next_unit += 1;
        Ok(unit)
    }

    fn on_wave_start(&mut self, wave: WaveNumber, count: u64, spawn_interval: Duration) {
        info!(%wave, count, interval = ?spawn_interval, "wave started");
        self.events.push(Event::WaveStarted {
            wave,
            count,
            spawn_interval,
        });
    }

    fn on_unit_spawned(&mut self, context: &SpawnContext, outcome: Result<&UnitId, &SpawnError>) {
        match outcome {
            Ok(unit) => debug!(
                wave = %context.wave,
                index = context.index,
                remaining = context.remaining_to_spawn,
                unit = unit.0,
                "unit spawned"
            ),
            Err(error) => {
                warn!(wave = %context.wave, index = context.index, %error, "unit lost");
                // Lost units are released on the next reap.
                self.deaths.push(context.spawned_at);
            }
        }
        self.events.push(Event::UnitSpawned {
            context: *context,
            failure: outcome.err().cloned(),
        });
    }

    fn on_wave_complete(&mut self, wave: WaveNumber) {
        self.completed_waves += 1;
        info!(%wave, "wave complete");
        self.events.push(Event::WaveCompleted { wave });
    }

    fn on_intermission_begin(&mut self, wave_just_completed: WaveNumber, duration: Duration) {
        info!(
            wave = %wave_just_completed,
            seconds = duration.as_secs_f32(),
            "intermission"
        );
        self.events.push(Event::IntermissionBegun {
            wave_just_completed,
            duration,
        });
    }
}

/// Runs waves until `options.waves` have been cleared.
pub(crate) fn run(config: SchedulerConfig, options: &SessionOptions) -> SessionReport {
    let tick = options.tick.max(Duration::from_millis(1));
    let mut scheduler = WaveScheduler::new(config, DemoHost::new(options));
    let started_at = Instant::now();

    if options.waves > 0 {
        scheduler.start();
    }

    while scheduler.hooks().completed_waves < options.waves {
        scheduler.advance(tick);

        let now = scheduler.elapsed();
        let died = scheduler.hooks_mut().reap(now);
        for _ in 0..died {
            scheduler.notify_unit_killed();
        }

        if options.realtime {
            if let Some(wait) = now.checked_sub(started_at.elapsed()) {
                thread::sleep(wait);
            }
        }
    }

    let status = scheduler.status();
    scheduler.stop();
    SessionReport {
        status,
        events: scheduler.into_hooks().events,
    }
}
