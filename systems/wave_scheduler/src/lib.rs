#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Endless wave scheduler.
//!
//! [`WaveScheduler`] runs an unbounded sequence of waves. Each wave spawns a
//! growing number of units on a tightening cadence, waits for the host to
//! report every unit killed, then sits out a fixed intermission before the next
//! wave begins. Time only moves when the host calls [`WaveScheduler::advance`],
//! so the scheduler is deterministic and shares the host's game loop rather
//! than owning threads.
//!
//! Both timing processes (the repeating spawn cadence and the one-shot
//! intermission) are tokens in a [`TimerQueue`]. Stopping or pausing revokes
//! the relevant token, and every firing is matched against the token the
//! scheduler currently holds, so a revoked timer can never mutate state.

mod hooks;

use std::time::Duration;

use endless_waves_core::{Command, Phase, SchedulerConfig, SpawnContext, WaveNumber, WaveStatus};
use endless_waves_timers::{TimerQueue, TimerToken};
use tracing::{debug, trace, warn};

pub use hooks::{Callbacks, WaveHooks};

/// Drives waves of units through spawn, cleanup and intermission phases.
#[derive(Debug)]
pub struct WaveScheduler<H: WaveHooks> {
    config: SchedulerConfig,
    hooks: H,
    timers: TimerQueue,
    wave: WaveNumber,
    running: bool,
    paused: bool,
    spawned: u64,
    target: u64,
    active: u64,
    spawn_interval: Duration,
    spawn_timer: Option<TimerToken>,
    intermission_timer: Option<TimerToken>,
}

impl<H: WaveHooks> WaveScheduler<H> {
    /// Creates an idle scheduler. Nothing happens until [`Self::start`].
    #[must_use]
    pub fn new(config: SchedulerConfig, hooks: H) -> Self {
        Self {
            config,
            hooks,
            timers: TimerQueue::new(),
            wave: WaveNumber::NONE,
            running: false,
            paused: false,
            spawned: 0,
            target: 0,
            active: 0,
            spawn_interval: Duration::ZERO,
            spawn_timer: None,
            intermission_timer: None,
        }
    }

    /// Dispatches a host command to the matching operation.
    pub fn apply(&mut self, command: Command) {
        match command {
            Command::Start => self.start(),
            Command::Stop => self.stop(),
            Command::Pause => self.pause(),
            Command::Resume => self.resume(),
            Command::UnitKilled => self.notify_unit_killed(),
            Command::Tick { dt } => self.advance(dt),
        }
    }

    /// Begins the run at wave one. Does nothing while already running.
    pub fn start(&mut self) {
        if self.running {
            return;
        }

        self.running = true;
        self.paused = false;
        self.wave = WaveNumber::FIRST;
        debug!("wave scheduler started");
        self.begin_wave();
    }

    /// Halts the run and revokes both timers. The wave counter is kept.
    pub fn stop(&mut self) {
        if self.running {
            debug!(wave = %self.wave, "wave scheduler stopped");
        }

        self.running = false;
        self.paused = false;
        self.cancel_spawn_cadence();
        self.cancel_intermission();
    }

    /// Suspends spawning. A pending intermission keeps counting down.
    pub fn pause(&mut self) {
        if !self.running || self.paused {
            return;
        }

        self.paused = true;
        self.cancel_spawn_cadence();
        debug!(wave = %self.wave, spawned = self.spawned, "spawning paused");
    }

    /// Lifts a pause and re-arms the cadence from the current progress.
    pub fn resume(&mut self) {
        if !self.running || !self.paused {
            return;
        }

        self.paused = false;
        debug!(wave = %self.wave, spawned = self.spawned, "spawning resumed");
        if self.spawned < self.target {
            self.arm_spawn_cadence();
        }
    }

    /// Records that one active unit died, despawned or escaped.
    ///
    /// Surplus reports are absorbed: the active count never drops below zero
    /// and a wave never completes twice.
    pub fn notify_unit_killed(&mut self) {
        if !self.running {
            return;
        }

        if self.active == 0 {
            trace!(wave = %self.wave, "kill reported with no active units");
        }
        self.active = self.active.saturating_sub(1);
        self.maybe_complete_wave();
    }

    /// Advances the scheduler clock by `dt`, firing every timer that falls due
    /// in deadline order.
    pub fn advance(&mut self, dt: Duration) {
        let until = self.timers.now().saturating_add(dt);
        while let Some(firing) = self.timers.pop_due(until) {
            self.dispatch(firing.token());
        }
        self.timers.settle(until);
    }

    /// Current wave, or [`WaveNumber::NONE`] before the first start.
    #[must_use]
    pub const fn wave(&self) -> WaveNumber {
        self.wave
    }

    /// Reports whether the run is active.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// Reports whether spawning is suspended.
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    /// Units spawned so far in the current wave.
    #[must_use]
    pub const fn spawned_count(&self) -> u64 {
        self.spawned
    }

    /// Units the current wave spawns in total.
    #[must_use]
    pub const fn target_spawn_count(&self) -> u64 {
        self.target
    }

    /// Spawned units not yet reported killed.
    #[must_use]
    pub const fn active_count(&self) -> u64 {
        self.active
    }

    /// Cadence of the current wave.
    #[must_use]
    pub const fn spawn_interval(&self) -> Duration {
        self.spawn_interval
    }

    /// Total time the scheduler clock has advanced.
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        self.timers.now()
    }

    /// Configuration the scheduler was built with.
    #[must_use]
    pub const fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Phase of the wave cycle.
    #[must_use]
    pub fn phase(&self) -> Phase {
        if !self.running {
            Phase::Idle
        } else if self.intermission_timer.is_some() {
            Phase::Intermission
        } else if self.spawned < self.target {
            Phase::Spawning
        } else {
            Phase::Cleanup
        }
    }

    /// Time left before the next wave, while an intermission is pending.
    #[must_use]
    pub fn intermission_remaining(&self) -> Option<Duration> {
        self.intermission_timer
            .and_then(|token| self.timers.remaining(token))
    }

    /// Reports whether a spawn cadence or intermission is armed.
    #[must_use]
    pub fn has_pending_timer(&self) -> bool {
        self.spawn_timer.is_some() || self.intermission_timer.is_some()
    }

    /// Captures a snapshot of the scheduler state.
    #[must_use]
    pub fn status(&self) -> WaveStatus {
        WaveStatus {
            wave: self.wave,
            phase: self.phase(),
            running: self.running,
            paused: self.paused,
            spawned: self.spawned,
            target: self.target,
            active: self.active,
            spawn_interval: self.spawn_interval,
            intermission_remaining: self.intermission_remaining(),
            elapsed: self.elapsed(),
        }
    }

    /// Shared access to the host hooks.
    #[must_use]
    pub const fn hooks(&self) -> &H {
        &self.hooks
    }

    /// Exclusive access to the host hooks.
    pub fn hooks_mut(&mut self) -> &mut H {
        &mut self.hooks
    }

    /// Consumes the scheduler, returning the host hooks.
    #[must_use]
    pub fn into_hooks(self) -> H {
        self.hooks
    }

    fn dispatch(&mut self, token: TimerToken) {
        if self.spawn_timer == Some(token) {
            self.on_spawn_tick();
        } else if self.intermission_timer == Some(token) {
            self.on_intermission_elapsed();
        } else {
            trace!(token = token.get(), "ignoring revoked timer");
        }
    }

    fn begin_wave(&mut self) {
        self.spawned = 0;
        self.active = 0;
        self.target = self.config.units_for_wave(self.wave);
        self.spawn_interval = self.config.spawn_interval_for_wave(self.wave);

        debug!(
            wave = %self.wave,
            count = self.target,
            interval = ?self.spawn_interval,
            "wave started"
        );
        self.hooks
            .on_wave_start(self.wave, self.target, self.spawn_interval);

        // A pause that outlived the intermission holds the cadence until resume.
        if !self.paused {
            self.arm_spawn_cadence();
        }
    }

    fn on_spawn_tick(&mut self) {
        if !self.running || self.paused {
            self.cancel_spawn_cadence();
            return;
        }

        if self.spawned >= self.target {
            self.cancel_spawn_cadence();
            self.maybe_complete_wave();
            return;
        }

        self.spawn_next_unit();
    }

    fn spawn_next_unit(&mut self) {
        self.spawned = self.spawned.saturating_add(1);
        self.active = self.active.saturating_add(1);
        let context = SpawnContext {
            wave: self.wave,
            index: self.spawned,
            remaining_to_spawn: self.target.saturating_sub(self.spawned),
            spawned_at: self.timers.now(),
        };

        let outcome = self.hooks.spawn_unit(&context);
        match &outcome {
            Ok(_) => trace!(wave = %context.wave, index = context.index, "unit spawned"),
            // The unit stays counted as active until the host reports it.
            Err(error) => warn!(
                wave = %context.wave,
                index = context.index,
                %error,
                "spawn hook failed; continuing wave"
            ),
        }
        self.hooks.on_unit_spawned(&context, outcome.as_ref());

        if self.spawned >= self.target {
            self.cancel_spawn_cadence();
        }
    }

    fn maybe_complete_wave(&mut self) {
        if !self.running || self.intermission_timer.is_some() {
            return;
        }
        if self.spawned < self.target || self.active > 0 {
            return;
        }

        debug!(wave = %self.wave, "wave complete");
        self.hooks.on_wave_complete(self.wave);
        self.schedule_intermission();
    }

    fn schedule_intermission(&mut self) {
        let duration = self.config.intermission();
        self.hooks.on_intermission_begin(self.wave, duration);
        self.intermission_timer = Some(self.timers.arm_once(duration));
    }

    fn on_intermission_elapsed(&mut self) {
        self.intermission_timer = None;
        if !self.running {
            return;
        }

        self.wave = self.wave.next();
        self.begin_wave();
    }

    fn arm_spawn_cadence(&mut self) {
        self.cancel_spawn_cadence();
        self.spawn_timer = Some(self.timers.arm_repeating(self.spawn_interval));
    }

    fn cancel_spawn_cadence(&mut self) {
        if let Some(token) = self.spawn_timer.take() {
            let _ = self.timers.cancel(token);
        }
    }

    fn cancel_intermission(&mut self) {
        if let Some(token) = self.intermission_timer.take() {
            let _ = self.timers.cancel(token);
        }
    }
}
