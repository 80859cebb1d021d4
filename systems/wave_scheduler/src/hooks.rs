use std::{fmt, time::Duration};

use endless_waves_core::{SpawnContext, SpawnError, WaveNumber};

/// Host integration points invoked synchronously by the scheduler.
///
/// Only [`WaveHooks::spawn_unit`] is required; every notification defaults to
/// doing nothing.
pub trait WaveHooks {
    /// Opaque value the host associates with a spawned unit.
    type Handle;

    /// Materialises one unit. Returning an error does not stop the wave; the
    /// failure is logged and passed on to [`WaveHooks::on_unit_spawned`].
    /// A failed unit still counts as active until the host reports it killed.
    fn spawn_unit(&mut self, context: &SpawnContext) -> Result<Self::Handle, SpawnError>;

    /// A wave began. `count` units will be spawned every `spawn_interval`.
    fn on_wave_start(&mut self, _wave: WaveNumber, _count: u64, _spawn_interval: Duration) {}

    /// A spawn tick ran, successfully or not.
    fn on_unit_spawned(
        &mut self,
        _context: &SpawnContext,
        _outcome: Result<&Self::Handle, &SpawnError>,
    ) {
    }

    /// Every unit of the wave was spawned and cleared.
    fn on_wave_complete(&mut self, _wave: WaveNumber) {}

    /// The intermission after `wave_just_completed` started counting down.
    fn on_intermission_begin(&mut self, _wave_just_completed: WaveNumber, _duration: Duration) {}
}

type SpawnFn<T> = Box<dyn FnMut(&SpawnContext) -> Result<T, SpawnError>>;
type WaveStartFn = Box<dyn FnMut(WaveNumber, u64, Duration)>;
type UnitSpawnedFn<T> = Box<dyn FnMut(&SpawnContext, Result<&T, &SpawnError>)>;
type WaveCompleteFn = Box<dyn FnMut(WaveNumber)>;
type IntermissionFn = Box<dyn FnMut(WaveNumber, Duration)>;

/// Closure-backed [`WaveHooks`] for hosts that prefer wiring callbacks over
/// implementing the trait.
pub struct Callbacks<T> {
    spawn_unit: SpawnFn<T>,
    on_wave_start: Option<WaveStartFn>,
    on_unit_spawned: Option<UnitSpawnedFn<T>>,
    on_wave_complete: Option<WaveCompleteFn>,
    on_intermission_begin: Option<IntermissionFn>,
}

impl<T> Callbacks<T> {
    /// Creates hooks around the mandatory spawn closure.
    #[must_use]
    pub fn new(
        spawn_unit: impl FnMut(&SpawnContext) -> Result<T, SpawnError> + 'static,
    ) -> Self {
        Self {
            spawn_unit: Box::new(spawn_unit),
            on_wave_start: None,
            on_unit_spawned: None,
            on_wave_complete: None,
            on_intermission_begin: None,
        }
    }

    /// Registers the wave-start notification.
    #[must_use]
    pub fn on_wave_start(
        mut self,
        callback: impl FnMut(WaveNumber, u64, Duration) + 'static,
    ) -> Self {
        self.on_wave_start = Some(Box::new(callback));
        self
    }

    /// Registers the per-spawn notification.
    #[must_use]
    pub fn on_unit_spawned(
        mut self,
        callback: impl FnMut(&SpawnContext, Result<&T, &SpawnError>) + 'static,
    ) -> Self {
        self.on_unit_spawned = Some(Box::new(callback));
        self
    }

    /// Registers the wave-complete notification.
    #[must_use]
    pub fn on_wave_complete(mut self, callback: impl FnMut(WaveNumber) + 'static) -> Self {
        self.on_wave_complete = Some(Box::new(callback));
        self
    }

    /// Registers the intermission notification.
    #[must_use]
    pub fn on_intermission_begin(
        mut self,
        callback: impl FnMut(WaveNumber, Duration) + 'static,
    ) -> Self {
        self.on_intermission_begin = Some(Box::new(callback));
        self
    }
}

impl<T> fmt::Debug for Callbacks<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_wave_start", &self.on_wave_start.is_some())
            .field("on_unit_spawned", &self.on_unit_spawned.is_some())
            .field("on_wave_complete", &self.on_wave_complete.is_some())
            .field("on_intermission_begin", &self.on_intermission_begin.is_some())
            .finish_non_exhaustive()
    }
}

impl<T> WaveHooks for Callbacks<T> {
    type Handle = T;

    fn spawn_unit(&mut self, context: &SpawnContext) -> Result<T, SpawnError> {
        (self.spawn_unit)(context)
    }

    fn on_wave_start(&mut self, wave: WaveNumber, count: u64, spawn_interval: Duration) {
        if let Some(callback) = self.on_wave_start.as_mut() {
            callback(wave, count, spawn_interval);
        }
    }

    fn on_unit_spawned(&mut self, context: &SpawnContext, outcome: Result<&T, &SpawnError>) {
        if let Some(callback) = self.on_unit_spawned.as_mut() {
            callback(context, outcome);
        }
    }

    fn on_wave_complete(&mut self, wave: WaveNumber) {
        if let Some(callback) = self.on_wave_complete.as_mut() {
            callback(wave);
        }
    }

    fn on_intermission_begin(&mut self, wave_just_completed: WaveNumber, duration: Duration) {
        if let Some(callback) = self.on_intermission_begin.as_mut() {
            callback(wave_just_completed, duration);
        }
    }
}
