use std::{
    cell::RefCell,
    collections::{hash_map::DefaultHasher, HashSet},
    hash::{Hash, Hasher},
    rc::Rc,
    time::Duration,
};

use endless_waves_core::{
    Command, Event, Phase, SchedulerConfig, SpawnContext, SpawnError, WaveNumber,
};
use endless_waves_system_wave_scheduler::{Callbacks, WaveHooks, WaveScheduler};

fn fast_config() -> SchedulerConfig {
    SchedulerConfig::default()
        .with_intermission_ms(100)
        .with_base_units_per_wave(3.0)
        .with_per_wave_increment(2.0)
        .with_base_spawn_interval_ms(50)
        .with_min_spawn_interval_ms(10)
        .with_spawn_accel_per_wave_ms(5)
}

fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

#[derive(Debug, Default)]
struct Recorder {
    events: Vec<Event>,
    failing: HashSet<(u64, u64)>,
}

impl Recorder {
    fn failing_at(wave: u64, index: u64) -> Self {
        let mut recorder = Self::default();
        let _ = recorder.failing.insert((wave, index));
        recorder
    }

    fn spawns_in(&self, wave: u64) -> Vec<SpawnContext> {
        self.events
            .iter()
            .filter_map(|event| match event {
                Event::UnitSpawned { context, .. } if context.wave.get() == wave => Some(*context),
                _ => None,
            })
            .collect()
    }

    fn count(&self, predicate: impl Fn(&Event) -> bool) -> usize {
        self.events.iter().filter(|event| predicate(*event)).count()
    }
}

impl WaveHooks for Recorder {
    type Handle = u64;

    fn spawn_unit(&mut self, context: &SpawnContext) -> Result<u64, SpawnError> {
        if self.failing.contains(&(context.wave.get(), context.index)) {
            return Err(SpawnError::new("spawn point blocked"));
        }
        Ok(context.index)
    }

    fn on_wave_start(&mut self, wave: WaveNumber, count: u64, spawn_interval: Duration) {
        self.events.push(Event::WaveStarted {
            wave,
            count,
            spawn_interval,
        });
    }

    fn on_unit_spawned(&mut self, context: &SpawnContext, outcome: Result<&u64, &SpawnError>) {
        if let Ok(handle) = outcome {
            assert_eq!(*handle, context.index, "handle passed through unchanged");
        }
        self.events.push(Event::UnitSpawned {
            context: *context,
            failure: outcome.err().cloned(),
        });
    }

    fn on_wave_complete(&mut self, wave: WaveNumber) {
        self.events.push(Event::WaveCompleted { wave });
    }

    fn on_intermission_begin(&mut self, wave_just_completed: WaveNumber, duration: Duration) {
        self.events.push(Event::IntermissionBegun {
            wave_just_completed,
            duration,
        });
    }
}

fn started() -> WaveScheduler<Recorder> {
    let mut scheduler = WaveScheduler::new(fast_config(), Recorder::default());
    scheduler.start();
    scheduler
}

fn kill(scheduler: &mut WaveScheduler<Recorder>, times: u64) {
    for _ in 0..times {
        scheduler.notify_unit_killed();
        assert_counters_consistent(scheduler);
    }
}

fn assert_counters_consistent(scheduler: &WaveScheduler<Recorder>) {
    assert!(
        scheduler.spawned_count() <= scheduler.target_spawn_count(),
        "spawned {} exceeds target {}",
        scheduler.spawned_count(),
        scheduler.target_spawn_count()
    );
    assert!(scheduler.active_count() <= scheduler.spawned_count());
}

fn is_completion(event: &Event) -> bool {
    matches!(event, Event::WaveCompleted { .. })
}

fn is_intermission(event: &Event) -> bool {
    matches!(event, Event::IntermissionBegun { .. })
}

fn is_wave_start(event: &Event) -> bool {
    matches!(event, Event::WaveStarted { .. })
}

fn is_spawn(event: &Event) -> bool {
    matches!(event, Event::UnitSpawned { .. })
}

#[test]
fn first_wave_spawns_then_intermission_leads_to_harder_wave() {
    let mut scheduler = started();
    assert_eq!(
        scheduler.hooks().events,
        vec![Event::WaveStarted {
            wave: WaveNumber::FIRST,
            count: 3,
            spawn_interval: ms(50),
        }]
    );
    assert_eq!(scheduler.phase(), Phase::Spawning);

    scheduler.advance(ms(149));
    assert_eq!(scheduler.spawned_count(), 2);
    scheduler.advance(ms(1));
    assert_eq!(scheduler.spawned_count(), 3);
    assert_eq!(scheduler.active_count(), 3);
    assert_eq!(scheduler.phase(), Phase::Cleanup);

    let contexts = scheduler.hooks().spawns_in(1);
    let layout: Vec<_> = contexts
        .iter()
        .map(|context| (context.index, context.remaining_to_spawn))
        .collect();
    assert_eq!(layout, vec![(1, 2), (2, 1), (3, 0)]);
    let times: Vec<_> = contexts.iter().map(|context| context.spawned_at).collect();
    assert_eq!(times, vec![ms(50), ms(100), ms(150)]);

    kill(&mut scheduler, 3);
    let tail = &scheduler.hooks().events[scheduler.hooks().events.len() - 2..];
    assert_eq!(
        tail,
        [
            Event::WaveCompleted {
                wave: WaveNumber::FIRST,
            },
            Event::IntermissionBegun {
                wave_just_completed: WaveNumber::FIRST,
                duration: ms(100),
            },
        ]
    );
    assert_eq!(scheduler.phase(), Phase::Intermission);
    assert_eq!(scheduler.intermission_remaining(), Some(ms(100)));

    scheduler.advance(ms(99));
    assert_eq!(scheduler.wave(), WaveNumber::FIRST);
    assert_eq!(scheduler.intermission_remaining(), Some(ms(1)));

    scheduler.advance(ms(1));
    assert_eq!(scheduler.wave(), WaveNumber::new(2));
    assert_eq!(
        scheduler.hooks().events.last(),
        Some(&Event::WaveStarted {
            wave: WaveNumber::new(2),
            count: 5,
            spawn_interval: ms(45),
        })
    );
    assert_eq!(scheduler.phase(), Phase::Spawning);
    assert_eq!(scheduler.active_count(), 0);
}

#[test]
fn cadence_stops_once_the_wave_is_fully_spawned() {
    let mut scheduler = started();
    scheduler.advance(Duration::from_secs(5));

    assert_eq!(scheduler.hooks().count(is_spawn), 3);
    assert!(!scheduler.has_pending_timer());
    assert_eq!(scheduler.phase(), Phase::Cleanup);
    assert!(scheduler.is_running());
}

#[test]
fn surplus_kills_never_underflow_or_complete_twice() {
    let mut scheduler = started();
    scheduler.advance(ms(150));

    kill(&mut scheduler, 10);

    assert_eq!(scheduler.active_count(), 0);
    assert_eq!(scheduler.hooks().count(is_completion), 1);
    assert_eq!(scheduler.hooks().count(is_intermission), 1);
}

#[test]
fn kills_during_spawn_phase_do_not_complete_the_wave() {
    let mut scheduler = started();
    scheduler.advance(ms(50));
    kill(&mut scheduler, 2);

    assert_eq!(scheduler.active_count(), 0);
    assert_eq!(scheduler.hooks().count(is_completion), 0);
    assert_eq!(scheduler.phase(), Phase::Spawning);

    scheduler.advance(ms(100));
    assert_eq!(scheduler.spawned_count(), 3);
    kill(&mut scheduler, 2);
    assert_eq!(scheduler.hooks().count(is_completion), 1);
}

#[test]
fn stop_revokes_every_pending_timer() {
    let mut scheduler = started();
    scheduler.advance(ms(60));
    scheduler.stop();
    let recorded = scheduler.hooks().events.len();

    scheduler.advance(Duration::from_secs(10));
    kill(&mut scheduler, 1);

    assert_eq!(scheduler.hooks().events.len(), recorded);
    assert!(!scheduler.is_running());
    assert!(!scheduler.has_pending_timer());
    assert_eq!(scheduler.phase(), Phase::Idle);
    assert_eq!(scheduler.wave(), WaveNumber::FIRST, "stop keeps the counter");

    scheduler.stop();
    assert_eq!(scheduler.hooks().events.len(), recorded, "stop is idempotent");
}

#[test]
fn stop_during_intermission_skips_the_next_wave() {
    let mut scheduler = started();
    scheduler.advance(ms(150));
    kill(&mut scheduler, 3);
    assert_eq!(scheduler.phase(), Phase::Intermission);

    scheduler.stop();
    scheduler.advance(Duration::from_secs(1));

    assert_eq!(scheduler.hooks().count(is_wave_start), 1);
    assert_eq!(scheduler.wave(), WaveNumber::FIRST);
    assert_eq!(scheduler.intermission_remaining(), None);

    scheduler.start();
    assert_eq!(
        scheduler.hooks().events.last(),
        Some(&Event::WaveStarted {
            wave: WaveNumber::FIRST,
            count: 3,
            spawn_interval: ms(50),
        })
    );
}

#[test]
fn pause_halts_spawning_until_resume() {
    let mut scheduler = started();
    scheduler.advance(ms(60));
    assert_eq!(scheduler.spawned_count(), 1);

    scheduler.pause();
    scheduler.pause();
    assert!(scheduler.is_paused());
    scheduler.advance(ms(500));
    assert_eq!(scheduler.spawned_count(), 1);
    assert_eq!(scheduler.phase(), Phase::Spawning);

    scheduler.resume();
    assert!(!scheduler.is_paused());
    scheduler.advance(ms(49));
    assert_eq!(scheduler.spawned_count(), 1, "cadence restarts from resume");
    scheduler.advance(ms(1));
    assert_eq!(scheduler.spawned_count(), 2);
    assert_eq!(scheduler.hooks().spawns_in(1)[1].index, 2);
}

#[test]
fn resume_after_full_spawn_does_not_rearm_cadence() {
    let mut scheduler = started();
    scheduler.advance(ms(150));
    assert_eq!(scheduler.phase(), Phase::Cleanup);
    assert!(!scheduler.has_pending_timer());

    scheduler.pause();
    scheduler.resume();
    assert!(!scheduler.is_paused());
    assert!(!scheduler.has_pending_timer());

    scheduler.advance(Duration::from_secs(1));
    assert_eq!(scheduler.spawned_count(), 3);
    assert_eq!(scheduler.hooks().count(is_spawn), 3);
    assert_eq!(scheduler.phase(), Phase::Cleanup);
}

#[test]
fn pause_does_not_freeze_the_intermission() {
    let mut scheduler = started();
    scheduler.advance(ms(150));
    kill(&mut scheduler, 3);

    scheduler.pause();
    scheduler.advance(ms(100));

    // The intermission still elapses while paused; only spawning is held.
    assert_eq!(scheduler.wave(), WaveNumber::new(2));
    assert_eq!(scheduler.hooks().count(is_wave_start), 2);

    scheduler.advance(Duration::from_secs(1));
    assert!(scheduler.hooks().spawns_in(2).is_empty());

    scheduler.resume();
    scheduler.advance(ms(45));
    assert_eq!(scheduler.hooks().spawns_in(2).len(), 1);
}

#[test]
fn failed_spawns_are_reported_and_do_not_stall_the_wave() {
    let mut scheduler = WaveScheduler::new(fast_config(), Recorder::failing_at(1, 2));
    scheduler.start();
    scheduler.advance(ms(150));

    let failures: Vec<_> = scheduler
        .hooks()
        .events
        .iter()
        .filter_map(|event| match event {
            Event::UnitSpawned {
                context,
                failure: Some(error),
            } => Some((context.index, error.reason().to_owned())),
            _ => None,
        })
        .collect();
    assert_eq!(failures, vec![(2, "spawn point blocked".to_owned())]);
    assert_eq!(scheduler.spawned_count(), 3);
    assert_eq!(scheduler.active_count(), 3, "failed spawns stay active");

    // Unit one dies and the host releases the lost unit two; unit three lives on.
    kill(&mut scheduler, 2);
    assert_eq!(scheduler.active_count(), 1);
    assert_eq!(scheduler.hooks().count(is_completion), 0);
    assert_eq!(scheduler.phase(), Phase::Cleanup);

    kill(&mut scheduler, 1);
    assert_eq!(scheduler.hooks().count(is_completion), 1);
}

#[test]
fn failed_final_spawn_waits_for_the_host_to_release_it() {
    let mut scheduler = WaveScheduler::new(fast_config(), Recorder::failing_at(1, 3));
    scheduler.start();
    scheduler.advance(ms(100));
    kill(&mut scheduler, 2);
    assert_eq!(scheduler.hooks().count(is_completion), 0);

    scheduler.advance(ms(50));
    assert_eq!(scheduler.spawned_count(), 3);
    assert_eq!(scheduler.active_count(), 1);
    assert_eq!(scheduler.hooks().count(is_completion), 0);
    assert!(!scheduler.has_pending_timer(), "cadence stops after the last attempt");

    kill(&mut scheduler, 1);
    assert_eq!(scheduler.hooks().count(is_completion), 1);
    assert_eq!(scheduler.phase(), Phase::Intermission);
}

#[test]
fn operations_before_start_are_ignored() {
    let mut scheduler = WaveScheduler::new(fast_config(), Recorder::default());
    scheduler.pause();
    scheduler.resume();
    scheduler.notify_unit_killed();
    scheduler.stop();
    scheduler.advance(Duration::from_secs(3));

    assert!(scheduler.hooks().events.is_empty());
    assert_eq!(scheduler.wave(), WaveNumber::NONE);
    assert!(!scheduler.is_paused());
    assert_eq!(scheduler.elapsed(), Duration::from_secs(3));
}

#[test]
fn start_while_running_is_ignored() {
    let mut scheduler = started();
    scheduler.advance(ms(50));
    scheduler.start();

    assert_eq!(scheduler.hooks().count(is_wave_start), 1);
    assert_eq!(scheduler.spawned_count(), 1);
}

#[test]
fn timers_armed_inside_an_advance_fire_within_it() {
    let mut scheduler = started();
    scheduler.advance(ms(150));
    kill(&mut scheduler, 3);

    // Intermission ends at 250ms, wave two then spawns at 295..=475ms.
    scheduler.advance(ms(325));

    assert_eq!(scheduler.wave(), WaveNumber::new(2));
    assert_eq!(scheduler.hooks().spawns_in(2).len(), 5);
    assert_eq!(scheduler.phase(), Phase::Cleanup);
    assert_eq!(scheduler.elapsed(), ms(475));
}

#[test]
fn waves_continue_indefinitely_with_growing_difficulty() {
    let mut scheduler = started();

    for wave in 1..=12_u64 {
        let target = scheduler.target_spawn_count();
        let interval = scheduler.spawn_interval();
        assert_eq!(scheduler.wave(), WaveNumber::new(wave));
        assert_eq!(target, 3 + 2 * (wave - 1));
        assert_eq!(
            interval,
            ms(50_u64.saturating_sub(5 * (wave - 1)).max(10)),
            "wave {wave} cadence"
        );

        scheduler.advance(interval * u32::try_from(target).expect("small wave"));
        assert_eq!(scheduler.hooks().spawns_in(wave).len() as u64, target);
        assert_counters_consistent(&scheduler);

        kill(&mut scheduler, target);
        assert_eq!(scheduler.phase(), Phase::Intermission);
        scheduler.advance(ms(100));
    }

    assert!(scheduler.is_running());
    assert!(scheduler.has_pending_timer());
    assert_eq!(scheduler.hooks().count(is_completion), 12);
    assert_eq!(scheduler.hooks().count(is_intermission), 12);

    let completions: Vec<_> = scheduler
        .hooks()
        .events
        .iter()
        .enumerate()
        .filter(|(_, event)| is_completion(event))
        .map(|(index, _)| index)
        .collect();
    for index in completions {
        assert!(
            is_intermission(&scheduler.hooks().events[index + 1]),
            "each completion is followed by its intermission"
        );
    }
}

#[test]
fn status_snapshot_reflects_scheduler_state() {
    let mut scheduler = started();
    scheduler.advance(ms(120));

    let status = scheduler.status();
    assert_eq!(status.wave, WaveNumber::FIRST);
    assert_eq!(status.phase, Phase::Spawning);
    assert!(status.running);
    assert!(!status.paused);
    assert_eq!((status.spawned, status.target, status.active), (2, 3, 2));
    assert_eq!(status.spawn_interval, ms(50));
    assert_eq!(status.intermission_remaining, None);
    assert_eq!(status.elapsed, ms(120));
}

#[test]
fn closure_callbacks_receive_every_notification() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let hooks = {
        let on_start = Rc::clone(&log);
        let on_spawn = Rc::clone(&log);
        let on_complete = Rc::clone(&log);
        let on_intermission = Rc::clone(&log);
        Callbacks::new(|context: &SpawnContext| Ok(format!("unit-{}", context.index)))
            .on_wave_start(move |wave, count, interval| {
                on_start
                    .borrow_mut()
                    .push(format!("start {wave} x{count} every {}ms", interval.as_millis()));
            })
            .on_unit_spawned(move |context, outcome| {
                let handle = outcome.map(String::as_str).unwrap_or("none");
                on_spawn
                    .borrow_mut()
                    .push(format!("spawn {}#{} {handle}", context.wave, context.index));
            })
            .on_wave_complete(move |wave| on_complete.borrow_mut().push(format!("done {wave}")))
            .on_intermission_begin(move |wave, duration| {
                on_intermission
                    .borrow_mut()
                    .push(format!("rest {wave} {}ms", duration.as_millis()));
            })
    };

    let config = fast_config().with_base_units_per_wave(2.0);
    let mut scheduler = WaveScheduler::new(config, hooks);
    scheduler.start();
    scheduler.advance(ms(100));
    scheduler.notify_unit_killed();
    scheduler.notify_unit_killed();

    assert_eq!(
        *log.borrow(),
        vec![
            "start 1 x2 every 50ms",
            "spawn 1#1 unit-1",
            "spawn 1#2 unit-2",
            "done 1",
            "rest 1 100ms",
        ]
    );
}

#[test]
fn command_replay_is_deterministic() {
    let first = replay(scripted_commands());
    let second = replay(scripted_commands());

    assert_eq!(first, second, "replay diverged between runs");
    assert_eq!(fingerprint(&first), fingerprint(&second));
    assert!(first.iter().any(is_completion));
}

fn replay(commands: Vec<Command>) -> Vec<Event> {
    let mut scheduler = WaveScheduler::new(fast_config(), Recorder::failing_at(2, 4));
    for command in commands {
        scheduler.apply(command);
    }
    scheduler.into_hooks().events
}

fn fingerprint(events: &[Event]) -> u64 {
    let mut hasher = DefaultHasher::new();
    events.hash(&mut hasher);
    hasher.finish()
}

fn scripted_commands() -> Vec<Command> {
    let tick = |millis| Command::Tick { dt: ms(millis) };
    vec![
        Command::Start,
        tick(70),
        Command::Pause,
        tick(300),
        Command::Resume,
        tick(200),
        Command::UnitKilled,
        Command::UnitKilled,
        Command::UnitKilled,
        tick(400),
        Command::UnitKilled,
        Command::UnitKilled,
        Command::UnitKilled,
        Command::UnitKilled,
        tick(16),
        Command::Stop,
        tick(1_000),
    ]
}
