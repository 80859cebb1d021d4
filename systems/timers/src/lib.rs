#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic cancellable timers driven by simulated time.
//!
//! A [`TimerQueue`] owns a monotonic clock that only moves when the owner
//! advances it. Arming a timer yields a [`TimerToken`]; cancelling the token
//! removes the timer so it can never fire afterwards. Owners drain due timers
//! one at a time with [`TimerQueue::pop_due`], which lets a firing arm or
//! cancel other timers before the next one is considered.

use std::time::Duration;

/// Shortest period a repeating timer may use. Shorter periods are raised to it
/// so a zero interval cannot fire forever within a single advance.
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Handle identifying one armed timer. Tokens are never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerToken(u64);

impl TimerToken {
    /// Retrieves the numeric representation of the token.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// A timer that became due.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Firing {
    token: TimerToken,
    deadline: Duration,
}

impl Firing {
    /// Token of the timer that fired.
    #[must_use]
    pub const fn token(&self) -> TimerToken {
        self.token
    }

    /// Clock reading at which the timer was due.
    #[must_use]
    pub const fn deadline(&self) -> Duration {
        self.deadline
    }
}

#[derive(Clone, Copy, Debug)]
enum Schedule {
    Once,
    Every(Duration),
}

#[derive(Clone, Copy, Debug)]
struct Entry {
    token: TimerToken,
    deadline: Duration,
    schedule: Schedule,
}

/// Collection of armed timers sharing one simulated clock.
#[derive(Debug, Default)]
pub struct TimerQueue {
    now: Duration,
    next_token: u64,
    entries: Vec<Entry>,
}

impl TimerQueue {
    /// Creates an empty queue with its clock at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current clock reading.
    #[must_use]
    pub const fn now(&self) -> Duration {
        self.now
    }

    /// Arms a timer that fires once, `delay` after the current clock reading.
    pub fn arm_once(&mut self, delay: Duration) -> TimerToken {
        self.arm(delay, Schedule::Once)
    }

    /// Arms a timer that fires every `period`, first one period from now.
    ///
    /// If the clock jumps past several periods at once, every missed period
    /// still fires, in order.
    pub fn arm_repeating(&mut self, period: Duration) -> TimerToken {
        let period = period.max(MIN_PERIOD);
        self.arm(period, Schedule::Every(period))
    }

    /// Revokes a timer. Returns `false` if it was not armed.
    pub fn cancel(&mut self, token: TimerToken) -> bool {
        match self.position(token) {
            Some(index) => {
                let _ = self.entries.swap_remove(index);
                true
            }
            None => false,
        }
    }

    /// Time left until the timer next fires, if it is armed.
    #[must_use]
    pub fn remaining(&self, token: TimerToken) -> Option<Duration> {
        self.position(token)
            .map(|index| self.entries[index].deadline.saturating_sub(self.now))
    }

    /// Removes and returns the earliest timer due at or before `until`.
    ///
    /// The clock moves to the firing's deadline. Repeating timers are
    /// re-armed one period later; ties fire in arming order.
    pub fn pop_due(&mut self, until: Duration) -> Option<Firing> {
        let index = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.deadline <= until)
            .min_by_key(|(_, entry)| (entry.deadline, entry.token))
            .map(|(index, _)| index)?;

        let Entry {
            token,
            deadline,
            schedule,
        } = self.entries[index];
        match schedule {
            Schedule::Once => {
                let _ = self.entries.swap_remove(index);
            }
            Schedule::Every(period) => {
                self.entries[index].deadline = deadline.saturating_add(period);
            }
        }

        self.now = self.now.max(deadline);
        Some(Firing { token, deadline })
    }

    /// Moves the clock forward to `until` once no timer is due before it.
    pub fn settle(&mut self, until: Duration) {
        debug_assert!(
            self.entries.iter().all(|entry| entry.deadline > until),
            "settle called with due timers pending"
        );
        self.now = self.now.max(until);
    }

    fn arm(&mut self, delay: Duration, schedule: Schedule) -> TimerToken {
        let token = TimerToken(self.next_token);
        self.next_token = self.next_token.wrapping_add(1);
        self.entries.push(Entry {
            token,
            deadline: self.now.saturating_add(delay),
            schedule,
        });
        token
    }

    fn position(&self, token: TimerToken) -> Option<usize> {
        self.entries.iter().position(|entry| entry.token == token)
    }
}
