//! Cooperative timer scheduler.
//!
//! Timers are registered against a monotonic clock that the owning event loop
//! advances explicitly, so scheduling is deterministic under test. Due timers
//! are handed out one at a time by `pop_due`; a timer cancelled between two
//! pops is never delivered.
//!
//! A repeating timer that falls behind (the loop stalled for several periods)
//! fires once and is re-armed for the next period boundary after `now`, so
//! missed periods are coalesced rather than replayed.

use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// A timer that came due.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fired<E> {
    pub id: TimerId,
    pub event: E,
    /// Scheduled due time (not the time it was popped).
    pub due: Duration,
}

struct Timer<E> {
    id: TimerId,
    due: Duration,
    period: Option<Duration>,
    event: E,
}

pub struct Scheduler<E> {
    now: Duration,
    next_id: u64,
    timers: Vec<Timer<E>>,
}

impl<E: Clone> Scheduler<E> {
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            next_id: 1,
            timers: Vec::new(),
        }
    }

    /// Current scheduler time.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Fire `event` once, `delay` after the current time.
    pub fn schedule_once(&mut self, delay: Duration, event: E) -> TimerId {
        self.insert(self.now + delay, None, event)
    }

    /// Fire `event` every `period`, first at `now + period`.
    pub fn schedule_repeating(&mut self, period: Duration, event: E) -> TimerId {
        let period = period.max(Duration::from_millis(1));
        self.insert(self.now + period, Some(period), event)
    }

    /// Remove a pending timer. Returns false if it already fired (one-shot) or
    /// was never registered.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|timer| timer.id != id);
        self.timers.len() != before
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.timers.iter().any(|timer| timer.id == id)
    }

    pub fn pending(&self) -> usize {
        self.timers.len()
    }

    /// Time until the earliest pending timer, if any.
    pub fn next_due_in(&self) -> Option<Duration> {
        self.timers
            .iter()
            .map(|timer| timer.due.saturating_sub(self.now))
            .min()
    }

    /// Id the next registered timer will get. Timers registered from here on
    /// compare greater than or equal to it.
    pub fn horizon(&self) -> TimerId {
        TimerId(self.next_id)
    }

    /// Advance the clock to `now` (never backwards) and pop the earliest due
    /// timer. Ties resolve in registration order.
    pub fn pop_due(&mut self, now: Duration) -> Option<Fired<E>> {
        self.pop_due_before(now, TimerId(u64::MAX))
    }

    /// Like `pop_due`, but only timers registered before `horizon` are eligible.
    pub fn pop_due_before(&mut self, now: Duration, horizon: TimerId) -> Option<Fired<E>> {
        if now > self.now {
            self.now = now;
        }
        let index = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, timer)| timer.due <= self.now && timer.id < horizon)
            .min_by_key(|(_, timer)| (timer.due, timer.id))
            .map(|(index, _)| index)?;

        let timer = &mut self.timers[index];
        let fired = Fired {
            id: timer.id,
            event: timer.event.clone(),
            due: timer.due,
        };
        match timer.period {
            Some(period) => {
                // First period boundary strictly after `now`.
                let into_period = (self.now - timer.due).as_nanos() % period.as_nanos();
                let into_period =
                    Duration::from_nanos(u64::try_from(into_period).unwrap_or(u64::MAX));
                timer.due = self
                    .now
                    .checked_add(period.saturating_sub(into_period))
                    .unwrap_or(Duration::MAX);
            }
            None => {
                self.timers.remove(index);
            }
        }
        Some(fired)
    }

    fn insert(&mut self, due: Duration, period: Option<Duration>, event: E) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.timers.push(Timer {
            id,
            due,
            period,
            event,
        });
        id
    }
}

impl<E: Clone> Default for Scheduler<E> {
    fn default() -> Self {
        Self::new()
    }
}
