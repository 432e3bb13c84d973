//! Wall-clock abstraction, session timer and display ticker.
//!
//! Timers only ever *read* the clock. Counters and lap sequences are mutated
//! exclusively by the session transitions, so a display poll can never race a
//! tap.
use chrono::{DateTime, TimeDelta, Utc};
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

/// Instant on the wall clock.
pub type Timestamp = DateTime<Utc>;

/// Source of the current time.
pub trait Clock {
    fn now(&self) -> Timestamp;
}

/// Clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

/// Hand-driven clock for tests and simulations. Clones share the same instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<Timestamp>>,
}

impl ManualClock {
    #[must_use]
    pub fn starting_at(now: Timestamp) -> Self {
        Self {
            now: Rc::new(Cell::new(now)),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        self.now.set(shift(self.now.get(), by));
    }

    /// Jump to an absolute instant.
    pub fn set(&self, now: Timestamp) {
        self.now.set(now);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::starting_at(DateTime::UNIX_EPOCH)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.get()
    }
}

/// Positive span from `earlier` to `later`; zero when `later` precedes `earlier`.
#[must_use]
pub fn span(earlier: Timestamp, later: Timestamp) -> Duration {
    later
        .signed_duration_since(earlier)
        .to_std()
        .unwrap_or_default()
}

/// Move an instant forward by a duration, saturating at the representable range.
#[must_use]
pub fn shift(at: Timestamp, by: Duration) -> Timestamp {
    TimeDelta::from_std(by)
        .ok()
        .and_then(|delta| at.checked_add_signed(delta))
        .unwrap_or(at)
}

/// Move an instant backward by a duration, saturating at the representable range.
#[must_use]
pub fn rewind(at: Timestamp, by: Duration) -> Timestamp {
    TimeDelta::from_std(by)
        .ok()
        .and_then(|delta| at.checked_sub_signed(delta))
        .unwrap_or(at)
}

/// Elapsed-time and lap bookkeeping for one sub-session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTimer {
    started_at: Timestamp,
    lap_started_at: Option<Timestamp>,
    paused_at: Option<Timestamp>,
    total_paused: Duration,
}

impl SessionTimer {
    #[must_use]
    pub const fn start(now: Timestamp) -> Self {
        Self {
            started_at: now,
            lap_started_at: None,
            paused_at: None,
            total_paused: Duration::ZERO,
        }
    }

    pub const fn begin_lap(&mut self, now: Timestamp) {
        self.lap_started_at = Some(now);
    }

    /// Close the in-flight lap and return its duration.
    pub fn finish_lap(&mut self, now: Timestamp) -> Option<Duration> {
        let started = self.lap_started_at.take()?;
        Some(span(started, now))
    }

    /// Freeze elapsed accounting. Returns `false` if already paused.
    pub const fn pause(&mut self, now: Timestamp) -> bool {
        if self.paused_at.is_some() {
            return false;
        }
        self.paused_at = Some(now);
        true
    }

    /// Thaw the timer, re-basing the in-flight lap by the pause length.
    /// Returns the pause duration, or `None` if the timer was not paused.
    pub fn resume(&mut self, now: Timestamp) -> Option<Duration> {
        let paused_at = self.paused_at.take()?;
        let pause = span(paused_at, now);
        self.total_paused = self.total_paused.saturating_add(pause);
        if let Some(lap_started) = self.lap_started_at {
            self.lap_started_at = Some(shift(lap_started, pause));
        }
        Some(pause)
    }

    /// Wall time since start minus every pause, frozen while paused.
    #[must_use]
    pub fn elapsed(&self, now: Timestamp) -> Duration {
        let reference = self.paused_at.unwrap_or(now);
        span(self.started_at, reference).saturating_sub(self.total_paused)
    }

    /// Running duration of the in-flight lap, if any.
    #[must_use]
    pub fn current_lap(&self, now: Timestamp) -> Option<Duration> {
        let reference = self.paused_at.unwrap_or(now);
        self.lap_started_at.map(|started| span(started, reference))
    }

    #[must_use]
    pub const fn started_at(&self) -> Timestamp {
        self.started_at
    }

    #[must_use]
    pub const fn lap_started_at(&self) -> Option<Timestamp> {
        self.lap_started_at
    }

    #[must_use]
    pub const fn paused_at(&self) -> Option<Timestamp> {
        self.paused_at
    }

    #[must_use]
    pub const fn total_paused(&self) -> Duration {
        self.total_paused
    }

    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }
}

/// Fixed-interval poller for the elapsed display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayTicker {
    interval: Duration,
    last_tick: Option<u128>,
}

impl DisplayTicker {
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_tick: None,
        }
    }

    /// Returns the elapsed time once per crossed interval, `None` otherwise.
    pub fn poll(&mut self, timer: &SessionTimer, now: Timestamp) -> Option<Duration> {
        let elapsed = timer.elapsed(now);
        let tick = elapsed.as_nanos() / self.interval.as_nanos().max(1);
        if self.last_tick == Some(tick) {
            return None;
        }
        self.last_tick = Some(tick);
        Some(elapsed)
    }

    pub const fn reset(&mut self) {
        self.last_tick = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::default();
        let other = clock.clone();
        clock.advance(secs(5));
        assert_eq!(span(DateTime::UNIX_EPOCH, other.now()), secs(5));
    }

    #[test]
    fn span_never_goes_negative() {
        let clock = ManualClock::default();
        let earlier = clock.now();
        clock.advance(secs(3));
        assert_eq!(span(clock.now(), earlier), Duration::ZERO);
    }

    #[test]
    fn pause_freezes_elapsed_and_resume_rebases_lap() {
        let clock = ManualClock::default();
        let mut timer = SessionTimer::start(clock.now());
        clock.advance(secs(2));
        timer.begin_lap(clock.now());
        clock.advance(secs(4));
        assert!(timer.pause(clock.now()));
        assert!(!timer.pause(clock.now()));
        clock.advance(secs(30));
        assert_eq!(timer.elapsed(clock.now()), secs(6));
        assert_eq!(timer.current_lap(clock.now()), Some(secs(4)));

        assert_eq!(timer.resume(clock.now()), Some(secs(30)));
        clock.advance(secs(1));
        assert_eq!(timer.finish_lap(clock.now()), Some(secs(5)));
        assert_eq!(timer.elapsed(clock.now()), secs(7));
        assert_eq!(timer.total_paused(), secs(30));
    }

    #[test]
    fn resume_without_pause_is_noop() {
        let clock = ManualClock::default();
        let mut timer = SessionTimer::start(clock.now());
        assert_eq!(timer.resume(clock.now()), None);
        assert_eq!(timer.total_paused(), Duration::ZERO);
    }

    #[test]
    fn ticker_fires_once_per_interval() {
        let clock = ManualClock::default();
        let timer = SessionTimer::start(clock.now());
        let mut ticker = DisplayTicker::new(secs(1));
        assert_eq!(ticker.poll(&timer, clock.now()), Some(Duration::ZERO));
        clock.advance(Duration::from_millis(400));
        assert_eq!(ticker.poll(&timer, clock.now()), None);
        clock.advance(Duration::from_millis(700));
        assert_eq!(
            ticker.poll(&timer, clock.now()),
            Some(Duration::from_millis(1100))
        );
    }
}
