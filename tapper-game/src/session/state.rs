use crate::clock::{SessionTimer, Timestamp};
use std::collections::BTreeMap;
use std::time::Duration;

/// Transient state of the running sub-session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    total_goal: u32,
    tapped_count: u32,
    timer: SessionTimer,
    lap_durations: Vec<Duration>,
    last_lap: Option<Duration>,
    previous_lap: Option<Duration>,
    loot: BTreeMap<String, u64>,
}

impl SessionState {
    #[must_use]
    pub const fn new(total_goal: u32, now: Timestamp) -> Self {
        Self {
            total_goal,
            tapped_count: 0,
            timer: SessionTimer::start(now),
            lap_durations: Vec::new(),
            last_lap: None,
            previous_lap: None,
            loot: BTreeMap::new(),
        }
    }

    /// Append a completed lap, shifting last into previous.
    pub fn record_lap(&mut self, lap: Duration) {
        self.lap_durations.push(lap);
        self.tapped_count += 1;
        self.previous_lap = self.last_lap.replace(lap);
    }

    pub fn tally(&mut self, key: String, amount: u64) {
        let entry = self.loot.entry(key).or_insert(0);
        *entry = entry.saturating_add(amount);
    }

    /// Mean time per tap so far, excluding pauses.
    #[must_use]
    pub fn average(&self, now: Timestamp) -> Option<Duration> {
        (self.tapped_count > 0).then(|| self.timer.elapsed(now) / self.tapped_count)
    }

    #[must_use]
    pub const fn total_goal(&self) -> u32 {
        self.total_goal
    }

    #[must_use]
    pub const fn tapped_count(&self) -> u32 {
        self.tapped_count
    }

    #[must_use]
    pub const fn timer(&self) -> &SessionTimer {
        &self.timer
    }

    pub const fn timer_mut(&mut self) -> &mut SessionTimer {
        &mut self.timer
    }

    #[must_use]
    pub fn lap_durations(&self) -> &[Duration] {
        &self.lap_durations
    }

    #[must_use]
    pub const fn last_lap(&self) -> Option<Duration> {
        self.last_lap
    }

    #[must_use]
    pub const fn previous_lap(&self) -> Option<Duration> {
        self.previous_lap
    }

    #[must_use]
    pub const fn loot(&self) -> &BTreeMap<String, u64> {
        &self.loot
    }
}
