//! Cross-session cycle bookkeeping.
//!
//! A cycle is one full pass over every tappable object. Its size is learned
//! from the first session the user marks as a full cycle and never changes
//! afterwards; later sessions may each cover only part of it.
use crate::numbers::{u64_to_f64, usize_to_f64};
use serde::{Deserialize, Serialize};

/// Persisted cycle progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CycleState {
    #[serde(default)]
    pub cycle_goal: Option<u32>,
    #[serde(default)]
    pub tapped_in_current_cycle: u32,
}

/// What a session commit did to the cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CycleCommit {
    /// Goal learned by this commit, if any.
    pub goal_set: Option<u32>,
    /// The cycle boundary was reached and progress reset.
    pub completed: bool,
}

impl CycleState {
    /// Whether the running session has reached the end of the cycle.
    #[must_use]
    pub const fn boundary_reached(&self, tapped_so_far: u32) -> bool {
        match self.cycle_goal {
            Some(goal) => self.tapped_in_current_cycle.saturating_add(tapped_so_far) >= goal,
            None => false,
        }
    }

    /// Ordinal of the next tap within the cycle.
    ///
    /// Until a goal is learned this counts from the start of the running
    /// session, even though partial sessions already accumulate progress.
    #[must_use]
    pub const fn next_tap_ordinal(&self, tapped_so_far: u32) -> u32 {
        match self.cycle_goal {
            Some(_) => self
                .tapped_in_current_cycle
                .saturating_add(tapped_so_far)
                .saturating_add(1),
            None => tapped_so_far.saturating_add(1),
        }
    }

    /// Fraction of the cycle covered including the running session, in `[0, 1]`.
    #[must_use]
    pub fn progress_fraction(&self, tapped_so_far: u32) -> Option<f64> {
        let goal = self.cycle_goal.filter(|goal| *goal > 0)?;
        let done = self.tapped_in_current_cycle.saturating_add(tapped_so_far);
        Some((u64_to_f64(u64::from(done)) / u64_to_f64(u64::from(goal))).clamp(0.0, 1.0))
    }

    /// Fold a finished session's taps into the cycle.
    pub fn commit(&mut self, tapped: u32, full_cycle: bool) -> CycleCommit {
        let mut outcome = CycleCommit::default();
        if full_cycle && self.cycle_goal.is_none() {
            let goal = self.tapped_in_current_cycle.saturating_add(tapped);
            if goal > 0 {
                self.cycle_goal = Some(goal);
                outcome.goal_set = Some(goal);
                log::info!("cycle goal learned: {goal} taps");
            }
        }
        self.tapped_in_current_cycle = self.tapped_in_current_cycle.saturating_add(tapped);
        if let Some(goal) = self.cycle_goal
            && self.tapped_in_current_cycle >= goal
        {
            self.tapped_in_current_cycle = 0;
            outcome.completed = true;
            log::info!("cycle of {goal} taps completed");
        }
        log::debug!(
            "cycle commit: +{tapped} taps, now {} of {:?}",
            self.tapped_in_current_cycle,
            self.cycle_goal
        );
        outcome
    }
}

/// Share of a session's taps relative to a known cycle size, for reports.
#[must_use]
pub fn coverage(tapped: usize, goal: u32) -> f64 {
    if goal == 0 {
        return 0.0;
    }
    usize_to_f64(tapped) / u64_to_f64(u64::from(goal))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_full_cycle_sets_goal_and_resets() {
        let mut cycle = CycleState::default();
        assert!(!cycle.boundary_reached(3));
        let commit = cycle.commit(3, true);
        assert_eq!(
            commit,
            CycleCommit {
                goal_set: Some(3),
                completed: true
            }
        );
        assert_eq!(cycle.cycle_goal, Some(3));
        assert_eq!(cycle.tapped_in_current_cycle, 0);
    }

    #[test]
    fn goal_never_overwritten() {
        let mut cycle = CycleState {
            cycle_goal: Some(10),
            tapped_in_current_cycle: 0,
        };
        let commit = cycle.commit(4, true);
        assert_eq!(commit.goal_set, None);
        assert!(!commit.completed);
        assert_eq!(cycle.cycle_goal, Some(10));
        assert_eq!(cycle.tapped_in_current_cycle, 4);
    }

    #[test]
    fn partial_sessions_accumulate_into_goal() {
        let mut cycle = CycleState::default();
        cycle.commit(4, false);
        assert_eq!(cycle.cycle_goal, None);
        let commit = cycle.commit(6, true);
        assert_eq!(commit.goal_set, Some(10));
        assert!(commit.completed);
        assert_eq!(cycle.tapped_in_current_cycle, 0);
    }

    #[test]
    fn boundary_and_ordinal_track_running_session() {
        let cycle = CycleState {
            cycle_goal: Some(100),
            tapped_in_current_cycle: 98,
        };
        assert_eq!(cycle.next_tap_ordinal(0), 99);
        assert!(!cycle.boundary_reached(1));
        assert!(cycle.boundary_reached(2));
        assert_eq!(cycle.progress_fraction(1), Some(0.99));
        assert_eq!(CycleState::default().progress_fraction(5), None);
    }

    #[test]
    fn ordinal_restarts_per_session_without_goal() {
        let mut cycle = CycleState::default();
        cycle.commit(5, false);
        assert_eq!(cycle.tapped_in_current_cycle, 5);
        assert_eq!(cycle.next_tap_ordinal(0), 1);
        assert_eq!(cycle.next_tap_ordinal(2), 3);
    }

    #[test]
    fn zero_tap_full_cycle_learns_nothing() {
        let mut cycle = CycleState::default();
        assert_eq!(cycle.commit(0, true), CycleCommit::default());
        assert_eq!(cycle.cycle_goal, None);
    }

    #[test]
    fn coverage_handles_zero_goal() {
        assert!((coverage(5, 10) - 0.5).abs() < f64::EPSILON);
        assert!(coverage(5, 0).abs() < f64::EPSILON);
    }
}
