//! Canned player behaviours for the simulator.
use serde::Serialize;
use std::time::Duration;

const HOUR: Duration = Duration::from_secs(3600);

/// How a simulated player taps through a run of sessions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionPlan {
    /// Taps aimed for in each session.
    pub goal: u32,
    /// Goal of the very first session when it differs.
    pub first_goal: Option<u32>,
    /// End the first session as a full cycle so the cycle size is learned.
    pub first_full_cycle: bool,
    pub min_lap_ms: u64,
    pub max_lap_ms: u64,
    /// Lap-time multiplier applied once per session.
    pub speedup: f64,
    /// Pause in the middle of every n-th tap.
    pub pause_every: Option<u32>,
    pub pause_length: Duration,
    /// Wall time between sessions.
    pub session_gap: Duration,
    pub tend_plantation: bool,
    pub shop: bool,
    pub expect: Expectations,
}

impl Default for SessionPlan {
    fn default() -> Self {
        Self {
            goal: 20,
            first_goal: None,
            first_full_cycle: false,
            min_lap_ms: 1500,
            max_lap_ms: 3000,
            speedup: 1.0,
            pause_every: None,
            pause_length: Duration::ZERO,
            session_gap: HOUR * 20,
            tend_plantation: false,
            shop: false,
            expect: Expectations::default(),
        }
    }
}

/// Outcomes a scenario must produce once it runs for at least four sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub struct Expectations {
    pub min_new_records: usize,
    pub auto_end: bool,
    pub cycle_learned: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scenario {
    pub name: &'static str,
    pub description: &'static str,
    pub plan: SessionPlan,
}

#[must_use]
pub fn all_scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            name: "steady",
            description: "Even pacing, first session learns the cycle, buys upgrades",
            plan: SessionPlan {
                goal: 25,
                first_full_cycle: true,
                shop: true,
                expect: Expectations {
                    cycle_learned: true,
                    auto_end: true,
                    ..Expectations::default()
                },
                ..SessionPlan::default()
            },
        },
        Scenario {
            name: "pause-heavy",
            description: "Pauses mid-lap every third tap; laps must ignore paused time",
            plan: SessionPlan {
                goal: 15,
                min_lap_ms: 2000,
                max_lap_ms: 4000,
                pause_every: Some(3),
                pause_length: Duration::from_secs(300),
                ..SessionPlan::default()
            },
        },
        Scenario {
            name: "cycle-split",
            description: "Learns a 30-tap cycle, then covers it in 12-tap sub-sessions",
            plan: SessionPlan {
                goal: 12,
                first_goal: Some(30),
                first_full_cycle: true,
                min_lap_ms: 1000,
                max_lap_ms: 2500,
                session_gap: HOUR * 3,
                expect: Expectations {
                    auto_end: true,
                    cycle_learned: true,
                    ..Expectations::default()
                },
                ..SessionPlan::default()
            },
        },
        Scenario {
            name: "record-chase",
            description: "Gets faster every session and should keep setting records",
            plan: SessionPlan {
                min_lap_ms: 3000,
                max_lap_ms: 4000,
                speedup: 0.9,
                expect: Expectations {
                    min_new_records: 3,
                    ..Expectations::default()
                },
                ..SessionPlan::default()
            },
        },
        Scenario {
            name: "plantation",
            description: "Long sessions that plant, water, grow and upgrade every drop",
            plan: SessionPlan {
                goal: 80,
                min_lap_ms: 800,
                max_lap_ms: 1600,
                session_gap: HOUR * 26,
                tend_plantation: true,
                shop: true,
                ..SessionPlan::default()
            },
        },
    ]
}

#[must_use]
pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    all_scenarios()
        .into_iter()
        .map(|scenario| (scenario.name, scenario.description))
        .collect()
}

#[must_use]
pub fn get_scenario(name: &str) -> Option<Scenario> {
    all_scenarios()
        .into_iter()
        .find(|scenario| scenario.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_names_are_unique() {
        let names: Vec<_> = list_scenarios().into_iter().map(|(name, _)| name).collect();
        let mut deduped = names.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(names.len(), deduped.len());
    }

    #[test]
    fn plans_have_sane_lap_ranges() {
        for scenario in all_scenarios() {
            let plan = &scenario.plan;
            assert!(plan.min_lap_ms > 0, "{}", scenario.name);
            assert!(plan.min_lap_ms <= plan.max_lap_ms, "{}", scenario.name);
            assert!(plan.goal > 0, "{}", scenario.name);
        }
    }

    #[test]
    fn lookup_by_name() {
        assert!(get_scenario("cycle-split").is_some());
        assert!(get_scenario("nope").is_none());
    }
}
