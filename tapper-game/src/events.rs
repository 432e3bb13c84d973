//! Events emitted by engine transitions and the observable session snapshot.
use crate::catalog::Rarity;
use crate::session::SessionPhase;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::time::Duration;

/// Notable things that happened during a transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    LevelUp {
        level: u32,
        coins: u64,
    },
    NewRecord {
        average: Duration,
        bonus_coins: u64,
    },
    AchievementUnlocked {
        id: String,
        coins: u64,
    },
    MissionCompleted {
        id: String,
        reward: u64,
    },
    RareItemAcquired {
        object_id: String,
        species: String,
        rarity: Rarity,
    },
    MaterialFound {
        key: String,
        amount: u64,
    },
    CycleGoalSet {
        goal: u32,
    },
    CycleCompleted {
        goal: u32,
    },
}

pub type EventList = SmallVec<[EngineEvent; 4]>;

/// Read-only view of the engine after a transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub paused: bool,
    pub goal: Option<u32>,
    pub tapped: u32,
    /// Cycle-relative ordinal of the next tap.
    pub next_tap_ordinal: u32,
    pub elapsed: Duration,
    pub current_lap: Option<Duration>,
    pub last_lap: Option<Duration>,
    pub previous_lap: Option<Duration>,
    pub average_lap: Option<Duration>,
    pub loot: BTreeMap<String, u64>,
    pub cycle_progress: Option<f64>,
    /// Seconds behind (positive) or ahead of the reference pace.
    pub pacing_delta_secs: Option<f64>,
}
