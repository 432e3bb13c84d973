//! Tapper's Log Engine
//!
//! Platform-agnostic core for a timed tapping game: session timing with
//! pause/resume, cycle bookkeeping across sub-sessions, weighted loot,
//! cascading level-ups, plantation growth, missions and achievements.
//! This crate has no UI or platform-specific dependencies; persistence and
//! catalog loading go through the traits below.

pub mod analysis;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod cycle;
pub mod daily;
pub mod effects;
pub mod error;
pub mod events;
pub mod history;
pub mod missions;
pub mod numbers;
pub mod plantation;
pub mod profile;
pub mod progression;
pub mod reward;
pub mod rng;
pub mod session;
pub mod storage;

// Re-export commonly used types
pub use analysis::{
    CoachTip, Consistency, HistoryComparison, PacingAnalysis, PacingTrend, SessionInsight,
    coached_goal, daily_streak, pacing_analysis, session_insight, suggested_tap_goal,
};
pub use catalog::{
    Balance, GameCatalog, JsonCatalog, LootEntry, LootReward, LootTable, MaterialDef, Rarity,
    SpeciesDef, StaticCatalog, UpgradeDef, XpCurve,
};
pub use clock::{Clock, DisplayTicker, ManualClock, SessionTimer, SystemClock, Timestamp};
pub use config::EngineConfig;
pub use cycle::{CycleCommit, CycleState};
pub use daily::{DailyBlockReason, DailyRewardOutcome};
pub use effects::{
    Modifiers, PurchaseBlockReason, PurchaseOutcome, SpecialAttributes, UpgradeEffect,
    UpgradeLevels,
};
pub use error::{CatalogError, EngineError};
pub use events::{EngineEvent, EventList, SessionSnapshot};
pub use history::{SessionHistory, SessionRecord};
pub use missions::{
    AchievementCondition, AchievementDef, AchievementLedger, ActiveMission, MissionBoard,
    MissionCompletion, MissionMetric, MissionTemplate, SessionStats,
};
pub use plantation::{CareBlockReason, CareOutcome, GrowthStage, Inventory, OwnedObject};
pub use profile::{BlobKey, Profile};
pub use progression::{LevelUp, ProgressionState, XpGrant};
pub use reward::RewardOutcome;
pub use rng::RngStreams;
pub use session::{
    OBJECT_UPGRADED_ACTION, SessionPhase, SessionState, SessionSummary, TapOutcome, TapperEngine,
    Transition,
};
pub use storage::MemoryStore;

/// Trait for abstracting catalog loading
/// Platform-specific implementations should provide this
pub trait CatalogLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the read-only game catalog
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be loaded or parsed.
    fn load_catalog(&self) -> Result<GameCatalog, Self::Error>;
}

/// Trait for abstracting persisted progress
/// Values are JSON text blobs keyed by [`BlobKey`] names
pub trait ProgressStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the blob stored under `key`
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn load(&self, key: &str) -> Result<Option<String>, Self::Error>;

    /// Save a blob under `key`, replacing any previous value
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be written.
    fn save(&self, key: &str, value: &str) -> Result<(), Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[derive(Debug, thiserror::Error)]
    #[error("catalog offline")]
    struct OfflineError;

    struct OfflineLoader;

    impl CatalogLoader for OfflineLoader {
        type Error = OfflineError;

        fn load_catalog(&self) -> Result<GameCatalog, Self::Error> {
            Err(OfflineError)
        }
    }

    #[test]
    fn open_refuses_without_catalog() {
        let err = TapperEngine::open(
            &OfflineLoader,
            MemoryStore::new(),
            ManualClock::default(),
            EngineConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err, EngineError::CatalogUnavailable("catalog offline".into()));
    }

    #[test]
    fn open_generates_daily_missions() {
        let store = MemoryStore::new();
        let engine = TapperEngine::open(
            &StaticCatalog,
            store.clone(),
            ManualClock::default(),
            EngineConfig::default(),
        )
        .unwrap();
        assert_eq!(engine.profile().missions.missions.len(), 3);
        assert!(store.get("missions").is_some());
        assert_eq!(engine.phase(), SessionPhase::Idle);
    }

    #[test]
    fn engine_runs_a_short_session() {
        let clock = ManualClock::default();
        let mut engine = TapperEngine::open(
            &StaticCatalog,
            MemoryStore::new(),
            clock.clone(),
            EngineConfig::default(),
        )
        .unwrap();
        engine.start_session(2).unwrap();
        for _ in 0..2 {
            engine.begin_tap().unwrap();
            clock.advance(Duration::from_secs(5));
            engine.complete_tap().unwrap();
        }
        let summary = engine.end_session(false).unwrap().unwrap();
        assert_eq!(summary.record.tapped, 2);
        assert_eq!(summary.record.average, Duration::from_secs(5));
        assert_eq!(engine.profile().history.len(), 1);
    }
}
