//! Persisted player profile, split into independently saved JSON blobs.
use crate::ProgressStore;
use crate::cycle::CycleState;
use crate::effects::UpgradeLevels;
use crate::history::SessionHistory;
use crate::missions::{AchievementLedger, MissionBoard};
use crate::plantation::Inventory;
use crate::progression::ProgressionState;
use anyhow::Context;
use serde::de::DeserializeOwned;
use std::fmt;

/// Store key of one persisted blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlobKey {
    Progression,
    Cycle,
    History,
    Inventory,
    Upgrades,
    Achievements,
    Missions,
}

impl BlobKey {
    pub const ALL: [Self; 7] = [
        Self::Progression,
        Self::Cycle,
        Self::History,
        Self::Inventory,
        Self::Upgrades,
        Self::Achievements,
        Self::Missions,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Progression => "progression",
            Self::Cycle => "cycle",
            Self::History => "history",
            Self::Inventory => "inventory",
            Self::Upgrades => "upgrades",
            Self::Achievements => "achievements",
            Self::Missions => "missions",
        }
    }
}

impl fmt::Display for BlobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything that survives a reload.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Profile {
    pub progression: ProgressionState,
    pub cycle: CycleState,
    pub history: SessionHistory,
    pub inventory: Inventory,
    pub upgrades: UpgradeLevels,
    pub achievements: AchievementLedger,
    pub missions: MissionBoard,
}

impl Profile {
    /// Read every blob. Missing blobs start fresh; corrupt ones are logged and
    /// replaced with defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the store itself cannot be read.
    pub fn load<S: ProgressStore>(store: &S) -> anyhow::Result<Self> {
        Ok(Self {
            progression: read_blob(store, BlobKey::Progression)?,
            cycle: read_blob(store, BlobKey::Cycle)?,
            history: read_blob(store, BlobKey::History)?,
            inventory: read_blob(store, BlobKey::Inventory)?,
            upgrades: read_blob(store, BlobKey::Upgrades)?,
            achievements: read_blob(store, BlobKey::Achievements)?,
            missions: read_blob(store, BlobKey::Missions)?,
        })
    }

    /// Serialize one blob.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn blob(&self, key: BlobKey) -> Result<String, serde_json::Error> {
        match key {
            BlobKey::Progression => serde_json::to_string(&self.progression),
            BlobKey::Cycle => serde_json::to_string(&self.cycle),
            BlobKey::History => serde_json::to_string(&self.history),
            BlobKey::Inventory => serde_json::to_string(&self.inventory),
            BlobKey::Upgrades => serde_json::to_string(&self.upgrades),
            BlobKey::Achievements => serde_json::to_string(&self.achievements),
            BlobKey::Missions => serde_json::to_string(&self.missions),
        }
    }

    /// Write the given blobs. Failures are logged and skipped; returns how
    /// many blobs were written.
    pub fn save<S: ProgressStore>(&self, store: &S, keys: &[BlobKey]) -> usize {
        keys.iter()
            .filter(|key| match write_blob(store, **key, self) {
                Ok(()) => true,
                Err(err) => {
                    log::error!("failed to persist {key}: {err:#}");
                    false
                }
            })
            .count()
    }

    /// Write every blob.
    pub fn save_all<S: ProgressStore>(&self, store: &S) -> usize {
        self.save(store, &BlobKey::ALL)
    }
}

fn read_blob<S, T>(store: &S, key: BlobKey) -> anyhow::Result<T>
where
    S: ProgressStore,
    T: DeserializeOwned + Default,
{
    let Some(raw) = store
        .load(key.as_str())
        .with_context(|| format!("loading {key} blob"))?
    else {
        return Ok(T::default());
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(value),
        Err(err) => {
            log::warn!("discarding unreadable {key} blob: {err}");
            Ok(T::default())
        }
    }
}

fn write_blob<S: ProgressStore>(store: &S, key: BlobKey, profile: &Profile) -> anyhow::Result<()> {
    let json = profile
        .blob(key)
        .with_context(|| format!("serializing {key} blob"))?;
    store
        .save(key.as_str(), &json)
        .with_context(|| format!("writing {key} blob"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use std::io;

    #[test]
    fn empty_store_loads_defaults() {
        let profile = Profile::load(&MemoryStore::new()).unwrap();
        assert_eq!(profile, Profile::default());
        assert_eq!(profile.progression.level, 1);
    }

    #[test]
    fn round_trips_through_store() {
        let store = MemoryStore::new();
        let mut profile = Profile::default();
        profile.progression.currency = 42;
        profile.cycle.cycle_goal = Some(120);
        profile.upgrades.insert("sharper_knife".into(), 2);
        assert_eq!(profile.save_all(&store), BlobKey::ALL.len());
        assert_eq!(Profile::load(&store).unwrap(), profile);
    }

    #[test]
    fn corrupt_blob_falls_back_to_default() {
        let store = MemoryStore::new();
        store.save("cycle", "not json").unwrap();
        store.save("progression", r#"{"currency": 7}"#).unwrap();
        let profile = Profile::load(&store).unwrap();
        assert_eq!(profile.cycle, CycleState::default());
        assert_eq!(profile.progression.currency, 7);
        assert_eq!(profile.progression.level, 1);
    }

    struct BrokenStore;

    impl ProgressStore for BrokenStore {
        type Error = io::Error;

        fn load(&self, _key: &str) -> Result<Option<String>, Self::Error> {
            Err(io::Error::other("disk gone"))
        }

        fn save(&self, _key: &str, _value: &str) -> Result<(), Self::Error> {
            Err(io::Error::other("disk gone"))
        }
    }

    #[test]
    fn store_failures_surface_on_load_and_log_on_save() {
        let err = Profile::load(&BrokenStore).unwrap_err();
        assert!(format!("{err:#}").contains("disk gone"));
        assert_eq!(Profile::default().save_all(&BrokenStore), 0);
    }
}
