//! Read-only game catalog: species, materials, loot, upgrades, achievements,
//! mission templates and balance constants.
use crate::CatalogLoader;
use crate::effects::{SpecialAttributes, UpgradeEffect};
use crate::error::CatalogError;
use crate::missions::{AchievementDef, MissionTemplate};
use crate::numbers::{round_f64_to_u64, u64_to_f64};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

const DEFAULT_CATALOG_JSON: &str = include_str!("../assets/catalog.json");

/// Rarity tier of a species or seed drop.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    #[default]
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    pub const ALL: [Self; 5] = [
        Self::Common,
        Self::Uncommon,
        Self::Rare,
        Self::Epic,
        Self::Legendary,
    ];

    /// Material multiplier applied when upgrading an object of this rarity.
    #[must_use]
    pub const fn upgrade_multiplier(self) -> f64 {
        match self {
            Self::Common => 1.0,
            Self::Uncommon => 1.3,
            Self::Rare => 1.8,
            Self::Epic => 2.5,
            Self::Legendary => 3.5,
        }
    }

    /// Rare, epic and legendary drops count as rare items.
    #[must_use]
    pub const fn is_rare_or_better(self) -> bool {
        matches!(self, Self::Rare | Self::Epic | Self::Legendary)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Common => "common",
            Self::Uncommon => "uncommon",
            Self::Rare => "rare",
            Self::Epic => "epic",
            Self::Legendary => "legendary",
        }
    }
}

/// Polynomial experience curve: `round(base * level^exponent)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct XpCurve {
    pub base: f64,
    pub exponent: f64,
}

impl XpCurve {
    #[must_use]
    pub const fn new(base: f64, exponent: f64) -> Self {
        Self { base, exponent }
    }

    /// Experience needed to leave `level`. Never below 1 so cascades terminate.
    #[must_use]
    pub fn required_for(&self, level: u32) -> u64 {
        let raw = self.base * f64::from(level.max(1)).powf(self.exponent);
        round_f64_to_u64(raw).max(1)
    }
}

/// A plantable species.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesDef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub rarity: Rarity,
    #[serde(default = "SpeciesDef::default_base_xp_per_level")]
    pub base_xp_per_level: f64,
    #[serde(default = "SpeciesDef::default_growth_rate")]
    pub growth_rate: f64,
    #[serde(default = "SpeciesDef::default_max_level")]
    pub max_level: u32,
    #[serde(default = "SpeciesDef::default_base_growth_hours")]
    pub base_growth_hours: f64,
    #[serde(default)]
    pub base_materials_needed: BTreeMap<String, u64>,
    #[serde(default)]
    pub attributes: SpecialAttributes,
}

impl SpeciesDef {
    const fn default_base_xp_per_level() -> f64 {
        10.0
    }

    const fn default_growth_rate() -> f64 {
        1.1
    }

    const fn default_max_level() -> u32 {
        10
    }

    const fn default_base_growth_hours() -> f64 {
        8.0
    }

    /// Per-object experience curve for this species.
    #[must_use]
    pub const fn curve(&self) -> XpCurve {
        XpCurve::new(self.base_xp_per_level, self.growth_rate)
    }
}

/// A collectible material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialDef {
    pub key: String,
    pub name: String,
}

/// Reward carried by a loot entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LootReward {
    Coins { min: u64, max: u64 },
    Material { key: String, amount: u64 },
    Seed { rarity: Rarity },
}

impl LootReward {
    /// Whether drop-rate boosts apply to this entry's weight.
    #[must_use]
    pub const fn is_drop(&self) -> bool {
        matches!(self, Self::Material { .. } | Self::Seed { .. })
    }
}

/// One weighted row of the loot table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LootEntry {
    pub weight: f64,
    #[serde(flatten)]
    pub reward: LootReward,
}

/// Validated loot table: non-empty with a positive total weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<LootEntry>", into = "Vec<LootEntry>")]
pub struct LootTable {
    entries: Vec<LootEntry>,
}

impl LootTable {
    #[must_use]
    pub fn entries(&self) -> &[LootEntry] {
        &self.entries
    }

    #[must_use]
    pub fn total_weight(&self) -> f64 {
        self.entries.iter().map(|entry| entry.weight).sum()
    }
}

impl TryFrom<Vec<LootEntry>> for LootTable {
    type Error = CatalogError;

    fn try_from(entries: Vec<LootEntry>) -> Result<Self, Self::Error> {
        for (index, entry) in entries.iter().enumerate() {
            if !entry.weight.is_finite() || entry.weight < 0.0 {
                return Err(CatalogError::InvalidWeight {
                    index,
                    weight: entry.weight,
                });
            }
            if let LootReward::Coins { min, max } = entry.reward
                && min > max
            {
                return Err(CatalogError::InvertedCoinRange { index, min, max });
            }
        }
        let table = Self { entries };
        if table.entries.is_empty() || table.total_weight() <= 0.0 {
            return Err(CatalogError::EmptyLootTable);
        }
        Ok(table)
    }
}

impl From<LootTable> for Vec<LootEntry> {
    fn from(table: LootTable) -> Self {
        table.entries
    }
}

/// A purchasable upgrade with a per-level effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpgradeDef {
    pub id: String,
    pub name: String,
    pub max_level: u32,
    pub base_cost: f64,
    pub cost_multiplier: f64,
    pub effect: UpgradeEffect,
}

/// Tunable balance constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    #[serde(default = "Balance::default_base_xp_per_level")]
    pub base_xp_per_level: f64,
    #[serde(default = "Balance::default_xp_exponent")]
    pub xp_exponent: f64,
    #[serde(default = "Balance::default_xp_per_tap")]
    pub xp_per_tap: f64,
    #[serde(default = "Balance::default_record_bonus_coins")]
    pub record_bonus_coins: u64,
    #[serde(default = "Balance::default_level_up_base_coins")]
    pub level_up_base_coins: u64,
    #[serde(default = "Balance::default_level_up_coins_per_level")]
    pub level_up_coins_per_level: u64,
    #[serde(default = "Balance::default_ai_goal_min_sessions")]
    pub ai_goal_min_sessions: usize,
    #[serde(default = "Balance::default_ai_goal_lookback_sessions")]
    pub ai_goal_lookback_sessions: usize,
    #[serde(default = "Balance::default_ai_goal_percent_improvement")]
    pub ai_goal_percent_improvement: f64,
    #[serde(default = "Balance::default_ai_goal_min_secs")]
    pub ai_goal_min_secs: f64,
    #[serde(default = "Balance::default_ai_goal_max_secs")]
    pub ai_goal_max_secs: f64,
    #[serde(default = "Balance::default_water_cooldown_hours")]
    pub water_cooldown_hours: f64,
    #[serde(default = "Balance::default_water_reduction_minutes")]
    pub water_reduction_minutes: f64,
    #[serde(default = "Balance::default_fertilizer_reduction_minutes")]
    pub fertilizer_reduction_minutes: f64,
    #[serde(default = "Balance::default_fertilizer_key")]
    pub fertilizer_key: String,
    #[serde(default = "Balance::default_daily_mission_count")]
    pub daily_mission_count: usize,
}

impl Balance {
    const fn default_base_xp_per_level() -> f64 {
        100.0
    }

    const fn default_xp_exponent() -> f64 {
        1.5
    }

    const fn default_xp_per_tap() -> f64 {
        0.5
    }

    const fn default_record_bonus_coins() -> u64 {
        25
    }

    const fn default_level_up_base_coins() -> u64 {
        50
    }

    const fn default_level_up_coins_per_level() -> u64 {
        5
    }

    const fn default_ai_goal_min_sessions() -> usize {
        5
    }

    const fn default_ai_goal_lookback_sessions() -> usize {
        10
    }

    const fn default_ai_goal_percent_improvement() -> f64 {
        0.98
    }

    const fn default_ai_goal_min_secs() -> f64 {
        15.0
    }

    const fn default_ai_goal_max_secs() -> f64 {
        60.0
    }

    const fn default_water_cooldown_hours() -> f64 {
        4.0
    }

    const fn default_water_reduction_minutes() -> f64 {
        60.0
    }

    const fn default_fertilizer_reduction_minutes() -> f64 {
        30.0
    }

    fn default_fertilizer_key() -> String {
        String::from("fertilizer")
    }

    const fn default_daily_mission_count() -> usize {
        3
    }

    /// Coins granted on reaching `new_level`.
    #[must_use]
    pub const fn level_up_coins(&self, new_level: u32) -> u64 {
        let per_level = self.level_up_coins_per_level;
        self.level_up_base_coins
            .saturating_add(per_level.saturating_mul(new_level as u64))
    }

    /// Base session XP before boosts.
    #[must_use]
    pub fn session_xp(&self, tapped: u32) -> f64 {
        u64_to_f64(u64::from(tapped)) * self.xp_per_tap
    }
}

impl Default for Balance {
    fn default() -> Self {
        Self {
            base_xp_per_level: Self::default_base_xp_per_level(),
            xp_exponent: Self::default_xp_exponent(),
            xp_per_tap: Self::default_xp_per_tap(),
            record_bonus_coins: Self::default_record_bonus_coins(),
            level_up_base_coins: Self::default_level_up_base_coins(),
            level_up_coins_per_level: Self::default_level_up_coins_per_level(),
            ai_goal_min_sessions: Self::default_ai_goal_min_sessions(),
            ai_goal_lookback_sessions: Self::default_ai_goal_lookback_sessions(),
            ai_goal_percent_improvement: Self::default_ai_goal_percent_improvement(),
            ai_goal_min_secs: Self::default_ai_goal_min_secs(),
            ai_goal_max_secs: Self::default_ai_goal_max_secs(),
            water_cooldown_hours: Self::default_water_cooldown_hours(),
            water_reduction_minutes: Self::default_water_reduction_minutes(),
            fertilizer_reduction_minutes: Self::default_fertilizer_reduction_minutes(),
            fertilizer_key: Self::default_fertilizer_key(),
            daily_mission_count: Self::default_daily_mission_count(),
        }
    }
}

/// Everything the engine reads but never mutates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameCatalog {
    #[serde(default)]
    pub species: Vec<SpeciesDef>,
    #[serde(default)]
    pub materials: Vec<MaterialDef>,
    pub loot: LootTable,
    #[serde(default)]
    pub upgrades: Vec<UpgradeDef>,
    #[serde(default)]
    pub achievements: Vec<AchievementDef>,
    #[serde(default)]
    pub mission_templates: Vec<MissionTemplate>,
    /// Login calendar; day `n` of a streak grants entry `n - 1`.
    #[serde(default)]
    pub daily_rewards: Vec<LootReward>,
    #[serde(default)]
    pub balance: Balance,
}

impl GameCatalog {
    /// Parse and validate a catalog from JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or fails validation.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let catalog: Self =
            serde_json::from_str(json).map_err(|err| CatalogError::Parse(err.to_string()))?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// The catalog bundled with the crate.
    ///
    /// # Errors
    ///
    /// Returns an error if the bundled asset fails validation.
    pub fn bundled() -> Result<Self, CatalogError> {
        Self::from_json(DEFAULT_CATALOG_JSON)
    }

    /// Cross-reference checks that serde alone cannot express.
    ///
    /// # Errors
    ///
    /// Returns the first inconsistency found.
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.balance.base_xp_per_level <= 0.0 {
            return Err(CatalogError::NonPositiveBase {
                what: String::from("player"),
                base: self.balance.base_xp_per_level,
            });
        }
        if self.balance.xp_exponent <= 1.0 {
            return Err(CatalogError::FlatCurve {
                what: String::from("player"),
                exponent: self.balance.xp_exponent,
            });
        }
        check_unique("species", self.species.iter().map(|s| s.id.as_str()))?;
        check_unique("material", self.materials.iter().map(|m| m.key.as_str()))?;
        check_unique("upgrade", self.upgrades.iter().map(|u| u.id.as_str()))?;
        check_unique(
            "achievement",
            self.achievements.iter().map(|a| a.id.as_str()),
        )?;
        check_unique(
            "mission template",
            self.mission_templates.iter().map(|t| t.id.as_str()),
        )?;
        for species in &self.species {
            if species.base_xp_per_level <= 0.0 {
                return Err(CatalogError::NonPositiveBase {
                    what: species.id.clone(),
                    base: species.base_xp_per_level,
                });
            }
            if species.growth_rate <= 1.0 {
                return Err(CatalogError::FlatCurve {
                    what: species.id.clone(),
                    exponent: species.growth_rate,
                });
            }
        }
        for (index, entry) in self.loot.entries().iter().enumerate() {
            if let LootReward::Material { key, .. } = &entry.reward
                && self.material(key).is_none()
            {
                return Err(CatalogError::UnknownMaterial {
                    index,
                    key: key.clone(),
                });
            }
        }
        for (index, reward) in self.daily_rewards.iter().enumerate() {
            let day = index + 1;
            match reward {
                LootReward::Coins { min, max } if min > max => {
                    return Err(CatalogError::InvalidDailyReward {
                        day,
                        detail: format!("coin range {min}..={max}"),
                    });
                }
                LootReward::Material { key, .. } if self.material(key).is_none() => {
                    return Err(CatalogError::InvalidDailyReward {
                        day,
                        detail: format!("unknown material `{key}`"),
                    });
                }
                _ => {}
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn species(&self, id: &str) -> Option<&SpeciesDef> {
        self.species.iter().find(|species| species.id == id)
    }

    /// Species of exactly `rarity`, in catalog order.
    #[must_use]
    pub fn species_of_rarity(&self, rarity: Rarity) -> Vec<&SpeciesDef> {
        self.species
            .iter()
            .filter(|species| species.rarity == rarity)
            .collect()
    }

    #[must_use]
    pub fn material(&self, key: &str) -> Option<&MaterialDef> {
        self.materials.iter().find(|material| material.key == key)
    }

    #[must_use]
    pub fn upgrade(&self, id: &str) -> Option<&UpgradeDef> {
        self.upgrades.iter().find(|upgrade| upgrade.id == id)
    }

    #[must_use]
    pub fn mission_template(&self, id: &str) -> Option<&MissionTemplate> {
        self.mission_templates
            .iter()
            .find(|template| template.id == id)
    }

    /// Player experience curve.
    #[must_use]
    pub const fn player_curve(&self) -> XpCurve {
        XpCurve::new(self.balance.base_xp_per_level, self.balance.xp_exponent)
    }
}

fn check_unique<'a>(
    kind: &'static str,
    ids: impl Iterator<Item = &'a str>,
) -> Result<(), CatalogError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(CatalogError::DuplicateId {
                kind,
                id: id.to_string(),
            });
        }
    }
    Ok(())
}

/// Loader for the catalog bundled in `assets/catalog.json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticCatalog;

impl CatalogLoader for StaticCatalog {
    type Error = CatalogError;

    fn load_catalog(&self) -> Result<GameCatalog, Self::Error> {
        GameCatalog::bundled()
    }
}

/// Loader over caller-supplied JSON text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonCatalog {
    source: String,
}

impl JsonCatalog {
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

impl CatalogLoader for JsonCatalog {
    type Error = CatalogError;

    fn load_catalog(&self) -> Result<GameCatalog, Self::Error> {
        GameCatalog::from_json(&self.source)
    }
}
