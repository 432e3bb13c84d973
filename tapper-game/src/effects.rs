//! Upgrade effects, object attributes and the combined modifier set.
use crate::catalog::GameCatalog;
use crate::numbers::floor_f64_to_u64;
use crate::progression::ProgressionState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Purchased level per upgrade id.
pub type UpgradeLevels = BTreeMap<String, u32>;

/// Effect of one upgrade level. Totals scale linearly with the purchased level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UpgradeEffect {
    XpBoostPercent { per_level: f64 },
    CoinYieldPercent { per_level: f64 },
    RecordBonusFlat { per_level: u64 },
    MaterialDropBoost { per_level: f64 },
    SeedDropBoost { per_level: f64 },
    ObjectXpBoostPercent { per_level: f64 },
    GrowthRateBoost { per_level: f64 },
}

/// Bonuses carried by an owned object while it is active.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct SpecialAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xp_gain: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coin_yield: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material_drop_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub growth_rate: Option<f64>,
}

impl SpecialAttributes {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.xp_gain.is_none()
            && self.coin_yield.is_none()
            && self.material_drop_rate.is_none()
            && self.growth_rate.is_none()
    }
}

/// Multiplicative factors (1.0 = neutral) plus flat record bonus.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Modifiers {
    pub xp: f64,
    pub coin_yield: f64,
    pub material_drop: f64,
    pub seed_drop: f64,
    pub object_xp: f64,
    pub growth_rate: f64,
    pub record_bonus_flat: u64,
}

impl Default for Modifiers {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

impl Modifiers {
    pub const NEUTRAL: Self = Self {
        xp: 1.0,
        coin_yield: 1.0,
        material_drop: 1.0,
        seed_drop: 1.0,
        object_xp: 1.0,
        growth_rate: 1.0,
        record_bonus_flat: 0,
    };

    /// Fold purchased upgrades and the active object's attributes together.
    #[must_use]
    pub fn collect(
        catalog: &GameCatalog,
        upgrades: &UpgradeLevels,
        active: Option<&SpecialAttributes>,
    ) -> Self {
        let mut mods = Self::NEUTRAL;
        for def in &catalog.upgrades {
            let level = upgrades.get(&def.id).copied().unwrap_or(0);
            if level == 0 {
                continue;
            }
            mods.apply_upgrade(def.effect, level);
        }
        if let Some(attributes) = active {
            mods.apply_attributes(attributes);
        }
        mods
    }

    fn apply_upgrade(&mut self, effect: UpgradeEffect, level: u32) {
        let levels = f64::from(level);
        match effect {
            UpgradeEffect::XpBoostPercent { per_level } => {
                self.xp *= boost(per_level * levels);
            }
            UpgradeEffect::CoinYieldPercent { per_level } => {
                self.coin_yield *= boost(per_level * levels);
            }
            UpgradeEffect::RecordBonusFlat { per_level } => {
                self.record_bonus_flat = self
                    .record_bonus_flat
                    .saturating_add(per_level.saturating_mul(u64::from(level)));
            }
            UpgradeEffect::MaterialDropBoost { per_level } => {
                self.material_drop *= boost(per_level * levels);
            }
            UpgradeEffect::SeedDropBoost { per_level } => {
                self.seed_drop *= boost(per_level * levels);
            }
            UpgradeEffect::ObjectXpBoostPercent { per_level } => {
                self.object_xp *= boost(per_level * levels);
            }
            UpgradeEffect::GrowthRateBoost { per_level } => {
                self.growth_rate *= boost(per_level * levels);
            }
        }
    }

    fn apply_attributes(&mut self, attributes: &SpecialAttributes) {
        if let Some(bonus) = attributes.xp_gain {
            self.xp *= boost(bonus);
        }
        if let Some(bonus) = attributes.coin_yield {
            self.coin_yield *= boost(bonus);
        }
        if let Some(bonus) = attributes.material_drop_rate {
            self.material_drop *= boost(bonus);
        }
        if let Some(bonus) = attributes.growth_rate {
            self.growth_rate *= boost(bonus);
        }
    }
}

fn boost(fraction: f64) -> f64 {
    if fraction.is_finite() {
        (1.0 + fraction).max(0.0)
    } else {
        1.0
    }
}

/// Price of the next level, or `None` at max level or for an unknown id.
#[must_use]
pub fn upgrade_cost(catalog: &GameCatalog, upgrades: &UpgradeLevels, id: &str) -> Option<u64> {
    let def = catalog.upgrade(id)?;
    let level = upgrades.get(id).copied().unwrap_or(0);
    if level >= def.max_level {
        return None;
    }
    let exponent = i32::try_from(level).unwrap_or(i32::MAX);
    Some(floor_f64_to_u64(
        def.base_cost * def.cost_multiplier.powi(exponent),
    ))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseBlockReason {
    UnknownUpgrade,
    MaxLevel,
    InsufficientFunds { cost: u64, available: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseOutcome {
    Purchased { id: String, level: u32, cost: u64 },
    Blocked(PurchaseBlockReason),
}

/// Buy the next level of an upgrade with player currency.
pub fn purchase_upgrade(
    catalog: &GameCatalog,
    upgrades: &mut UpgradeLevels,
    progression: &mut ProgressionState,
    id: &str,
) -> PurchaseOutcome {
    let Some(def) = catalog.upgrade(id) else {
        return PurchaseOutcome::Blocked(PurchaseBlockReason::UnknownUpgrade);
    };
    let Some(cost) = upgrade_cost(catalog, upgrades, id) else {
        return PurchaseOutcome::Blocked(PurchaseBlockReason::MaxLevel);
    };
    if progression.currency < cost {
        return PurchaseOutcome::Blocked(PurchaseBlockReason::InsufficientFunds {
            cost,
            available: progression.currency,
        });
    }
    progression.currency -= cost;
    let level = upgrades.entry(def.id.clone()).or_insert(0);
    *level += 1;
    log::info!("purchased upgrade {id} level {} for {cost} coins", *level);
    PurchaseOutcome::Purchased {
        id: def.id.clone(),
        level: *level,
        cost,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{LootEntry, LootReward, LootTable, UpgradeDef};

    fn catalog_with(upgrades: Vec<UpgradeDef>) -> GameCatalog {
        GameCatalog {
            species: Vec::new(),
            materials: Vec::new(),
            loot: LootTable::try_from(vec![LootEntry {
                weight: 1.0,
                reward: LootReward::Coins { min: 1, max: 1 },
            }])
            .unwrap(),
            upgrades,
            achievements: Vec::new(),
            mission_templates: Vec::new(),
            daily_rewards: Vec::new(),
            balance: crate::catalog::Balance::default(),
        }
    }

    fn upgrade(id: &str, effect: UpgradeEffect) -> UpgradeDef {
        UpgradeDef {
            id: id.to_string(),
            name: id.to_string(),
            max_level: 3,
            base_cost: 100.0,
            cost_multiplier: 1.5,
            effect,
        }
    }

    #[test]
    fn upgrades_and_attributes_multiply() {
        let catalog = catalog_with(vec![
            upgrade("knife", UpgradeEffect::XpBoostPercent { per_level: 0.1 }),
            upgrade("bonus", UpgradeEffect::RecordBonusFlat { per_level: 5 }),
        ]);
        let levels = UpgradeLevels::from([("knife".to_string(), 2), ("bonus".to_string(), 3)]);
        let attributes = SpecialAttributes {
            xp_gain: Some(0.5),
            ..SpecialAttributes::default()
        };
        let mods = Modifiers::collect(&catalog, &levels, Some(&attributes));
        assert!((mods.xp - 1.2 * 1.5).abs() < 1e-9);
        assert_eq!(mods.record_bonus_flat, 15);
        assert!((mods.coin_yield - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unpurchased_upgrades_are_neutral() {
        let catalog = catalog_with(vec![upgrade(
            "drops",
            UpgradeEffect::MaterialDropBoost { per_level: 0.2 },
        )]);
        let mods = Modifiers::collect(&catalog, &UpgradeLevels::new(), None);
        assert_eq!(mods, Modifiers::NEUTRAL);
    }

    #[test]
    fn cost_grows_geometrically_and_caps() {
        let catalog = catalog_with(vec![upgrade(
            "knife",
            UpgradeEffect::XpBoostPercent { per_level: 0.1 },
        )]);
        let mut levels = UpgradeLevels::new();
        assert_eq!(upgrade_cost(&catalog, &levels, "knife"), Some(100));
        levels.insert("knife".to_string(), 2);
        assert_eq!(upgrade_cost(&catalog, &levels, "knife"), Some(225));
        levels.insert("knife".to_string(), 3);
        assert_eq!(upgrade_cost(&catalog, &levels, "knife"), None);
    }

    #[test]
    fn purchase_blocks_without_funds() {
        let catalog = catalog_with(vec![upgrade(
            "knife",
            UpgradeEffect::XpBoostPercent { per_level: 0.1 },
        )]);
        let mut levels = UpgradeLevels::new();
        let mut progression = ProgressionState {
            currency: 99,
            ..ProgressionState::default()
        };
        assert_eq!(
            purchase_upgrade(&catalog, &mut levels, &mut progression, "knife"),
            PurchaseOutcome::Blocked(PurchaseBlockReason::InsufficientFunds {
                cost: 100,
                available: 99
            })
        );
        progression.currency = 250;
        assert_eq!(
            purchase_upgrade(&catalog, &mut levels, &mut progression, "knife"),
            PurchaseOutcome::Purchased {
                id: "knife".to_string(),
                level: 1,
                cost: 100
            }
        );
        assert_eq!(progression.currency, 150);
        assert_eq!(
            purchase_upgrade(&catalog, &mut levels, &mut progression, "axe"),
            PurchaseOutcome::Blocked(PurchaseBlockReason::UnknownUpgrade)
        );
    }
}
