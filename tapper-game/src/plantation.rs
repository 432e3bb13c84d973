//! Owned objects, materials and plantation growth.
//!
//! Every action here either succeeds or reports why it was blocked; none of
//! them can fail with an error.
use crate::catalog::{GameCatalog, Rarity, SpeciesDef};
use crate::clock::{Timestamp, rewind, shift, span};
use crate::effects::{Modifiers, SpecialAttributes};
use crate::numbers::{ceil_f64_to_u64, duration_from_secs_f64, round_f64_to_u64, u64_to_f64};
use crate::progression::cascade_levels;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeMap;

const SECS_PER_HOUR: f64 = 3600.0;
const SECS_PER_MINUTE: f64 = 60.0;

/// Growth stage of an owned object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum GrowthStage {
    Seed,
    Seedling {
        grows_at: Timestamp,
        #[serde(default)]
        last_watered: Option<Timestamp>,
    },
    Grown,
}

/// An object the player owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnedObject {
    pub id: String,
    pub species: String,
    pub rarity: Rarity,
    #[serde(default = "OwnedObject::default_level")]
    pub level: u32,
    #[serde(default)]
    pub xp: u64,
    pub growth: GrowthStage,
    #[serde(default)]
    pub attributes: SpecialAttributes,
    /// Freshly acquired and not yet acknowledged.
    #[serde(default)]
    pub is_new: bool,
    pub acquired_at: Timestamp,
}

impl OwnedObject {
    const fn default_level() -> u32 {
        1
    }

    /// A new level-1 seed of `species`.
    #[must_use]
    pub fn from_seed(id: String, species: &SpeciesDef, now: Timestamp) -> Self {
        Self {
            id,
            species: species.id.clone(),
            rarity: species.rarity,
            level: 1,
            xp: 0,
            growth: GrowthStage::Seed,
            attributes: species.attributes,
            is_new: true,
            acquired_at: now,
        }
    }

    #[must_use]
    pub const fn is_grown(&self) -> bool {
        matches!(self.growth, GrowthStage::Grown)
    }
}

/// Persisted materials and owned objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Inventory {
    #[serde(default)]
    pub materials: BTreeMap<String, u64>,
    #[serde(default)]
    pub owned: Vec<OwnedObject>,
    #[serde(default)]
    pub active_object: Option<String>,
}

impl Inventory {
    #[must_use]
    pub fn material(&self, key: &str) -> u64 {
        self.materials.get(key).copied().unwrap_or(0)
    }

    pub fn add_material(&mut self, key: &str, amount: u64) {
        let entry = self.materials.entry(key.to_string()).or_insert(0);
        *entry = entry.saturating_add(amount);
    }

    /// Remove `amount` of `key` if available. Returns `false` and leaves the
    /// inventory untouched otherwise.
    pub fn take_material(&mut self, key: &str, amount: u64) -> bool {
        match self.materials.get_mut(key) {
            Some(held) if *held >= amount => {
                *held -= amount;
                true
            }
            _ => amount == 0,
        }
    }

    #[must_use]
    pub fn object(&self, id: &str) -> Option<&OwnedObject> {
        self.owned.iter().find(|object| object.id == id)
    }

    pub fn object_mut(&mut self, id: &str) -> Option<&mut OwnedObject> {
        self.owned.iter_mut().find(|object| object.id == id)
    }

    /// Attributes of the active object, if it is grown.
    #[must_use]
    pub fn active_attributes(&self) -> Option<&SpecialAttributes> {
        let id = self.active_object.as_deref()?;
        self.object(id)
            .filter(|object| object.is_grown())
            .map(|object| &object.attributes)
    }

    /// Owned objects of rare rarity or better.
    #[must_use]
    pub fn rare_objects_owned(&self) -> usize {
        self.owned
            .iter()
            .filter(|object| object.rarity.is_rare_or_better())
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CareBlockReason {
    UnknownObject,
    UnknownSpecies,
    WrongStage,
    WateringCooldown {
        ready_at: Timestamp,
    },
    MissingMaterial {
        key: String,
        needed: u64,
        available: u64,
    },
    NotReady {
        grows_at: Timestamp,
    },
    MaxLevel,
    AnotherActive {
        active: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CareOutcome {
    Planted {
        grows_at: Timestamp,
    },
    Watered {
        grows_at: Timestamp,
    },
    Fertilized {
        grows_at: Timestamp,
    },
    Grown,
    Activated,
    Deactivated,
    Upgraded {
        xp_granted: u64,
        level: u32,
        levels_gained: SmallVec<[u32; 2]>,
        consumed: BTreeMap<String, u64>,
    },
    Acknowledged,
    Blocked(CareBlockReason),
}

impl CareOutcome {
    #[must_use]
    pub const fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked(_))
    }
}

macro_rules! or_block {
    ($value:expr, $reason:expr) => {
        match $value {
            Some(value) => value,
            None => return CareOutcome::Blocked($reason),
        }
    };
}

/// Put a seed in the ground. Growth time is shortened by the growth-rate modifier.
pub fn plant(
    catalog: &GameCatalog,
    inventory: &mut Inventory,
    modifiers: &Modifiers,
    id: &str,
    now: Timestamp,
) -> CareOutcome {
    let object = or_block!(inventory.object_mut(id), CareBlockReason::UnknownObject);
    if object.growth != GrowthStage::Seed {
        return CareOutcome::Blocked(CareBlockReason::WrongStage);
    }
    let species = or_block!(
        catalog.species(&object.species),
        CareBlockReason::UnknownSpecies
    );
    let rate = if modifiers.growth_rate > 0.0 {
        modifiers.growth_rate
    } else {
        1.0
    };
    let growth = duration_from_secs_f64(species.base_growth_hours * SECS_PER_HOUR / rate);
    let grows_at = shift(now, growth);
    object.growth = GrowthStage::Seedling {
        grows_at,
        last_watered: None,
    };
    log::debug!("planted {id}, grows at {grows_at}");
    CareOutcome::Planted { grows_at }
}

/// Water a seedling, pulling its harvest time earlier. Limited by a cooldown.
pub fn water(
    catalog: &GameCatalog,
    inventory: &mut Inventory,
    id: &str,
    now: Timestamp,
) -> CareOutcome {
    let balance = &catalog.balance;
    let object = or_block!(inventory.object_mut(id), CareBlockReason::UnknownObject);
    let GrowthStage::Seedling {
        grows_at,
        last_watered,
    } = object.growth
    else {
        return CareOutcome::Blocked(CareBlockReason::WrongStage);
    };
    if let Some(watered) = last_watered {
        let ready_at = shift(
            watered,
            duration_from_secs_f64(balance.water_cooldown_hours * SECS_PER_HOUR),
        );
        if now < ready_at {
            return CareOutcome::Blocked(CareBlockReason::WateringCooldown { ready_at });
        }
    }
    let grows_at = rewind(
        grows_at,
        duration_from_secs_f64(balance.water_reduction_minutes * SECS_PER_MINUTE),
    );
    object.growth = GrowthStage::Seedling {
        grows_at,
        last_watered: Some(now),
    };
    CareOutcome::Watered { grows_at }
}

/// Spend one fertilizer on a seedling, pulling its harvest time earlier.
pub fn fertilize(catalog: &GameCatalog, inventory: &mut Inventory, id: &str) -> CareOutcome {
    let balance = &catalog.balance;
    let stage = or_block!(
        inventory.object(id).map(|object| object.growth),
        CareBlockReason::UnknownObject
    );
    let GrowthStage::Seedling {
        grows_at,
        last_watered,
    } = stage
    else {
        return CareOutcome::Blocked(CareBlockReason::WrongStage);
    };
    let key = balance.fertilizer_key.as_str();
    if !inventory.take_material(key, 1) {
        return CareOutcome::Blocked(CareBlockReason::MissingMaterial {
            key: key.to_string(),
            needed: 1,
            available: inventory.material(key),
        });
    }
    let grows_at = rewind(
        grows_at,
        duration_from_secs_f64(balance.fertilizer_reduction_minutes * SECS_PER_MINUTE),
    );
    if let Some(object) = inventory.object_mut(id) {
        object.growth = GrowthStage::Seedling {
            grows_at,
            last_watered,
        };
    }
    CareOutcome::Fertilized { grows_at }
}

/// Promote a seedling whose timer has elapsed.
pub fn grow(inventory: &mut Inventory, id: &str, now: Timestamp) -> CareOutcome {
    let object = or_block!(inventory.object_mut(id), CareBlockReason::UnknownObject);
    let GrowthStage::Seedling { grows_at, .. } = object.growth else {
        return CareOutcome::Blocked(CareBlockReason::WrongStage);
    };
    if now < grows_at {
        return CareOutcome::Blocked(CareBlockReason::NotReady { grows_at });
    }
    object.growth = GrowthStage::Grown;
    log::info!("{} grew after {:?} overdue", object.id, span(grows_at, now));
    CareOutcome::Grown
}

/// Activate a grown object, or deactivate it if it is already active.
pub fn toggle_active(inventory: &mut Inventory, id: &str) -> CareOutcome {
    let object = or_block!(inventory.object(id), CareBlockReason::UnknownObject);
    if !object.is_grown() {
        return CareOutcome::Blocked(CareBlockReason::WrongStage);
    }
    match inventory.active_object.as_deref() {
        Some(active) if active == id => {
            inventory.active_object = None;
            CareOutcome::Deactivated
        }
        Some(active) => CareOutcome::Blocked(CareBlockReason::AnotherActive {
            active: active.to_string(),
        }),
        None => {
            inventory.active_object = Some(id.to_string());
            CareOutcome::Activated
        }
    }
}

/// Materials required to take `object` to its next level. Empty at max level
/// or for an unknown species.
#[must_use]
pub fn materials_needed(catalog: &GameCatalog, object: &OwnedObject) -> BTreeMap<String, u64> {
    let Some(species) = catalog.species(&object.species) else {
        return BTreeMap::new();
    };
    if object.level >= species.max_level {
        return BTreeMap::new();
    }
    let level_multiplier = species
        .growth_rate
        .powi(i32::try_from(object.level.max(1)).unwrap_or(i32::MAX));
    let rarity_multiplier = object.rarity.upgrade_multiplier();
    species
        .base_materials_needed
        .iter()
        .map(|(key, base)| {
            let needed = ceil_f64_to_u64(u64_to_f64(*base) * rarity_multiplier * level_multiplier);
            (key.clone(), needed)
        })
        .collect()
}

/// Spend materials to grant a grown object half its current requirement as XP.
pub fn upgrade_object(
    catalog: &GameCatalog,
    inventory: &mut Inventory,
    modifiers: &Modifiers,
    id: &str,
) -> CareOutcome {
    let object = or_block!(inventory.object(id), CareBlockReason::UnknownObject);
    if !object.is_grown() {
        return CareOutcome::Blocked(CareBlockReason::WrongStage);
    }
    let species = or_block!(
        catalog.species(&object.species),
        CareBlockReason::UnknownSpecies
    );
    if object.level >= species.max_level {
        return CareOutcome::Blocked(CareBlockReason::MaxLevel);
    }
    let needed = materials_needed(catalog, object);
    if let Some((key, amount)) = needed
        .iter()
        .find(|(key, amount)| inventory.material(key) < **amount)
    {
        return CareOutcome::Blocked(CareBlockReason::MissingMaterial {
            key: key.clone(),
            needed: *amount,
            available: inventory.material(key),
        });
    }
    for (key, amount) in &needed {
        inventory.take_material(key, *amount);
    }

    let curve = species.curve();
    let max_level = species.max_level;
    let object = or_block!(inventory.object_mut(id), CareBlockReason::UnknownObject);
    let half_requirement = u64_to_f64(curve.required_for(object.level)) / 2.0;
    let xp_granted = round_f64_to_u64(half_requirement * modifiers.object_xp);
    object.xp = object.xp.saturating_add(xp_granted);
    let levels_gained = cascade_levels(&mut object.level, &mut object.xp, &curve, Some(max_level));
    log::info!(
        "upgraded {id} with {xp_granted} xp, now level {}",
        object.level
    );
    CareOutcome::Upgraded {
        xp_granted,
        level: object.level,
        levels_gained,
        consumed: needed,
    }
}

/// Clear the freshly-acquired flag.
pub fn acknowledge(inventory: &mut Inventory, id: &str) -> CareOutcome {
    let object = or_block!(inventory.object_mut(id), CareBlockReason::UnknownObject);
    object.is_new = false;
    CareOutcome::Acknowledged
}

/// Seedlings whose growth timer has elapsed.
#[must_use]
pub fn ready_to_grow(inventory: &Inventory, now: Timestamp) -> usize {
    inventory
        .owned
        .iter()
        .filter(|object| {
            matches!(object.growth, GrowthStage::Seedling { grows_at, .. } if grows_at <= now)
        })
        .count()
}
