//! Weighted loot resolution: exactly one outcome per completed tap.
use crate::catalog::{GameCatalog, LootEntry, LootReward, LootTable, Rarity};
use crate::clock::Timestamp;
use crate::effects::Modifiers;
use crate::plantation::{Inventory, OwnedObject};
use crate::progression::{ProgressionState, grant_coins};
use crate::rng::RngStreams;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::hash::Hasher;
use twox_hash::XxHash64;

/// What a single tap produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RewardOutcome {
    Coins {
        amount: u64,
    },
    Material {
        key: String,
        amount: u64,
    },
    Seed {
        object_id: String,
        species: String,
        rarity: Rarity,
    },
    /// A seed of a rarity with no species was drawn and dropped.
    SeedDiscarded {
        rarity: Rarity,
    },
}

impl RewardOutcome {
    /// Session loot tally key and count, if the outcome counts as loot.
    #[must_use]
    pub fn loot_entry(&self) -> Option<(String, u64)> {
        match self {
            Self::Coins { amount } => Some((String::from("coins"), *amount)),
            Self::Material { key, amount } => Some((key.clone(), *amount)),
            Self::Seed { species, .. } => Some((format!("{species}_seed"), 1)),
            Self::SeedDiscarded { .. } => None,
        }
    }
}

/// Entry weight after drop-rate boosts. Coin entries are never boosted.
#[must_use]
pub fn effective_weight(entry: &LootEntry, modifiers: &Modifiers) -> f64 {
    let factor = match entry.reward {
        LootReward::Coins { .. } => 1.0,
        LootReward::Material { .. } => modifiers.material_drop,
        LootReward::Seed { .. } => modifiers.seed_drop,
    };
    (entry.weight * factor).max(0.0)
}

/// One uniform draw in `[0, total)` walked against cumulative weights.
pub fn select_entry<'a, R: Rng + ?Sized>(
    table: &'a LootTable,
    modifiers: &Modifiers,
    rng: &mut R,
) -> &'a LootEntry {
    let entries = table.entries();
    let weights: Vec<f64> = entries
        .iter()
        .map(|entry| effective_weight(entry, modifiers))
        .collect();
    let total: f64 = weights.iter().sum();
    let fallback = entries
        .iter()
        .zip(&weights)
        .rev()
        .find(|(_, weight)| **weight > 0.0)
        .map_or(&entries[0], |(entry, _)| entry);
    if !total.is_finite() || total <= 0.0 {
        return fallback;
    }
    let roll = rng.gen_range(0.0..total);
    let mut cumulative = 0.0;
    for (entry, weight) in entries.iter().zip(&weights) {
        if *weight <= 0.0 {
            continue;
        }
        cumulative += weight;
        if roll < cumulative {
            return entry;
        }
    }
    fallback
}

/// Deterministic id for a newly acquired object.
#[must_use]
pub fn object_id(species: &str, now: Timestamp, draws: u64) -> String {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(species.as_bytes());
    hasher.write_i64(now.timestamp_micros());
    hasher.write_u64(draws);
    format!("{species}-{:016x}", hasher.finish())
}

/// Resolve one tap's reward and apply it to currency or inventory.
pub fn resolve_tap_reward(
    catalog: &GameCatalog,
    modifiers: &Modifiers,
    progression: &mut ProgressionState,
    inventory: &mut Inventory,
    rngs: &mut RngStreams,
    now: Timestamp,
) -> RewardOutcome {
    let entry = select_entry(&catalog.loot, modifiers, rngs.loot());
    let outcome = apply_reward(
        catalog,
        &entry.reward,
        modifiers,
        progression,
        inventory,
        rngs,
        now,
    );
    log::debug!("tap reward: {outcome:?}");
    outcome
}

/// Grant a catalog reward: roll coins, add materials, or plant a seed of a
/// random species of the given rarity. A rarity with no species yields
/// [`RewardOutcome::SeedDiscarded`].
pub fn apply_reward(
    catalog: &GameCatalog,
    reward: &LootReward,
    modifiers: &Modifiers,
    progression: &mut ProgressionState,
    inventory: &mut Inventory,
    rngs: &mut RngStreams,
    now: Timestamp,
) -> RewardOutcome {
    match reward {
        LootReward::Coins { min, max } => {
            let rolled = rngs.loot().gen_range(*min..=*max);
            let amount = grant_coins(progression, rolled, modifiers);
            RewardOutcome::Coins { amount }
        }
        LootReward::Material { key, amount } => {
            inventory.add_material(key, *amount);
            RewardOutcome::Material {
                key: key.clone(),
                amount: *amount,
            }
        }
        LootReward::Seed { rarity } => {
            let candidates = catalog.species_of_rarity(*rarity);
            if candidates.is_empty() {
                log::debug!("no {} species; seed discarded", rarity.as_str());
                return RewardOutcome::SeedDiscarded { rarity: *rarity };
            }
            let species = candidates[rngs.species().gen_range(0..candidates.len())];
            let id = object_id(&species.id, now, rngs.total_draws());
            inventory
                .owned
                .push(OwnedObject::from_seed(id.clone(), species, now));
            RewardOutcome::Seed {
                object_id: id,
                species: species.id.clone(),
                rarity: species.rarity,
            }
        }
    }
}
