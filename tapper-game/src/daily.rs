//! Daily login calendar.
//!
//! Claiming on consecutive days walks the streak through the catalog's
//! `daily_rewards`; a missed day restarts it at day 1 and running past the
//! last entry wraps back to day 1.
use crate::catalog::GameCatalog;
use crate::clock::Timestamp;
use crate::effects::Modifiers;
use crate::plantation::Inventory;
use crate::progression::ProgressionState;
use crate::reward::{RewardOutcome, apply_reward};
use crate::rng::RngStreams;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DailyBlockReason {
    AlreadyClaimed,
    NoRewards,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DailyRewardOutcome {
    Claimed { day: u32, reward: RewardOutcome },
    Blocked(DailyBlockReason),
}

/// Streak day a claim on `today` would grant, or why none is due.
///
/// # Errors
///
/// Returns the block reason when today's reward was already claimed or the
/// calendar is empty.
pub fn due_day(
    progression: &ProgressionState,
    today: NaiveDate,
    calendar_len: usize,
) -> Result<u32, DailyBlockReason> {
    if calendar_len == 0 {
        return Err(DailyBlockReason::NoRewards);
    }
    let last = progression.last_daily_claim;
    if last == Some(today) {
        return Err(DailyBlockReason::AlreadyClaimed);
    }
    let continues = last.is_some_and(|last| today.pred_opt() == Some(last));
    let day = if continues {
        progression.login_streak.saturating_add(1)
    } else {
        1
    };
    if !usize::try_from(day).is_ok_and(|day| day <= calendar_len) {
        return Ok(1);
    }
    Ok(day)
}

/// Claim today's login reward and advance the streak.
pub fn claim_daily_reward(
    catalog: &GameCatalog,
    modifiers: &Modifiers,
    progression: &mut ProgressionState,
    inventory: &mut Inventory,
    rngs: &mut RngStreams,
    now: Timestamp,
) -> DailyRewardOutcome {
    let today = now.date_naive();
    let day = match due_day(progression, today, catalog.daily_rewards.len()) {
        Ok(day) => day,
        Err(reason) => return DailyRewardOutcome::Blocked(reason),
    };
    let Some(reward) = usize::try_from(day - 1)
        .ok()
        .and_then(|index| catalog.daily_rewards.get(index))
    else {
        return DailyRewardOutcome::Blocked(DailyBlockReason::NoRewards);
    };
    let reward = apply_reward(catalog, reward, modifiers, progression, inventory, rngs, now);
    progression.login_streak = day;
    progression.last_daily_claim = Some(today);
    log::info!("daily reward day {day} claimed: {reward:?}");
    DailyRewardOutcome::Claimed { day, reward }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{LootReward, Rarity};
    use crate::clock::{Clock, ManualClock};
    use std::time::Duration;

    const DAY: Duration = Duration::from_secs(86_400);

    fn claim(
        catalog: &GameCatalog,
        progression: &mut ProgressionState,
        inventory: &mut Inventory,
        clock: &ManualClock,
    ) -> DailyRewardOutcome {
        let mut rngs = RngStreams::from_user_seed(9);
        claim_daily_reward(
            catalog,
            &Modifiers::NEUTRAL,
            progression,
            inventory,
            &mut rngs,
            clock.now(),
        )
    }

    fn claimed_day(outcome: &DailyRewardOutcome) -> u32 {
        match outcome {
            DailyRewardOutcome::Claimed { day, .. } => *day,
            DailyRewardOutcome::Blocked(reason) => panic!("blocked: {reason:?}"),
        }
    }

    #[test]
    fn consecutive_days_continue_the_streak() {
        let catalog = GameCatalog::bundled().unwrap();
        let clock = ManualClock::default();
        let mut progression = ProgressionState::default();
        let mut inventory = Inventory::default();
        for expected in 1..=3 {
            let outcome = claim(&catalog, &mut progression, &mut inventory, &clock);
            assert_eq!(claimed_day(&outcome), expected);
            clock.advance(DAY);
        }
        assert_eq!(progression.login_streak, 3);
        // day 1 is 100 coins, day 2 is 3 latex, day 3 is 200 coins
        assert_eq!(progression.currency, 300);
        assert_eq!(inventory.materials.get("latex"), Some(&3));
    }

    #[test]
    fn second_claim_on_the_same_day_is_blocked() {
        let catalog = GameCatalog::bundled().unwrap();
        let clock = ManualClock::default();
        let mut progression = ProgressionState::default();
        let mut inventory = Inventory::default();
        claim(&catalog, &mut progression, &mut inventory, &clock);
        clock.advance(Duration::from_secs(3600));
        assert_eq!(
            claim(&catalog, &mut progression, &mut inventory, &clock),
            DailyRewardOutcome::Blocked(DailyBlockReason::AlreadyClaimed)
        );
        assert_eq!(progression.currency, 100);
    }

    #[test]
    fn missed_day_resets_to_day_one() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let progression = ProgressionState {
            login_streak: 4,
            last_daily_claim: NaiveDate::from_ymd_opt(2024, 5, 8),
            ..ProgressionState::default()
        };
        assert_eq!(due_day(&progression, today, 7), Ok(1));
        let yesterday = ProgressionState {
            last_daily_claim: today.pred_opt(),
            ..progression
        };
        assert_eq!(due_day(&yesterday, today, 7), Ok(5));
    }

    #[test]
    fn streak_wraps_after_the_last_day() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let progression = ProgressionState {
            login_streak: 7,
            last_daily_claim: today.pred_opt(),
            ..ProgressionState::default()
        };
        assert_eq!(due_day(&progression, today, 7), Ok(1));
        assert_eq!(
            due_day(&ProgressionState::default(), today, 0),
            Err(DailyBlockReason::NoRewards)
        );
    }

    #[test]
    fn seed_of_missing_rarity_is_discarded() {
        let mut catalog = GameCatalog::bundled().unwrap();
        catalog.species.retain(|species| species.rarity != Rarity::Legendary);
        catalog.daily_rewards = vec![LootReward::Seed {
            rarity: Rarity::Legendary,
        }];
        let clock = ManualClock::default();
        let mut progression = ProgressionState::default();
        let mut inventory = Inventory::default();
        let outcome = claim(&catalog, &mut progression, &mut inventory, &clock);
        assert_eq!(
            outcome,
            DailyRewardOutcome::Claimed {
                day: 1,
                reward: RewardOutcome::SeedDiscarded {
                    rarity: Rarity::Legendary
                },
            }
        );
        assert!(inventory.owned.is_empty());
        assert_eq!(progression.login_streak, 1);
    }
}
