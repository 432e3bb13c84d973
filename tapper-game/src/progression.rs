//! Player progression ledger: experience, level-ups, currency and records.
use crate::catalog::{Balance, XpCurve};
use crate::effects::Modifiers;
use crate::numbers::{round_f64_to_u64, u64_to_f64};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::time::Duration;

/// Persisted player progression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionState {
    #[serde(default = "ProgressionState::default_level")]
    pub level: u32,
    #[serde(default)]
    pub xp: u64,
    #[serde(default)]
    pub currency: u64,
    #[serde(default)]
    pub best_average_lap: Option<Duration>,
    /// Lap sequence of the session that set `best_average_lap`.
    #[serde(default)]
    pub best_lap_sequence: Vec<Duration>,
    #[serde(default)]
    pub lifetime_taps: u64,
    /// Coached average-seconds goal.
    #[serde(default)]
    pub goal_average: Option<f64>,
    #[serde(default)]
    pub last_session_date: Option<NaiveDate>,
    /// Day of the login calendar claimed most recently.
    #[serde(default)]
    pub login_streak: u32,
    #[serde(default)]
    pub last_daily_claim: Option<NaiveDate>,
}

impl ProgressionState {
    const fn default_level() -> u32 {
        1
    }
}

impl Default for ProgressionState {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            xp: 0,
            currency: 0,
            best_average_lap: None,
            best_lap_sequence: Vec::new(),
            lifetime_taps: 0,
            goal_average: None,
            last_session_date: None,
            login_streak: 0,
            last_daily_claim: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelUp {
    pub level: u32,
    pub coins: u64,
}

/// Result of an experience grant.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct XpGrant {
    pub granted: u64,
    pub level_ups: SmallVec<[LevelUp; 2]>,
}

/// Apply the overflow rule until `xp` is below the current requirement.
///
/// At `max_level` the cascade stops and surplus experience is dropped so the
/// `xp < required` invariant still holds. Returns every level reached.
pub fn cascade_levels(
    level: &mut u32,
    xp: &mut u64,
    curve: &XpCurve,
    max_level: Option<u32>,
) -> SmallVec<[u32; 2]> {
    let mut reached = SmallVec::new();
    *level = (*level).max(1);
    loop {
        let required = curve.required_for(*level);
        if max_level.is_some_and(|cap| *level >= cap) {
            *xp = (*xp).min(required.saturating_sub(1));
            break;
        }
        if *xp < required {
            break;
        }
        *xp -= required;
        *level += 1;
        reached.push(*level);
    }
    reached
}

/// Grant experience with boosts applied, cascading through level-ups and
/// granting level-up coins once per level crossed.
pub fn grant_xp(
    state: &mut ProgressionState,
    amount: f64,
    curve: &XpCurve,
    balance: &Balance,
    modifiers: &Modifiers,
) -> XpGrant {
    if amount.is_nan() || amount <= 0.0 {
        return XpGrant::default();
    }
    let granted = round_f64_to_u64(amount * modifiers.xp);
    state.xp = state.xp.saturating_add(granted);
    let reached = cascade_levels(&mut state.level, &mut state.xp, curve, None);
    let level_ups = reached
        .into_iter()
        .map(|level| {
            let coins = grant_coins(state, balance.level_up_coins(level), modifiers);
            log::info!("reached level {level} (+{coins} coins)");
            LevelUp { level, coins }
        })
        .collect();
    XpGrant { granted, level_ups }
}

/// Credit coins scaled by the coin-yield modifier. Returns the amount credited.
pub fn grant_coins(state: &mut ProgressionState, amount: u64, modifiers: &Modifiers) -> u64 {
    if amount == 0 {
        return 0;
    }
    let credited = round_f64_to_u64(u64_to_f64(amount) * modifiers.coin_yield);
    state.currency = state.currency.saturating_add(credited);
    credited
}

/// Credit coins without applying any modifier.
pub const fn credit_coins(state: &mut ProgressionState, amount: u64) {
    state.currency = state.currency.saturating_add(amount);
}

/// Strictly better than the stored best (or no best recorded yet).
#[must_use]
pub fn is_new_record(state: &ProgressionState, average: Duration) -> bool {
    state.best_average_lap.is_none_or(|best| average < best)
}

/// Record a new best average and pay the record bonus. Returns the coins
/// credited, or `None` when `average` is not a strict improvement.
pub fn record_best(
    state: &mut ProgressionState,
    average: Duration,
    laps: &[Duration],
    balance: &Balance,
    modifiers: &Modifiers,
) -> Option<u64> {
    if !is_new_record(state, average) {
        return None;
    }
    state.best_average_lap = Some(average);
    state.best_lap_sequence = laps.to_vec();
    let bonus = balance
        .record_bonus_coins
        .saturating_add(modifiers.record_bonus_flat);
    let coins = grant_coins(state, bonus, modifiers);
    log::info!(
        "new best average {:.2}s (+{coins} coins)",
        average.as_secs_f64()
    );
    Some(coins)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve() -> XpCurve {
        XpCurve::new(100.0, 1.5)
    }

    #[test]
    fn single_level_up_pays_coins() {
        let mut state = ProgressionState {
            xp: 90,
            ..ProgressionState::default()
        };
        let grant = grant_xp(
            &mut state,
            10.0,
            &curve(),
            &Balance::default(),
            &Modifiers::NEUTRAL,
        );
        assert_eq!(grant.granted, 10);
        assert_eq!(state.level, 2);
        assert_eq!(state.xp, 0);
        assert_eq!(grant.level_ups.as_slice(), &[LevelUp { level: 2, coins: 60 }]);
        assert_eq!(state.currency, 60);
    }

    #[test]
    fn cascade_crosses_multiple_levels() {
        let mut state = ProgressionState::default();
        // 100 + 283 + 520 = 903 to reach level 4
        let grant = grant_xp(
            &mut state,
            1000.0,
            &curve(),
            &Balance::default(),
            &Modifiers::NEUTRAL,
        );
        assert_eq!(state.level, 4);
        assert_eq!(state.xp, 97);
        assert!(state.xp < curve().required_for(state.level));
        let levels: Vec<u32> = grant.level_ups.iter().map(|up| up.level).collect();
        assert_eq!(levels, vec![2, 3, 4]);
        assert_eq!(state.currency, 60 + 65 + 70);
    }

    #[test]
    fn xp_boost_rounds_after_multiplying() {
        let mut state = ProgressionState::default();
        let mods = Modifiers {
            xp: 1.25,
            ..Modifiers::NEUTRAL
        };
        let grant = grant_xp(&mut state, 5.0, &curve(), &Balance::default(), &mods);
        assert_eq!(grant.granted, 6);
    }

    #[test]
    fn non_positive_grants_are_noops() {
        let mut state = ProgressionState::default();
        let before = state.clone();
        grant_xp(
            &mut state,
            0.0,
            &curve(),
            &Balance::default(),
            &Modifiers::NEUTRAL,
        );
        grant_xp(
            &mut state,
            f64::NAN,
            &curve(),
            &Balance::default(),
            &Modifiers::NEUTRAL,
        );
        assert_eq!(grant_coins(&mut state, 0, &Modifiers::NEUTRAL), 0);
        assert_eq!(state, before);
    }

    #[test]
    fn coin_yield_applies_to_grants() {
        let mut state = ProgressionState::default();
        let mods = Modifiers {
            coin_yield: 1.15,
            ..Modifiers::NEUTRAL
        };
        assert_eq!(grant_coins(&mut state, 20, &mods), 23);
        credit_coins(&mut state, 7);
        assert_eq!(state.currency, 30);
    }

    #[test]
    fn cascade_stops_at_cap() {
        let mut level = 9;
        let mut xp = 10_000;
        let reached = cascade_levels(&mut level, &mut xp, &XpCurve::new(10.0, 1.1), Some(10));
        assert_eq!(reached.as_slice(), &[10]);
        assert_eq!(level, 10);
        assert!(xp < XpCurve::new(10.0, 1.1).required_for(10));
    }

    #[test]
    fn records_require_strict_improvement() {
        let mut state = ProgressionState::default();
        let balance = Balance::default();
        let laps = [Duration::from_secs(10)];
        let avg = Duration::from_secs(10);
        assert_eq!(
            record_best(&mut state, avg, &laps, &balance, &Modifiers::NEUTRAL),
            Some(25)
        );
        assert_eq!(
            record_best(&mut state, avg, &laps, &balance, &Modifiers::NEUTRAL),
            None
        );
        let mods = Modifiers {
            record_bonus_flat: 5,
            ..Modifiers::NEUTRAL
        };
        assert_eq!(
            record_best(&mut state, Duration::from_secs(9), &laps, &balance, &mods),
            Some(30)
        );
        assert_eq!(state.best_average_lap, Some(Duration::from_secs(9)));
        assert_eq!(state.currency, 55);
    }
}
