//! Tapping session engine.
//!
//! [`TapperEngine`] owns the catalog, the persisted profile, the store, the
//! clock and the RNG streams, and drives one sub-session at a time through
//! `Idle -> Prepared(n) -> Timing(n) -> Prepared(n + 1) | Idle`. Every tap
//! commits its side effects to the store before returning, so a reload loses
//! at most the in-flight sub-session.
mod phase;
mod state;

pub use phase::{SessionPhase, Transition};
pub use state::SessionState;

use crate::analysis::{
    CoachTip, coach_tip, coached_goal, daily_streak, pacing_analysis, pacing_delta,
    session_insight, suggested_tap_goal,
};
use crate::catalog::GameCatalog;
use crate::clock::{Clock, DisplayTicker, Timestamp};
use crate::config::EngineConfig;
use crate::cycle::CycleCommit;
use crate::daily::{DailyBlockReason, DailyRewardOutcome, claim_daily_reward, due_day};
use crate::effects::{Modifiers, PurchaseOutcome, purchase_upgrade, upgrade_cost};
use crate::error::EngineError;
use crate::events::{EngineEvent, EventList, SessionSnapshot};
use crate::history::SessionRecord;
use crate::missions::SessionStats;
use crate::plantation::{self, CareOutcome};
use crate::profile::{BlobKey, Profile};
use crate::progression::{XpGrant, credit_coins, grant_coins, grant_xp, record_best};
use crate::reward::{RewardOutcome, resolve_tap_reward};
use crate::rng::RngStreams;
use crate::{CatalogLoader, ProgressStore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Action key reported to missions when an owned object is upgraded.
pub const OBJECT_UPGRADED_ACTION: &str = "object_upgraded";

/// Result of a completed tap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TapOutcome {
    /// Cycle-relative ordinal of the tap just completed.
    pub ordinal: u32,
    pub lap: Duration,
    pub reward: RewardOutcome,
    pub events: EventList,
    /// Present when this tap reached the cycle boundary and ended the session.
    pub summary: Option<SessionSummary>,
}

/// Everything committed when a session ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub record: SessionRecord,
    pub full_cycle: bool,
    pub new_record: bool,
    pub xp: XpGrant,
    pub cycle: CycleCommit,
    pub loot: BTreeMap<String, u64>,
    pub events: EventList,
}

/// The engine context object.
#[derive(Debug)]
pub struct TapperEngine<S, C>
where
    S: ProgressStore,
    C: Clock,
{
    catalog: GameCatalog,
    store: S,
    clock: C,
    config: EngineConfig,
    profile: Profile,
    rngs: RngStreams,
    session: Option<SessionState>,
    phase: SessionPhase,
    ticker: DisplayTicker,
}

impl<S, C> TapperEngine<S, C>
where
    S: ProgressStore,
    C: Clock,
{
    /// Load the catalog and persisted profile and refresh today's missions.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::CatalogUnavailable`] if the catalog cannot be
    /// loaded or validated, and [`EngineError::Storage`] if the store cannot
    /// be read.
    pub fn open<L: CatalogLoader>(
        loader: &L,
        store: S,
        clock: C,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        let catalog = loader
            .load_catalog()
            .map_err(|err| EngineError::CatalogUnavailable(err.to_string()))?;
        catalog
            .validate()
            .map_err(|err| EngineError::CatalogUnavailable(err.to_string()))?;
        let profile =
            Profile::load(&store).map_err(|err| EngineError::Storage(format!("{err:#}")))?;
        let mut engine = Self {
            catalog,
            rngs: RngStreams::from_user_seed(config.rng_seed),
            ticker: DisplayTicker::new(config.display_interval()),
            store,
            clock,
            config,
            profile,
            session: None,
            phase: SessionPhase::Idle,
        };
        engine.refresh_missions();
        log::debug!(
            "engine opened: level {}, cycle {:?}",
            engine.profile.progression.level,
            engine.profile.cycle
        );
        Ok(engine)
    }

    fn illegal(&self, op: Transition) -> EngineError {
        let paused = self.is_paused();
        log::warn!("rejected {op} while {}", self.phase);
        EngineError::IllegalTransition {
            op,
            phase: self.phase,
            paused,
        }
    }

    fn modifiers(&self) -> Modifiers {
        Modifiers::collect(
            &self.catalog,
            &self.profile.upgrades,
            self.profile.inventory.active_attributes(),
        )
    }

    fn persist(&self, keys: &[BlobKey]) {
        self.profile.save(&self.store, keys);
    }

    /// Begin a new sub-session aiming for `goal` taps.
    ///
    /// # Errors
    ///
    /// Fails if a session is already running or `goal` is zero.
    pub fn start_session(&mut self, goal: u32) -> Result<SessionSnapshot, EngineError> {
        if self.phase.is_running() {
            return Err(self.illegal(Transition::StartSession));
        }
        if goal < 1 {
            return Err(EngineError::InvalidGoal { goal });
        }
        self.session = Some(SessionState::new(goal, self.clock.now()));
        self.phase = SessionPhase::Prepared { next_tap: 1 };
        self.ticker.reset();
        log::debug!("session started with goal {goal}");
        Ok(self.snapshot())
    }

    /// Start timing the next tap.
    ///
    /// # Errors
    ///
    /// Fails unless the session is prepared and not paused.
    pub fn begin_tap(&mut self) -> Result<SessionSnapshot, EngineError> {
        let SessionPhase::Prepared { next_tap } = self.phase else {
            return Err(self.illegal(Transition::BeginTap));
        };
        if self.is_paused() {
            return Err(self.illegal(Transition::BeginTap));
        }
        let now = self.clock.now();
        let Some(session) = self.session.as_mut() else {
            return Err(self.illegal(Transition::BeginTap));
        };
        session.timer_mut().begin_lap(now);
        self.phase = SessionPhase::Timing { lap: next_tap };
        Ok(self.snapshot())
    }

    /// Finish the timed tap: record the lap, resolve exactly one reward and
    /// end the session automatically when the cycle boundary is reached.
    ///
    /// # Errors
    ///
    /// Fails unless a tap is being timed and the session is not paused.
    pub fn complete_tap(&mut self) -> Result<TapOutcome, EngineError> {
        if !matches!(self.phase, SessionPhase::Timing { .. }) || self.is_paused() {
            return Err(self.illegal(Transition::CompleteTap));
        }
        let now = self.clock.now();
        let modifiers = self.modifiers();
        let Some(session) = self.session.as_mut() else {
            return Err(self.illegal(Transition::CompleteTap));
        };
        let Some(lap) = session.timer_mut().finish_lap(now) else {
            return Err(self.illegal(Transition::CompleteTap));
        };
        let ordinal = self.profile.cycle.next_tap_ordinal(session.tapped_count());
        session.record_lap(lap);

        let reward = resolve_tap_reward(
            &self.catalog,
            &modifiers,
            &mut self.profile.progression,
            &mut self.profile.inventory,
            &mut self.rngs,
            now,
        );
        let mut events = EventList::new();
        match &reward {
            RewardOutcome::Material { key, amount } => events.push(EngineEvent::MaterialFound {
                key: key.clone(),
                amount: *amount,
            }),
            RewardOutcome::Seed {
                object_id,
                species,
                rarity,
            } if rarity.is_rare_or_better() => events.push(EngineEvent::RareItemAcquired {
                object_id: object_id.clone(),
                species: species.clone(),
                rarity: *rarity,
            }),
            _ => {}
        }
        if let Some((key, amount)) = reward.loot_entry() {
            session.tally(key, amount);
        }
        let tapped = session.tapped_count();
        log::debug!("tap {tapped} (cycle #{ordinal}) in {lap:?}");
        self.persist(&[BlobKey::Progression, BlobKey::Inventory]);

        let summary = if self.profile.cycle.boundary_reached(tapped) {
            self.finish_session(true, now)
        } else {
            self.phase = SessionPhase::Prepared {
                next_tap: tapped + 1,
            };
            None
        };
        Ok(TapOutcome {
            ordinal,
            lap,
            reward,
            events,
            summary,
        })
    }

    /// Freeze elapsed-time accounting.
    ///
    /// # Errors
    ///
    /// Fails when idle or already paused.
    pub fn pause(&mut self) -> Result<SessionSnapshot, EngineError> {
        let now = self.clock.now();
        let paused = self
            .session
            .as_mut()
            .is_some_and(|session| session.timer_mut().pause(now));
        if !paused {
            return Err(self.illegal(Transition::Pause));
        }
        log::debug!("session paused while {}", self.phase);
        Ok(self.snapshot())
    }

    /// Resume after a pause, shifting the in-flight lap by the pause length.
    ///
    /// # Errors
    ///
    /// Fails when idle or not paused.
    pub fn resume(&mut self) -> Result<SessionSnapshot, EngineError> {
        let now = self.clock.now();
        let resumed = self
            .session
            .as_mut()
            .and_then(|session| session.timer_mut().resume(now));
        let Some(pause) = resumed else {
            return Err(self.illegal(Transition::Resume));
        };
        log::debug!("session resumed after {pause:?}");
        Ok(self.snapshot())
    }

    /// End the running session. A session with no completed taps is discarded
    /// without side effects and yields `None`.
    ///
    /// # Errors
    ///
    /// Fails when no session is running.
    pub fn end_session(&mut self, full_cycle: bool) -> Result<Option<SessionSummary>, EngineError> {
        if self.phase.is_idle() {
            return Err(self.illegal(Transition::EndSession));
        }
        let now = self.clock.now();
        Ok(self.finish_session(full_cycle, now))
    }

    fn finish_session(&mut self, full_cycle: bool, now: Timestamp) -> Option<SessionSummary> {
        self.phase = SessionPhase::Idle;
        self.ticker.reset();
        let mut session = self.session.take()?;
        session.timer_mut().resume(now);
        let tapped = session.tapped_count();
        if tapped == 0 {
            log::debug!("discarding session with no taps");
            return None;
        }

        let total = session.timer().elapsed(now);
        let average = total / tapped;
        let laps = session.lap_durations().to_vec();
        let insight = session_insight(&laps, average, &self.profile.history);
        let record = SessionRecord {
            date: now,
            tapped,
            total,
            average,
            pacing: pacing_analysis(&laps),
            insight: insight.to_string(),
            lap_durations: laps,
        };
        self.profile
            .history
            .push(record.clone(), self.config.history_capacity);

        let modifiers = self.modifiers();
        let balance = &self.catalog.balance;
        let progression = &mut self.profile.progression;
        progression.lifetime_taps = progression.lifetime_taps.saturating_add(u64::from(tapped));
        progression.last_session_date = Some(now.date_naive());

        let mut events = EventList::new();
        let record_bonus = record_best(
            progression,
            average,
            &record.lap_durations,
            balance,
            &modifiers,
        );
        if let Some(bonus_coins) = record_bonus {
            events.push(EngineEvent::NewRecord {
                average,
                bonus_coins,
            });
        }

        let xp = grant_xp(
            progression,
            balance.session_xp(tapped),
            &self.catalog.player_curve(),
            balance,
            &modifiers,
        );
        events.extend(xp.level_ups.iter().map(|up| EngineEvent::LevelUp {
            level: up.level,
            coins: up.coins,
        }));

        let cycle = self.profile.cycle.commit(tapped, full_cycle);
        if let Some(goal) = cycle.goal_set {
            events.push(EngineEvent::CycleGoalSet { goal });
        }
        if cycle.completed
            && let Some(goal) = self.profile.cycle.cycle_goal
        {
            events.push(EngineEvent::CycleCompleted { goal });
        }

        let stats = SessionStats {
            tapped,
            average_secs: average.as_secs_f64(),
            total_minutes: total.as_secs_f64() / 60.0,
            lifetime_taps: progression.lifetime_taps,
            rare_objects_owned: self.profile.inventory.rare_objects_owned(),
        };
        for def in self.profile.achievements.evaluate(&self.catalog, &stats) {
            let coins = grant_coins(progression, def.coin_reward, &modifiers);
            events.push(EngineEvent::AchievementUnlocked {
                id: def.id.clone(),
                coins,
            });
        }
        for completion in self.profile.missions.evaluate_session(&stats) {
            credit_coins(progression, completion.reward);
            events.push(EngineEvent::MissionCompleted {
                id: completion.id,
                reward: completion.reward,
            });
        }
        progression.goal_average = coached_goal(&self.profile.history, balance);

        self.profile.save_all(&self.store);
        log::info!(
            "session committed: {tapped} taps in {:.1}s (avg {:.2}s)",
            total.as_secs_f64(),
            average.as_secs_f64()
        );
        Some(SessionSummary {
            new_record: record_bonus.is_some(),
            record,
            full_cycle,
            xp,
            cycle,
            loot: session.loot().clone(),
            events,
        })
    }

    /// Observable state right now.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let now = self.clock.now();
        let cycle = &self.profile.cycle;
        let Some(session) = &self.session else {
            return SessionSnapshot {
                phase: self.phase,
                next_tap_ordinal: cycle.next_tap_ordinal(0),
                cycle_progress: cycle.progress_fraction(0),
                ..SessionSnapshot::default()
            };
        };
        let tapped = session.tapped_count();
        let progression = &self.profile.progression;
        SessionSnapshot {
            phase: self.phase,
            paused: session.timer().is_paused(),
            goal: Some(session.total_goal()),
            tapped,
            next_tap_ordinal: cycle.next_tap_ordinal(tapped),
            elapsed: session.timer().elapsed(now),
            current_lap: session.timer().current_lap(now),
            last_lap: session.last_lap(),
            previous_lap: session.previous_lap(),
            average_lap: session.average(now),
            loot: session.loot().clone(),
            cycle_progress: cycle.progress_fraction(tapped),
            pacing_delta_secs: pacing_delta(
                session.lap_durations(),
                &progression.best_lap_sequence,
                progression.goal_average,
            ),
        }
    }

    /// Elapsed time once per display interval while a session runs.
    pub fn poll_display(&mut self) -> Option<Duration> {
        let now = self.clock.now();
        let session = self.session.as_ref()?;
        self.ticker.poll(session.timer(), now)
    }

    /// Regenerate daily missions if the board is stale. Returns whether it was.
    pub fn refresh_missions(&mut self) -> bool {
        let today = self.clock.now().date_naive();
        if !self.profile.missions.needs_refresh(today) {
            return false;
        }
        self.profile.missions.generate(
            &self.catalog,
            &self.profile.history,
            &self.profile.progression,
            today,
            self.rngs.missions(),
        );
        self.persist(&[BlobKey::Missions]);
        true
    }

    /// Buy the next level of an upgrade.
    pub fn purchase_upgrade(&mut self, id: &str) -> PurchaseOutcome {
        let outcome = purchase_upgrade(
            &self.catalog,
            &mut self.profile.upgrades,
            &mut self.profile.progression,
            id,
        );
        if matches!(outcome, PurchaseOutcome::Purchased { .. }) {
            self.persist(&[BlobKey::Upgrades, BlobKey::Progression]);
        }
        outcome
    }

    /// Streak day today's login reward would grant.
    ///
    /// # Errors
    ///
    /// Returns why nothing is due.
    pub fn daily_reward_due(&self) -> Result<u32, DailyBlockReason> {
        due_day(
            &self.profile.progression,
            self.clock.now().date_naive(),
            self.catalog.daily_rewards.len(),
        )
    }

    /// Claim today's login reward.
    pub fn claim_daily_reward(&mut self) -> DailyRewardOutcome {
        let modifiers = self.modifiers();
        let outcome = claim_daily_reward(
            &self.catalog,
            &modifiers,
            &mut self.profile.progression,
            &mut self.profile.inventory,
            &mut self.rngs,
            self.clock.now(),
        );
        if matches!(outcome, DailyRewardOutcome::Claimed { .. }) {
            self.persist(&[BlobKey::Progression, BlobKey::Inventory]);
        }
        outcome
    }

    #[must_use]
    pub fn upgrade_cost(&self, id: &str) -> Option<u64> {
        upgrade_cost(&self.catalog, &self.profile.upgrades, id)
    }

    fn persist_care(&self, outcome: &CareOutcome) {
        if !outcome.is_blocked() {
            self.persist(&[BlobKey::Inventory]);
        }
    }

    pub fn plant(&mut self, id: &str) -> CareOutcome {
        let modifiers = self.modifiers();
        let now = self.clock.now();
        let outcome = plantation::plant(
            &self.catalog,
            &mut self.profile.inventory,
            &modifiers,
            id,
            now,
        );
        self.persist_care(&outcome);
        outcome
    }

    pub fn water(&mut self, id: &str) -> CareOutcome {
        let now = self.clock.now();
        let outcome = plantation::water(&self.catalog, &mut self.profile.inventory, id, now);
        self.persist_care(&outcome);
        outcome
    }

    pub fn fertilize(&mut self, id: &str) -> CareOutcome {
        let outcome = plantation::fertilize(&self.catalog, &mut self.profile.inventory, id);
        self.persist_care(&outcome);
        outcome
    }

    pub fn grow(&mut self, id: &str) -> CareOutcome {
        let now = self.clock.now();
        let outcome = plantation::grow(&mut self.profile.inventory, id, now);
        self.persist_care(&outcome);
        outcome
    }

    pub fn toggle_active(&mut self, id: &str) -> CareOutcome {
        let outcome = plantation::toggle_active(&mut self.profile.inventory, id);
        self.persist_care(&outcome);
        outcome
    }

    pub fn acknowledge(&mut self, id: &str) -> CareOutcome {
        let outcome = plantation::acknowledge(&mut self.profile.inventory, id);
        self.persist_care(&outcome);
        outcome
    }

    /// Upgrade an owned object and advance matching action missions.
    pub fn upgrade_object(&mut self, id: &str) -> (CareOutcome, EventList) {
        let modifiers = self.modifiers();
        let outcome =
            plantation::upgrade_object(&self.catalog, &mut self.profile.inventory, &modifiers, id);
        let mut events = EventList::new();
        if outcome.is_blocked() {
            return (outcome, events);
        }
        for completion in self.profile.missions.record_action(OBJECT_UPGRADED_ACTION) {
            credit_coins(&mut self.profile.progression, completion.reward);
            events.push(EngineEvent::MissionCompleted {
                id: completion.id,
                reward: completion.reward,
            });
        }
        self.persist(&[BlobKey::Inventory, BlobKey::Missions, BlobKey::Progression]);
        (outcome, events)
    }

    #[must_use]
    pub fn ready_to_grow(&self) -> usize {
        plantation::ready_to_grow(&self.profile.inventory, self.clock.now())
    }

    #[must_use]
    pub fn materials_needed(&self, id: &str) -> Option<BTreeMap<String, u64>> {
        self.profile
            .inventory
            .object(id)
            .map(|object| plantation::materials_needed(&self.catalog, object))
    }

    #[must_use]
    pub fn suggested_tap_goal(&self) -> u32 {
        suggested_tap_goal(self.profile.cycle.cycle_goal, &self.profile.history)
    }

    #[must_use]
    pub fn coach_tip(&self) -> CoachTip {
        coach_tip(&self.profile.progression, &self.profile.history)
    }

    #[must_use]
    pub fn daily_streak(&self) -> u32 {
        daily_streak(&self.profile.history, self.clock.now().date_naive())
    }

    #[must_use]
    pub const fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.timer().is_paused())
    }

    #[must_use]
    pub const fn session(&self) -> Option<&SessionState> {
        self.session.as_ref()
    }

    #[must_use]
    pub const fn profile(&self) -> &Profile {
        &self.profile
    }

    #[must_use]
    pub const fn catalog(&self) -> &GameCatalog {
        &self.catalog
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub const fn clock(&self) -> &C {
        &self.clock
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }
}
