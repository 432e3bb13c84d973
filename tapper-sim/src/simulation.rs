use anyhow::{Context, Result};
use chrono::DateTime;
use colored::Colorize;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tapper_game::cycle::coverage;
use tapper_game::{
    CareOutcome, CatalogLoader, Clock, DailyRewardOutcome, EngineConfig, EngineError,
    EngineEvent, GrowthStage, ManualClock, MemoryStore, PurchaseOutcome, SessionSummary,
    TapOutcome, TapperEngine,
};

use crate::scenarios::{Scenario, SessionPlan};

/// 2025-01-01T08:00:00Z
const SIM_EPOCH_SECS: i64 = 1_735_718_400;
const LAP_STREAM: u64 = 0x1A95_5EED;
const EXPECTATION_MIN_SESSIONS: usize = 4;

type SimEngine = TapperEngine<MemoryStore, ManualClock>;

/// Outcome of one scenario run for one seed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub seed: u64,
    pub sessions: usize,
    pub taps: u64,
    pub auto_ended: usize,
    pub level: u32,
    pub currency: u64,
    pub best_average_secs: Option<f64>,
    pub cycle_goal: Option<u32>,
    pub cycles_completed: usize,
    pub new_records: usize,
    pub rare_items: usize,
    pub achievements: usize,
    pub missions_completed: usize,
    pub upgrades_bought: usize,
    #[serde(default)]
    pub daily_claims: usize,
    pub grown_objects: usize,
    /// Mean share of the cycle covered per session once the cycle is known.
    pub mean_cycle_coverage: Option<f64>,
    pub failures: Vec<String>,
    pub wall_time_ms: f64,
}

impl SimulationSummary {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct Simulator<'a, L> {
    loader: &'a L,
    verbose: bool,
}

impl<'a, L: CatalogLoader> Simulator<'a, L> {
    pub const fn new(loader: &'a L, verbose: bool) -> Self {
        Self { loader, verbose }
    }

    /// Play `sessions` sessions of `scenario` against a fresh in-memory profile.
    pub fn run(&self, scenario: &Scenario, seed: u64, sessions: usize) -> Result<SimulationSummary> {
        let started = Instant::now();
        let clock = ManualClock::starting_at(
            DateTime::from_timestamp(SIM_EPOCH_SECS, 0).unwrap_or_default(),
        );
        let engine = TapperEngine::open(
            self.loader,
            MemoryStore::new(),
            clock.clone(),
            EngineConfig::default().with_seed(seed),
        )
        .with_context(|| format!("opening engine for {} seed {seed}", scenario.name))?;

        let mut run = Run {
            engine,
            clock,
            plan: &scenario.plan,
            laps: ChaCha8Rng::seed_from_u64(seed ^ LAP_STREAM),
            coverage: Vec::new(),
            verbose: self.verbose,
            summary: SimulationSummary {
                seed,
                ..SimulationSummary::default()
            },
        };
        for index in 0..sessions {
            run.claim_daily();
            run.play_session(index);
            if scenario.plan.tend_plantation {
                run.tend_plantation();
            }
            if scenario.plan.shop {
                run.shop();
            }
            run.clock.advance(scenario.plan.session_gap);
            run.engine.refresh_missions();
        }
        Ok(run.finish(started))
    }
}

struct Run<'p> {
    engine: SimEngine,
    clock: ManualClock,
    plan: &'p SessionPlan,
    laps: ChaCha8Rng,
    coverage: Vec<f64>,
    verbose: bool,
    summary: SimulationSummary,
}

impl Run<'_> {
    fn fail(&mut self, message: String) {
        log::warn!("{message}");
        self.summary.failures.push(message);
    }

    fn next_lap(&mut self, session: usize) -> Duration {
        let ms = self.laps.gen_range(self.plan.min_lap_ms..=self.plan.max_lap_ms);
        let scale = self
            .plan
            .speedup
            .powi(i32::try_from(session).unwrap_or(i32::MAX));
        Duration::from_millis(ms).mul_f64(scale).max(Duration::from_millis(1))
    }

    /// Time one tap, pausing halfway through when the plan asks for it.
    fn tap(&mut self, nth: u32, planned: Duration) -> Result<TapOutcome, EngineError> {
        self.engine.begin_tap()?;
        let half = planned / 2;
        self.clock.advance(half);
        if self.plan.pause_every.is_some_and(|every| every > 0 && nth % every == 0) {
            self.engine.pause()?;
            self.clock.advance(self.plan.pause_length);
            self.engine.resume()?;
        }
        self.clock.advance(planned - half);
        self.engine.complete_tap()
    }

    fn play_session(&mut self, index: usize) {
        let label = index + 1;
        let goal = match (index, self.plan.first_goal) {
            (0, Some(first)) => first,
            _ => self.plan.goal,
        };
        let full_cycle = index == 0 && self.plan.first_full_cycle;
        if let Err(err) = self.engine.start_session(goal) {
            self.fail(format!("session {label}: {err}"));
            return;
        }
        self.summary.sessions += 1;

        let mut planned_total = Duration::ZERO;
        let mut last_ordinal: Option<u32> = None;
        let mut auto_summary = None;
        for nth in 1..=goal {
            let planned = self.next_lap(index);
            let outcome = match self.tap(nth, planned) {
                Ok(outcome) => outcome,
                Err(err) => {
                    self.fail(format!("session {label} tap {nth}: {err}"));
                    break;
                }
            };
            planned_total += planned;
            if outcome.lap != planned {
                self.fail(format!(
                    "session {label} tap {nth}: lap {:?} differs from timed {planned:?}",
                    outcome.lap
                ));
            }
            if let Some(previous) = last_ordinal
                && outcome.ordinal != previous + 1
            {
                self.fail(format!(
                    "session {label} tap {nth}: ordinal jumped from {previous} to {}",
                    outcome.ordinal
                ));
            }
            last_ordinal = Some(outcome.ordinal);
            self.check_progression(label);
            self.absorb_events(&outcome.events);
            if outcome.summary.is_some() {
                self.summary.auto_ended += 1;
                auto_summary = outcome.summary;
                break;
            }
        }

        let summary = match auto_summary {
            Some(summary) => Some(summary),
            None => match self.engine.end_session(full_cycle) {
                Ok(summary) => summary,
                Err(err) => {
                    self.fail(format!("session {label} end: {err}"));
                    None
                }
            },
        };
        let Some(summary) = summary else {
            return;
        };
        if summary.record.total != planned_total {
            self.fail(format!(
                "session {label}: total {:?} differs from timed {planned_total:?}",
                summary.record.total
            ));
        }
        self.absorb_summary(&summary);
        if self.verbose {
            println!(
                "   session {label}: {} taps, avg {:.2}s{}",
                summary.record.tapped,
                summary.record.average.as_secs_f64(),
                if summary.new_record {
                    " NEW RECORD".green().to_string()
                } else {
                    String::new()
                }
            );
        }
    }

    fn check_progression(&mut self, label: usize) {
        let progression = &self.engine.profile().progression;
        let required = self
            .engine
            .catalog()
            .player_curve()
            .required_for(progression.level);
        if progression.xp >= required {
            let message = format!(
                "session {label}: xp {} not below requirement {required} at level {}",
                progression.xp, progression.level
            );
            self.fail(message);
        }
    }

    fn absorb_events(&mut self, events: &[EngineEvent]) {
        for event in events {
            match event {
                EngineEvent::RareItemAcquired { .. } => self.summary.rare_items += 1,
                EngineEvent::NewRecord { .. } => self.summary.new_records += 1,
                EngineEvent::AchievementUnlocked { .. } => self.summary.achievements += 1,
                EngineEvent::MissionCompleted { .. } => self.summary.missions_completed += 1,
                EngineEvent::CycleCompleted { .. } => self.summary.cycles_completed += 1,
                EngineEvent::LevelUp { .. }
                | EngineEvent::MaterialFound { .. }
                | EngineEvent::CycleGoalSet { .. } => {}
            }
        }
    }

    fn absorb_summary(&mut self, summary: &SessionSummary) {
        self.summary.taps += u64::from(summary.record.tapped);
        self.absorb_events(&summary.events);
        let cycle = self.engine.profile().cycle;
        if let Some(goal) = cycle.cycle_goal {
            self.coverage
                .push(coverage(summary.record.lap_durations.len(), goal));
            if cycle.tapped_in_current_cycle >= goal {
                self.fail(format!(
                    "cycle progress {} reached goal {goal} without resetting",
                    cycle.tapped_in_current_cycle
                ));
            }
        }
    }

    /// Plant every seed, water and fertilize seedlings, harvest what is ready
    /// and put materials into the active object.
    fn tend_plantation(&mut self) {
        let owned: Vec<(String, GrowthStage, bool)> = self
            .engine
            .profile()
            .inventory
            .owned
            .iter()
            .map(|object| (object.id.clone(), object.growth, object.is_new))
            .collect();
        for (id, growth, is_new) in owned {
            if is_new {
                self.engine.acknowledge(&id);
            }
            match growth {
                GrowthStage::Seed => {
                    self.engine.plant(&id);
                }
                GrowthStage::Seedling { grows_at, .. } => {
                    if grows_at <= self.engine.clock().now() {
                        self.engine.grow(&id);
                    } else {
                        self.engine.water(&id);
                        self.engine.fertilize(&id);
                    }
                }
                GrowthStage::Grown => {}
            }
        }

        let inventory = &self.engine.profile().inventory;
        let active = inventory.active_object.clone().or_else(|| {
            inventory
                .owned
                .iter()
                .find(|object| object.is_grown())
                .map(|object| object.id.clone())
        });
        let Some(active) = active else {
            return;
        };
        if inventory.active_object.is_none()
            && self.engine.toggle_active(&active) != CareOutcome::Activated
        {
            self.fail(format!("could not activate grown object {active}"));
        }
        let (outcome, events) = self.engine.upgrade_object(&active);
        if !outcome.is_blocked() {
            log::debug!("upgraded {active}: {outcome:?}");
        }
        self.absorb_events(&events);
    }

    /// Claim the login reward whenever one is due.
    fn claim_daily(&mut self) {
        let Ok(due) = self.engine.daily_reward_due() else {
            return;
        };
        match self.engine.claim_daily_reward() {
            DailyRewardOutcome::Claimed { day, .. } if day == due => {
                self.summary.daily_claims += 1;
            }
            other => self.fail(format!("daily reward for day {due}: {other:?}")),
        }
    }

    /// Buy the first affordable upgrade.
    fn shop(&mut self) {
        let currency = self.engine.profile().progression.currency;
        let affordable = self.engine.catalog().upgrades.iter().find_map(|def| {
            self.engine
                .upgrade_cost(&def.id)
                .filter(|cost| *cost <= currency)
                .map(|cost| (def.id.clone(), cost))
        });
        let Some((id, cost)) = affordable else {
            return;
        };
        match self.engine.purchase_upgrade(&id) {
            PurchaseOutcome::Purchased { cost: paid, .. } if paid == cost => {
                self.summary.upgrades_bought += 1;
                let after = self.engine.profile().progression.currency;
                if after != currency - cost {
                    self.fail(format!(
                        "buying {id} for {cost} left {after} of {currency} coins"
                    ));
                }
            }
            other => self.fail(format!("buying {id} for {cost}: {other:?}")),
        }
    }

    fn finish(mut self, started: Instant) -> SimulationSummary {
        let profile = self.engine.profile();
        self.summary.level = profile.progression.level;
        self.summary.currency = profile.progression.currency;
        self.summary.best_average_secs = profile
            .progression
            .best_average_lap
            .map(|best| best.as_secs_f64());
        self.summary.cycle_goal = profile.cycle.cycle_goal;
        self.summary.grown_objects = profile
            .inventory
            .owned
            .iter()
            .filter(|object| object.is_grown())
            .count();
        if !self.coverage.is_empty() {
            let total: f64 = self.coverage.iter().sum();
            self.summary.mean_cycle_coverage =
                Some(total / f64::from(u32::try_from(self.coverage.len()).unwrap_or(u32::MAX)));
        }

        if self.summary.sessions >= EXPECTATION_MIN_SESSIONS {
            let expect = self.plan.expect;
            if self.summary.new_records < expect.min_new_records {
                let message = format!(
                    "expected at least {} new records, saw {}",
                    expect.min_new_records, self.summary.new_records
                );
                self.fail(message);
            }
            if expect.auto_end && self.summary.auto_ended == 0 {
                self.fail("expected a session to end at the cycle boundary".to_string());
            }
            if expect.cycle_learned && self.summary.cycle_goal.is_none() {
                self.fail("expected the cycle goal to be learned".to_string());
            }
        }
        self.summary.wall_time_ms = started.elapsed().as_secs_f64() * 1000.0;
        self.summary
    }
}
