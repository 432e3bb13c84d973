//! Achievements and daily missions.
use crate::catalog::GameCatalog;
use crate::history::SessionHistory;
use crate::numbers::{ceil_f64_to_u64, round_to_hundredths, u64_to_f64, usize_to_f64};
use crate::progression::ProgressionState;
use chrono::NaiveDate;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Figures a finished session is judged by.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct SessionStats {
    pub tapped: u32,
    pub average_secs: f64,
    pub total_minutes: f64,
    pub lifetime_taps: u64,
    pub rare_objects_owned: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AchievementCondition {
    LifetimeTaps { target: u64 },
    AverageUnder { seconds: f64 },
    SessionTaps { target: u32 },
}

impl AchievementCondition {
    #[must_use]
    pub fn is_met(&self, stats: &SessionStats) -> bool {
        match *self {
            Self::LifetimeTaps { target } => stats.lifetime_taps >= target,
            Self::AverageUnder { seconds } => stats.tapped > 0 && stats.average_secs < seconds,
            Self::SessionTaps { target } => stats.tapped >= target,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementDef {
    pub id: String,
    pub title: String,
    pub condition: AchievementCondition,
    #[serde(default)]
    pub coin_reward: u64,
}

/// Ids of unlocked achievements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct AchievementLedger(BTreeSet<String>);

impl AchievementLedger {
    #[must_use]
    pub fn is_unlocked(&self, id: &str) -> bool {
        self.0.contains(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Unlock every achievement whose condition now holds. Each unlocks once.
    pub fn evaluate<'a>(
        &mut self,
        catalog: &'a GameCatalog,
        stats: &SessionStats,
    ) -> Vec<&'a AchievementDef> {
        let mut unlocked = Vec::new();
        for def in &catalog.achievements {
            if self.is_unlocked(&def.id) || !def.condition.is_met(stats) {
                continue;
            }
            self.0.insert(def.id.clone());
            log::info!("achievement unlocked: {}", def.id);
            unlocked.push(def);
        }
        unlocked
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    More,
    Less,
}

impl Comparison {
    #[must_use]
    pub fn satisfied(self, value: f64, target: f64) -> bool {
        match self {
            Self::More => value >= target,
            Self::Less => value < target,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionKind {
    Session,
    Cumulative,
    Action,
}

/// What a mission measures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MissionMetric {
    SessionTaps,
    SessionAverage,
    BeatLastAverage,
    SessionMinutes,
    RareObjectsOwned,
    Action { key: String },
}

impl MissionMetric {
    #[must_use]
    pub const fn comparison(&self) -> Comparison {
        match self {
            Self::SessionAverage | Self::BeatLastAverage => Comparison::Less,
            Self::SessionTaps
            | Self::SessionMinutes
            | Self::RareObjectsOwned
            | Self::Action { .. } => Comparison::More,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> MissionKind {
        match self {
            Self::SessionTaps
            | Self::SessionAverage
            | Self::BeatLastAverage
            | Self::SessionMinutes => MissionKind::Session,
            Self::RareObjectsOwned => MissionKind::Cumulative,
            Self::Action { .. } => MissionKind::Action,
        }
    }

    fn value(&self, stats: &SessionStats) -> Option<f64> {
        match self {
            Self::SessionTaps => Some(u64_to_f64(u64::from(stats.tapped))),
            Self::SessionAverage | Self::BeatLastAverage => Some(stats.average_secs),
            Self::SessionMinutes => Some(stats.total_minutes),
            Self::RareObjectsOwned => Some(usize_to_f64(stats.rare_objects_owned)),
            Self::Action { .. } => None,
        }
    }
}

/// Catalog entry daily missions are drawn from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionTemplate {
    pub id: String,
    pub metric: MissionMetric,
    pub reward: u64,
    /// Fixed target; personalised from history when absent.
    #[serde(default)]
    pub target: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveMission {
    pub template_id: String,
    pub metric: MissionMetric,
    pub target: f64,
    pub reward: u64,
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub completed: bool,
}

impl ActiveMission {
    fn observe(&mut self, value: f64) -> Option<MissionCompletion> {
        if self.completed {
            return None;
        }
        if self.metric.comparison().satisfied(value, self.target) {
            self.completed = true;
            self.progress = self.target;
            log::info!("mission completed: {}", self.template_id);
            Some(MissionCompletion {
                id: self.template_id.clone(),
                reward: self.reward,
            })
        } else {
            self.progress = value.min(self.target);
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionCompletion {
    pub id: String,
    pub reward: u64,
}

/// Target for a template, derived from the player's recent sessions.
#[must_use]
pub fn personalised_target(
    template: &MissionTemplate,
    history: &SessionHistory,
    progression: &ProgressionState,
) -> f64 {
    if let Some(target) = template.target {
        return target;
    }
    let recent: Vec<_> = history.recent(5).collect();
    let count = usize_to_f64(recent.len());
    match &template.metric {
        MissionMetric::SessionTaps => {
            if recent.is_empty() {
                return 100.0;
            }
            let average = recent
                .iter()
                .map(|record| u64_to_f64(u64::from(record.tapped)))
                .sum::<f64>()
                / count;
            let target = u64_to_f64(ceil_f64_to_u64(average / 10.0) * 10);
            if target > 0.0 { target.max(50.0) } else { 100.0 }
        }
        MissionMetric::SessionAverage => progression
            .best_average_lap
            .map_or(40.0, |best| round_to_hundredths(best.as_secs_f64() * 0.9))
            .max(20.0),
        MissionMetric::BeatLastAverage => history
            .last()
            .map_or(45.0, |last| {
                round_to_hundredths(last.average.as_secs_f64() * 0.95)
            })
            .max(20.0),
        MissionMetric::SessionMinutes => {
            if recent.is_empty() {
                return 30.0;
            }
            let minutes = recent
                .iter()
                .map(|record| record.total.as_secs_f64() / 60.0)
                .sum::<f64>()
                / count;
            (u64_to_f64(ceil_f64_to_u64(minutes)) + 5.0).max(10.0)
        }
        MissionMetric::RareObjectsOwned => 2.0,
        MissionMetric::Action { .. } => 1.0,
    }
}

/// Today's missions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MissionBoard {
    #[serde(default)]
    pub generated_on: Option<NaiveDate>,
    #[serde(default)]
    pub missions: Vec<ActiveMission>,
}

impl MissionBoard {
    #[must_use]
    pub fn needs_refresh(&self, today: NaiveDate) -> bool {
        self.generated_on != Some(today) || self.missions.is_empty()
    }

    /// Replace the board with distinct templates drawn at random.
    pub fn generate<R: Rng + ?Sized>(
        &mut self,
        catalog: &GameCatalog,
        history: &SessionHistory,
        progression: &ProgressionState,
        today: NaiveDate,
        rng: &mut R,
    ) {
        self.missions = catalog
            .mission_templates
            .choose_multiple(rng, catalog.balance.daily_mission_count)
            .map(|template| ActiveMission {
                template_id: template.id.clone(),
                metric: template.metric.clone(),
                target: personalised_target(template, history, progression),
                reward: template.reward,
                progress: 0.0,
                completed: false,
            })
            .collect();
        self.generated_on = Some(today);
        log::debug!("generated {} missions for {today}", self.missions.len());
    }

    /// Check session and cumulative missions against a finished session.
    pub fn evaluate_session(&mut self, stats: &SessionStats) -> Vec<MissionCompletion> {
        self.missions
            .iter_mut()
            .filter_map(|mission| {
                let value = mission.metric.value(stats)?;
                mission.observe(value)
            })
            .collect()
    }

    /// Advance action missions keyed by `key`.
    pub fn record_action(&mut self, key: &str) -> Vec<MissionCompletion> {
        self.missions
            .iter_mut()
            .filter(|mission| {
                matches!(&mission.metric, MissionMetric::Action { key: k } if k == key)
            })
            .filter_map(|mission| {
                let progress = mission.progress + 1.0;
                mission.observe(progress)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::SessionRecord;
    use chrono::DateTime;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::time::Duration;

    fn template(id: &str, metric: MissionMetric) -> MissionTemplate {
        MissionTemplate {
            id: id.to_string(),
            metric,
            reward: 50,
            target: None,
        }
    }

    fn record(tapped: u32, average: f64) -> SessionRecord {
        SessionRecord {
            date: DateTime::UNIX_EPOCH,
            tapped,
            total: Duration::from_secs_f64(average * f64::from(tapped)),
            average: Duration::from_secs_f64(average),
            lap_durations: Vec::new(),
            insight: String::new(),
            pacing: None,
        }
    }

    #[test]
    fn achievements_unlock_once() {
        let catalog = GameCatalog::bundled().unwrap();
        let mut ledger = AchievementLedger::default();
        let stats = SessionStats {
            tapped: 600,
            average_secs: 25.0,
            total_minutes: 250.0,
            lifetime_taps: 1200,
            rare_objects_owned: 0,
        };
        let first = ledger.evaluate(&catalog, &stats);
        assert!(!first.is_empty());
        assert!(ledger.evaluate(&catalog, &stats).is_empty());
        assert!(first.iter().all(|def| ledger.is_unlocked(&def.id)));
    }

    #[test]
    fn average_condition_is_strict() {
        let condition = AchievementCondition::AverageUnder { seconds: 30.0 };
        let mut stats = SessionStats {
            tapped: 10,
            average_secs: 30.0,
            ..SessionStats::default()
        };
        assert!(!condition.is_met(&stats));
        stats.average_secs = 29.9;
        assert!(condition.is_met(&stats));
    }

    #[test]
    fn targets_personalise_from_history() {
        let mut history = SessionHistory::default();
        for tapped in [120, 130, 141] {
            history.push(record(tapped, 30.0), 30);
        }
        let progression = ProgressionState {
            best_average_lap: Some(Duration::from_secs(30)),
            ..ProgressionState::default()
        };
        let taps = template("tap_x_trees", MissionMetric::SessionTaps);
        // avg 130.33 -> ceil(13.03) * 10
        assert!((personalised_target(&taps, &history, &progression) - 140.0).abs() < 1e-9);
        let avg = template("avg_time_under_x", MissionMetric::SessionAverage);
        assert!((personalised_target(&avg, &history, &progression) - 27.0).abs() < 1e-9);
        let beat = template("beat_last_avg", MissionMetric::BeatLastAverage);
        assert!((personalised_target(&beat, &history, &progression) - 28.5).abs() < 1e-9);
        let rare = template("own_rare", MissionMetric::RareObjectsOwned);
        assert!((personalised_target(&rare, &history, &progression) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn targets_default_without_history() {
        let history = SessionHistory::default();
        let progression = ProgressionState::default();
        let cases = [
            (MissionMetric::SessionTaps, 100.0),
            (MissionMetric::SessionAverage, 40.0),
            (MissionMetric::BeatLastAverage, 45.0),
            (MissionMetric::SessionMinutes, 30.0),
        ];
        for (metric, expected) in cases {
            let target = personalised_target(&template("t", metric), &history, &progression);
            assert!((target - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn generation_picks_distinct_templates() {
        let catalog = GameCatalog::bundled().unwrap();
        let mut board = MissionBoard::default();
        let today = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert!(board.needs_refresh(today));
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        board.generate(
            &catalog,
            &SessionHistory::default(),
            &ProgressionState::default(),
            today,
            &mut rng,
        );
        assert_eq!(board.missions.len(), 3);
        let ids: BTreeSet<_> = board.missions.iter().map(|m| m.template_id.as_str()).collect();
        assert_eq!(ids.len(), 3);
        assert!(!board.needs_refresh(today));
        assert!(board.needs_refresh(today.succ_opt().unwrap()));
    }

    #[test]
    fn session_missions_compare_by_direction() {
        let mut board = MissionBoard {
            generated_on: None,
            missions: vec![
                ActiveMission {
                    template_id: "taps".into(),
                    metric: MissionMetric::SessionTaps,
                    target: 100.0,
                    reward: 50,
                    progress: 0.0,
                    completed: false,
                },
                ActiveMission {
                    template_id: "fast".into(),
                    metric: MissionMetric::SessionAverage,
                    target: 20.0,
                    reward: 75,
                    progress: 0.0,
                    completed: false,
                },
            ],
        };
        let stats = SessionStats {
            tapped: 60,
            average_secs: 19.0,
            total_minutes: 19.0,
            ..SessionStats::default()
        };
        let done = board.evaluate_session(&stats);
        assert_eq!(
            done,
            vec![MissionCompletion {
                id: "fast".into(),
                reward: 75
            }]
        );
        assert!((board.missions[0].progress - 60.0).abs() < 1e-9);
        assert!(board.evaluate_session(&stats).is_empty());
    }

    #[test]
    fn action_missions_count_occurrences() {
        let mut board = MissionBoard {
            generated_on: None,
            missions: vec![ActiveMission {
                template_id: "upgrade_twice".into(),
                metric: MissionMetric::Action {
                    key: "object_upgraded".into(),
                },
                target: 2.0,
                reward: 40,
                progress: 0.0,
                completed: false,
            }],
        };
        assert!(board.evaluate_session(&SessionStats::default()).is_empty());
        assert!(board.record_action("object_planted").is_empty());
        assert!(board.record_action("object_upgraded").is_empty());
        assert_eq!(board.record_action("object_upgraded").len(), 1);
        assert!(board.missions[0].completed);
        assert!(board.record_action("object_upgraded").is_empty());
    }

    #[test]
    fn fractional_progress_reloads_exactly() {
        let board = MissionBoard {
            generated_on: NaiveDate::from_ymd_opt(2024, 5, 1),
            missions: vec![ActiveMission {
                template_id: "minutes".into(),
                metric: MissionMetric::SessionMinutes,
                target: 30.0,
                reward: 60,
                progress: 7.0 / 60.0,
                completed: false,
            }],
        };
        let json = serde_json::to_string(&board).unwrap();
        let back: MissionBoard = serde_json::from_str(&json).unwrap();
        assert_eq!(back.missions[0].progress.to_bits(), (7.0_f64 / 60.0).to_bits());
        assert_eq!(back, board);
    }
}
