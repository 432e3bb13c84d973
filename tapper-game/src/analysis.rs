//! Session analysis and coaching: pacing, consistency insight, coached
//! goals, tap suggestions and daily streaks.
use crate::catalog::Balance;
use crate::history::SessionHistory;
use crate::numbers::{round_f64_to_u32, round_to_hundredths, u64_to_f64, usize_to_f64};
use crate::progression::ProgressionState;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

const PACING_MIN_LAPS: usize = 10;
const COACHED_GOAL_MIN_TAPS: u32 = 10;
const SUGGESTION_MIN_SESSIONS: usize = 3;
const SUGGESTION_LOOKBACK: usize = 7;
const SUGGESTION_DEFAULT: u32 = 100;
const SUGGESTION_MINIMUM: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PacingTrend {
    Steady,
    Fading,
    Accelerating,
    Mixed,
}

/// First-half versus second-half lap comparison.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PacingAnalysis {
    pub trend: PacingTrend,
    pub first_half_avg_secs: f64,
    pub second_half_avg_secs: f64,
    pub percent_change: f64,
}

fn mean_secs(laps: &[Duration]) -> f64 {
    if laps.is_empty() {
        return 0.0;
    }
    laps.iter().map(Duration::as_secs_f64).sum::<f64>() / usize_to_f64(laps.len())
}

/// Compare the first half (rounded up) of a lap sequence with the rest.
/// Needs at least ten laps.
#[must_use]
pub fn pacing_analysis(laps: &[Duration]) -> Option<PacingAnalysis> {
    if laps.len() < PACING_MIN_LAPS {
        return None;
    }
    let (first, second) = laps.split_at(laps.len().div_ceil(2));
    let first_half_avg_secs = mean_secs(first);
    let second_half_avg_secs = mean_secs(second);
    let percent_change = if first_half_avg_secs > 0.0 {
        (second_half_avg_secs - first_half_avg_secs) / first_half_avg_secs * 100.0
    } else {
        0.0
    };
    let trend = if percent_change.abs() < 3.0 {
        PacingTrend::Steady
    } else if percent_change > 10.0 {
        PacingTrend::Fading
    } else if percent_change < -10.0 {
        PacingTrend::Accelerating
    } else {
        PacingTrend::Mixed
    };
    Some(PacingAnalysis {
        trend,
        first_half_avg_secs,
        second_half_avg_secs,
        percent_change,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Consistency {
    Excellent,
    Steady,
    Uneven,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryComparison {
    Faster { previous_avg_secs: f64 },
    Slower { previous_avg_secs: f64 },
}

/// Post-session consistency and trend assessment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionInsight {
    NotEnoughData,
    Assessed {
        consistency: Consistency,
        versus_history: Option<HistoryComparison>,
    },
}

impl fmt::Display for SessionInsight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self::Assessed {
            consistency,
            versus_history,
        } = self
        else {
            return f.write_str("Not enough data to analyse this session yet.");
        };
        match versus_history {
            Some(HistoryComparison::Faster { previous_avg_secs }) => write!(
                f,
                "Faster than your recent average ({previous_avg_secs:.2}s per tap). "
            )?,
            Some(HistoryComparison::Slower { previous_avg_secs }) => write!(
                f,
                "A little slower than your recent average ({previous_avg_secs:.2}s per tap). "
            )?,
            None => {}
        }
        f.write_str(match consistency {
            Consistency::Excellent => "Excellent, very consistent pace.",
            Consistency::Steady => "Fairly steady pace.",
            Consistency::Uneven => "Pace varied a lot between taps.",
        })
    }
}

/// Assess a finished session against the laps' spread and the earlier history.
/// `previous` must not yet contain the session being assessed.
#[must_use]
pub fn session_insight(
    laps: &[Duration],
    average: Duration,
    previous: &SessionHistory,
) -> SessionInsight {
    if laps.len() < 2 {
        return SessionInsight::NotEnoughData;
    }
    let mean = average.as_secs_f64();
    let variance = laps
        .iter()
        .map(|lap| (lap.as_secs_f64() - mean).powi(2))
        .sum::<f64>()
        / usize_to_f64(laps.len());
    let std_dev = variance.sqrt();
    let consistency = if std_dev < mean * 0.15 {
        Consistency::Excellent
    } else if std_dev < mean * 0.3 {
        Consistency::Steady
    } else {
        Consistency::Uneven
    };

    let earlier: Vec<f64> = previous
        .iter()
        .filter(|record| record.tapped > 0)
        .map(|record| record.average.as_secs_f64())
        .collect();
    let versus_history = if earlier.is_empty() {
        None
    } else {
        let previous_avg_secs = earlier.iter().sum::<f64>() / usize_to_f64(earlier.len());
        if mean < previous_avg_secs * 0.95 {
            Some(HistoryComparison::Faster { previous_avg_secs })
        } else if mean > previous_avg_secs * 1.05 {
            Some(HistoryComparison::Slower { previous_avg_secs })
        } else {
            None
        }
    };
    SessionInsight::Assessed {
        consistency,
        versus_history,
    }
}

/// Average-seconds goal derived from the best recent session.
#[must_use]
pub fn coached_goal(history: &SessionHistory, balance: &Balance) -> Option<f64> {
    if history.len() < balance.ai_goal_min_sessions {
        return None;
    }
    let best = history
        .recent(balance.ai_goal_lookback_sessions)
        .filter(|record| record.tapped >= COACHED_GOAL_MIN_TAPS)
        .map(|record| record.average.as_secs_f64())
        .min_by(f64::total_cmp)?;
    let goal = round_to_hundredths(best * balance.ai_goal_percent_improvement)
        .max(balance.ai_goal_min_secs)
        .min(balance.ai_goal_max_secs);
    Some(if goal < 20.0 {
        (goal * 2.0).round() / 2.0
    } else {
        goal.round()
    })
}

fn round_to_tens(value: f64) -> u32 {
    round_f64_to_u32(value / 10.0).saturating_mul(10)
}

/// Suggested tap count for the next session.
#[must_use]
pub fn suggested_tap_goal(cycle_goal: Option<u32>, history: &SessionHistory) -> u32 {
    let suggestion = match cycle_goal {
        Some(goal) if goal > 0 => round_to_tens(u64_to_f64(u64::from(goal))),
        _ if history.len() >= SUGGESTION_MIN_SESSIONS => {
            let recent: Vec<u32> = history
                .recent(SUGGESTION_LOOKBACK)
                .map(|record| record.tapped)
                .collect();
            let total: u64 = recent.iter().map(|tapped| u64::from(*tapped)).sum();
            let average = u64_to_f64(total) / usize_to_f64(recent.len());
            if average > 0.0 {
                round_to_tens(average)
            } else {
                SUGGESTION_DEFAULT
            }
        }
        _ => SUGGESTION_DEFAULT,
    };
    suggestion.max(SUGGESTION_MINIMUM)
}

/// Consecutive days with at least one session, ending today or yesterday.
#[must_use]
pub fn daily_streak(history: &SessionHistory, today: NaiveDate) -> u32 {
    let mut dates: Vec<NaiveDate> = history
        .iter()
        .map(|record| record.date.date_naive())
        .collect();
    dates.sort_unstable_by(|a, b| b.cmp(a));
    dates.dedup();
    let Some(latest) = dates.first().copied() else {
        return 0;
    };
    let yesterday = today.checked_sub_days(Days::new(1));
    let mut expected = if latest >= today {
        today
    } else if Some(latest) == yesterday {
        latest
    } else {
        return 0;
    };
    let mut streak = 0;
    for date in dates {
        if date == expected {
            streak += 1;
            match expected.checked_sub_days(Days::new(1)) {
                Some(previous) => expected = previous,
                None => break,
            }
        } else if date < expected {
            break;
        }
    }
    streak
}

/// Seconds ahead (negative) or behind (positive) a reference pace after the
/// completed laps: the record session's laps when it ran at least as long,
/// otherwise the coached average goal.
#[must_use]
pub fn pacing_delta(
    laps: &[Duration],
    best_sequence: &[Duration],
    goal_average: Option<f64>,
) -> Option<f64> {
    if laps.is_empty() {
        return None;
    }
    let done: f64 = laps.iter().map(Duration::as_secs_f64).sum();
    if best_sequence.len() >= laps.len() {
        let reference: f64 = best_sequence[..laps.len()]
            .iter()
            .map(Duration::as_secs_f64)
            .sum();
        return Some(done - reference);
    }
    goal_average.map(|goal| done - goal * usize_to_f64(laps.len()))
}

/// Coaching message selector; wording is left to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoachTip {
    GoalMet { goal_secs: f64 },
    GoalClose { goal_secs: f64, short_by_secs: f64 },
    GoalSet { goal_secs: f64 },
    RecordSet { average_secs: f64 },
    ChaseRecord { best_secs: f64 },
    Welcome,
}

#[must_use]
pub fn coach_tip(progression: &ProgressionState, history: &SessionHistory) -> CoachTip {
    let last = history.last().map(|record| record.average.as_secs_f64());
    if let Some(goal_secs) = progression.goal_average {
        return match last {
            Some(average) if average <= goal_secs => CoachTip::GoalMet { goal_secs },
            Some(average) => CoachTip::GoalClose {
                goal_secs,
                short_by_secs: round_to_hundredths(average - goal_secs),
            },
            None => CoachTip::GoalSet { goal_secs },
        };
    }
    if let Some(best) = progression.best_average_lap {
        let best_secs = best.as_secs_f64();
        if let Some(average) = last
            && average <= best_secs
        {
            return CoachTip::RecordSet {
                average_secs: average,
            };
        }
        return CoachTip::ChaseRecord { best_secs };
    }
    CoachTip::Welcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::SessionRecord;
    use chrono::{NaiveTime, TimeZone, Utc};

    fn secs(values: &[f64]) -> Vec<Duration> {
        values.iter().map(|v| Duration::from_secs_f64(*v)).collect()
    }

    fn record_on(date: NaiveDate, tapped: u32, average: f64) -> SessionRecord {
        SessionRecord {
            date: Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)),
            tapped,
            total: Duration::from_secs_f64(average * f64::from(tapped)),
            average: Duration::from_secs_f64(average),
            lap_durations: Vec::new(),
            insight: String::new(),
            pacing: None,
        }
    }

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, n).unwrap()
    }

    fn history_of(records: Vec<SessionRecord>) -> SessionHistory {
        let mut history = SessionHistory::default();
        for record in records {
            history.push(record, 30);
        }
        history
    }

    #[test]
    fn pacing_needs_ten_laps() {
        assert!(pacing_analysis(&secs(&[10.0; 9])).is_none());
        let steady = pacing_analysis(&secs(&[10.0; 10])).unwrap();
        assert_eq!(steady.trend, PacingTrend::Steady);
    }

    #[test]
    fn pacing_detects_fading_and_accelerating() {
        let mut laps = vec![10.0; 5];
        laps.extend([12.0; 5]);
        assert_eq!(
            pacing_analysis(&secs(&laps)).unwrap().trend,
            PacingTrend::Fading
        );
        let mut laps = vec![10.0; 5];
        laps.extend([8.0; 5]);
        assert_eq!(
            pacing_analysis(&secs(&laps)).unwrap().trend,
            PacingTrend::Accelerating
        );
        let mut laps = vec![10.0; 5];
        laps.extend([10.5; 5]);
        assert_eq!(
            pacing_analysis(&secs(&laps)).unwrap().trend,
            PacingTrend::Mixed
        );
    }

    #[test]
    fn odd_lap_count_puts_extra_lap_first() {
        let mut laps = vec![10.0; 6];
        laps.extend([20.0; 5]);
        let analysis = pacing_analysis(&secs(&laps)).unwrap();
        assert!((analysis.first_half_avg_secs - 10.0).abs() < 1e-9);
        assert!((analysis.second_half_avg_secs - 20.0).abs() < 1e-9);
    }

    #[test]
    fn insight_grades_consistency() {
        let empty = SessionHistory::default();
        let steady = secs(&[10.0, 10.0, 10.0]);
        assert_eq!(
            session_insight(&steady, Duration::from_secs(10), &empty),
            SessionInsight::Assessed {
                consistency: Consistency::Excellent,
                versus_history: None
            }
        );
        let uneven = secs(&[2.0, 18.0]);
        assert!(matches!(
            session_insight(&uneven, Duration::from_secs(10), &empty),
            SessionInsight::Assessed {
                consistency: Consistency::Uneven,
                ..
            }
        ));
        assert_eq!(
            session_insight(&secs(&[5.0]), Duration::from_secs(5), &empty),
            SessionInsight::NotEnoughData
        );
    }

    #[test]
    fn insight_compares_with_history() {
        let history = history_of(vec![record_on(day(1), 10, 12.0)]);
        let laps = secs(&[10.0, 10.0]);
        let insight = session_insight(&laps, Duration::from_secs(10), &history);
        assert_eq!(
            insight,
            SessionInsight::Assessed {
                consistency: Consistency::Excellent,
                versus_history: Some(HistoryComparison::Faster {
                    previous_avg_secs: 12.0
                })
            }
        );
        assert!(insight.to_string().starts_with("Faster"));
    }

    #[test]
    fn coached_goal_requires_history() {
        let balance = Balance::default();
        let four = history_of((1..=4).map(|d| record_on(day(d), 20, 30.0)).collect());
        assert_eq!(coached_goal(&four, &balance), None);
        let five = history_of((1..=5).map(|d| record_on(day(d), 20, 30.0)).collect());
        // 30 * 0.98 = 29.4 -> 29
        assert_eq!(coached_goal(&five, &balance), Some(29.0));
    }

    #[test]
    fn coached_goal_rounds_to_half_below_twenty_and_clamps() {
        let balance = Balance::default();
        let fast = history_of((1..=5).map(|d| record_on(day(d), 20, 17.0)).collect());
        // 17 * 0.98 = 16.66 -> 16.5
        assert_eq!(coached_goal(&fast, &balance), Some(16.5));
        let blazing = history_of((1..=5).map(|d| record_on(day(d), 20, 5.0)).collect());
        assert_eq!(coached_goal(&blazing, &balance), Some(15.0));
        let short = history_of((1..=5).map(|d| record_on(day(d), 9, 30.0)).collect());
        assert_eq!(coached_goal(&short, &balance), None);
    }

    #[test]
    fn tap_suggestion_prefers_cycle_goal() {
        let history = history_of((1..=3).map(|d| record_on(day(d), 123, 10.0)).collect());
        assert_eq!(suggested_tap_goal(Some(347), &history), 350);
        assert_eq!(suggested_tap_goal(None, &history), 120);
        assert_eq!(suggested_tap_goal(None, &SessionHistory::default()), 100);
        assert_eq!(suggested_tap_goal(Some(12), &history), 50);
    }

    #[test]
    fn streak_counts_consecutive_days() {
        let history = history_of(vec![
            record_on(day(1), 5, 10.0),
            record_on(day(3), 5, 10.0),
            record_on(day(4), 5, 10.0),
            record_on(day(4), 5, 10.0),
            record_on(day(5), 5, 10.0),
        ]);
        assert_eq!(daily_streak(&history, day(5)), 3);
        assert_eq!(daily_streak(&history, day(6)), 3);
        assert_eq!(daily_streak(&history, day(7)), 0);
        assert_eq!(daily_streak(&SessionHistory::default(), day(7)), 0);
    }

    #[test]
    fn pacing_delta_prefers_record_laps() {
        let laps = secs(&[10.0, 12.0]);
        let best = secs(&[9.0, 10.0, 11.0]);
        assert_eq!(pacing_delta(&laps, &best, Some(5.0)), Some(3.0));
        assert_eq!(pacing_delta(&laps, &best[..1], Some(12.0)), Some(-2.0));
        assert_eq!(pacing_delta(&laps, &[], None), None);
        assert_eq!(pacing_delta(&[], &best, Some(5.0)), None);
    }

    #[test]
    fn coach_tip_follows_goal_then_record() {
        let history = history_of(vec![record_on(day(1), 10, 12.0)]);
        let mut progression = ProgressionState::default();
        assert_eq!(
            coach_tip(&progression, &SessionHistory::default()),
            CoachTip::Welcome
        );
        progression.best_average_lap = Some(Duration::from_secs(12));
        assert_eq!(
            coach_tip(&progression, &history),
            CoachTip::RecordSet { average_secs: 12.0 }
        );
        progression.goal_average = Some(11.5);
        assert_eq!(
            coach_tip(&progression, &history),
            CoachTip::GoalClose {
                goal_secs: 11.5,
                short_by_secs: 0.5
            }
        );
    }
}
