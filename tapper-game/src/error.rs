//! Engine error types.
use crate::session::{SessionPhase, Transition};
use thiserror::Error;

/// Errors surfaced by engine operations.
///
/// Soft conditions such as blocked plantation actions or an empty rarity draw
/// are reported as outcomes instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("session goal must be at least 1 tap (got {goal})")]
    InvalidGoal { goal: u32 },
    #[error("cannot {op} while {phase}{}", paused_suffix(.paused))]
    IllegalTransition {
        op: Transition,
        phase: SessionPhase,
        paused: bool,
    },
    #[error("catalog unavailable: {0}")]
    CatalogUnavailable(String),
    #[error("progress store unreadable: {0}")]
    Storage(String),
}

const fn paused_suffix(paused: &bool) -> &'static str {
    if *paused { " (paused)" } else { "" }
}

/// Validation failures for a loaded catalog.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CatalogError {
    #[error("catalog parse failed: {0}")]
    Parse(String),
    #[error("loot table must contain at least one entry with positive weight")]
    EmptyLootTable,
    #[error("loot entry {index} has invalid weight {weight}")]
    InvalidWeight { index: usize, weight: f64 },
    #[error("loot entry {index} has coin range {min}..={max}")]
    InvertedCoinRange { index: usize, min: u64, max: u64 },
    #[error("{what} xp exponent must exceed 1.0 (got {exponent:.2})")]
    FlatCurve { what: String, exponent: f64 },
    #[error("{what} xp base must be positive (got {base:.2})")]
    NonPositiveBase { what: String, base: f64 },
    #[error("duplicate {kind} id `{id}`")]
    DuplicateId { kind: &'static str, id: String },
    #[error("loot entry {index} references unknown material `{key}`")]
    UnknownMaterial { index: usize, key: String },
    #[error("daily reward for day {day} is invalid: {detail}")]
    InvalidDailyReward { day: usize, detail: String },
}
