//! Bounded log of completed sessions.
use crate::analysis::PacingAnalysis;
use crate::clock::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// One committed session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub date: Timestamp,
    pub tapped: u32,
    pub total: Duration,
    pub average: Duration,
    #[serde(default)]
    pub lap_durations: Vec<Duration>,
    #[serde(default)]
    pub insight: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pacing: Option<PacingAnalysis>,
}

/// Session records, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct SessionHistory(VecDeque<SessionRecord>);

impl SessionHistory {
    /// Append a record, evicting the oldest entries beyond `capacity`.
    pub fn push(&mut self, record: SessionRecord, capacity: usize) {
        self.0.push_back(record);
        while self.0.len() > capacity.max(1) {
            self.0.pop_front();
        }
    }

    /// Up to `n` most recent records, oldest first.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &SessionRecord> {
        self.0.iter().skip(self.0.len().saturating_sub(n))
    }

    #[must_use]
    pub fn last(&self) -> Option<&SessionRecord> {
        self.0.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SessionRecord> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
