//! Session lifecycle phases and the transitions between them.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a session currently sits in its lifecycle.
///
/// `Idle -> Prepared(n) -> Timing(n) -> Prepared(n + 1) | Idle`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    Idle,
    Prepared {
        next_tap: u32,
    },
    Timing {
        lap: u32,
    },
}

impl SessionPhase {
    #[must_use]
    pub const fn is_idle(self) -> bool {
        matches!(self, Self::Idle)
    }

    #[must_use]
    pub const fn is_running(self) -> bool {
        !self.is_idle()
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Prepared { next_tap } => write!(f, "prepared for tap {next_tap}"),
            Self::Timing { lap } => write!(f, "timing tap {lap}"),
        }
    }
}

/// Operations that move a session between phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    StartSession,
    BeginTap,
    CompleteTap,
    Pause,
    Resume,
    EndSession,
}

impl Transition {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StartSession => "start session",
            Self::BeginTap => "begin tap",
            Self::CompleteTap => "complete tap",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::EndSession => "end session",
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
