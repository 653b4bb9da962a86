//! Progress Status Value Object
//!
//! Lifecycle of a course progress record:
//! `not_started → in_progress → completed`, with an admin reset back to
//! `not_started` as the only way out of `completed`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Course progress status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    /// Enrolled, no recorded activity yet
    #[default]
    NotStarted,

    /// At least one lesson or quiz activity recorded
    InProgress,

    /// Every lesson and quiz completed
    Completed,
}

impl ProgressStatus {
    pub const ALL: [ProgressStatus; 3] = [Self::NotStarted, Self::InProgress, Self::Completed];

    /// Get string code for storage and API
    #[inline]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }

    /// Create from string code
    #[inline]
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "not_started" => Some(Self::NotStarted),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }

    /// Completed records only change through an admin reset
    #[inline]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }

    #[inline]
    pub const fn is_started(&self) -> bool {
        !matches!(self, Self::NotStarted)
    }
}

impl fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
