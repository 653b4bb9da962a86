//! Snapshot Milestone
//!
//! Threshold markers recorded in the progress history. Percentage
//! thresholds (25/50/75) are snapshotted when crossed upward by an update;
//! `Completed` is recorded by the completion use case and `Manual` on demand.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Milestone {
    Quarter,
    Half,
    ThreeQuarters,
    Completed,
    Manual,
}

impl Milestone {
    /// Percentage milestones that updates can cross, ascending
    pub const THRESHOLDS: [Milestone; 3] = [Self::Quarter, Self::Half, Self::ThreeQuarters];

    #[inline]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Quarter => "quarter",
            Self::Half => "half",
            Self::ThreeQuarters => "three_quarters",
            Self::Completed => "completed",
            Self::Manual => "manual",
        }
    }

    #[inline]
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "quarter" => Some(Self::Quarter),
            "half" => Some(Self::Half),
            "three_quarters" => Some(Self::ThreeQuarters),
            "completed" => Some(Self::Completed),
            "manual" => Some(Self::Manual),
            _ => None,
        }
    }

    /// Percentage at which the milestone is reached (`None` for `Manual`)
    #[inline]
    pub const fn threshold(&self) -> Option<f64> {
        match self {
            Self::Quarter => Some(25.0),
            Self::Half => Some(50.0),
            Self::ThreeQuarters => Some(75.0),
            Self::Completed => Some(100.0),
            Self::Manual => None,
        }
    }

    /// Threshold milestones crossed going from `previous` to `current` percent
    ///
    /// A threshold counts as crossed when `previous < t <= current`. Moving
    /// down (or staying put) crosses nothing.
    pub fn crossed(previous: f64, current: f64) -> Vec<Milestone> {
        Self::THRESHOLDS
            .into_iter()
            .filter(|m| {
                m.threshold()
                    .is_some_and(|t| previous < t && t <= current)
            })
            .collect()
    }
}

impl fmt::Display for Milestone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
