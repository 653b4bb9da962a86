//! Date Range
//!
//! Inclusive time window used by progress history queries. Either bound may
//! be open.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
}

impl DateRange {
    /// `None` when `from` is after `to`
    pub fn new(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Option<Self> {
        match (from, to) {
            (Some(f), Some(t)) if f > t => None,
            _ => Some(Self { from, to }),
        }
    }

    /// Unbounded on both sides
    pub const fn all() -> Self {
        Self {
            from: None,
            to: None,
        }
    }

    #[inline]
    pub fn from(&self) -> Option<DateTime<Utc>> {
        self.from
    }

    #[inline]
    pub fn to(&self) -> Option<DateTime<Utc>> {
        self.to
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from.is_none_or(|f| at >= f) && self.to.is_none_or(|t| at <= t)
    }
}
