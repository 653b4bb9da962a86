//! Certificate Grade

use serde::{Deserialize, Serialize};

/// Final grade attached to a certificate, a percentage in `0..=100`
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Grade(f64);

impl Grade {
    pub const MIN: f64 = 0.0;
    pub const MAX: f64 = 100.0;

    /// `None` when outside `0..=100` or not a finite number
    pub fn new(value: f64) -> Option<Self> {
        (value.is_finite() && (Self::MIN..=Self::MAX).contains(&value)).then_some(Self(value))
    }

    #[inline]
    pub fn value(&self) -> f64 {
        self.0
    }
}
