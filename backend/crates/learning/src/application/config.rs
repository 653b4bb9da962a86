//! Application Configuration
//!
//! Configuration for the learning application layer.

use std::time::Duration;

/// Learning application configuration
#[derive(Debug, Clone)]
pub struct LearningConfig {
    /// Validity of newly issued certificates (`None` = never expire)
    pub certificate_validity: Option<Duration>,
    /// Issuance attempts before a certificate-number collision is surfaced
    pub issue_max_attempts: u32,
    /// Minimum quiz score (percent) that counts as passed
    pub quiz_passing_percentage: f64,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            certificate_validity: None,
            issue_max_attempts: 3,
            quiz_passing_percentage: 70.0,
        }
    }
}

impl LearningConfig {
    /// Create config for development (certificates valid for one year)
    pub fn development() -> Self {
        Self {
            certificate_validity: Some(Duration::from_secs(365 * 24 * 3600)),
            ..Default::default()
        }
    }

    /// Validity as a chrono duration for timestamp arithmetic
    ///
    /// Durations too large for chrono are treated as no expiry.
    pub fn certificate_validity_chrono(&self) -> Option<chrono::Duration> {
        self.certificate_validity
            .and_then(|d| chrono::Duration::from_std(d).ok())
    }

    /// At least one issuance attempt is always made
    pub fn issue_attempts(&self) -> u32 {
        self.issue_max_attempts.max(1)
    }
}
