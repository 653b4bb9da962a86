//! Certificate Status Value Object

use serde::{Deserialize, Serialize};
use std::fmt;

/// Certificate status
///
/// Status changes never touch the verification code; a revoked or expired
/// certificate still matches its code but no longer validates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertificateStatus {
    #[default]
    Issued,
    Revoked,
    Expired,
}

impl CertificateStatus {
    #[inline]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Issued => "issued",
            Self::Revoked => "revoked",
            Self::Expired => "expired",
        }
    }

    #[inline]
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "issued" => Some(Self::Issued),
            "revoked" => Some(Self::Revoked),
            "expired" => Some(Self::Expired),
            _ => None,
        }
    }
}

impl fmt::Display for CertificateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
