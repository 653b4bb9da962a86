//! Verification Code Value Object
//!
//! SHA-256 over the certificate's immutable identity fields, fixed when the
//! certificate is created and never recomputed:
//!
//! ```text
//! hex(SHA-256("{certificate_id}:{user_id}:{course_id}:{certificate_number}:{issued_at}"))
//! ```
//!
//! `issued_at` is rendered as RFC 3339 at second precision with a `Z` suffix.

use chrono::{DateTime, SecondsFormat, Utc};
use kernel::id::{CertificateId, CourseId, UserId};
use platform::crypto::sha256_hex;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::certificate_number::CertificateNumber;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VerificationCode(String);

impl VerificationCode {
    pub fn derive(
        certificate_id: CertificateId,
        user_id: UserId,
        course_id: CourseId,
        number: &CertificateNumber,
        issued_at: DateTime<Utc>,
    ) -> Self {
        let payload = format!(
            "{}:{}:{}:{}:{}",
            certificate_id,
            user_id,
            course_id,
            number,
            issued_at.to_rfc3339_opts(SecondsFormat::Secs, true)
        );
        Self(sha256_hex(payload.as_bytes()))
    }

    /// Plain string comparison against a presented code
    #[inline]
    pub fn matches(&self, presented: &str) -> bool {
        self.0 == presented
    }

    #[inline]
    pub(crate) fn from_stored(value: String) -> Self {
        Self(value)
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VerificationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_payload_format() {
        let cert_id = CertificateId::new();
        let user_id = UserId::new();
        let course_id = CourseId::new();
        let number = CertificateNumber::parse("CERT-0123456789abcdef").unwrap();
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 8, 7, 6).unwrap();

        let code = VerificationCode::derive(cert_id, user_id, course_id, &number, at);

        let payload = format!(
            "{}:{}:{}:CERT-0123456789abcdef:2024-03-09T08:07:06Z",
            cert_id, user_id, course_id
        );
        assert_eq!(code.as_str(), sha256_hex(payload.as_bytes()));
        assert_eq!(code.as_str().len(), 64);
    }

    #[test]
    fn test_matches_is_exact() {
        let number = CertificateNumber::parse("CERT-0123456789abcdef").unwrap();
        let code = VerificationCode::derive(
            CertificateId::new(),
            UserId::new(),
            CourseId::new(),
            &number,
            Utc::now(),
        );
        assert!(code.matches(code.as_str()));
        assert!(!code.matches(&code.as_str().to_uppercase()));
        assert!(!code.matches(""));
    }
}
