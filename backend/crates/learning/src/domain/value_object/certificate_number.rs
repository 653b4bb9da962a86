//! Certificate Number Value Object
//!
//! Human-facing certificate identifier, derived (never user supplied):
//!
//! ```text
//! CERT-<first 16 hex chars of SHA-256("{tenant8}-{user8}-{course8}-{unix_seconds}")>
//! ```
//!
//! where `tenant8`, `user8` and `course8` are the first eight characters of
//! the hyphenated UUID text. Derivation is pure: the same inputs always give
//! the same number, and the issuance timestamp is the only varying input.

use chrono::{DateTime, Utc};
use kernel::id::{CourseId, TenantId, UserId};
use platform::crypto::sha256_hex_prefix;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CertificateNumber(String);

impl CertificateNumber {
    pub const PREFIX: &'static str = "CERT-";
    pub const DIGEST_LEN: usize = 16;

    /// Derive the number for a (tenant, user, course) triple issued at `issued_at`
    pub fn derive(
        tenant_id: TenantId,
        user_id: UserId,
        course_id: CourseId,
        issued_at: DateTime<Utc>,
    ) -> Self {
        let seed = format!(
            "{}-{}-{}-{}",
            tenant_id.prefix(),
            user_id.prefix(),
            course_id.prefix(),
            issued_at.timestamp()
        );
        let digest = sha256_hex_prefix(seed.as_bytes(), Self::DIGEST_LEN);
        Self(format!("{}{}", Self::PREFIX, digest))
    }

    /// Parse a number supplied by a verifier
    ///
    /// Accepts only the derived shape: prefix plus 16 lower-case hex chars.
    pub fn parse(value: &str) -> Option<Self> {
        let digest = value.strip_prefix(Self::PREFIX)?;
        let well_formed = digest.len() == Self::DIGEST_LEN
            && digest
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        well_formed.then(|| Self(value.to_owned()))
    }

    /// Rehydrate from storage without re-validating
    #[inline]
    pub(crate) fn from_stored(value: String) -> Self {
        Self(value)
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for CertificateNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CertificateNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn ids() -> (TenantId, UserId, CourseId) {
        (
            TenantId::from_uuid(Uuid::parse_str("11111111-2222-4333-8444-555555555555").unwrap()),
            UserId::from_uuid(Uuid::parse_str("aaaaaaaa-bbbb-4ccc-8ddd-eeeeeeeeeeee").unwrap()),
            CourseId::from_uuid(Uuid::parse_str("12345678-9abc-4def-8123-456789abcdef").unwrap()),
        )
    }

    #[test]
    fn test_derive_matches_manual_digest() {
        let (tenant, user, course) = ids();
        let at = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();

        let number = CertificateNumber::derive(tenant, user, course, at);

        let seed = format!("11111111-aaaaaaaa-12345678-{}", at.timestamp());
        let expected = format!("CERT-{}", &platform::crypto::sha256_hex(seed.as_bytes())[..16]);
        assert_eq!(number.as_str(), expected);
        assert_eq!(number.as_str().len(), 5 + 16);
    }

    #[test]
    fn test_derive_is_pure() {
        let (tenant, user, course) = ids();
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        assert_eq!(
            CertificateNumber::derive(tenant, user, course, at),
            CertificateNumber::derive(tenant, user, course, at)
        );
    }

    #[test]
    fn test_distinct_triples_same_instant() {
        let (tenant, user, course) = ids();
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let other_user = UserId::new();

        assert_ne!(
            CertificateNumber::derive(tenant, user, course, at),
            CertificateNumber::derive(tenant, other_user, course, at)
        );
    }

    #[test]
    fn test_timestamp_changes_number() {
        let (tenant, user, course) = ids();
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        assert_ne!(
            CertificateNumber::derive(tenant, user, course, at),
            CertificateNumber::derive(tenant, user, course, at + chrono::Duration::seconds(1))
        );
    }

    #[test]
    fn test_parse() {
        let (tenant, user, course) = ids();
        let number = CertificateNumber::derive(tenant, user, course, Utc::now());
        assert_eq!(CertificateNumber::parse(number.as_str()), Some(number));

        assert!(CertificateNumber::parse("CERT-0123").is_none());
        assert!(CertificateNumber::parse("CERT-0123456789ABCDEF").is_none());
        assert!(CertificateNumber::parse("cert-0123456789abcdef").is_none());
        assert!(CertificateNumber::parse("CERT-0123456789abcdef").is_some());
    }
}
