//! Certificate Entity
//!
//! Issued once when a course progress record becomes completed. Never
//! physically deleted: revocation and expiry only change `status`, and the
//! verification code stays whatever it was at creation.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use kernel::id::{
    CertificateId, CourseId, EnrollmentId, ProgressId, TemplateId, TenantId, UserId,
};
use serde_json::{Map, Value};

use crate::domain::entity::course_progress::CourseProgress;
use crate::domain::value_object::{
    certificate_number::CertificateNumber, certificate_status::CertificateStatus, grade::Grade,
    verification_code::VerificationCode,
};
use crate::error::{CertificateError, CertificateResult};

/// Maximum accepted length of a revocation reason
pub const MAX_REVOCATION_REASON_LEN: usize = 1000;

/// Who and what a certificate is issued for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CertificateSubject {
    pub tenant_id: TenantId,
    pub user_id: UserId,
    pub course_id: CourseId,
    pub enrollment_id: EnrollmentId,
    pub progress_id: ProgressId,
}

impl From<&CourseProgress> for CertificateSubject {
    fn from(progress: &CourseProgress) -> Self {
        Self {
            tenant_id: progress.tenant_id,
            user_id: progress.user_id,
            course_id: progress.course_id,
            enrollment_id: progress.enrollment_id,
            progress_id: progress.id,
        }
    }
}

/// Certificate entity
#[derive(Debug, Clone, PartialEq)]
pub struct Certificate {
    pub id: CertificateId,
    pub tenant_id: TenantId,
    pub user_id: UserId,
    pub course_id: CourseId,
    pub enrollment_id: EnrollmentId,
    pub progress_id: ProgressId,
    pub template_id: Option<TemplateId>,
    pub certificate_number: CertificateNumber,
    pub verification_code: VerificationCode,
    pub status: CertificateStatus,
    pub issued_at: DateTime<Utc>,
    pub completion_date: DateTime<Utc>,
    /// Minutes spent on the course at completion
    pub total_time_spent: u32,
    pub expires_at: Option<DateTime<Utc>>,
    pub grade: Option<Grade>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revoked_by: Option<UserId>,
    pub revocation_reason: Option<String>,
    pub metadata: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Certificate {
    /// Issue a new certificate
    ///
    /// `issued_at` is truncated to whole seconds so the stored timestamp
    /// reproduces the verification code payload exactly.
    pub fn issue(
        subject: CertificateSubject,
        completion_date: DateTime<Utc>,
        total_time_spent: u32,
        issued_at: DateTime<Utc>,
        validity: Option<Duration>,
    ) -> Self {
        let issued_at = issued_at.trunc_subsecs(0);
        let id = CertificateId::new();
        let certificate_number = CertificateNumber::derive(
            subject.tenant_id,
            subject.user_id,
            subject.course_id,
            issued_at,
        );
        let verification_code = VerificationCode::derive(
            id,
            subject.user_id,
            subject.course_id,
            &certificate_number,
            issued_at,
        );

        Self {
            id,
            tenant_id: subject.tenant_id,
            user_id: subject.user_id,
            course_id: subject.course_id,
            enrollment_id: subject.enrollment_id,
            progress_id: subject.progress_id,
            template_id: None,
            certificate_number,
            verification_code,
            status: CertificateStatus::Issued,
            issued_at,
            completion_date,
            total_time_spent,
            expires_at: validity.map(|ttl| issued_at + ttl),
            grade: None,
            revoked_at: None,
            revoked_by: None,
            revocation_reason: None,
            metadata: Map::new(),
            created_at: issued_at,
            updated_at: issued_at,
        }
    }

    /// Compare a presented code with the stored one
    #[inline]
    pub fn verify_code(&self, code: &str) -> bool {
        self.verification_code.matches(code)
    }

    /// Issued and not past its expiration
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.status == CertificateStatus::Issued && self.expires_at.is_none_or(|exp| now < exp)
    }

    #[inline]
    pub fn is_revoked(&self) -> bool {
        self.status == CertificateStatus::Revoked
    }

    /// Revoke the certificate
    ///
    /// The first call wins: revoking an already revoked certificate keeps
    /// the original timestamp, actor and reason and returns `false`.
    pub fn revoke(&mut self, revoked_by: UserId, reason: &str) -> CertificateResult<bool> {
        if self.is_revoked() {
            return Ok(false);
        }
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(CertificateError::InvalidRevocation(
                "reason must not be empty".into(),
            ));
        }
        if reason.chars().count() > MAX_REVOCATION_REASON_LEN {
            return Err(CertificateError::InvalidRevocation(format!(
                "reason must be at most {MAX_REVOCATION_REASON_LEN} characters"
            )));
        }

        let now = Utc::now();
        self.status = CertificateStatus::Revoked;
        self.revoked_at = Some(now);
        self.revoked_by = Some(revoked_by);
        self.revocation_reason = Some(reason.to_owned());
        self.updated_at = now;
        Ok(true)
    }

    fn ensure_not_revoked(&self) -> CertificateResult<()> {
        if self.is_revoked() {
            return Err(CertificateError::CertificateRevoked);
        }
        Ok(())
    }

    /// Set or move the expiration; must fall after `issued_at`
    ///
    /// Moving the expiration of an expired certificate into the future
    /// reinstates it.
    pub fn set_expiration(&mut self, expires_at: DateTime<Utc>) -> CertificateResult<()> {
        self.ensure_not_revoked()?;
        if expires_at <= self.issued_at {
            return Err(CertificateError::InvalidExpiration(
                "expiration must be after the issue date".into(),
            ));
        }

        let now = Utc::now();
        self.expires_at = Some(expires_at);
        if self.status == CertificateStatus::Expired && now < expires_at {
            self.status = CertificateStatus::Issued;
        }
        self.updated_at = now;
        Ok(())
    }

    pub fn set_grade(&mut self, value: f64) -> CertificateResult<()> {
        self.ensure_not_revoked()?;
        let grade = Grade::new(value).ok_or(CertificateError::InvalidGrade(value))?;
        self.grade = Some(grade);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Link a template; callers check the template exists and is active
    pub fn set_template(&mut self, template_id: TemplateId) -> CertificateResult<()> {
        self.ensure_not_revoked()?;
        self.template_id = Some(template_id);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Insert or replace one metadata entry
    pub fn add_metadata(&mut self, key: &str, value: Value) -> CertificateResult<()> {
        self.ensure_not_revoked()?;
        let key = key.trim();
        if key.is_empty() {
            return Err(CertificateError::InvalidMetadata(
                "metadata key must not be empty".into(),
            ));
        }
        self.metadata.insert(key.to_owned(), value);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// `issued → expired` once `expires_at` has passed
    pub fn mark_expired_if_due(&mut self, now: DateTime<Utc>) -> bool {
        let due = self.status == CertificateStatus::Issued
            && self.expires_at.is_some_and(|exp| now >= exp);
        if due {
            self.status = CertificateStatus::Expired;
            self.updated_at = now;
        }
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel::error::category::Categorized;
    use serde_json::json;

    fn subject() -> CertificateSubject {
        CertificateSubject {
            tenant_id: TenantId::new(),
            user_id: UserId::new(),
            course_id: CourseId::new(),
            enrollment_id: EnrollmentId::new(),
            progress_id: ProgressId::new(),
        }
    }

    fn issue() -> Certificate {
        let now = Utc::now();
        Certificate::issue(subject(), now, 90, now, None)
    }

    #[test]
    fn test_issue_derives_identifiers() {
        let cert = issue();
        assert!(cert.certificate_number.as_str().starts_with("CERT-"));
        assert_eq!(cert.verification_code.as_str().len(), 64);
        assert_eq!(cert.status, CertificateStatus::Issued);
        assert_eq!(cert.issued_at.timestamp_subsec_nanos(), 0);

        let expected = VerificationCode::derive(
            cert.id,
            cert.user_id,
            cert.course_id,
            &cert.certificate_number,
            cert.issued_at,
        );
        assert_eq!(cert.verification_code, expected);
    }

    #[test]
    fn test_verify_code_rejects_any_single_char_change() {
        let cert = issue();
        let code = cert.verification_code.as_str().to_owned();
        assert!(cert.verify_code(&code));

        for i in 0..code.len() {
            let mut bytes = code.clone().into_bytes();
            bytes[i] = if bytes[i] == b'0' { b'1' } else { b'0' };
            let mutated = String::from_utf8(bytes).unwrap();
            assert!(!cert.verify_code(&mutated), "mutation at {i} accepted");
        }
    }

    #[test]
    fn test_revoke_first_call_wins() {
        let mut cert = issue();
        let admin = UserId::new();
        assert!(cert.revoke(admin, "plagiarism").unwrap());
        let revoked_at = cert.revoked_at;

        assert!(!cert.revoke(UserId::new(), "second reason").unwrap());
        assert_eq!(cert.revoked_at, revoked_at);
        assert_eq!(cert.revoked_by, Some(admin));
        assert_eq!(cert.revocation_reason.as_deref(), Some("plagiarism"));
    }

    #[test]
    fn test_revoke_again_without_reason_is_noop() {
        let mut cert = issue();
        cert.revoke(UserId::new(), "fraud").unwrap();

        assert!(!cert.revoke(UserId::new(), "").unwrap());
        assert_eq!(cert.revocation_reason.as_deref(), Some("fraud"));
    }

    #[test]
    fn test_revoke_requires_reason() {
        let mut cert = issue();
        assert!(cert.revoke(UserId::new(), "   ").unwrap_err().is_validation());
        assert!(!cert.is_revoked());
    }

    #[test]
    fn test_validity_after_revoke_and_expiry() {
        let mut cert = issue();
        assert!(cert.is_valid());

        let mut expired = cert.clone();
        expired.expires_at = Some(cert.issued_at + Duration::seconds(1));
        assert!(!expired.is_valid_at(cert.issued_at + Duration::seconds(1)));
        assert!(expired.is_valid_at(cert.issued_at));

        cert.revoke(UserId::new(), "issued in error").unwrap();
        assert!(!cert.is_valid());
        // code still matches after revocation
        let code = cert.verification_code.as_str().to_owned();
        assert!(cert.verify_code(&code));
    }

    #[test]
    fn test_set_expiration_rules() {
        let mut cert = issue();
        let err = cert.set_expiration(cert.issued_at).unwrap_err();
        assert!(err.is_validation());

        let later = cert.issued_at + Duration::days(365);
        cert.set_expiration(later).unwrap();
        assert_eq!(cert.expires_at, Some(later));
    }

    #[test]
    fn test_mark_expired_if_due_and_reinstate() {
        let mut cert = issue();
        cert.set_expiration(cert.issued_at + Duration::seconds(1)).unwrap();
        assert!(cert.mark_expired_if_due(cert.issued_at + Duration::seconds(5)));
        assert_eq!(cert.status, CertificateStatus::Expired);
        assert!(!cert.mark_expired_if_due(cert.issued_at + Duration::seconds(6)));

        cert.set_expiration(Utc::now() + Duration::days(30)).unwrap();
        assert_eq!(cert.status, CertificateStatus::Issued);
    }

    #[test]
    fn test_mutations_rejected_after_revoke() {
        let mut cert = issue();
        cert.revoke(UserId::new(), "fraud").unwrap();

        assert!(matches!(
            cert.set_grade(90.0),
            Err(CertificateError::CertificateRevoked)
        ));
        assert!(matches!(
            cert.set_template(TemplateId::new()),
            Err(CertificateError::CertificateRevoked)
        ));
        assert!(matches!(
            cert.add_metadata("k", json!(1)),
            Err(CertificateError::CertificateRevoked)
        ));
        assert!(matches!(
            cert.set_expiration(Utc::now() + Duration::days(1)),
            Err(CertificateError::CertificateRevoked)
        ));
    }

    #[test]
    fn test_grade_and_metadata() {
        let mut cert = issue();
        cert.set_grade(92.5).unwrap();
        assert_eq!(cert.grade.map(|g| g.value()), Some(92.5));
        assert!(cert.set_grade(101.0).unwrap_err().is_validation());

        cert.add_metadata("instructor", json!("Dr. Lee")).unwrap();
        cert.add_metadata("instructor", json!("Dr. Kim")).unwrap();
        assert_eq!(cert.metadata.get("instructor"), Some(&json!("Dr. Kim")));
        assert!(cert.add_metadata(" ", json!(null)).is_err());
    }
}
