//! Certificate Service
//!
//! Lookup, public verification and administrative edits of issued
//! certificates. Issuance itself happens in the complete-course use case.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use kernel::id::{CertificateId, TemplateId, TenantId, UserId};
use serde_json::Value;

use crate::domain::entity::certificate::Certificate;
use crate::domain::repository::{CertificateRepository, CertificateTemplateRepository};
use crate::domain::value_object::{
    certificate_number::CertificateNumber, certificate_status::CertificateStatus,
};
use crate::error::{CertificateError, CertificateResult, ResultExt};

/// Result of checking a (number, code) pair
#[derive(Debug, Clone)]
pub enum VerificationOutcome {
    /// No certificate with that number in the tenant
    Unknown,
    /// Number exists but the code does not match; nothing else is disclosed
    Mismatch,
    /// Code matches; the certificate may still be revoked or expired
    Matched(Certificate),
}

impl VerificationOutcome {
    /// Code matches and the certificate is currently valid
    pub fn is_valid(&self) -> bool {
        match self {
            Self::Matched(certificate) => certificate.is_valid(),
            _ => false,
        }
    }

    pub fn certificate(&self) -> Option<&Certificate> {
        match self {
            Self::Matched(certificate) => Some(certificate),
            _ => None,
        }
    }
}

/// Certificate service
pub struct CertificateService<R>
where
    R: CertificateRepository + CertificateTemplateRepository,
{
    repo: Arc<R>,
}

impl<R> Clone for CertificateService<R>
where
    R: CertificateRepository + CertificateTemplateRepository,
{
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
        }
    }
}

impl<R> CertificateService<R>
where
    R: CertificateRepository + CertificateTemplateRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    async fn load(
        &self,
        op: &'static str,
        tenant_id: TenantId,
        certificate_id: CertificateId,
    ) -> CertificateResult<Certificate> {
        self.repo
            .find_certificate(tenant_id, certificate_id)
            .await
            .in_op(op, "load certificate")?
            .ok_or_else(|| CertificateError::CertificateNotFound.in_op(op, "load certificate"))
    }

    async fn save(&self, op: &'static str, certificate: &Certificate) -> CertificateResult<()> {
        self.repo
            .update_certificate(certificate)
            .await
            .in_op(op, "save certificate")
    }

    pub async fn get_certificate(
        &self,
        tenant_id: TenantId,
        certificate_id: CertificateId,
    ) -> CertificateResult<Certificate> {
        self.load("get_certificate", tenant_id, certificate_id).await
    }

    pub async fn get_by_number(
        &self,
        tenant_id: TenantId,
        number: &str,
    ) -> CertificateResult<Certificate> {
        const OP: &str = "get_by_number";

        let number = CertificateNumber::parse(number.trim()).ok_or_else(|| {
            CertificateError::InvalidCertificateNumber.in_op(OP, "parse certificate number")
        })?;
        self.repo
            .find_certificate_by_number(tenant_id, &number)
            .await
            .in_op(OP, "load certificate")?
            .ok_or_else(|| CertificateError::CertificateNotFound.in_op(OP, "load certificate"))
    }

    pub async fn list_user_certificates(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
    ) -> CertificateResult<Vec<Certificate>> {
        self.repo
            .list_certificates_by_user(tenant_id, user_id)
            .await
            .in_op("list_user_certificates", "list certificates")
    }

    /// Check a presented (number, code) pair
    ///
    /// A malformed number is reported as `Unknown` rather than as an error;
    /// verification is a public check and only answers yes or no.
    pub async fn verify_certificate(
        &self,
        tenant_id: TenantId,
        number: &str,
        code: &str,
    ) -> CertificateResult<VerificationOutcome> {
        let Some(number) = CertificateNumber::parse(number.trim()) else {
            return Ok(VerificationOutcome::Unknown);
        };

        let found = self
            .repo
            .find_certificate_by_number(tenant_id, &number)
            .await
            .in_op("verify_certificate", "load certificate")?;

        let outcome = match found {
            None => VerificationOutcome::Unknown,
            Some(certificate) if !certificate.verify_code(code.trim()) => {
                VerificationOutcome::Mismatch
            }
            Some(certificate) => VerificationOutcome::Matched(certificate),
        };

        tracing::info!(
            tenant_id = %tenant_id,
            certificate_number = %number,
            valid = outcome.is_valid(),
            "Certificate verification"
        );

        Ok(outcome)
    }

    /// Revoke; repeating the call keeps the first revocation
    pub async fn revoke_certificate(
        &self,
        tenant_id: TenantId,
        certificate_id: CertificateId,
        revoked_by: UserId,
        reason: &str,
    ) -> CertificateResult<Certificate> {
        const OP: &str = "revoke_certificate";

        let mut certificate = self.load(OP, tenant_id, certificate_id).await?;
        let changed = certificate
            .revoke(revoked_by, reason)
            .map_err(|e| e.in_op(OP, "revoke"))?;
        if changed {
            self.save(OP, &certificate).await?;
            tracing::info!(
                certificate_id = %certificate.id,
                revoked_by = %revoked_by,
                "Certificate revoked"
            );
        }
        Ok(certificate)
    }

    pub async fn set_expiration(
        &self,
        tenant_id: TenantId,
        certificate_id: CertificateId,
        expires_at: DateTime<Utc>,
    ) -> CertificateResult<Certificate> {
        const OP: &str = "set_expiration";

        let mut certificate = self.load(OP, tenant_id, certificate_id).await?;
        let was_expired = certificate.status == CertificateStatus::Expired;
        certificate
            .set_expiration(expires_at)
            .map_err(|e| e.in_op(OP, "set expiration"))?;

        // Reinstating must not leave the user with two issued certificates
        if was_expired && certificate.status == CertificateStatus::Issued {
            let current = self
                .repo
                .find_issued_certificate(tenant_id, certificate.user_id, certificate.course_id)
                .await
                .in_op(OP, "look up issued certificate")?;
            if current.is_some_and(|c| c.id != certificate.id) {
                return Err(CertificateError::AlreadyCertified.in_op(OP, "reinstate certificate"));
            }
        }

        self.save(OP, &certificate).await?;
        Ok(certificate)
    }

    pub async fn set_grade(
        &self,
        tenant_id: TenantId,
        certificate_id: CertificateId,
        grade: f64,
    ) -> CertificateResult<Certificate> {
        const OP: &str = "set_grade";

        let mut certificate = self.load(OP, tenant_id, certificate_id).await?;
        certificate
            .set_grade(grade)
            .map_err(|e| e.in_op(OP, "set grade"))?;
        self.save(OP, &certificate).await?;
        Ok(certificate)
    }

    /// Link an active template of the same tenant
    pub async fn set_template(
        &self,
        tenant_id: TenantId,
        certificate_id: CertificateId,
        template_id: TemplateId,
    ) -> CertificateResult<Certificate> {
        const OP: &str = "set_template";

        let mut certificate = self.load(OP, tenant_id, certificate_id).await?;
        let template = self
            .repo
            .find_template(tenant_id, template_id)
            .await
            .in_op(OP, "load template")?
            .ok_or_else(|| CertificateError::TemplateNotFound.in_op(OP, "load template"))?;
        if !template.is_active {
            return Err(CertificateError::TemplateInactive.in_op(OP, "check template"));
        }

        certificate
            .set_template(template.id)
            .map_err(|e| e.in_op(OP, "set template"))?;
        self.save(OP, &certificate).await?;
        Ok(certificate)
    }

    pub async fn add_metadata(
        &self,
        tenant_id: TenantId,
        certificate_id: CertificateId,
        key: &str,
        value: Value,
    ) -> CertificateResult<Certificate> {
        const OP: &str = "add_metadata";

        let mut certificate = self.load(OP, tenant_id, certificate_id).await?;
        certificate
            .add_metadata(key, value)
            .map_err(|e| e.in_op(OP, "add metadata"))?;
        self.save(OP, &certificate).await?;
        Ok(certificate)
    }

    /// Move overdue issued certificates to `expired`
    pub async fn expire_overdue_certificates(&self) -> CertificateResult<u64> {
        let expired = self
            .repo
            .expire_overdue_certificates(Utc::now())
            .await
            .in_op("expire_overdue_certificates", "expire certificates")?;

        tracing::info!(certificates_expired = expired, "Expired overdue certificates");
        Ok(expired)
    }
}
