//! In-Memory Repository Implementation
//!
//! Single-process adapter for tests and local runs. All state lives behind
//! one mutex, so each multi-record operation is atomic by holding the lock
//! for its whole duration. No lock is held across an `.await`.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use kernel::id::{CertificateId, CourseId, ProgressId, TemplateId, TenantId, UserId};

use crate::domain::entity::{
    certificate::Certificate, certificate_template::CertificateTemplate,
    course_progress::CourseProgress, progress_snapshot::ProgressSnapshot,
};
use crate::domain::repository::{
    CertificateRepository, CertificateTemplateRepository, CourseCatalog, LearningUnitOfWork,
    ProgressRepository, SnapshotRepository,
};
use crate::domain::value_object::{
    certificate_number::CertificateNumber, certificate_status::CertificateStatus,
    course_totals::CourseTotals, date_range::DateRange, milestone::Milestone,
};
use crate::error::{CertificateError, CertificateResult, ProgressError, ProgressResult};

#[derive(Default)]
struct State {
    courses: HashMap<(TenantId, CourseId), CourseTotals>,
    progress: HashMap<(TenantId, ProgressId), CourseProgress>,
    snapshots: Vec<ProgressSnapshot>,
    certificates: HashMap<(TenantId, CertificateId), Certificate>,
    templates: HashMap<(TenantId, TemplateId), CertificateTemplate>,
}

impl State {
    fn number_taken(&self, number: &CertificateNumber) -> bool {
        self.certificates
            .values()
            .any(|c| &c.certificate_number == number)
    }

    /// Another issued certificate for the same user and course
    fn issued_conflict(&self, certificate: &Certificate) -> bool {
        self.certificates.values().any(|c| {
            c.id != certificate.id
                && c.tenant_id == certificate.tenant_id
                && c.user_id == certificate.user_id
                && c.course_id == certificate.course_id
                && c.status == CertificateStatus::Issued
        })
    }
}

/// In-memory learning repository
#[derive(Default)]
pub struct MemoryLearningRepository {
    state: Mutex<State>,
}

impl MemoryLearningRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a course in the catalog
    pub fn insert_course(&self, tenant_id: TenantId, course_id: CourseId, totals: CourseTotals) {
        self.state().courses.insert((tenant_id, course_id), totals);
    }

    /// Store a certificate directly, bypassing completion
    pub fn insert_certificate(&self, certificate: Certificate) {
        self.state()
            .certificates
            .insert((certificate.tenant_id, certificate.id), certificate);
    }

    pub fn snapshot_count(&self) -> usize {
        self.state().snapshots.len()
    }
}

// ============================================================================
// Course Catalog
// ============================================================================

impl CourseCatalog for MemoryLearningRepository {
    async fn course_totals(
        &self,
        tenant_id: TenantId,
        course_id: CourseId,
    ) -> ProgressResult<Option<CourseTotals>> {
        Ok(self.state().courses.get(&(tenant_id, course_id)).copied())
    }
}

// ============================================================================
// Progress Repository Implementation
// ============================================================================

impl ProgressRepository for MemoryLearningRepository {
    async fn create_progress(&self, progress: &CourseProgress) -> ProgressResult<()> {
        let mut state = self.state();
        let duplicate = state.progress.values().any(|p| {
            p.tenant_id == progress.tenant_id
                && p.user_id == progress.user_id
                && p.course_id == progress.course_id
        });
        if duplicate {
            return Err(ProgressError::ProgressAlreadyExists);
        }
        state
            .progress
            .insert((progress.tenant_id, progress.id), progress.clone());
        Ok(())
    }

    async fn find_progress(
        &self,
        tenant_id: TenantId,
        progress_id: ProgressId,
    ) -> ProgressResult<Option<CourseProgress>> {
        Ok(self.state().progress.get(&(tenant_id, progress_id)).cloned())
    }

    async fn find_progress_by_user_course(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        course_id: CourseId,
    ) -> ProgressResult<Option<CourseProgress>> {
        Ok(self
            .state()
            .progress
            .values()
            .find(|p| p.tenant_id == tenant_id && p.user_id == user_id && p.course_id == course_id)
            .cloned())
    }

    async fn list_progress_by_user(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
    ) -> ProgressResult<Vec<CourseProgress>> {
        let mut records: Vec<CourseProgress> = self
            .state()
            .progress
            .values()
            .filter(|p| p.tenant_id == tenant_id && p.user_id == user_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn list_progress_by_course(
        &self,
        tenant_id: TenantId,
        course_id: CourseId,
    ) -> ProgressResult<Vec<CourseProgress>> {
        let mut records: Vec<CourseProgress> = self
            .state()
            .progress
            .values()
            .filter(|p| p.tenant_id == tenant_id && p.course_id == course_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn update_progress(&self, progress: &CourseProgress) -> ProgressResult<()> {
        let mut state = self.state();
        let slot = state
            .progress
            .get_mut(&(progress.tenant_id, progress.id))
            .ok_or(ProgressError::ProgressNotFound)?;
        *slot = progress.clone();
        Ok(())
    }
}

// ============================================================================
// Snapshot Repository Implementation
// ============================================================================

impl SnapshotRepository for MemoryLearningRepository {
    async fn append_snapshots(&self, snapshots: &[ProgressSnapshot]) -> ProgressResult<()> {
        self.state().snapshots.extend_from_slice(snapshots);
        Ok(())
    }

    async fn list_snapshots(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        course_id: CourseId,
        range: &DateRange,
    ) -> ProgressResult<Vec<ProgressSnapshot>> {
        let mut snapshots: Vec<ProgressSnapshot> = self
            .state()
            .snapshots
            .iter()
            .filter(|s| {
                s.tenant_id == tenant_id
                    && s.user_id == user_id
                    && s.course_id == course_id
                    && range.contains(s.recorded_at)
            })
            .cloned()
            .collect();
        snapshots.sort_by_key(|s| s.recorded_at);
        Ok(snapshots)
    }

    async fn list_snapshots_by_milestone(
        &self,
        tenant_id: TenantId,
        course_id: CourseId,
        milestone: Milestone,
    ) -> ProgressResult<Vec<ProgressSnapshot>> {
        let mut snapshots: Vec<ProgressSnapshot> = self
            .state()
            .snapshots
            .iter()
            .filter(|s| s.tenant_id == tenant_id && s.course_id == course_id && s.milestone == milestone)
            .cloned()
            .collect();
        snapshots.sort_by_key(|s| s.recorded_at);
        Ok(snapshots)
    }
}

// ============================================================================
// Certificate Repository Implementation
// ============================================================================

impl CertificateRepository for MemoryLearningRepository {
    async fn find_certificate(
        &self,
        tenant_id: TenantId,
        certificate_id: CertificateId,
    ) -> CertificateResult<Option<Certificate>> {
        Ok(self
            .state()
            .certificates
            .get(&(tenant_id, certificate_id))
            .cloned())
    }

    async fn find_certificate_by_number(
        &self,
        tenant_id: TenantId,
        number: &CertificateNumber,
    ) -> CertificateResult<Option<Certificate>> {
        Ok(self
            .state()
            .certificates
            .values()
            .find(|c| c.tenant_id == tenant_id && &c.certificate_number == number)
            .cloned())
    }

    async fn find_issued_certificate(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        course_id: CourseId,
    ) -> CertificateResult<Option<Certificate>> {
        Ok(self
            .state()
            .certificates
            .values()
            .find(|c| {
                c.tenant_id == tenant_id
                    && c.user_id == user_id
                    && c.course_id == course_id
                    && c.status == CertificateStatus::Issued
            })
            .cloned())
    }

    async fn list_certificates_by_user(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
    ) -> CertificateResult<Vec<Certificate>> {
        let mut certificates: Vec<Certificate> = self
            .state()
            .certificates
            .values()
            .filter(|c| c.tenant_id == tenant_id && c.user_id == user_id)
            .cloned()
            .collect();
        certificates.sort_by(|a, b| b.issued_at.cmp(&a.issued_at));
        Ok(certificates)
    }

    async fn update_certificate(&self, certificate: &Certificate) -> CertificateResult<()> {
        let mut state = self.state();
        let key = (certificate.tenant_id, certificate.id);
        if !state.certificates.contains_key(&key) {
            return Err(CertificateError::CertificateNotFound);
        }
        if certificate.status == CertificateStatus::Issued && state.issued_conflict(certificate) {
            return Err(CertificateError::AlreadyCertified);
        }
        state.certificates.insert(key, certificate.clone());
        Ok(())
    }

    async fn expire_overdue_certificates(&self, now: DateTime<Utc>) -> CertificateResult<u64> {
        let mut state = self.state();
        let expired = state
            .certificates
            .values_mut()
            .map(|c| c.mark_expired_if_due(now))
            .filter(|&changed| changed)
            .count();
        Ok(expired as u64)
    }
}

// ============================================================================
// Certificate Template Repository Implementation
// ============================================================================

impl CertificateTemplateRepository for MemoryLearningRepository {
    async fn create_template(&self, template: &CertificateTemplate) -> CertificateResult<()> {
        self.state()
            .templates
            .insert((template.tenant_id, template.id), template.clone());
        Ok(())
    }

    async fn find_template(
        &self,
        tenant_id: TenantId,
        template_id: TemplateId,
    ) -> CertificateResult<Option<CertificateTemplate>> {
        Ok(self.state().templates.get(&(tenant_id, template_id)).cloned())
    }

    async fn find_default_template(
        &self,
        tenant_id: TenantId,
    ) -> CertificateResult<Option<CertificateTemplate>> {
        Ok(self
            .state()
            .templates
            .values()
            .find(|t| t.tenant_id == tenant_id && t.is_default)
            .cloned())
    }

    async fn list_templates(
        &self,
        tenant_id: TenantId,
    ) -> CertificateResult<Vec<CertificateTemplate>> {
        let mut templates: Vec<CertificateTemplate> = self
            .state()
            .templates
            .values()
            .filter(|t| t.tenant_id == tenant_id)
            .cloned()
            .collect();
        templates.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(templates)
    }

    async fn update_template(&self, template: &CertificateTemplate) -> CertificateResult<()> {
        let mut state = self.state();
        let slot = state
            .templates
            .get_mut(&(template.tenant_id, template.id))
            .ok_or(CertificateError::TemplateNotFound)?;
        *slot = template.clone();
        Ok(())
    }

    async fn make_default_template(
        &self,
        tenant_id: TenantId,
        template_id: TemplateId,
    ) -> CertificateResult<CertificateTemplate> {
        let mut state = self.state();

        let mut chosen = state
            .templates
            .get(&(tenant_id, template_id))
            .cloned()
            .ok_or(CertificateError::TemplateNotFound)?;
        chosen.set_as_default()?;

        for template in state.templates.values_mut() {
            if template.tenant_id == tenant_id && template.is_default && template.id != template_id {
                template.unset_as_default();
            }
        }
        state
            .templates
            .insert((tenant_id, template_id), chosen.clone());
        Ok(chosen)
    }
}

// ============================================================================
// Unit of Work Implementation
// ============================================================================

impl LearningUnitOfWork for MemoryLearningRepository {
    async fn complete_course(
        &self,
        progress: &CourseProgress,
        new_certificate: Option<&Certificate>,
        expired_certificate: Option<&Certificate>,
        snapshots: &[ProgressSnapshot],
    ) -> ProgressResult<()> {
        let mut state = self.state();

        if !state.progress.contains_key(&(progress.tenant_id, progress.id)) {
            return Err(ProgressError::ProgressNotFound);
        }
        if let Some(certificate) = expired_certificate {
            if !state
                .certificates
                .contains_key(&(certificate.tenant_id, certificate.id))
            {
                return Err(CertificateError::CertificateNotFound.into());
            }
        }
        if let Some(certificate) = new_certificate {
            if state.number_taken(&certificate.certificate_number) {
                return Err(CertificateError::NumberCollision.into());
            }
            let blocked = state.certificates.values().any(|c| {
                c.tenant_id == certificate.tenant_id
                    && c.user_id == certificate.user_id
                    && c.course_id == certificate.course_id
                    && c.status == CertificateStatus::Issued
                    && expired_certificate.is_none_or(|e| e.id != c.id)
            });
            if blocked {
                return Err(CertificateError::AlreadyCertified.into());
            }
        }

        if let Some(certificate) = expired_certificate {
            state
                .certificates
                .insert((certificate.tenant_id, certificate.id), certificate.clone());
        }
        if let Some(certificate) = new_certificate {
            state
                .certificates
                .insert((certificate.tenant_id, certificate.id), certificate.clone());
        }

        state
            .progress
            .insert((progress.tenant_id, progress.id), progress.clone());
        state.snapshots.extend_from_slice(snapshots);
        Ok(())
    }

    async fn reset_course(
        &self,
        progress: &CourseProgress,
        revoked_certificate: Option<&Certificate>,
    ) -> ProgressResult<()> {
        let mut state = self.state();

        if !state.progress.contains_key(&(progress.tenant_id, progress.id)) {
            return Err(ProgressError::ProgressNotFound);
        }
        if let Some(certificate) = revoked_certificate {
            let key = (certificate.tenant_id, certificate.id);
            if !state.certificates.contains_key(&key) {
                return Err(CertificateError::CertificateNotFound.into());
            }
            state.certificates.insert(key, certificate.clone());
        }

        state
            .progress
            .insert((progress.tenant_id, progress.id), progress.clone());
        Ok(())
    }
}
