//! Complete Course Use Case
//!
//! Issues (or re-links) the certificate, flips the status and appends the
//! `completed` snapshot through one [`LearningUnitOfWork::complete_course`]
//! call. A certificate-number collision is retried with the issue timestamp
//! moved forward one second per attempt, up to
//! `LearningConfig::issue_max_attempts`.
//!
//! An issued certificate whose `expires_at` has already passed is never
//! re-linked: it is moved to `expired` in the same transaction that inserts
//! its replacement, even when the startup sweep has not reached it yet.
//!
//! [`LearningUnitOfWork::complete_course`]: crate::domain::repository::LearningUnitOfWork::complete_course

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use kernel::id::{ProgressId, TenantId, TemplateId};

use crate::application::LearningStore;
use crate::application::config::LearningConfig;
use crate::application::progress_service::load_progress;
use crate::domain::entity::{
    certificate::{Certificate, CertificateSubject},
    course_progress::CourseProgress,
    progress_snapshot::ProgressSnapshot,
};
use crate::domain::value_object::milestone::Milestone;
use crate::error::{CertificateError, ProgressError, ProgressResult, ResultExt};

const OP: &str = "mark_progress_as_completed";

/// Completed progress and the certificate linked to it
#[derive(Debug, Clone)]
pub struct CompletionOutput {
    pub progress: CourseProgress,
    pub certificate: Certificate,
    /// `false` when an existing certificate was re-linked or the record was
    /// already completed
    pub newly_issued: bool,
}

/// Complete Course Use Case
pub struct CompleteCourseUseCase<R>
where
    R: LearningStore,
{
    repo: Arc<R>,
    config: Arc<LearningConfig>,
}

impl<R> CompleteCourseUseCase<R>
where
    R: LearningStore,
{
    pub fn new(repo: Arc<R>, config: Arc<LearningConfig>) -> Self {
        Self { repo, config }
    }

    /// Idempotent: an already completed record returns its linked
    /// certificate. A user who already holds a still-valid issued
    /// certificate for the course gets it re-linked instead of a second one.
    pub async fn execute(
        &self,
        tenant_id: TenantId,
        progress_id: ProgressId,
    ) -> ProgressResult<CompletionOutput> {
        let progress = load_progress(self.repo.as_ref(), OP, tenant_id, progress_id).await?;

        if progress.is_completed() {
            let certificate = self.linked_certificate(&progress).await?;
            return Ok(CompletionOutput {
                progress,
                certificate,
                newly_issued: false,
            });
        }

        if !progress.is_complete_eligible() {
            return Err(ProgressError::CourseNotComplete {
                completed_lessons: progress.completed_lessons,
                total_lessons: progress.total_lessons,
                completed_quizzes: progress.completed_quizzes,
                total_quizzes: progress.total_quizzes,
            }
            .in_op(OP, "check course totals"));
        }

        let existing = self
            .repo
            .find_issued_certificate(tenant_id, progress.user_id, progress.course_id)
            .await
            .map_err(|e| ProgressError::from(e).in_op(OP, "look up issued certificate"))?;

        let completed_at = Utc::now();

        let mut lapsed = None;
        if let Some(mut certificate) = existing {
            if !certificate.mark_expired_if_due(completed_at) {
                let progress = self
                    .commit(progress, &certificate, None, None, completed_at)
                    .await?;
                tracing::info!(
                    progress_id = %progress.id,
                    certificate_id = %certificate.id,
                    "Course completed, existing certificate re-linked"
                );
                return Ok(CompletionOutput {
                    progress,
                    certificate,
                    newly_issued: false,
                });
            }
            tracing::info!(
                certificate_id = %certificate.id,
                "Issued certificate past its expiration, issuing a replacement"
            );
            lapsed = Some(certificate);
        }

        let template_id = self.default_template(tenant_id).await?;
        self.issue(progress, lapsed.as_ref(), template_id, completed_at)
            .await
    }

    async fn default_template(&self, tenant_id: TenantId) -> ProgressResult<Option<TemplateId>> {
        Ok(self
            .repo
            .find_default_template(tenant_id)
            .await
            .map_err(|e| ProgressError::from(e).in_op(OP, "load default template"))?
            .filter(|t| t.is_active)
            .map(|t| t.id))
    }

    async fn issue(
        &self,
        progress: CourseProgress,
        lapsed: Option<&Certificate>,
        template_id: Option<TemplateId>,
        completed_at: DateTime<Utc>,
    ) -> ProgressResult<CompletionOutput> {
        let attempts = self.config.issue_attempts();
        let mut attempt: u32 = 0;
        loop {
            let issued_at = completed_at + Duration::seconds(i64::from(attempt));
            let mut certificate = Certificate::issue(
                CertificateSubject::from(&progress),
                completed_at,
                progress.time_spent_minutes,
                issued_at,
                self.config.certificate_validity_chrono(),
            );
            certificate.template_id = template_id;

            match self
                .commit(
                    progress.clone(),
                    &certificate,
                    Some(&certificate),
                    lapsed,
                    completed_at,
                )
                .await
            {
                Ok(progress) => {
                    tracing::info!(
                        progress_id = %progress.id,
                        certificate_id = %certificate.id,
                        certificate_number = %certificate.certificate_number,
                        "Course completed, certificate issued"
                    );
                    return Ok(CompletionOutput {
                        progress,
                        certificate,
                        newly_issued: true,
                    });
                }
                Err(e) if e.is_number_collision() && attempt + 1 < attempts => {
                    tracing::warn!(
                        progress_id = %progress.id,
                        certificate_number = %certificate.certificate_number,
                        attempt = attempt + 1,
                        "Certificate number collision, retrying"
                    );
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn commit(
        &self,
        mut progress: CourseProgress,
        linked: &Certificate,
        new_certificate: Option<&Certificate>,
        expired_certificate: Option<&Certificate>,
        completed_at: DateTime<Utc>,
    ) -> ProgressResult<CourseProgress> {
        progress
            .mark_completed(Some(linked.id), completed_at)
            .map_err(|e| e.in_op(OP, "complete progress"))?;
        let snapshot = ProgressSnapshot::capture(&progress, Milestone::Completed);

        self.repo
            .complete_course(&progress, new_certificate, expired_certificate, &[snapshot])
            .await
            .in_op(OP, "persist completion")?;
        Ok(progress)
    }

    async fn linked_certificate(&self, progress: &CourseProgress) -> ProgressResult<Certificate> {
        let found = match progress.certificate_id {
            Some(id) => self.repo.find_certificate(progress.tenant_id, id).await,
            None => {
                self.repo
                    .find_issued_certificate(progress.tenant_id, progress.user_id, progress.course_id)
                    .await
            }
        };
        found
            .map_err(|e| ProgressError::from(e).in_op(OP, "load linked certificate"))?
            .ok_or_else(|| {
                ProgressError::from(CertificateError::CertificateNotFound)
                    .in_op(OP, "load linked certificate")
            })
    }
}
