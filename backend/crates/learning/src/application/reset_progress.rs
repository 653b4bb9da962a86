//! Reset Progress Use Case

use std::sync::Arc;

use kernel::id::{ProgressId, TenantId, UserId};

use crate::application::LearningStore;
use crate::application::progress_service::load_progress;
use crate::domain::entity::course_progress::CourseProgress;
use crate::error::{ProgressError, ProgressResult, ResultExt};

const OP: &str = "reset_progress";

/// What happens to the linked certificate on an admin reset
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ResetPolicy {
    /// Certificate stays issued and linked
    #[default]
    KeepCertificate,
    /// Certificate is revoked in the same transaction and unlinked
    RevokeCertificate { revoked_by: UserId, reason: String },
}

/// Reset Progress Use Case
///
/// Admin reset back to `not_started` with counters and time cleared.
pub struct ResetProgressUseCase<R>
where
    R: LearningStore,
{
    repo: Arc<R>,
}

impl<R> ResetProgressUseCase<R>
where
    R: LearningStore,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn execute(
        &self,
        tenant_id: TenantId,
        progress_id: ProgressId,
        policy: ResetPolicy,
    ) -> ProgressResult<CourseProgress> {
        let mut progress = load_progress(self.repo.as_ref(), OP, tenant_id, progress_id).await?;

        match policy {
            ResetPolicy::KeepCertificate => {
                progress.reset(true);
                self.repo
                    .reset_course(&progress, None)
                    .await
                    .in_op(OP, "persist reset")?;
            }
            ResetPolicy::RevokeCertificate { revoked_by, reason } => {
                let linked = match progress.certificate_id {
                    Some(id) => self
                        .repo
                        .find_certificate(tenant_id, id)
                        .await
                        .map_err(|e| ProgressError::from(e).in_op(OP, "load linked certificate"))?,
                    None => None,
                };

                let mut revoked = None;
                if let Some(mut certificate) = linked {
                    let changed = certificate
                        .revoke(revoked_by, &reason)
                        .map_err(|e| ProgressError::from(e).in_op(OP, "revoke certificate"))?;
                    if changed {
                        revoked = Some(certificate);
                    }
                }

                progress.reset(false);
                self.repo
                    .reset_course(&progress, revoked.as_ref())
                    .await
                    .in_op(OP, "persist reset")?;

                if let Some(certificate) = &revoked {
                    tracing::info!(
                        certificate_id = %certificate.id,
                        revoked_by = %revoked_by,
                        "Certificate revoked by progress reset"
                    );
                }
            }
        }

        tracing::info!(progress_id = %progress.id, tenant_id = %tenant_id, "Progress reset");
        Ok(progress)
    }
}
