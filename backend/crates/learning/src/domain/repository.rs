//! Repository Traits
//!
//! Interfaces for data persistence. Implementations live in the
//! infrastructure layer. Every lookup is tenant-scoped: an ID that belongs to
//! another tenant resolves to `None`, never to the foreign record.
//!
//! Method names are distinct across traits so one adapter type can implement
//! all of them.

use chrono::{DateTime, Utc};
use kernel::id::{CertificateId, CourseId, ProgressId, TemplateId, TenantId, UserId};

use crate::domain::entity::{
    certificate::Certificate, certificate_template::CertificateTemplate,
    course_progress::CourseProgress, progress_snapshot::ProgressSnapshot,
};
use crate::domain::value_object::{
    certificate_number::CertificateNumber, course_totals::CourseTotals, date_range::DateRange,
    milestone::Milestone,
};
use crate::error::{CertificateResult, ProgressResult};

/// Course progress repository trait
#[trait_variant::make(ProgressRepository: Send)]
pub trait LocalProgressRepository {
    /// Insert a new record
    ///
    /// Fails with `ProgressAlreadyExists` when the (tenant, user, course)
    /// triple already has one.
    async fn create_progress(&self, progress: &CourseProgress) -> ProgressResult<()>;

    /// Find by ID within a tenant
    async fn find_progress(
        &self,
        tenant_id: TenantId,
        progress_id: ProgressId,
    ) -> ProgressResult<Option<CourseProgress>>;

    /// Find by (tenant, user, course)
    async fn find_progress_by_user_course(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        course_id: CourseId,
    ) -> ProgressResult<Option<CourseProgress>>;

    /// All records of a user, newest first
    async fn list_progress_by_user(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
    ) -> ProgressResult<Vec<CourseProgress>>;

    /// All records of a course
    async fn list_progress_by_course(
        &self,
        tenant_id: TenantId,
        course_id: CourseId,
    ) -> ProgressResult<Vec<CourseProgress>>;

    /// Overwrite a record; `ProgressNotFound` if it does not exist
    async fn update_progress(&self, progress: &CourseProgress) -> ProgressResult<()>;
}

/// Progress snapshot repository trait (append-only)
#[trait_variant::make(SnapshotRepository: Send)]
pub trait LocalSnapshotRepository {
    /// Append snapshots
    async fn append_snapshots(&self, snapshots: &[ProgressSnapshot]) -> ProgressResult<()>;

    /// History of a user in a course, oldest first
    async fn list_snapshots(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        course_id: CourseId,
        range: &DateRange,
    ) -> ProgressResult<Vec<ProgressSnapshot>>;

    /// Snapshots of one milestone across a course, oldest first
    async fn list_snapshots_by_milestone(
        &self,
        tenant_id: TenantId,
        course_id: CourseId,
        milestone: Milestone,
    ) -> ProgressResult<Vec<ProgressSnapshot>>;
}

/// Read-only view of the course catalog
#[trait_variant::make(CourseCatalog: Send)]
pub trait LocalCourseCatalog {
    /// Lesson and quiz totals; `None` if the course is unknown in the tenant
    async fn course_totals(
        &self,
        tenant_id: TenantId,
        course_id: CourseId,
    ) -> ProgressResult<Option<CourseTotals>>;
}

/// Certificate repository trait
///
/// Certificates are inserted only through [`LearningUnitOfWork::complete_course`].
#[trait_variant::make(CertificateRepository: Send)]
pub trait LocalCertificateRepository {
    async fn find_certificate(
        &self,
        tenant_id: TenantId,
        certificate_id: CertificateId,
    ) -> CertificateResult<Option<Certificate>>;

    async fn find_certificate_by_number(
        &self,
        tenant_id: TenantId,
        number: &CertificateNumber,
    ) -> CertificateResult<Option<Certificate>>;

    /// The user's certificate in `issued` status for a course, if any
    async fn find_issued_certificate(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        course_id: CourseId,
    ) -> CertificateResult<Option<Certificate>>;

    /// All certificates of a user, newest first
    async fn list_certificates_by_user(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
    ) -> CertificateResult<Vec<Certificate>>;

    /// Overwrite mutable fields; `CertificateNotFound` if it does not exist
    ///
    /// Moving a certificate to `issued` while the user holds another issued
    /// certificate for the course fails with `AlreadyCertified`.
    async fn update_certificate(&self, certificate: &Certificate) -> CertificateResult<()>;

    /// Move every issued certificate whose expiration has passed to `expired`
    async fn expire_overdue_certificates(&self, now: DateTime<Utc>) -> CertificateResult<u64>;
}

/// Certificate template repository trait
#[trait_variant::make(CertificateTemplateRepository: Send)]
pub trait LocalCertificateTemplateRepository {
    async fn create_template(&self, template: &CertificateTemplate) -> CertificateResult<()>;

    async fn find_template(
        &self,
        tenant_id: TenantId,
        template_id: TemplateId,
    ) -> CertificateResult<Option<CertificateTemplate>>;

    async fn find_default_template(
        &self,
        tenant_id: TenantId,
    ) -> CertificateResult<Option<CertificateTemplate>>;

    /// All templates of a tenant, by name
    async fn list_templates(&self, tenant_id: TenantId)
    -> CertificateResult<Vec<CertificateTemplate>>;

    /// Overwrite a template; `TemplateNotFound` if it does not exist
    async fn update_template(&self, template: &CertificateTemplate) -> CertificateResult<()>;

    /// Atomically make `template_id` the tenant's only default
    ///
    /// Every other default in the tenant is cleared in the same transaction.
    /// Fails with `TemplateNotFound` or `TemplateInactive`.
    async fn make_default_template(
        &self,
        tenant_id: TenantId,
        template_id: TemplateId,
    ) -> CertificateResult<CertificateTemplate>;
}

/// Multi-record writes that must commit or fail together
#[trait_variant::make(LearningUnitOfWork: Send)]
pub trait LocalLearningUnitOfWork {
    /// Persist a course completion
    ///
    /// Writes `expired_certificate` (an issued certificate found past its
    /// expiration), inserts `new_certificate` (when a fresh one was issued),
    /// overwrites `progress` and appends `snapshots` in one transaction. A
    /// taken certificate number fails with `CertificateError::NumberCollision`
    /// and leaves nothing behind.
    async fn complete_course(
        &self,
        progress: &CourseProgress,
        new_certificate: Option<&Certificate>,
        expired_certificate: Option<&Certificate>,
        snapshots: &[ProgressSnapshot],
    ) -> ProgressResult<()>;

    /// Persist an admin reset, together with the revocation of the linked
    /// certificate when one is given
    async fn reset_course(
        &self,
        progress: &CourseProgress,
        revoked_certificate: Option<&Certificate>,
    ) -> ProgressResult<()>;
}
