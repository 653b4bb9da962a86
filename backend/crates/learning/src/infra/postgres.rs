//! PostgreSQL Repository Implementations
//!
//! Counters are stored as BIGINT, statuses and milestones as their text
//! codes, certificate metadata and template configuration as JSONB.
//! Uniqueness the domain relies on is enforced by named constraints:
//!
//! - `course_progress_tenant_user_course_key` on (tenant_id, user_id, course_id)
//! - `certificates_certificate_number_key` on (certificate_number)
//! - `certificates_one_issued_per_course` partial index on
//!   (tenant_id, user_id, course_id) WHERE status = 'issued'

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

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
    course_totals::CourseTotals, date_range::DateRange, grade::Grade, milestone::Milestone,
    progress_status::ProgressStatus, verification_code::VerificationCode,
};
use crate::error::{CertificateError, CertificateResult, ProgressError, ProgressResult};

const PROGRESS_TRIPLE_KEY: &str = "course_progress_tenant_user_course_key";
const CERTIFICATE_NUMBER_KEY: &str = "certificates_certificate_number_key";
const ONE_ISSUED_CERTIFICATE: &str = "certificates_one_issued_per_course";

const PROGRESS_SELECT: &str = r#"
    SELECT
        progress_id,
        tenant_id,
        user_id,
        course_id,
        enrollment_id,
        status,
        completed_lessons,
        total_lessons,
        completed_quizzes,
        total_quizzes,
        time_spent_minutes,
        started_at,
        completed_at,
        last_accessed_at,
        certificate_id,
        created_at,
        updated_at
    FROM course_progress
"#;

const SNAPSHOT_SELECT: &str = r#"
    SELECT
        snapshot_id,
        tenant_id,
        user_id,
        course_id,
        progress_id,
        milestone,
        percentage,
        recorded_at
    FROM progress_snapshots
"#;

const CERTIFICATE_SELECT: &str = r#"
    SELECT
        certificate_id,
        tenant_id,
        user_id,
        course_id,
        enrollment_id,
        progress_id,
        template_id,
        certificate_number,
        verification_code,
        status,
        issued_at,
        completion_date,
        total_time_spent,
        expires_at,
        grade,
        revoked_at,
        revoked_by,
        revocation_reason,
        metadata,
        created_at,
        updated_at
    FROM certificates
"#;

const TEMPLATE_SELECT: &str = r#"
    SELECT
        template_id,
        tenant_id,
        name,
        description,
        configuration,
        is_default,
        is_active,
        created_at,
        updated_at
    FROM certificate_templates
"#;

/// PostgreSQL-backed learning repository
#[derive(Clone)]
pub struct PgLearningRepository {
    pool: PgPool,
}

impl PgLearningRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Name of the unique constraint a database error violated, if any
fn unique_violation(err: &sqlx::Error) -> Option<&str> {
    match err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => db_err.constraint(),
        _ => None,
    }
}

fn certificate_insert_error(err: sqlx::Error) -> ProgressError {
    match unique_violation(&err) {
        Some(CERTIFICATE_NUMBER_KEY) => CertificateError::NumberCollision.into(),
        Some(ONE_ISSUED_CERTIFICATE) => CertificateError::AlreadyCertified.into(),
        _ => ProgressError::Database(err),
    }
}

// ============================================================================
// Shared statements
// ============================================================================

async fn update_progress_row<'e, E>(
    executor: E,
    progress: &CourseProgress,
) -> Result<u64, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        UPDATE course_progress SET
            status = $3,
            completed_lessons = $4,
            total_lessons = $5,
            completed_quizzes = $6,
            total_quizzes = $7,
            time_spent_minutes = $8,
            started_at = $9,
            completed_at = $10,
            last_accessed_at = $11,
            certificate_id = $12,
            updated_at = $13
        WHERE tenant_id = $1 AND progress_id = $2
        "#,
    )
    .bind(progress.tenant_id.as_uuid())
    .bind(progress.id.as_uuid())
    .bind(progress.status.code())
    .bind(i64::from(progress.completed_lessons))
    .bind(i64::from(progress.total_lessons))
    .bind(i64::from(progress.completed_quizzes))
    .bind(i64::from(progress.total_quizzes))
    .bind(i64::from(progress.time_spent_minutes))
    .bind(progress.started_at)
    .bind(progress.completed_at)
    .bind(progress.last_accessed_at)
    .bind(progress.certificate_id.map(|id| id.into_uuid()))
    .bind(progress.updated_at)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

async fn insert_snapshot_row<'e, E>(
    executor: E,
    snapshot: &ProgressSnapshot,
) -> Result<(), sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO progress_snapshots (
            snapshot_id,
            tenant_id,
            user_id,
            course_id,
            progress_id,
            milestone,
            percentage,
            recorded_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(snapshot.id.as_uuid())
    .bind(snapshot.tenant_id.as_uuid())
    .bind(snapshot.user_id.as_uuid())
    .bind(snapshot.course_id.as_uuid())
    .bind(snapshot.progress_id.as_uuid())
    .bind(snapshot.milestone.code())
    .bind(snapshot.percentage)
    .bind(snapshot.recorded_at)
    .execute(executor)
    .await?;

    Ok(())
}

async fn insert_certificate_row<'e, E>(
    executor: E,
    certificate: &Certificate,
) -> Result<(), sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO certificates (
            certificate_id,
            tenant_id,
            user_id,
            course_id,
            enrollment_id,
            progress_id,
            template_id,
            certificate_number,
            verification_code,
            status,
            issued_at,
            completion_date,
            total_time_spent,
            expires_at,
            grade,
            revoked_at,
            revoked_by,
            revocation_reason,
            metadata,
            created_at,
            updated_at
        ) VALUES (
            $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11,
            $12, $13, $14, $15, $16, $17, $18, $19, $20, $21
        )
        "#,
    )
    .bind(certificate.id.as_uuid())
    .bind(certificate.tenant_id.as_uuid())
    .bind(certificate.user_id.as_uuid())
    .bind(certificate.course_id.as_uuid())
    .bind(certificate.enrollment_id.as_uuid())
    .bind(certificate.progress_id.as_uuid())
    .bind(certificate.template_id.map(|id| id.into_uuid()))
    .bind(certificate.certificate_number.as_str())
    .bind(certificate.verification_code.as_str())
    .bind(certificate.status.code())
    .bind(certificate.issued_at)
    .bind(certificate.completion_date)
    .bind(i64::from(certificate.total_time_spent))
    .bind(certificate.expires_at)
    .bind(certificate.grade.map(|g| g.value()))
    .bind(certificate.revoked_at)
    .bind(certificate.revoked_by.map(|id| id.into_uuid()))
    .bind(certificate.revocation_reason.as_deref())
    .bind(Json(&certificate.metadata))
    .bind(certificate.created_at)
    .bind(certificate.updated_at)
    .execute(executor)
    .await?;

    Ok(())
}

/// Writes only the fields certificate edits may change
async fn update_certificate_row<'e, E>(
    executor: E,
    certificate: &Certificate,
) -> Result<u64, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        UPDATE certificates SET
            template_id = $3,
            status = $4,
            expires_at = $5,
            grade = $6,
            revoked_at = $7,
            revoked_by = $8,
            revocation_reason = $9,
            metadata = $10,
            updated_at = $11
        WHERE tenant_id = $1 AND certificate_id = $2
        "#,
    )
    .bind(certificate.tenant_id.as_uuid())
    .bind(certificate.id.as_uuid())
    .bind(certificate.template_id.map(|id| id.into_uuid()))
    .bind(certificate.status.code())
    .bind(certificate.expires_at)
    .bind(certificate.grade.map(|g| g.value()))
    .bind(certificate.revoked_at)
    .bind(certificate.revoked_by.map(|id| id.into_uuid()))
    .bind(certificate.revocation_reason.as_deref())
    .bind(Json(&certificate.metadata))
    .bind(certificate.updated_at)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

// ============================================================================
// Course Catalog Implementation
// ============================================================================

impl CourseCatalog for PgLearningRepository {
    async fn course_totals(
        &self,
        tenant_id: TenantId,
        course_id: CourseId,
    ) -> ProgressResult<Option<CourseTotals>> {
        let row = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM lessons l
                    WHERE l.tenant_id = c.tenant_id AND l.course_id = c.course_id),
                (SELECT COUNT(*) FROM quizzes q
                    WHERE q.tenant_id = c.tenant_id AND q.course_id = c.course_id)
            FROM courses c
            WHERE c.tenant_id = $1 AND c.course_id = $2
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(course_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(lessons, quizzes)| -> ProgressResult<CourseTotals> {
            Ok(CourseTotals::new(
                to_count(lessons, "lesson count").map_err(ProgressError::Internal)?,
                to_count(quizzes, "quiz count").map_err(ProgressError::Internal)?,
            ))
        })
        .transpose()
    }
}

// ============================================================================
// Progress Repository Implementation
// ============================================================================

impl ProgressRepository for PgLearningRepository {
    async fn create_progress(&self, progress: &CourseProgress) -> ProgressResult<()> {
        sqlx::query(
            r#"
            INSERT INTO course_progress (
                progress_id,
                tenant_id,
                user_id,
                course_id,
                enrollment_id,
                status,
                completed_lessons,
                total_lessons,
                completed_quizzes,
                total_quizzes,
                time_spent_minutes,
                started_at,
                completed_at,
                last_accessed_at,
                certificate_id,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(progress.id.as_uuid())
        .bind(progress.tenant_id.as_uuid())
        .bind(progress.user_id.as_uuid())
        .bind(progress.course_id.as_uuid())
        .bind(progress.enrollment_id.as_uuid())
        .bind(progress.status.code())
        .bind(i64::from(progress.completed_lessons))
        .bind(i64::from(progress.total_lessons))
        .bind(i64::from(progress.completed_quizzes))
        .bind(i64::from(progress.total_quizzes))
        .bind(i64::from(progress.time_spent_minutes))
        .bind(progress.started_at)
        .bind(progress.completed_at)
        .bind(progress.last_accessed_at)
        .bind(progress.certificate_id.map(|id| id.into_uuid()))
        .bind(progress.created_at)
        .bind(progress.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match unique_violation(&e) {
            Some(PROGRESS_TRIPLE_KEY) => ProgressError::ProgressAlreadyExists,
            _ => ProgressError::Database(e),
        })?;

        Ok(())
    }

    async fn find_progress(
        &self,
        tenant_id: TenantId,
        progress_id: ProgressId,
    ) -> ProgressResult<Option<CourseProgress>> {
        let sql = format!("{PROGRESS_SELECT} WHERE tenant_id = $1 AND progress_id = $2");
        let row = sqlx::query_as::<_, ProgressRow>(&sql)
            .bind(tenant_id.as_uuid())
            .bind(progress_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| r.into_progress()).transpose()
    }

    async fn find_progress_by_user_course(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        course_id: CourseId,
    ) -> ProgressResult<Option<CourseProgress>> {
        let sql = format!(
            "{PROGRESS_SELECT} WHERE tenant_id = $1 AND user_id = $2 AND course_id = $3"
        );
        let row = sqlx::query_as::<_, ProgressRow>(&sql)
            .bind(tenant_id.as_uuid())
            .bind(user_id.as_uuid())
            .bind(course_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| r.into_progress()).transpose()
    }

    async fn list_progress_by_user(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
    ) -> ProgressResult<Vec<CourseProgress>> {
        let sql = format!(
            "{PROGRESS_SELECT} WHERE tenant_id = $1 AND user_id = $2 ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as::<_, ProgressRow>(&sql)
            .bind(tenant_id.as_uuid())
            .bind(user_id.as_uuid())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(|r| r.into_progress()).collect()
    }

    async fn list_progress_by_course(
        &self,
        tenant_id: TenantId,
        course_id: CourseId,
    ) -> ProgressResult<Vec<CourseProgress>> {
        let sql = format!(
            "{PROGRESS_SELECT} WHERE tenant_id = $1 AND course_id = $2 ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as::<_, ProgressRow>(&sql)
            .bind(tenant_id.as_uuid())
            .bind(course_id.as_uuid())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(|r| r.into_progress()).collect()
    }

    async fn update_progress(&self, progress: &CourseProgress) -> ProgressResult<()> {
        if update_progress_row(&self.pool, progress).await? == 0 {
            return Err(ProgressError::ProgressNotFound);
        }
        Ok(())
    }
}

// ============================================================================
// Snapshot Repository Implementation
// ============================================================================

impl SnapshotRepository for PgLearningRepository {
    async fn append_snapshots(&self, snapshots: &[ProgressSnapshot]) -> ProgressResult<()> {
        if snapshots.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for snapshot in snapshots {
            insert_snapshot_row(&mut *tx, snapshot).await?;
        }
        tx.commit().await?;

        Ok(())
    }

    async fn list_snapshots(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        course_id: CourseId,
        range: &DateRange,
    ) -> ProgressResult<Vec<ProgressSnapshot>> {
        let sql = format!(
            r#"{SNAPSHOT_SELECT}
            WHERE tenant_id = $1 AND user_id = $2 AND course_id = $3
              AND ($4::timestamptz IS NULL OR recorded_at >= $4)
              AND ($5::timestamptz IS NULL OR recorded_at <= $5)
            ORDER BY recorded_at ASC"#
        );
        let rows = sqlx::query_as::<_, SnapshotRow>(&sql)
            .bind(tenant_id.as_uuid())
            .bind(user_id.as_uuid())
            .bind(course_id.as_uuid())
            .bind(range.from())
            .bind(range.to())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(|r| r.into_snapshot()).collect()
    }

    async fn list_snapshots_by_milestone(
        &self,
        tenant_id: TenantId,
        course_id: CourseId,
        milestone: Milestone,
    ) -> ProgressResult<Vec<ProgressSnapshot>> {
        let sql = format!(
            "{SNAPSHOT_SELECT} WHERE tenant_id = $1 AND course_id = $2 AND milestone = $3 \
             ORDER BY recorded_at ASC"
        );
        let rows = sqlx::query_as::<_, SnapshotRow>(&sql)
            .bind(tenant_id.as_uuid())
            .bind(course_id.as_uuid())
            .bind(milestone.code())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(|r| r.into_snapshot()).collect()
    }
}

// ============================================================================
// Certificate Repository Implementation
// ============================================================================

impl CertificateRepository for PgLearningRepository {
    async fn find_certificate(
        &self,
        tenant_id: TenantId,
        certificate_id: CertificateId,
    ) -> CertificateResult<Option<Certificate>> {
        let sql = format!("{CERTIFICATE_SELECT} WHERE tenant_id = $1 AND certificate_id = $2");
        let row = sqlx::query_as::<_, CertificateRow>(&sql)
            .bind(tenant_id.as_uuid())
            .bind(certificate_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| r.into_certificate()).transpose()
    }

    async fn find_certificate_by_number(
        &self,
        tenant_id: TenantId,
        number: &CertificateNumber,
    ) -> CertificateResult<Option<Certificate>> {
        let sql =
            format!("{CERTIFICATE_SELECT} WHERE tenant_id = $1 AND certificate_number = $2");
        let row = sqlx::query_as::<_, CertificateRow>(&sql)
            .bind(tenant_id.as_uuid())
            .bind(number.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| r.into_certificate()).transpose()
    }

    async fn find_issued_certificate(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        course_id: CourseId,
    ) -> CertificateResult<Option<Certificate>> {
        let sql = format!(
            "{CERTIFICATE_SELECT} WHERE tenant_id = $1 AND user_id = $2 AND course_id = $3 \
             AND status = 'issued'"
        );
        let row = sqlx::query_as::<_, CertificateRow>(&sql)
            .bind(tenant_id.as_uuid())
            .bind(user_id.as_uuid())
            .bind(course_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| r.into_certificate()).transpose()
    }

    async fn list_certificates_by_user(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
    ) -> CertificateResult<Vec<Certificate>> {
        let sql = format!(
            "{CERTIFICATE_SELECT} WHERE tenant_id = $1 AND user_id = $2 ORDER BY issued_at DESC"
        );
        let rows = sqlx::query_as::<_, CertificateRow>(&sql)
            .bind(tenant_id.as_uuid())
            .bind(user_id.as_uuid())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(|r| r.into_certificate()).collect()
    }

    async fn update_certificate(&self, certificate: &Certificate) -> CertificateResult<()> {
        let updated = update_certificate_row(&self.pool, certificate)
            .await
            .map_err(|e| match unique_violation(&e) {
                Some(ONE_ISSUED_CERTIFICATE) => CertificateError::AlreadyCertified,
                _ => CertificateError::Database(e),
            })?;
        if updated == 0 {
            return Err(CertificateError::CertificateNotFound);
        }
        Ok(())
    }

    async fn expire_overdue_certificates(&self, now: DateTime<Utc>) -> CertificateResult<u64> {
        let expired = sqlx::query(
            r#"
            UPDATE certificates SET
                status = 'expired',
                updated_at = $1
            WHERE status = 'issued'
              AND expires_at IS NOT NULL
              AND expires_at <= $1
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(expired)
    }
}

// ============================================================================
// Certificate Template Repository Implementation
// ============================================================================

impl CertificateTemplateRepository for PgLearningRepository {
    async fn create_template(&self, template: &CertificateTemplate) -> CertificateResult<()> {
        sqlx::query(
            r#"
            INSERT INTO certificate_templates (
                template_id,
                tenant_id,
                name,
                description,
                configuration,
                is_default,
                is_active,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(template.id.as_uuid())
        .bind(template.tenant_id.as_uuid())
        .bind(&template.name)
        .bind(template.description.as_deref())
        .bind(Json(&template.configuration))
        .bind(template.is_default)
        .bind(template.is_active)
        .bind(template.created_at)
        .bind(template.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_template(
        &self,
        tenant_id: TenantId,
        template_id: TemplateId,
    ) -> CertificateResult<Option<CertificateTemplate>> {
        let sql = format!("{TEMPLATE_SELECT} WHERE tenant_id = $1 AND template_id = $2");
        let row = sqlx::query_as::<_, TemplateRow>(&sql)
            .bind(tenant_id.as_uuid())
            .bind(template_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(TemplateRow::into_template))
    }

    async fn find_default_template(
        &self,
        tenant_id: TenantId,
    ) -> CertificateResult<Option<CertificateTemplate>> {
        let sql = format!("{TEMPLATE_SELECT} WHERE tenant_id = $1 AND is_default LIMIT 1");
        let row = sqlx::query_as::<_, TemplateRow>(&sql)
            .bind(tenant_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(TemplateRow::into_template))
    }

    async fn list_templates(
        &self,
        tenant_id: TenantId,
    ) -> CertificateResult<Vec<CertificateTemplate>> {
        let sql = format!("{TEMPLATE_SELECT} WHERE tenant_id = $1 ORDER BY name ASC");
        let rows = sqlx::query_as::<_, TemplateRow>(&sql)
            .bind(tenant_id.as_uuid())
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(TemplateRow::into_template).collect())
    }

    async fn update_template(&self, template: &CertificateTemplate) -> CertificateResult<()> {
        let updated = sqlx::query(
            r#"
            UPDATE certificate_templates SET
                name = $3,
                description = $4,
                configuration = $5,
                is_default = $6,
                is_active = $7,
                updated_at = $8
            WHERE tenant_id = $1 AND template_id = $2
            "#,
        )
        .bind(template.tenant_id.as_uuid())
        .bind(template.id.as_uuid())
        .bind(&template.name)
        .bind(template.description.as_deref())
        .bind(Json(&template.configuration))
        .bind(template.is_default)
        .bind(template.is_active)
        .bind(template.updated_at)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(CertificateError::TemplateNotFound);
        }
        Ok(())
    }

    async fn make_default_template(
        &self,
        tenant_id: TenantId,
        template_id: TemplateId,
    ) -> CertificateResult<CertificateTemplate> {
        let mut tx = self.pool.begin().await?;

        let sql = format!("{TEMPLATE_SELECT} WHERE tenant_id = $1 AND template_id = $2 FOR UPDATE");
        let mut template = sqlx::query_as::<_, TemplateRow>(&sql)
            .bind(tenant_id.as_uuid())
            .bind(template_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await?
            .map(TemplateRow::into_template)
            .ok_or(CertificateError::TemplateNotFound)?;
        template.set_as_default()?;

        sqlx::query(
            r#"
            UPDATE certificate_templates SET
                is_default = FALSE,
                updated_at = $3
            WHERE tenant_id = $1 AND is_default AND template_id <> $2
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(template_id.as_uuid())
        .bind(template.updated_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE certificate_templates SET
                is_default = TRUE,
                updated_at = $3
            WHERE tenant_id = $1 AND template_id = $2
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(template_id.as_uuid())
        .bind(template.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(template)
    }
}

// ============================================================================
// Unit of Work Implementation
// ============================================================================

impl LearningUnitOfWork for PgLearningRepository {
    async fn complete_course(
        &self,
        progress: &CourseProgress,
        new_certificate: Option<&Certificate>,
        expired_certificate: Option<&Certificate>,
        snapshots: &[ProgressSnapshot],
    ) -> ProgressResult<()> {
        let mut tx = self.pool.begin().await?;

        // Must land before the insert so the one-issued index sees it expired
        if let Some(certificate) = expired_certificate {
            if update_certificate_row(&mut *tx, certificate).await? == 0 {
                return Err(CertificateError::CertificateNotFound.into());
            }
        }

        if let Some(certificate) = new_certificate {
            insert_certificate_row(&mut *tx, certificate)
                .await
                .map_err(certificate_insert_error)?;
        }

        if update_progress_row(&mut *tx, progress).await? == 0 {
            return Err(ProgressError::ProgressNotFound);
        }

        for snapshot in snapshots {
            insert_snapshot_row(&mut *tx, snapshot).await?;
        }

        tx.commit().await?;

        Ok(())
    }

    async fn reset_course(
        &self,
        progress: &CourseProgress,
        revoked_certificate: Option<&Certificate>,
    ) -> ProgressResult<()> {
        let mut tx = self.pool.begin().await?;

        if let Some(certificate) = revoked_certificate {
            if update_certificate_row(&mut *tx, certificate).await? == 0 {
                return Err(CertificateError::CertificateNotFound.into());
            }
        }

        if update_progress_row(&mut *tx, progress).await? == 0 {
            return Err(ProgressError::ProgressNotFound);
        }

        tx.commit().await?;

        Ok(())
    }
}

// ============================================================================
// Row Types for sqlx mapping
// ============================================================================

fn to_count(value: i64, field: &str) -> Result<u32, String> {
    u32::try_from(value).map_err(|_| format!("Invalid {}: {}", field, value))
}

#[derive(sqlx::FromRow)]
struct ProgressRow {
    progress_id: Uuid,
    tenant_id: Uuid,
    user_id: Uuid,
    course_id: Uuid,
    enrollment_id: Uuid,
    status: String,
    completed_lessons: i64,
    total_lessons: i64,
    completed_quizzes: i64,
    total_quizzes: i64,
    time_spent_minutes: i64,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    last_accessed_at: Option<DateTime<Utc>>,
    certificate_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProgressRow {
    fn into_progress(self) -> ProgressResult<CourseProgress> {
        let status = ProgressStatus::from_code(&self.status).ok_or_else(|| {
            ProgressError::Internal(format!("Invalid progress status: {}", self.status))
        })?;
        let count = |value: i64, field: &str| to_count(value, field).map_err(ProgressError::Internal);

        Ok(CourseProgress {
            id: ProgressId::from_uuid(self.progress_id),
            tenant_id: TenantId::from_uuid(self.tenant_id),
            user_id: UserId::from_uuid(self.user_id),
            course_id: CourseId::from_uuid(self.course_id),
            enrollment_id: self.enrollment_id.into(),
            status,
            completed_lessons: count(self.completed_lessons, "completed_lessons")?,
            total_lessons: count(self.total_lessons, "total_lessons")?,
            completed_quizzes: count(self.completed_quizzes, "completed_quizzes")?,
            total_quizzes: count(self.total_quizzes, "total_quizzes")?,
            time_spent_minutes: count(self.time_spent_minutes, "time_spent_minutes")?,
            started_at: self.started_at,
            completed_at: self.completed_at,
            last_accessed_at: self.last_accessed_at,
            certificate_id: self.certificate_id.map(CertificateId::from_uuid),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SnapshotRow {
    snapshot_id: Uuid,
    tenant_id: Uuid,
    user_id: Uuid,
    course_id: Uuid,
    progress_id: Uuid,
    milestone: String,
    percentage: f64,
    recorded_at: DateTime<Utc>,
}

impl SnapshotRow {
    fn into_snapshot(self) -> ProgressResult<ProgressSnapshot> {
        let milestone = Milestone::from_code(&self.milestone).ok_or_else(|| {
            ProgressError::Internal(format!("Invalid milestone: {}", self.milestone))
        })?;

        Ok(ProgressSnapshot {
            id: self.snapshot_id.into(),
            tenant_id: TenantId::from_uuid(self.tenant_id),
            user_id: UserId::from_uuid(self.user_id),
            course_id: CourseId::from_uuid(self.course_id),
            progress_id: ProgressId::from_uuid(self.progress_id),
            milestone,
            percentage: self.percentage,
            recorded_at: self.recorded_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CertificateRow {
    certificate_id: Uuid,
    tenant_id: Uuid,
    user_id: Uuid,
    course_id: Uuid,
    enrollment_id: Uuid,
    progress_id: Uuid,
    template_id: Option<Uuid>,
    certificate_number: String,
    verification_code: String,
    status: String,
    issued_at: DateTime<Utc>,
    completion_date: DateTime<Utc>,
    total_time_spent: i64,
    expires_at: Option<DateTime<Utc>>,
    grade: Option<f64>,
    revoked_at: Option<DateTime<Utc>>,
    revoked_by: Option<Uuid>,
    revocation_reason: Option<String>,
    metadata: Json<Map<String, Value>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CertificateRow {
    fn into_certificate(self) -> CertificateResult<Certificate> {
        let status = CertificateStatus::from_code(&self.status).ok_or_else(|| {
            CertificateError::Internal(format!("Invalid certificate status: {}", self.status))
        })?;
        let grade = self
            .grade
            .map(|g| {
                Grade::new(g).ok_or_else(|| CertificateError::Internal(format!("Invalid grade: {}", g)))
            })
            .transpose()?;
        let total_time_spent =
            to_count(self.total_time_spent, "total_time_spent").map_err(CertificateError::Internal)?;

        Ok(Certificate {
            id: CertificateId::from_uuid(self.certificate_id),
            tenant_id: TenantId::from_uuid(self.tenant_id),
            user_id: UserId::from_uuid(self.user_id),
            course_id: CourseId::from_uuid(self.course_id),
            enrollment_id: self.enrollment_id.into(),
            progress_id: ProgressId::from_uuid(self.progress_id),
            template_id: self.template_id.map(TemplateId::from_uuid),
            certificate_number: CertificateNumber::from_stored(self.certificate_number),
            verification_code: VerificationCode::from_stored(self.verification_code),
            status,
            issued_at: self.issued_at,
            completion_date: self.completion_date,
            total_time_spent,
            expires_at: self.expires_at,
            grade,
            revoked_at: self.revoked_at,
            revoked_by: self.revoked_by.map(UserId::from_uuid),
            revocation_reason: self.revocation_reason,
            metadata: self.metadata.0,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TemplateRow {
    template_id: Uuid,
    tenant_id: Uuid,
    name: String,
    description: Option<String>,
    configuration: Json<Map<String, Value>>,
    is_default: bool,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TemplateRow {
    fn into_template(self) -> CertificateTemplate {
        CertificateTemplate {
            id: TemplateId::from_uuid(self.template_id),
            tenant_id: TenantId::from_uuid(self.tenant_id),
            name: self.name,
            description: self.description,
            configuration: self.configuration.0,
            is_default: self.is_default,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::certificate::CertificateSubject;
    use chrono::Duration;
    use kernel::error::category::Categorized;
    use kernel::id::EnrollmentId;
    use serde_json::json;

    fn progress() -> CourseProgress {
        let mut progress = CourseProgress::new(
            TenantId::new(),
            UserId::new(),
            CourseId::new(),
            EnrollmentId::new(),
            CourseTotals::new(4, 2),
        );
        progress.apply_counts(2, 1, 35).unwrap();
        progress
    }

    fn progress_row(p: &CourseProgress) -> ProgressRow {
        ProgressRow {
            progress_id: p.id.into_uuid(),
            tenant_id: p.tenant_id.into_uuid(),
            user_id: p.user_id.into_uuid(),
            course_id: p.course_id.into_uuid(),
            enrollment_id: p.enrollment_id.into_uuid(),
            status: p.status.code().to_string(),
            completed_lessons: i64::from(p.completed_lessons),
            total_lessons: i64::from(p.total_lessons),
            completed_quizzes: i64::from(p.completed_quizzes),
            total_quizzes: i64::from(p.total_quizzes),
            time_spent_minutes: i64::from(p.time_spent_minutes),
            started_at: p.started_at,
            completed_at: p.completed_at,
            last_accessed_at: p.last_accessed_at,
            certificate_id: p.certificate_id.map(|id| id.into_uuid()),
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }

    fn certificate() -> Certificate {
        let now = Utc::now();
        let mut certificate = Certificate::issue(
            CertificateSubject::from(&progress()),
            now,
            35,
            now,
            Some(Duration::days(30)),
        );
        certificate.set_grade(88.5).unwrap();
        certificate.add_metadata("instructor", json!("Dr. Kim")).unwrap();
        certificate
    }

    fn certificate_row(c: &Certificate) -> CertificateRow {
        CertificateRow {
            certificate_id: c.id.into_uuid(),
            tenant_id: c.tenant_id.into_uuid(),
            user_id: c.user_id.into_uuid(),
            course_id: c.course_id.into_uuid(),
            enrollment_id: c.enrollment_id.into_uuid(),
            progress_id: c.progress_id.into_uuid(),
            template_id: c.template_id.map(|id| id.into_uuid()),
            certificate_number: c.certificate_number.as_str().to_string(),
            verification_code: c.verification_code.as_str().to_string(),
            status: c.status.code().to_string(),
            issued_at: c.issued_at,
            completion_date: c.completion_date,
            total_time_spent: i64::from(c.total_time_spent),
            expires_at: c.expires_at,
            grade: c.grade.map(|g| g.value()),
            revoked_at: c.revoked_at,
            revoked_by: c.revoked_by.map(|id| id.into_uuid()),
            revocation_reason: c.revocation_reason.clone(),
            metadata: Json(c.metadata.clone()),
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }

    #[test]
    fn test_to_count_bounds() {
        assert_eq!(to_count(0, "x"), Ok(0));
        assert_eq!(to_count(i64::from(u32::MAX), "x"), Ok(u32::MAX));
        assert_eq!(
            to_count(-1, "completed_lessons"),
            Err("Invalid completed_lessons: -1".to_string())
        );
        assert!(to_count(i64::from(u32::MAX) + 1, "x").is_err());
    }

    #[test]
    fn test_progress_row_maps_back() {
        let p = progress();
        assert_eq!(progress_row(&p).into_progress().unwrap(), p);
    }

    #[test]
    fn test_progress_row_rejects_bad_values() {
        let p = progress();

        let mut row = progress_row(&p);
        row.completed_lessons = -3;
        let err = row.into_progress().unwrap_err();
        assert!(matches!(&err, ProgressError::Internal(msg) if msg.contains("completed_lessons")));
        assert!(err.is_database());

        let mut row = progress_row(&p);
        row.status = "finished".to_string();
        assert!(matches!(
            row.into_progress(),
            Err(ProgressError::Internal(msg)) if msg.contains("finished")
        ));
    }

    #[test]
    fn test_snapshot_row_rejects_unknown_milestone() {
        let p = progress();
        let snapshot = ProgressSnapshot::capture(&p, Milestone::Half);
        let row = |milestone: &str| SnapshotRow {
            snapshot_id: snapshot.id.into_uuid(),
            tenant_id: snapshot.tenant_id.into_uuid(),
            user_id: snapshot.user_id.into_uuid(),
            course_id: snapshot.course_id.into_uuid(),
            progress_id: snapshot.progress_id.into_uuid(),
            milestone: milestone.to_string(),
            percentage: snapshot.percentage,
            recorded_at: snapshot.recorded_at,
        };

        assert_eq!(row(Milestone::Half.code()).into_snapshot().unwrap(), snapshot);
        assert!(row("halfway").into_snapshot().is_err());
    }

    #[test]
    fn test_certificate_row_maps_back() {
        let c = certificate();
        let mapped = certificate_row(&c).into_certificate().unwrap();
        assert_eq!(mapped, c);
        assert!(mapped.verify_code(c.verification_code.as_str()));
    }

    #[test]
    fn test_certificate_row_rejects_bad_values() {
        let c = certificate();

        let mut row = certificate_row(&c);
        row.status = "ISSUED".to_string();
        assert!(matches!(
            row.into_certificate(),
            Err(CertificateError::Internal(msg)) if msg.contains("ISSUED")
        ));

        let mut row = certificate_row(&c);
        row.grade = Some(120.0);
        assert!(matches!(row.into_certificate(), Err(CertificateError::Internal(_))));

        let mut row = certificate_row(&c);
        row.total_time_spent = -1;
        assert!(matches!(
            row.into_certificate(),
            Err(CertificateError::Internal(msg)) if msg.contains("total_time_spent")
        ));
    }

    #[test]
    fn test_template_row_maps_back() {
        let template = CertificateTemplate::new(
            TenantId::new(),
            "Classic",
            Some("Landscape layout".to_string()),
            r#"{"layout": "landscape"}"#,
        )
        .unwrap();
        let row = TemplateRow {
            template_id: template.id.into_uuid(),
            tenant_id: template.tenant_id.into_uuid(),
            name: template.name.clone(),
            description: template.description.clone(),
            configuration: Json(template.configuration.clone()),
            is_default: template.is_default,
            is_active: template.is_active,
            created_at: template.created_at,
            updated_at: template.updated_at,
        };
        assert_eq!(row.into_template(), template);
    }
}
