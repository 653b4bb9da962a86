//! API DTOs (Data Transfer Objects)
//!
//! Counters arrive as signed JSON numbers and are range-checked here, before
//! anything reaches the domain.

use chrono::{DateTime, Utc};
use kernel::id::UserId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::application::{
    CompletionOutput, QuizAttemptInput, QuizAttemptOutput, ResetPolicy, UpdateProgressInput,
    VerificationOutcome,
};
use crate::domain::entity::{
    certificate::Certificate, certificate_template::CertificateTemplate,
    course_progress::CourseProgress, progress_snapshot::ProgressSnapshot,
};
use crate::domain::services::QuizGrade;
use crate::domain::value_object::{
    certificate_status::CertificateStatus, milestone::Milestone, progress_status::ProgressStatus,
};
use crate::error::{ProgressError, ProgressResult};

fn count(value: i64, field: &str) -> ProgressResult<u32> {
    if value < 0 {
        return Err(ProgressError::InvalidProgressData(format!(
            "{} must not be negative",
            field
        )));
    }
    u32::try_from(value)
        .map_err(|_| ProgressError::InvalidProgressData(format!("{} is out of range", field)))
}

// ============================================================================
// Progress
// ============================================================================

/// Request for POST /tenants/{tenant_id}/progress
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeProgressRequest {
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub enrollment_id: Uuid,
}

/// Request for PUT /tenants/{tenant_id}/progress/{progress_id}
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProgressRequest {
    pub completed_lessons: i64,
    pub completed_quizzes: i64,
    pub time_spent_minutes: i64,
}

impl UpdateProgressRequest {
    pub fn into_input(self) -> ProgressResult<UpdateProgressInput> {
        Ok(UpdateProgressInput {
            completed_lessons: count(self.completed_lessons, "completedLessons")?,
            completed_quizzes: count(self.completed_quizzes, "completedQuizzes")?,
            time_spent_minutes: count(self.time_spent_minutes, "timeSpentMinutes")?,
        })
    }
}

/// Request for POST .../lessons
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordLessonRequest {
    #[serde(default)]
    pub minutes: i64,
}

impl RecordLessonRequest {
    pub fn minutes(&self) -> ProgressResult<u32> {
        count(self.minutes, "minutes")
    }
}

/// Request for POST .../quizzes
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResultRequest {
    pub points_earned: f64,
    pub points_possible: f64,
    #[serde(default)]
    pub minutes: i64,
}

impl QuizResultRequest {
    pub fn into_input(self) -> ProgressResult<QuizAttemptInput> {
        Ok(QuizAttemptInput {
            points_earned: self.points_earned,
            points_possible: self.points_possible,
            minutes: count(self.minutes, "minutes")?,
        })
    }
}

/// Request for POST .../reset
///
/// An empty body keeps the certificate.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetProgressRequest {
    #[serde(default)]
    pub revoke_certificate: bool,
    pub revoked_by: Option<Uuid>,
    pub reason: Option<String>,
}

impl ResetProgressRequest {
    pub fn into_policy(self) -> ProgressResult<ResetPolicy> {
        if !self.revoke_certificate {
            return Ok(ResetPolicy::KeepCertificate);
        }
        let revoked_by = self.revoked_by.ok_or_else(|| {
            ProgressError::InvalidProgressData(
                "revokedBy is required when revoking the certificate".to_string(),
            )
        })?;
        Ok(ResetPolicy::RevokeCertificate {
            revoked_by: UserId::from_uuid(revoked_by),
            reason: self.reason.unwrap_or_default(),
        })
    }
}

/// Query for GET .../history
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// Course progress as returned by every progress endpoint
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressResponse {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub enrollment_id: Uuid,
    pub status: ProgressStatus,
    pub completed_lessons: u32,
    pub total_lessons: u32,
    pub completed_quizzes: u32,
    pub total_quizzes: u32,
    pub percentage: f64,
    pub time_spent_minutes: u32,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_accessed_at: Option<DateTime<Utc>>,
    pub certificate_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CourseProgress> for ProgressResponse {
    fn from(p: CourseProgress) -> Self {
        Self {
            percentage: p.percentage(),
            id: p.id.into_uuid(),
            tenant_id: p.tenant_id.into_uuid(),
            user_id: p.user_id.into_uuid(),
            course_id: p.course_id.into_uuid(),
            enrollment_id: p.enrollment_id.into_uuid(),
            status: p.status,
            completed_lessons: p.completed_lessons,
            total_lessons: p.total_lessons,
            completed_quizzes: p.completed_quizzes,
            total_quizzes: p.total_quizzes,
            time_spent_minutes: p.time_spent_minutes,
            started_at: p.started_at,
            completed_at: p.completed_at,
            last_accessed_at: p.last_accessed_at,
            certificate_id: p.certificate_id.map(|id| id.into_uuid()),
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResultResponse {
    pub progress: ProgressResponse,
    pub grade: QuizGrade,
}

impl From<QuizAttemptOutput> for QuizResultResponse {
    fn from(output: QuizAttemptOutput) -> Self {
        Self {
            progress: output.progress.into(),
            grade: output.grade,
        }
    }
}

/// Response for POST .../complete
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResponse {
    pub progress: ProgressResponse,
    pub certificate: CertificateResponse,
    pub newly_issued: bool,
}

impl From<CompletionOutput> for CompletionResponse {
    fn from(output: CompletionOutput) -> Self {
        Self {
            progress: output.progress.into(),
            certificate: output.certificate.into(),
            newly_issued: output.newly_issued,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotResponse {
    pub id: Uuid,
    pub progress_id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub milestone: Milestone,
    pub percentage: f64,
    pub recorded_at: DateTime<Utc>,
}

impl From<ProgressSnapshot> for SnapshotResponse {
    fn from(s: ProgressSnapshot) -> Self {
        Self {
            id: s.id.into_uuid(),
            progress_id: s.progress_id.into_uuid(),
            user_id: s.user_id.into_uuid(),
            course_id: s.course_id.into_uuid(),
            milestone: s.milestone,
            percentage: s.percentage,
            recorded_at: s.recorded_at,
        }
    }
}

// ============================================================================
// Certificates
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevokeCertificateRequest {
    pub revoked_by: Uuid,
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetExpirationRequest {
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetGradeRequest {
    pub grade: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetTemplateRequest {
    pub template_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddMetadataRequest {
    pub key: String,
    pub value: Value,
}

/// Request for POST /tenants/{tenant_id}/certificates/verify
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyCertificateRequest {
    pub certificate_number: String,
    pub verification_code: String,
}

/// Full certificate, for the holder and administrators
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateResponse {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub enrollment_id: Uuid,
    pub progress_id: Uuid,
    pub template_id: Option<Uuid>,
    pub certificate_number: String,
    pub verification_code: String,
    pub status: CertificateStatus,
    pub is_valid: bool,
    pub issued_at: DateTime<Utc>,
    pub completion_date: DateTime<Utc>,
    pub total_time_spent: u32,
    pub expires_at: Option<DateTime<Utc>>,
    pub grade: Option<f64>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revoked_by: Option<Uuid>,
    pub revocation_reason: Option<String>,
    pub metadata: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Certificate> for CertificateResponse {
    fn from(c: Certificate) -> Self {
        Self {
            is_valid: c.is_valid(),
            id: c.id.into_uuid(),
            tenant_id: c.tenant_id.into_uuid(),
            user_id: c.user_id.into_uuid(),
            course_id: c.course_id.into_uuid(),
            enrollment_id: c.enrollment_id.into_uuid(),
            progress_id: c.progress_id.into_uuid(),
            template_id: c.template_id.map(|id| id.into_uuid()),
            certificate_number: c.certificate_number.into_inner(),
            verification_code: c.verification_code.as_str().to_string(),
            status: c.status,
            issued_at: c.issued_at,
            completion_date: c.completion_date,
            total_time_spent: c.total_time_spent,
            expires_at: c.expires_at,
            grade: c.grade.map(|g| g.value()),
            revoked_at: c.revoked_at,
            revoked_by: c.revoked_by.map(|id| id.into_uuid()),
            revocation_reason: c.revocation_reason,
            metadata: c.metadata,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

/// Public verification verdict
///
/// Certificate details are present only when the code matched.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyCertificateResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<CertificateStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<VerificationOutcome> for VerifyCertificateResponse {
    fn from(outcome: VerificationOutcome) -> Self {
        let valid = outcome.is_valid();
        match outcome {
            VerificationOutcome::Matched(c) => Self {
                valid,
                status: Some(c.status),
                certificate_number: Some(c.certificate_number.into_inner()),
                user_id: Some(c.user_id.into_uuid()),
                course_id: Some(c.course_id.into_uuid()),
                issued_at: Some(c.issued_at),
                expires_at: c.expires_at,
            },
            VerificationOutcome::Unknown | VerificationOutcome::Mismatch => Self {
                valid: false,
                status: None,
                certificate_number: None,
                user_id: None,
                course_id: None,
                issued_at: None,
                expires_at: None,
            },
        }
    }
}

// ============================================================================
// Templates
// ============================================================================

/// Request for POST /tenants/{tenant_id}/certificate-templates
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTemplateRequest {
    pub name: String,
    pub description: Option<String>,
    /// Must be a JSON object; defaults to `{}`
    #[serde(default)]
    pub configuration: Option<Value>,
    #[serde(default)]
    pub make_default: bool,
}

impl CreateTemplateRequest {
    pub fn configuration_text(&self) -> String {
        self.configuration
            .as_ref()
            .map_or_else(|| "{}".to_string(), Value::to_string)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateConfigurationRequest {
    pub configuration: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateResponse {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub configuration: Map<String, Value>,
    pub is_default: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CertificateTemplate> for TemplateResponse {
    fn from(t: CertificateTemplate) -> Self {
        Self {
            id: t.id.into_uuid(),
            tenant_id: t.tenant_id.into_uuid(),
            name: t.name,
            description: t.description,
            configuration: t.configuration,
            is_default: t.is_default,
            is_active: t.is_active,
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}
