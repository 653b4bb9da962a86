//! HTTP Handlers

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use kernel::id::{CertificateId, CourseId, EnrollmentId, ProgressId, TemplateId, TenantId, UserId};
use uuid::Uuid;

use crate::application::{
    CertificateService, CourseCompletionStats, CreateTemplateInput, LearningStore,
    ProgressService, TemplateService,
};
use crate::domain::value_object::milestone::Milestone;
use crate::error::{CertificateResult, ProgressError, ProgressResult};
use crate::presentation::dto::{
    AddMetadataRequest, CertificateResponse, CompletionResponse, CreateTemplateRequest,
    HistoryQuery, InitializeProgressRequest, ProgressResponse, QuizResultRequest,
    QuizResultResponse, RecordLessonRequest, ResetProgressRequest, RevokeCertificateRequest,
    SetExpirationRequest, SetGradeRequest, SetTemplateRequest, SnapshotResponse,
    TemplateResponse, UpdateConfigurationRequest, UpdateProgressRequest,
    VerifyCertificateRequest, VerifyCertificateResponse,
};

/// Shared state for learning handlers
pub struct LearningAppState<R>
where
    R: LearningStore,
{
    pub progress: ProgressService<R>,
    pub certificates: CertificateService<R>,
    pub templates: TemplateService<R>,
}

impl<R> Clone for LearningAppState<R>
where
    R: LearningStore,
{
    fn clone(&self) -> Self {
        Self {
            progress: self.progress.clone(),
            certificates: self.certificates.clone(),
            templates: self.templates.clone(),
        }
    }
}

// ============================================================================
// Progress
// ============================================================================

/// POST /tenants/{tenant_id}/progress
pub async fn initialize_progress<R>(
    State(state): State<LearningAppState<R>>,
    Path(tenant_id): Path<Uuid>,
    Json(req): Json<InitializeProgressRequest>,
) -> ProgressResult<(StatusCode, Json<ProgressResponse>)>
where
    R: LearningStore,
{
    let progress = state
        .progress
        .initialize_progress(
            TenantId::from_uuid(tenant_id),
            UserId::from_uuid(req.user_id),
            CourseId::from_uuid(req.course_id),
            EnrollmentId::from_uuid(req.enrollment_id),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(progress.into())))
}

/// GET /tenants/{tenant_id}/progress/{progress_id}
pub async fn get_progress<R>(
    State(state): State<LearningAppState<R>>,
    Path((tenant_id, progress_id)): Path<(Uuid, Uuid)>,
) -> ProgressResult<Json<ProgressResponse>>
where
    R: LearningStore,
{
    let progress = state
        .progress
        .get_progress(TenantId::from_uuid(tenant_id), ProgressId::from_uuid(progress_id))
        .await?;

    Ok(Json(progress.into()))
}

/// PUT /tenants/{tenant_id}/progress/{progress_id}
pub async fn update_progress<R>(
    State(state): State<LearningAppState<R>>,
    Path((tenant_id, progress_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdateProgressRequest>,
) -> ProgressResult<Json<ProgressResponse>>
where
    R: LearningStore,
{
    let input = req.into_input()?;
    let progress = state
        .progress
        .update_progress_data(
            TenantId::from_uuid(tenant_id),
            ProgressId::from_uuid(progress_id),
            input,
        )
        .await?;

    Ok(Json(progress.into()))
}

/// POST /tenants/{tenant_id}/progress/{progress_id}/start
pub async fn start_progress<R>(
    State(state): State<LearningAppState<R>>,
    Path((tenant_id, progress_id)): Path<(Uuid, Uuid)>,
) -> ProgressResult<Json<ProgressResponse>>
where
    R: LearningStore,
{
    let progress = state
        .progress
        .mark_progress_as_started(TenantId::from_uuid(tenant_id), ProgressId::from_uuid(progress_id))
        .await?;

    Ok(Json(progress.into()))
}

/// POST /tenants/{tenant_id}/progress/{progress_id}/lessons
pub async fn record_lesson<R>(
    State(state): State<LearningAppState<R>>,
    Path((tenant_id, progress_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<RecordLessonRequest>,
) -> ProgressResult<Json<ProgressResponse>>
where
    R: LearningStore,
{
    let minutes = req.minutes()?;
    let progress = state
        .progress
        .record_lesson_completion(
            TenantId::from_uuid(tenant_id),
            ProgressId::from_uuid(progress_id),
            minutes,
        )
        .await?;

    Ok(Json(progress.into()))
}

/// POST /tenants/{tenant_id}/progress/{progress_id}/quizzes
pub async fn record_quiz<R>(
    State(state): State<LearningAppState<R>>,
    Path((tenant_id, progress_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<QuizResultRequest>,
) -> ProgressResult<Json<QuizResultResponse>>
where
    R: LearningStore,
{
    let input = req.into_input()?;
    let output = state
        .progress
        .record_quiz_result(
            TenantId::from_uuid(tenant_id),
            ProgressId::from_uuid(progress_id),
            input,
        )
        .await?;

    Ok(Json(output.into()))
}

/// POST /tenants/{tenant_id}/progress/{progress_id}/access
pub async fn record_access<R>(
    State(state): State<LearningAppState<R>>,
    Path((tenant_id, progress_id)): Path<(Uuid, Uuid)>,
) -> ProgressResult<Json<ProgressResponse>>
where
    R: LearningStore,
{
    let progress = state
        .progress
        .record_access(TenantId::from_uuid(tenant_id), ProgressId::from_uuid(progress_id))
        .await?;

    Ok(Json(progress.into()))
}

/// POST /tenants/{tenant_id}/progress/{progress_id}/complete
pub async fn complete_progress<R>(
    State(state): State<LearningAppState<R>>,
    Path((tenant_id, progress_id)): Path<(Uuid, Uuid)>,
) -> ProgressResult<Json<CompletionResponse>>
where
    R: LearningStore,
{
    let output = state
        .progress
        .mark_progress_as_completed(
            TenantId::from_uuid(tenant_id),
            ProgressId::from_uuid(progress_id),
        )
        .await?;

    Ok(Json(output.into()))
}

/// POST /tenants/{tenant_id}/progress/{progress_id}/reset
pub async fn reset_progress<R>(
    State(state): State<LearningAppState<R>>,
    Path((tenant_id, progress_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<ResetProgressRequest>,
) -> ProgressResult<Json<ProgressResponse>>
where
    R: LearningStore,
{
    let policy = req.into_policy()?;
    let progress = state
        .progress
        .reset_progress(
            TenantId::from_uuid(tenant_id),
            ProgressId::from_uuid(progress_id),
            policy,
        )
        .await?;

    Ok(Json(progress.into()))
}

/// POST /tenants/{tenant_id}/progress/{progress_id}/snapshots
pub async fn create_snapshot<R>(
    State(state): State<LearningAppState<R>>,
    Path((tenant_id, progress_id)): Path<(Uuid, Uuid)>,
) -> ProgressResult<(StatusCode, Json<SnapshotResponse>)>
where
    R: LearningStore,
{
    let snapshot = state
        .progress
        .create_snapshot(TenantId::from_uuid(tenant_id), ProgressId::from_uuid(progress_id))
        .await?;

    Ok((StatusCode::CREATED, Json(snapshot.into())))
}

/// GET /tenants/{tenant_id}/users/{user_id}/progress
pub async fn list_user_progress<R>(
    State(state): State<LearningAppState<R>>,
    Path((tenant_id, user_id)): Path<(Uuid, Uuid)>,
) -> ProgressResult<Json<Vec<ProgressResponse>>>
where
    R: LearningStore,
{
    let records = state
        .progress
        .list_user_progress(TenantId::from_uuid(tenant_id), UserId::from_uuid(user_id))
        .await?;

    Ok(Json(records.into_iter().map(Into::into).collect()))
}

/// GET /tenants/{tenant_id}/users/{user_id}/courses/{course_id}/progress
pub async fn get_user_course_progress<R>(
    State(state): State<LearningAppState<R>>,
    Path((tenant_id, user_id, course_id)): Path<(Uuid, Uuid, Uuid)>,
) -> ProgressResult<Json<ProgressResponse>>
where
    R: LearningStore,
{
    let progress = state
        .progress
        .get_user_course_progress(
            TenantId::from_uuid(tenant_id),
            UserId::from_uuid(user_id),
            CourseId::from_uuid(course_id),
        )
        .await?;

    Ok(Json(progress.into()))
}

/// GET /tenants/{tenant_id}/users/{user_id}/courses/{course_id}/history
pub async fn progress_history<R>(
    State(state): State<LearningAppState<R>>,
    Path((tenant_id, user_id, course_id)): Path<(Uuid, Uuid, Uuid)>,
    Query(query): Query<HistoryQuery>,
) -> ProgressResult<Json<Vec<SnapshotResponse>>>
where
    R: LearningStore,
{
    let snapshots = state
        .progress
        .progress_history(
            TenantId::from_uuid(tenant_id),
            UserId::from_uuid(user_id),
            CourseId::from_uuid(course_id),
            query.from,
            query.to,
        )
        .await?;

    Ok(Json(snapshots.into_iter().map(Into::into).collect()))
}

/// GET /tenants/{tenant_id}/courses/{course_id}/milestones/{milestone}
pub async fn snapshots_by_milestone<R>(
    State(state): State<LearningAppState<R>>,
    Path((tenant_id, course_id, milestone)): Path<(Uuid, Uuid, String)>,
) -> ProgressResult<Json<Vec<SnapshotResponse>>>
where
    R: LearningStore,
{
    let milestone = Milestone::from_code(&milestone).ok_or_else(|| {
        ProgressError::InvalidProgressData(format!("Unknown milestone: {}", milestone))
    })?;
    let snapshots = state
        .progress
        .snapshots_by_milestone(
            TenantId::from_uuid(tenant_id),
            CourseId::from_uuid(course_id),
            milestone,
        )
        .await?;

    Ok(Json(snapshots.into_iter().map(Into::into).collect()))
}

/// GET /tenants/{tenant_id}/courses/{course_id}/stats
pub async fn course_stats<R>(
    State(state): State<LearningAppState<R>>,
    Path((tenant_id, course_id)): Path<(Uuid, Uuid)>,
) -> ProgressResult<Json<CourseCompletionStats>>
where
    R: LearningStore,
{
    let stats = state
        .progress
        .course_completion_stats(TenantId::from_uuid(tenant_id), CourseId::from_uuid(course_id))
        .await?;

    Ok(Json(stats))
}

// ============================================================================
// Certificates
// ============================================================================

/// GET /tenants/{tenant_id}/certificates/{certificate_id}
pub async fn get_certificate<R>(
    State(state): State<LearningAppState<R>>,
    Path((tenant_id, certificate_id)): Path<(Uuid, Uuid)>,
) -> CertificateResult<Json<CertificateResponse>>
where
    R: LearningStore,
{
    let certificate = state
        .certificates
        .get_certificate(
            TenantId::from_uuid(tenant_id),
            CertificateId::from_uuid(certificate_id),
        )
        .await?;

    Ok(Json(certificate.into()))
}

/// GET /tenants/{tenant_id}/certificates/by-number/{certificate_number}
pub async fn get_certificate_by_number<R>(
    State(state): State<LearningAppState<R>>,
    Path((tenant_id, number)): Path<(Uuid, String)>,
) -> CertificateResult<Json<CertificateResponse>>
where
    R: LearningStore,
{
    let certificate = state
        .certificates
        .get_by_number(TenantId::from_uuid(tenant_id), &number)
        .await?;

    Ok(Json(certificate.into()))
}

/// GET /tenants/{tenant_id}/users/{user_id}/certificates
pub async fn list_user_certificates<R>(
    State(state): State<LearningAppState<R>>,
    Path((tenant_id, user_id)): Path<(Uuid, Uuid)>,
) -> CertificateResult<Json<Vec<CertificateResponse>>>
where
    R: LearningStore,
{
    let certificates = state
        .certificates
        .list_user_certificates(TenantId::from_uuid(tenant_id), UserId::from_uuid(user_id))
        .await?;

    Ok(Json(certificates.into_iter().map(Into::into).collect()))
}

/// POST /tenants/{tenant_id}/certificates/verify
pub async fn verify_certificate<R>(
    State(state): State<LearningAppState<R>>,
    Path(tenant_id): Path<Uuid>,
    Json(req): Json<VerifyCertificateRequest>,
) -> CertificateResult<Json<VerifyCertificateResponse>>
where
    R: LearningStore,
{
    let outcome = state
        .certificates
        .verify_certificate(
            TenantId::from_uuid(tenant_id),
            &req.certificate_number,
            &req.verification_code,
        )
        .await?;

    Ok(Json(outcome.into()))
}

/// POST /tenants/{tenant_id}/certificates/{certificate_id}/revoke
pub async fn revoke_certificate<R>(
    State(state): State<LearningAppState<R>>,
    Path((tenant_id, certificate_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<RevokeCertificateRequest>,
) -> CertificateResult<Json<CertificateResponse>>
where
    R: LearningStore,
{
    let certificate = state
        .certificates
        .revoke_certificate(
            TenantId::from_uuid(tenant_id),
            CertificateId::from_uuid(certificate_id),
            UserId::from_uuid(req.revoked_by),
            &req.reason,
        )
        .await?;

    Ok(Json(certificate.into()))
}

/// POST /tenants/{tenant_id}/certificates/{certificate_id}/expiration
pub async fn set_expiration<R>(
    State(state): State<LearningAppState<R>>,
    Path((tenant_id, certificate_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<SetExpirationRequest>,
) -> CertificateResult<Json<CertificateResponse>>
where
    R: LearningStore,
{
    let certificate = state
        .certificates
        .set_expiration(
            TenantId::from_uuid(tenant_id),
            CertificateId::from_uuid(certificate_id),
            req.expires_at,
        )
        .await?;

    Ok(Json(certificate.into()))
}

/// POST /tenants/{tenant_id}/certificates/{certificate_id}/grade
pub async fn set_grade<R>(
    State(state): State<LearningAppState<R>>,
    Path((tenant_id, certificate_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<SetGradeRequest>,
) -> CertificateResult<Json<CertificateResponse>>
where
    R: LearningStore,
{
    let certificate = state
        .certificates
        .set_grade(
            TenantId::from_uuid(tenant_id),
            CertificateId::from_uuid(certificate_id),
            req.grade,
        )
        .await?;

    Ok(Json(certificate.into()))
}

/// POST /tenants/{tenant_id}/certificates/{certificate_id}/template
pub async fn set_certificate_template<R>(
    State(state): State<LearningAppState<R>>,
    Path((tenant_id, certificate_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<SetTemplateRequest>,
) -> CertificateResult<Json<CertificateResponse>>
where
    R: LearningStore,
{
    let certificate = state
        .certificates
        .set_template(
            TenantId::from_uuid(tenant_id),
            CertificateId::from_uuid(certificate_id),
            TemplateId::from_uuid(req.template_id),
        )
        .await?;

    Ok(Json(certificate.into()))
}

/// POST /tenants/{tenant_id}/certificates/{certificate_id}/metadata
pub async fn add_metadata<R>(
    State(state): State<LearningAppState<R>>,
    Path((tenant_id, certificate_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<AddMetadataRequest>,
) -> CertificateResult<Json<CertificateResponse>>
where
    R: LearningStore,
{
    let certificate = state
        .certificates
        .add_metadata(
            TenantId::from_uuid(tenant_id),
            CertificateId::from_uuid(certificate_id),
            &req.key,
            req.value,
        )
        .await?;

    Ok(Json(certificate.into()))
}

// ============================================================================
// Templates
// ============================================================================

/// GET /tenants/{tenant_id}/certificate-templates
pub async fn list_templates<R>(
    State(state): State<LearningAppState<R>>,
    Path(tenant_id): Path<Uuid>,
) -> CertificateResult<Json<Vec<TemplateResponse>>>
where
    R: LearningStore,
{
    let templates = state
        .templates
        .list_templates(TenantId::from_uuid(tenant_id))
        .await?;

    Ok(Json(templates.into_iter().map(Into::into).collect()))
}

/// POST /tenants/{tenant_id}/certificate-templates
pub async fn create_template<R>(
    State(state): State<LearningAppState<R>>,
    Path(tenant_id): Path<Uuid>,
    Json(req): Json<CreateTemplateRequest>,
) -> CertificateResult<(StatusCode, Json<TemplateResponse>)>
where
    R: LearningStore,
{
    let input = CreateTemplateInput {
        configuration: req.configuration_text(),
        name: req.name,
        description: req.description,
        make_default: req.make_default,
    };
    let template = state
        .templates
        .create_template(TenantId::from_uuid(tenant_id), input)
        .await?;

    Ok((StatusCode::CREATED, Json(template.into())))
}

/// GET /tenants/{tenant_id}/certificate-templates/default
pub async fn get_default_template<R>(
    State(state): State<LearningAppState<R>>,
    Path(tenant_id): Path<Uuid>,
) -> CertificateResult<Json<TemplateResponse>>
where
    R: LearningStore,
{
    let template = state
        .templates
        .get_default_template(TenantId::from_uuid(tenant_id))
        .await?;

    Ok(Json(template.into()))
}

/// GET /tenants/{tenant_id}/certificate-templates/{template_id}
pub async fn get_template<R>(
    State(state): State<LearningAppState<R>>,
    Path((tenant_id, template_id)): Path<(Uuid, Uuid)>,
) -> CertificateResult<Json<TemplateResponse>>
where
    R: LearningStore,
{
    let template = state
        .templates
        .get_template(TenantId::from_uuid(tenant_id), TemplateId::from_uuid(template_id))
        .await?;

    Ok(Json(template.into()))
}

/// POST /tenants/{tenant_id}/certificate-templates/{template_id}/default
pub async fn set_default_template<R>(
    State(state): State<LearningAppState<R>>,
    Path((tenant_id, template_id)): Path<(Uuid, Uuid)>,
) -> CertificateResult<Json<TemplateResponse>>
where
    R: LearningStore,
{
    let template = state
        .templates
        .set_default_template(TenantId::from_uuid(tenant_id), TemplateId::from_uuid(template_id))
        .await?;

    Ok(Json(template.into()))
}

/// DELETE /tenants/{tenant_id}/certificate-templates/{template_id}/default
pub async fn unset_default_template<R>(
    State(state): State<LearningAppState<R>>,
    Path((tenant_id, template_id)): Path<(Uuid, Uuid)>,
) -> CertificateResult<Json<TemplateResponse>>
where
    R: LearningStore,
{
    let template = state
        .templates
        .unset_default_template(TenantId::from_uuid(tenant_id), TemplateId::from_uuid(template_id))
        .await?;

    Ok(Json(template.into()))
}

/// POST /tenants/{tenant_id}/certificate-templates/{template_id}/activate
pub async fn activate_template<R>(
    State(state): State<LearningAppState<R>>,
    Path((tenant_id, template_id)): Path<(Uuid, Uuid)>,
) -> CertificateResult<Json<TemplateResponse>>
where
    R: LearningStore,
{
    let template = state
        .templates
        .activate_template(TenantId::from_uuid(tenant_id), TemplateId::from_uuid(template_id))
        .await?;

    Ok(Json(template.into()))
}

/// POST /tenants/{tenant_id}/certificate-templates/{template_id}/deactivate
pub async fn deactivate_template<R>(
    State(state): State<LearningAppState<R>>,
    Path((tenant_id, template_id)): Path<(Uuid, Uuid)>,
) -> CertificateResult<Json<TemplateResponse>>
where
    R: LearningStore,
{
    let template = state
        .templates
        .deactivate_template(TenantId::from_uuid(tenant_id), TemplateId::from_uuid(template_id))
        .await?;

    Ok(Json(template.into()))
}

/// POST /tenants/{tenant_id}/certificate-templates/{template_id}/configuration
pub async fn update_template_configuration<R>(
    State(state): State<LearningAppState<R>>,
    Path((tenant_id, template_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdateConfigurationRequest>,
) -> CertificateResult<Json<TemplateResponse>>
where
    R: LearningStore,
{
    let template = state
        .templates
        .update_template_configuration(
            TenantId::from_uuid(tenant_id),
            TemplateId::from_uuid(template_id),
            &req.configuration.to_string(),
        )
        .await?;

    Ok(Json(template.into()))
}
