//! Learning Router

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::application::{
    CertificateService, LearningConfig, LearningStore, ProgressService, TemplateService,
};
use crate::infra::postgres::PgLearningRepository;
use crate::presentation::handlers::{self, LearningAppState};

/// Create the learning router with PostgreSQL repository
pub fn learning_router(repo: PgLearningRepository, config: LearningConfig) -> Router {
    learning_router_generic(repo, config)
}

/// Create a generic learning router for any repository implementation
pub fn learning_router_generic<R>(repo: R, config: LearningConfig) -> Router
where
    R: LearningStore,
{
    let repo = Arc::new(repo);
    let state = LearningAppState {
        progress: ProgressService::new(repo.clone(), Arc::new(config)),
        certificates: CertificateService::new(repo.clone()),
        templates: TemplateService::new(repo),
    };

    Router::new()
        // Progress
        .route(
            "/tenants/{tenant_id}/progress",
            post(handlers::initialize_progress::<R>),
        )
        .route(
            "/tenants/{tenant_id}/progress/{progress_id}",
            get(handlers::get_progress::<R>).put(handlers::update_progress::<R>),
        )
        .route(
            "/tenants/{tenant_id}/progress/{progress_id}/start",
            post(handlers::start_progress::<R>),
        )
        .route(
            "/tenants/{tenant_id}/progress/{progress_id}/lessons",
            post(handlers::record_lesson::<R>),
        )
        .route(
            "/tenants/{tenant_id}/progress/{progress_id}/quizzes",
            post(handlers::record_quiz::<R>),
        )
        .route(
            "/tenants/{tenant_id}/progress/{progress_id}/access",
            post(handlers::record_access::<R>),
        )
        .route(
            "/tenants/{tenant_id}/progress/{progress_id}/complete",
            post(handlers::complete_progress::<R>),
        )
        .route(
            "/tenants/{tenant_id}/progress/{progress_id}/reset",
            post(handlers::reset_progress::<R>),
        )
        .route(
            "/tenants/{tenant_id}/progress/{progress_id}/snapshots",
            post(handlers::create_snapshot::<R>),
        )
        .route(
            "/tenants/{tenant_id}/users/{user_id}/progress",
            get(handlers::list_user_progress::<R>),
        )
        .route(
            "/tenants/{tenant_id}/users/{user_id}/courses/{course_id}/progress",
            get(handlers::get_user_course_progress::<R>),
        )
        .route(
            "/tenants/{tenant_id}/users/{user_id}/courses/{course_id}/history",
            get(handlers::progress_history::<R>),
        )
        .route(
            "/tenants/{tenant_id}/courses/{course_id}/milestones/{milestone}",
            get(handlers::snapshots_by_milestone::<R>),
        )
        .route(
            "/tenants/{tenant_id}/courses/{course_id}/stats",
            get(handlers::course_stats::<R>),
        )
        // Certificates
        .route(
            "/tenants/{tenant_id}/certificates/verify",
            post(handlers::verify_certificate::<R>),
        )
        .route(
            "/tenants/{tenant_id}/certificates/by-number/{certificate_number}",
            get(handlers::get_certificate_by_number::<R>),
        )
        .route(
            "/tenants/{tenant_id}/certificates/{certificate_id}",
            get(handlers::get_certificate::<R>),
        )
        .route(
            "/tenants/{tenant_id}/certificates/{certificate_id}/revoke",
            post(handlers::revoke_certificate::<R>),
        )
        .route(
            "/tenants/{tenant_id}/certificates/{certificate_id}/expiration",
            post(handlers::set_expiration::<R>),
        )
        .route(
            "/tenants/{tenant_id}/certificates/{certificate_id}/grade",
            post(handlers::set_grade::<R>),
        )
        .route(
            "/tenants/{tenant_id}/certificates/{certificate_id}/template",
            post(handlers::set_certificate_template::<R>),
        )
        .route(
            "/tenants/{tenant_id}/certificates/{certificate_id}/metadata",
            post(handlers::add_metadata::<R>),
        )
        .route(
            "/tenants/{tenant_id}/users/{user_id}/certificates",
            get(handlers::list_user_certificates::<R>),
        )
        // Templates
        .route(
            "/tenants/{tenant_id}/certificate-templates",
            get(handlers::list_templates::<R>).post(handlers::create_template::<R>),
        )
        .route(
            "/tenants/{tenant_id}/certificate-templates/default",
            get(handlers::get_default_template::<R>),
        )
        .route(
            "/tenants/{tenant_id}/certificate-templates/{template_id}",
            get(handlers::get_template::<R>),
        )
        .route(
            "/tenants/{tenant_id}/certificate-templates/{template_id}/default",
            post(handlers::set_default_template::<R>)
                .delete(handlers::unset_default_template::<R>),
        )
        .route(
            "/tenants/{tenant_id}/certificate-templates/{template_id}/activate",
            post(handlers::activate_template::<R>),
        )
        .route(
            "/tenants/{tenant_id}/certificate-templates/{template_id}/deactivate",
            post(handlers::deactivate_template::<R>),
        )
        .route(
            "/tenants/{tenant_id}/certificate-templates/{template_id}/configuration",
            post(handlers::update_template_configuration::<R>),
        )
        .with_state(state)
}
