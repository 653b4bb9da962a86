//! Learning Error Types
//!
//! Closed error enums for the progress and certificate domains. Both
//! implement [`Categorized`] so any caller can classify an error by cause
//! (not-found, validation, business rule, ...) no matter how many operation
//! wrappers sit on top of it.

use axum::response::{IntoResponse, Response};
use kernel::error::{
    app_error::AppError,
    category::{Categorized, ErrorCategory},
};
use thiserror::Error;

/// Progress-domain result type alias
pub type ProgressResult<T> = Result<T, ProgressError>;

/// Certificate-domain result type alias
pub type CertificateResult<T> = Result<T, CertificateError>;

// ============================================================================
// Progress errors
// ============================================================================

/// Progress-domain error variants
#[derive(Debug, Error)]
pub enum ProgressError {
    /// No progress record for the (progress, tenant) pair
    #[error("Progress not found")]
    ProgressNotFound,

    /// The (tenant, user, course) triple already has a progress record
    #[error("Progress already exists for this user and course")]
    ProgressAlreadyExists,

    /// Course unknown to the catalog in this tenant
    #[error("Course not found")]
    CourseNotFound,

    /// Counters or time values out of range
    #[error("Invalid progress data: {0}")]
    InvalidProgressData(String),

    /// Quiz attempt that cannot be graded
    #[error("Invalid quiz result: {0}")]
    InvalidQuizResult(String),

    /// History query with `from` after `to`
    #[error("Invalid date range: start is after end")]
    InvalidDateRange,

    /// Mutation attempted on a completed record
    #[error("Progress is already completed")]
    ProgressCompleted,

    /// Completion requested before every lesson and quiz is done
    #[error(
        "Course not complete: {completed_lessons}/{total_lessons} lessons, {completed_quizzes}/{total_quizzes} quizzes"
    )]
    CourseNotComplete {
        completed_lessons: u32,
        total_lessons: u32,
        completed_quizzes: u32,
        total_quizzes: u32,
    },

    /// Certificate failure raised while completing or resetting a course
    #[error(transparent)]
    Certificate(#[from] CertificateError),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Stored data could not be mapped back into the domain
    #[error("Internal error: {0}")]
    Internal(String),

    /// Failure annotated with the service operation it happened in
    #[error("{op}: {message}")]
    Operation {
        op: &'static str,
        message: String,
        #[source]
        source: Box<ProgressError>,
    },
}

impl ProgressError {
    /// Wrap with operation context, keeping the category of `self`
    pub fn in_op(self, op: &'static str, message: impl Into<String>) -> Self {
        ProgressError::Operation {
            op,
            message: message.into(),
            source: Box::new(self),
        }
    }

    /// Innermost error under any operation wrappers
    pub fn root(&self) -> &ProgressError {
        match self {
            ProgressError::Operation { source, .. } => source.root(),
            other => other,
        }
    }

    /// Outermost operation name, if wrapped
    pub fn operation(&self) -> Option<&'static str> {
        match self {
            ProgressError::Operation { op, .. } => Some(op),
            _ => None,
        }
    }

    /// Retryable certificate-number clash raised during issuance
    pub fn is_number_collision(&self) -> bool {
        matches!(
            self.root(),
            ProgressError::Certificate(inner) if inner.root().is_number_collision()
        )
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self.root() {
            ProgressError::Database(e) => {
                tracing::error!(error = %e, op = ?self.operation(), "Progress database error");
            }
            ProgressError::Internal(msg) => {
                tracing::error!(message = %msg, op = ?self.operation(), "Progress internal error");
            }
            ProgressError::Certificate(inner) => inner.log(),
            _ => {
                tracing::debug!(error = %self, "Progress error");
            }
        }
    }
}

impl Categorized for ProgressError {
    fn category(&self) -> ErrorCategory {
        match self {
            ProgressError::ProgressNotFound | ProgressError::CourseNotFound => {
                ErrorCategory::NotFound
            }
            ProgressError::ProgressAlreadyExists => ErrorCategory::AlreadyExists,
            ProgressError::InvalidProgressData(_)
            | ProgressError::InvalidQuizResult(_)
            | ProgressError::InvalidDateRange => ErrorCategory::Validation,
            ProgressError::ProgressCompleted | ProgressError::CourseNotComplete { .. } => {
                ErrorCategory::BusinessRule
            }
            ProgressError::Certificate(inner) => inner.category(),
            ProgressError::Database(_) | ProgressError::Internal(_) => ErrorCategory::Database,
            ProgressError::Operation { source, .. } => source.category(),
        }
    }
}

impl From<ProgressError> for AppError {
    fn from(err: ProgressError) -> Self {
        let app_err = match err.root() {
            ProgressError::Certificate(inner) => AppError::from_categorized(inner.root()),
            root => AppError::from_categorized(root),
        };
        let app_err = match err.operation() {
            Some(op) => app_err.with_operation(op),
            None => app_err,
        };
        app_err.with_source(err)
    }
}

impl IntoResponse for ProgressError {
    fn into_response(self) -> Response {
        self.log();
        AppError::from(self).into_response()
    }
}

// ============================================================================
// Certificate errors
// ============================================================================

/// Certificate-domain error variants
#[derive(Debug, Error)]
pub enum CertificateError {
    #[error("Certificate not found")]
    CertificateNotFound,

    #[error("Certificate template not found")]
    TemplateNotFound,

    /// The user already holds an issued certificate for the course
    #[error("An issued certificate already exists for this user and course")]
    AlreadyCertified,

    /// Generated certificate number is already taken; retry with a new timestamp
    #[error("Certificate number collision")]
    NumberCollision,

    /// Only revocation is idempotent on a revoked certificate; other edits are refused
    #[error("Certificate has been revoked")]
    CertificateRevoked,

    #[error("Certificate template is inactive")]
    TemplateInactive,

    #[error("Invalid certificate number format")]
    InvalidCertificateNumber,

    #[error("Invalid grade {0}: must be between 0 and 100")]
    InvalidGrade(f64),

    #[error("Invalid expiration: {0}")]
    InvalidExpiration(String),

    #[error("Invalid metadata: {0}")]
    InvalidMetadata(String),

    #[error("Invalid revocation: {0}")]
    InvalidRevocation(String),

    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Stored data could not be mapped back into the domain
    #[error("Internal error: {0}")]
    Internal(String),

    /// Failure annotated with the service operation it happened in
    #[error("{op}: {message}")]
    Operation {
        op: &'static str,
        message: String,
        #[source]
        source: Box<CertificateError>,
    },
}

impl CertificateError {
    /// Wrap with operation context, keeping the category of `self`
    pub fn in_op(self, op: &'static str, message: impl Into<String>) -> Self {
        CertificateError::Operation {
            op,
            message: message.into(),
            source: Box::new(self),
        }
    }

    /// Innermost error under any operation wrappers
    pub fn root(&self) -> &CertificateError {
        match self {
            CertificateError::Operation { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn operation(&self) -> Option<&'static str> {
        match self {
            CertificateError::Operation { op, .. } => Some(op),
            _ => None,
        }
    }

    pub fn is_number_collision(&self) -> bool {
        matches!(self.root(), CertificateError::NumberCollision)
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self.root() {
            CertificateError::Database(e) => {
                tracing::error!(error = %e, op = ?self.operation(), "Certificate database error");
            }
            CertificateError::Internal(msg) => {
                tracing::error!(message = %msg, op = ?self.operation(), "Certificate internal error");
            }
            CertificateError::NumberCollision => {
                tracing::warn!("Certificate number collision surfaced to caller");
            }
            _ => {
                tracing::debug!(error = %self, "Certificate error");
            }
        }
    }
}

impl Categorized for CertificateError {
    fn category(&self) -> ErrorCategory {
        match self {
            CertificateError::CertificateNotFound | CertificateError::TemplateNotFound => {
                ErrorCategory::NotFound
            }
            CertificateError::NumberCollision => ErrorCategory::AlreadyExists,
            CertificateError::AlreadyCertified
            | CertificateError::CertificateRevoked
            | CertificateError::TemplateInactive => ErrorCategory::BusinessRule,
            CertificateError::InvalidCertificateNumber
            | CertificateError::InvalidGrade(_)
            | CertificateError::InvalidExpiration(_)
            | CertificateError::InvalidMetadata(_)
            | CertificateError::InvalidRevocation(_)
            | CertificateError::InvalidTemplate(_) => ErrorCategory::Validation,
            CertificateError::Database(_) | CertificateError::Internal(_) => {
                ErrorCategory::Database
            }
            CertificateError::Operation { source, .. } => source.category(),
        }
    }
}

impl From<CertificateError> for AppError {
    fn from(err: CertificateError) -> Self {
        let app_err = AppError::from_categorized(err.root());
        let app_err = match err.operation() {
            Some(op) => app_err.with_operation(op),
            None => app_err,
        };
        app_err.with_source(err)
    }
}

impl IntoResponse for CertificateError {
    fn into_response(self) -> Response {
        self.log();
        AppError::from(self).into_response()
    }
}

// ============================================================================
// Result extension
// ============================================================================

/// Attach operation context to a failed repository call
///
/// The service-layer counterpart of wrapping errors with the operation name
/// before they leave the use case.
pub trait ResultExt<T> {
    fn in_op(self, op: &'static str, message: &str) -> Self;
}

impl<T> ResultExt<T> for ProgressResult<T> {
    fn in_op(self, op: &'static str, message: &str) -> Self {
        self.map_err(|e| e.in_op(op, message))
    }
}

impl<T> ResultExt<T> for CertificateResult<T> {
    fn in_op(self, op: &'static str, message: &str) -> Self {
        self.map_err(|e| e.in_op(op, message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use kernel::error::kind::ErrorKind;

    #[test]
    fn test_progress_categories() {
        assert!(ProgressError::ProgressNotFound.is_not_found());
        assert!(ProgressError::CourseNotFound.is_not_found());
        assert!(ProgressError::ProgressAlreadyExists.is_already_exists());
        assert!(ProgressError::InvalidProgressData("x".into()).is_validation());
        assert!(ProgressError::InvalidDateRange.is_validation());
        assert!(ProgressError::ProgressCompleted.is_business_rule());
        assert!(ProgressError::Internal("x".into()).is_database());
    }

    #[test]
    fn test_operation_wrapper_keeps_category() {
        let err = ProgressError::ProgressNotFound
            .in_op("get_progress", "load progress")
            .in_op("mark_progress_as_completed", "resolve progress");

        assert!(err.is_not_found());
        assert!(matches!(err.root(), ProgressError::ProgressNotFound));
        assert_eq!(err.operation(), Some("mark_progress_as_completed"));
        assert_eq!(err.to_string(), "mark_progress_as_completed: resolve progress");
    }

    #[test]
    fn test_nested_certificate_error_category() {
        let err: ProgressError = CertificateError::NumberCollision
            .in_op("complete_course", "insert certificate")
            .into();
        let err = err.in_op("mark_progress_as_completed", "persist completion");

        assert!(err.is_already_exists());
        assert!(err.is_number_collision());
        assert!(!ProgressError::ProgressNotFound.is_number_collision());
    }

    #[test]
    fn test_result_ext() {
        let result: CertificateResult<()> = Err(CertificateError::CertificateNotFound);
        let err = result.in_op("revoke_certificate", "load certificate").unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.operation(), Some("revoke_certificate"));
    }

    #[test]
    fn test_app_error_uses_root_message() {
        let err = ProgressError::CourseNotComplete {
            completed_lessons: 9,
            total_lessons: 10,
            completed_quizzes: 2,
            total_quizzes: 2,
        }
        .in_op("mark_progress_as_completed", "check totals");

        let app_err = AppError::from(err);
        assert_eq!(app_err.kind(), ErrorKind::Conflict);
        assert_eq!(app_err.operation(), Some("mark_progress_as_completed"));
        assert!(app_err.message().contains("9/10 lessons"));
    }

    #[test]
    fn test_error_into_response_status_codes() {
        let cases: Vec<(Response, StatusCode)> = vec![
            (
                ProgressError::ProgressNotFound.into_response(),
                StatusCode::NOT_FOUND,
            ),
            (
                ProgressError::InvalidProgressData("negative".into()).into_response(),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                ProgressError::ProgressCompleted.into_response(),
                StatusCode::CONFLICT,
            ),
            (
                ProgressError::Internal("boom".into()).into_response(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                CertificateError::AlreadyCertified.into_response(),
                StatusCode::CONFLICT,
            ),
            (
                CertificateError::InvalidGrade(120.0).into_response(),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                CertificateError::TemplateNotFound.into_response(),
                StatusCode::NOT_FOUND,
            ),
        ];

        for (response, expected) in cases {
            assert_eq!(response.status(), expected);
        }
    }
}
