//! Application Layer
//!
//! Use cases and application services.

pub mod certificate_service;
pub mod complete_course;
pub mod config;
pub mod progress_service;
pub mod reset_progress;
pub mod template_service;

use crate::domain::repository::{
    CertificateRepository, CertificateTemplateRepository, CourseCatalog, LearningUnitOfWork,
    ProgressRepository, SnapshotRepository,
};

// Re-exports
pub use certificate_service::{CertificateService, VerificationOutcome};
pub use complete_course::{CompleteCourseUseCase, CompletionOutput};
pub use config::LearningConfig;
pub use progress_service::{
    CourseCompletionStats, ProgressService, QuizAttemptInput, QuizAttemptOutput,
    UpdateProgressInput,
};
pub use reset_progress::{ResetPolicy, ResetProgressUseCase};
pub use template_service::{CreateTemplateInput, TemplateService};

/// Every port the learning services need, implemented by one adapter
pub trait LearningStore:
    ProgressRepository
    + SnapshotRepository
    + CourseCatalog
    + CertificateRepository
    + CertificateTemplateRepository
    + LearningUnitOfWork
    + Send
    + Sync
    + 'static
{
}

impl<T> LearningStore for T where
    T: ProgressRepository
        + SnapshotRepository
        + CourseCatalog
        + CertificateRepository
        + CertificateTemplateRepository
        + LearningUnitOfWork
        + Send
        + Sync
        + 'static
{
}
