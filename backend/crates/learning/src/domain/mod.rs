//! Domain Layer
//!
//! Contains entities, value objects, domain services and repository traits.

pub mod entity;
pub mod repository;
pub mod services;
pub mod value_object;

// Re-exports
pub use entity::{
    certificate::Certificate, certificate_template::CertificateTemplate,
    course_progress::CourseProgress, progress_snapshot::ProgressSnapshot,
};
pub use repository::{
    CertificateRepository, CertificateTemplateRepository, CourseCatalog, LearningUnitOfWork,
    ProgressRepository, SnapshotRepository,
};
