//! Learning (Progress & Certificates) Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Entities, value objects, grading rules, repository traits
//! - `application/` - Progress, certificate and template services
//! - `infra/` - PostgreSQL and in-memory repositories
//! - `presentation/` - HTTP handlers, DTOs, router
//!
//! ## Features
//! - Per-user course progress with `not_started → in_progress → completed`
//! - Milestone snapshots at 25 / 50 / 75 / 100 percent and on demand
//! - Certificate issuance on completion, with derived number and
//!   verification code
//! - Public certificate verification, revocation, expiry and grading
//! - Per-tenant certificate templates with a single default
//!
//! ## Consistency Model
//! - Every lookup is tenant scoped; foreign-tenant IDs never resolve
//! - Completion (certificate + status + snapshot) commits atomically
//! - At most one issued certificate per (tenant, user, course)

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

// Re-exports for convenience
pub use application::config::LearningConfig;
pub use error::{CertificateError, CertificateResult, ProgressError, ProgressResult};
pub use infra::memory::MemoryLearningRepository;
pub use infra::postgres::PgLearningRepository;
pub use presentation::router::learning_router;

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    category::{Categorized, ErrorCategory},
    kind::ErrorKind,
};

// Convenience re-exports
pub mod config {
    pub use crate::application::config::*;
}

pub mod models {
    pub use crate::domain::entity::*;
    pub use crate::domain::value_object::*;
    pub use crate::presentation::dto::*;
}

pub mod handlers {
    pub use crate::presentation::handlers::*;
}

pub mod store {
    pub use crate::infra::memory::MemoryLearningRepository as MemoryStore;
    pub use crate::infra::postgres::PgLearningRepository as PgStore;
}

pub mod router {
    pub use crate::presentation::router::*;
}

#[cfg(test)]
mod tests;
