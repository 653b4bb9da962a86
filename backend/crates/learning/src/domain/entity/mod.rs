//! Entity Module

pub mod certificate;
pub mod certificate_template;
pub mod course_progress;
pub mod progress_snapshot;
