//! Value Object Module

pub mod certificate_number;
pub mod certificate_status;
pub mod course_totals;
pub mod date_range;
pub mod grade;
pub mod milestone;
pub mod progress_status;
pub mod verification_code;
