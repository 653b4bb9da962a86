//! Shared Kernel - Domain-crossing minimal core
//!
//! This crate contains the "smallest core" of vocabulary shared by the
//! learning service:
//! - Typed entity IDs (tenant, user, course, progress, certificate, ...)
//! - Unified application error and its HTTP classification
//! - Cause-based error categories implemented by every domain error enum
//!
//! **Design Principle**: Only include things that are "hard to change"
//! and have consistent meaning across all domains.

pub mod error {
    pub mod app_error;
    pub mod category;
    pub mod conversions;
    pub mod kind;
}
pub mod id;
