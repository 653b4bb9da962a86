//! Progress Snapshot Entity
//!
//! Immutable point-in-time record of a progress percentage. Append-only.

use chrono::{DateTime, Utc};
use kernel::id::{CourseId, ProgressId, SnapshotId, TenantId, UserId};

use crate::domain::entity::course_progress::CourseProgress;
use crate::domain::value_object::milestone::Milestone;

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    pub id: SnapshotId,
    pub tenant_id: TenantId,
    pub user_id: UserId,
    pub course_id: CourseId,
    pub progress_id: ProgressId,
    pub milestone: Milestone,
    pub percentage: f64,
    pub recorded_at: DateTime<Utc>,
}

impl ProgressSnapshot {
    /// Capture the current percentage of `progress` under `milestone`
    pub fn capture(progress: &CourseProgress, milestone: Milestone) -> Self {
        Self {
            id: SnapshotId::new(),
            tenant_id: progress.tenant_id,
            user_id: progress.user_id,
            course_id: progress.course_id,
            progress_id: progress.id,
            milestone,
            percentage: progress.percentage(),
            recorded_at: Utc::now(),
        }
    }
}
