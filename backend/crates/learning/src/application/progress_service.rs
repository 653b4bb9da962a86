//! Progress Service
//!
//! Use cases over course progress: counter updates, the
//! `not_started → in_progress → completed` lifecycle, milestone snapshots
//! and certificate issuance on completion.
//!
//! Completion and reset live in their own use cases
//! ([`CompleteCourseUseCase`], [`ResetProgressUseCase`]).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use kernel::id::{CourseId, EnrollmentId, ProgressId, TenantId, UserId};
use serde::Serialize;

use crate::application::LearningStore;
use crate::application::complete_course::{CompleteCourseUseCase, CompletionOutput};
use crate::application::config::LearningConfig;
use crate::application::reset_progress::{ResetPolicy, ResetProgressUseCase};
use crate::domain::entity::{course_progress::CourseProgress, progress_snapshot::ProgressSnapshot};
use crate::domain::services::{QuizGrade, grade_quiz, round2};
use crate::domain::value_object::{
    date_range::DateRange, milestone::Milestone, progress_status::ProgressStatus,
};
use crate::error::{ProgressError, ProgressResult, ResultExt};

/// Absolute counter values for `update_progress_data`
#[derive(Debug, Clone, Copy)]
pub struct UpdateProgressInput {
    pub completed_lessons: u32,
    pub completed_quizzes: u32,
    pub time_spent_minutes: u32,
}

/// One graded quiz attempt
#[derive(Debug, Clone, Copy)]
pub struct QuizAttemptInput {
    pub points_earned: f64,
    pub points_possible: f64,
    pub minutes: u32,
}

#[derive(Debug, Clone)]
pub struct QuizAttemptOutput {
    pub progress: CourseProgress,
    pub grade: QuizGrade,
}

/// Per-course aggregate over all progress records
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseCompletionStats {
    pub total: u64,
    pub not_started: u64,
    pub in_progress: u64,
    pub completed: u64,
    pub average_percentage: f64,
}

/// Progress service
pub struct ProgressService<R>
where
    R: LearningStore,
{
    repo: Arc<R>,
    config: Arc<LearningConfig>,
}

impl<R> Clone for ProgressService<R>
where
    R: LearningStore,
{
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            config: self.config.clone(),
        }
    }
}

impl<R> ProgressService<R>
where
    R: LearningStore,
{
    pub fn new(repo: Arc<R>, config: Arc<LearningConfig>) -> Self {
        Self { repo, config }
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    async fn load(
        &self,
        op: &'static str,
        tenant_id: TenantId,
        progress_id: ProgressId,
    ) -> ProgressResult<CourseProgress> {
        load_progress(self.repo.as_ref(), op, tenant_id, progress_id).await
    }

    pub async fn get_progress(
        &self,
        tenant_id: TenantId,
        progress_id: ProgressId,
    ) -> ProgressResult<CourseProgress> {
        self.load("get_progress", tenant_id, progress_id).await
    }

    pub async fn get_user_course_progress(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        course_id: CourseId,
    ) -> ProgressResult<CourseProgress> {
        const OP: &str = "get_user_course_progress";
        self.repo
            .find_progress_by_user_course(tenant_id, user_id, course_id)
            .await
            .in_op(OP, "load progress")?
            .ok_or_else(|| ProgressError::ProgressNotFound.in_op(OP, "load progress"))
    }

    pub async fn list_user_progress(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
    ) -> ProgressResult<Vec<CourseProgress>> {
        self.repo
            .list_progress_by_user(tenant_id, user_id)
            .await
            .in_op("list_user_progress", "list progress")
    }

    // ========================================================================
    // Creation and counter updates
    // ========================================================================

    /// Create a `not_started` record for a new enrollment
    pub async fn initialize_progress(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        course_id: CourseId,
        enrollment_id: EnrollmentId,
    ) -> ProgressResult<CourseProgress> {
        const OP: &str = "initialize_progress";

        let totals = self
            .repo
            .course_totals(tenant_id, course_id)
            .await
            .in_op(OP, "load course totals")?
            .ok_or_else(|| ProgressError::CourseNotFound.in_op(OP, "load course totals"))?;

        let existing = self
            .repo
            .find_progress_by_user_course(tenant_id, user_id, course_id)
            .await
            .in_op(OP, "check existing progress")?;
        if existing.is_some() {
            return Err(ProgressError::ProgressAlreadyExists.in_op(OP, "check existing progress"));
        }

        let progress = CourseProgress::new(tenant_id, user_id, course_id, enrollment_id, totals);
        self.repo
            .create_progress(&progress)
            .await
            .in_op(OP, "insert progress")?;

        tracing::info!(
            progress_id = %progress.id,
            tenant_id = %tenant_id,
            user_id = %user_id,
            course_id = %course_id,
            total_lessons = totals.lessons,
            total_quizzes = totals.quizzes,
            "Progress initialized"
        );

        Ok(progress)
    }

    /// Overwrite counters with absolute values
    ///
    /// Repeating the same input is a no-op. Never completes the course.
    pub async fn update_progress_data(
        &self,
        tenant_id: TenantId,
        progress_id: ProgressId,
        input: UpdateProgressInput,
    ) -> ProgressResult<CourseProgress> {
        const OP: &str = "update_progress_data";

        let mut progress = self.load(OP, tenant_id, progress_id).await?;
        let previous = progress.percentage();

        let changed = progress
            .apply_counts(
                input.completed_lessons,
                input.completed_quizzes,
                input.time_spent_minutes,
            )
            .map_err(|e| e.in_op(OP, "apply counters"))?;
        if !changed {
            return Ok(progress);
        }

        self.persist_with_milestones(OP, &progress, previous).await?;

        tracing::debug!(
            progress_id = %progress.id,
            percentage = progress.percentage(),
            status = %progress.status,
            "Progress updated"
        );

        Ok(progress)
    }

    /// `not_started → in_progress`; no-op when already started
    pub async fn mark_progress_as_started(
        &self,
        tenant_id: TenantId,
        progress_id: ProgressId,
    ) -> ProgressResult<CourseProgress> {
        const OP: &str = "mark_progress_as_started";

        let mut progress = self.load(OP, tenant_id, progress_id).await?;
        let changed = progress
            .mark_started()
            .map_err(|e| e.in_op(OP, "start progress"))?;
        if changed {
            self.repo
                .update_progress(&progress)
                .await
                .in_op(OP, "save progress")?;
            tracing::info!(progress_id = %progress.id, "Progress started");
        }

        Ok(progress)
    }

    /// Count one more completed lesson
    ///
    /// Not idempotent: a replayed request counts again, up to the total.
    /// `update_progress_data` is the idempotent path.
    pub async fn record_lesson_completion(
        &self,
        tenant_id: TenantId,
        progress_id: ProgressId,
        minutes: u32,
    ) -> ProgressResult<CourseProgress> {
        const OP: &str = "record_lesson_completion";

        let mut progress = self.load(OP, tenant_id, progress_id).await?;
        let previous = progress.percentage();
        progress
            .record_lesson(minutes)
            .map_err(|e| e.in_op(OP, "record lesson"))?;

        self.persist_with_milestones(OP, &progress, previous).await?;
        Ok(progress)
    }

    /// Grade a quiz attempt; a passing attempt counts as a completed quiz
    pub async fn record_quiz_result(
        &self,
        tenant_id: TenantId,
        progress_id: ProgressId,
        input: QuizAttemptInput,
    ) -> ProgressResult<QuizAttemptOutput> {
        const OP: &str = "record_quiz_result";

        let grade = grade_quiz(
            input.points_earned,
            input.points_possible,
            self.config.quiz_passing_percentage,
        )
        .map_err(|e| e.in_op(OP, "grade attempt"))?;

        let mut progress = self.load(OP, tenant_id, progress_id).await?;
        let previous = progress.percentage();
        progress
            .record_quiz_attempt(grade.passed, input.minutes)
            .map_err(|e| e.in_op(OP, "record attempt"))?;

        self.persist_with_milestones(OP, &progress, previous).await?;

        tracing::debug!(
            progress_id = %progress.id,
            score = grade.percentage,
            passed = grade.passed,
            "Quiz attempt recorded"
        );

        Ok(QuizAttemptOutput { progress, grade })
    }

    /// Touch `last_accessed_at`
    pub async fn record_access(
        &self,
        tenant_id: TenantId,
        progress_id: ProgressId,
    ) -> ProgressResult<CourseProgress> {
        const OP: &str = "record_access";

        let mut progress = self.load(OP, tenant_id, progress_id).await?;
        progress.touch();
        self.repo
            .update_progress(&progress)
            .await
            .in_op(OP, "save progress")?;
        Ok(progress)
    }

    async fn persist_with_milestones(
        &self,
        op: &'static str,
        progress: &CourseProgress,
        previous_percentage: f64,
    ) -> ProgressResult<()> {
        self.repo
            .update_progress(progress)
            .await
            .in_op(op, "save progress")?;

        let snapshots: Vec<ProgressSnapshot> =
            Milestone::crossed(previous_percentage, progress.percentage())
                .into_iter()
                .map(|m| ProgressSnapshot::capture(progress, m))
                .collect();
        if !snapshots.is_empty() {
            self.repo
                .append_snapshots(&snapshots)
                .await
                .in_op(op, "append milestone snapshots")?;
            for snapshot in &snapshots {
                tracing::info!(
                    progress_id = %progress.id,
                    milestone = %snapshot.milestone,
                    percentage = snapshot.percentage,
                    "Milestone reached"
                );
            }
        }
        Ok(())
    }

    // ========================================================================
    // Completion and reset
    // ========================================================================

    /// Complete the course and issue its certificate
    pub async fn mark_progress_as_completed(
        &self,
        tenant_id: TenantId,
        progress_id: ProgressId,
    ) -> ProgressResult<CompletionOutput> {
        CompleteCourseUseCase::new(self.repo.clone(), self.config.clone())
            .execute(tenant_id, progress_id)
            .await
    }

    /// Admin reset back to `not_started`
    pub async fn reset_progress(
        &self,
        tenant_id: TenantId,
        progress_id: ProgressId,
        policy: ResetPolicy,
    ) -> ProgressResult<CourseProgress> {
        ResetProgressUseCase::new(self.repo.clone())
            .execute(tenant_id, progress_id, policy)
            .await
    }

    // ========================================================================
    // Snapshots and statistics
    // ========================================================================

    /// Record a `manual` snapshot of the current percentage
    pub async fn create_snapshot(
        &self,
        tenant_id: TenantId,
        progress_id: ProgressId,
    ) -> ProgressResult<ProgressSnapshot> {
        const OP: &str = "create_snapshot";

        let progress = self.load(OP, tenant_id, progress_id).await?;
        let snapshot = ProgressSnapshot::capture(&progress, Milestone::Manual);
        self.repo
            .append_snapshots(std::slice::from_ref(&snapshot))
            .await
            .in_op(OP, "append snapshot")?;
        Ok(snapshot)
    }

    /// Snapshot history of a user in a course, oldest first
    pub async fn progress_history(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        course_id: CourseId,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> ProgressResult<Vec<ProgressSnapshot>> {
        const OP: &str = "progress_history";

        let range = DateRange::new(from, to)
            .ok_or_else(|| ProgressError::InvalidDateRange.in_op(OP, "validate range"))?;
        self.repo
            .list_snapshots(tenant_id, user_id, course_id, &range)
            .await
            .in_op(OP, "list snapshots")
    }

    pub async fn snapshots_by_milestone(
        &self,
        tenant_id: TenantId,
        course_id: CourseId,
        milestone: Milestone,
    ) -> ProgressResult<Vec<ProgressSnapshot>> {
        self.repo
            .list_snapshots_by_milestone(tenant_id, course_id, milestone)
            .await
            .in_op("snapshots_by_milestone", "list snapshots")
    }

    pub async fn course_completion_stats(
        &self,
        tenant_id: TenantId,
        course_id: CourseId,
    ) -> ProgressResult<CourseCompletionStats> {
        let records = self
            .repo
            .list_progress_by_course(tenant_id, course_id)
            .await
            .in_op("course_completion_stats", "list progress")?;
        Ok(aggregate_stats(&records))
    }
}

/// Tenant-scoped load; a foreign tenant's record reads as missing
pub(crate) async fn load_progress<R>(
    repo: &R,
    op: &'static str,
    tenant_id: TenantId,
    progress_id: ProgressId,
) -> ProgressResult<CourseProgress>
where
    R: LearningStore,
{
    repo.find_progress(tenant_id, progress_id)
        .await
        .in_op(op, "load progress")?
        .ok_or_else(|| ProgressError::ProgressNotFound.in_op(op, "load progress"))
}

fn aggregate_stats(records: &[CourseProgress]) -> CourseCompletionStats {
    let count = |status: ProgressStatus| records.iter().filter(|p| p.status == status).count() as u64;
    let total = records.len() as u64;
    let average_percentage = if records.is_empty() {
        0.0
    } else {
        round2(records.iter().map(CourseProgress::percentage).sum::<f64>() / records.len() as f64)
    };

    CourseCompletionStats {
        total,
        not_started: count(ProgressStatus::NotStarted),
        in_progress: count(ProgressStatus::InProgress),
        completed: count(ProgressStatus::Completed),
        average_percentage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_object::course_totals::CourseTotals;

    fn record(completed_lessons: u32) -> CourseProgress {
        let mut p = CourseProgress::new(
            TenantId::new(),
            UserId::new(),
            CourseId::new(),
            EnrollmentId::new(),
            CourseTotals::new(4, 0),
        );
        p.apply_counts(completed_lessons, 0, 0).unwrap();
        p
    }

    #[test]
    fn test_aggregate_stats() {
        let mut done = record(4);
        done.mark_completed(None, Utc::now()).unwrap();
        let stats = aggregate_stats(&[record(0), record(1), record(2), done]);

        assert_eq!(stats.total, 4);
        assert_eq!(stats.not_started, 1);
        assert_eq!(stats.in_progress, 2);
        assert_eq!(stats.completed, 1);
        // (0 + 25 + 50 + 100) / 4
        assert_eq!(stats.average_percentage, 43.75);
    }

    #[test]
    fn test_aggregate_stats_empty() {
        let stats = aggregate_stats(&[]);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.average_percentage, 0.0);
    }
}
