//! Course Progress Entity
//!
//! Per-(tenant, user, course) completion counters. This record is the single
//! source of truth for whether a user has completed a course.

use chrono::{DateTime, Utc};
use kernel::id::{CertificateId, CourseId, EnrollmentId, ProgressId, TenantId, UserId};

use crate::domain::services::completion_percentage;
use crate::domain::value_object::{course_totals::CourseTotals, progress_status::ProgressStatus};
use crate::error::{ProgressError, ProgressResult};

/// Course progress entity
#[derive(Debug, Clone, PartialEq)]
pub struct CourseProgress {
    pub id: ProgressId,
    pub tenant_id: TenantId,
    pub user_id: UserId,
    pub course_id: CourseId,
    /// Enrollment that spawned this record (weak reference)
    pub enrollment_id: EnrollmentId,
    pub status: ProgressStatus,
    pub completed_lessons: u32,
    pub total_lessons: u32,
    pub completed_quizzes: u32,
    pub total_quizzes: u32,
    pub time_spent_minutes: u32,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_accessed_at: Option<DateTime<Utc>>,
    /// Certificate issued on completion, if any
    pub certificate_id: Option<CertificateId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CourseProgress {
    /// Create a `not_started` record with zeroed counters
    pub fn new(
        tenant_id: TenantId,
        user_id: UserId,
        course_id: CourseId,
        enrollment_id: EnrollmentId,
        totals: CourseTotals,
    ) -> Self {
        let now = Utc::now();

        Self {
            id: ProgressId::new(),
            tenant_id,
            user_id,
            course_id,
            enrollment_id,
            status: ProgressStatus::NotStarted,
            completed_lessons: 0,
            total_lessons: totals.lessons,
            completed_quizzes: 0,
            total_quizzes: totals.quizzes,
            time_spent_minutes: 0,
            started_at: None,
            completed_at: None,
            last_accessed_at: None,
            certificate_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[inline]
    pub fn totals(&self) -> CourseTotals {
        CourseTotals::new(self.total_lessons, self.total_quizzes)
    }

    /// Completion percentage, rounded to two decimals
    pub fn percentage(&self) -> f64 {
        completion_percentage(
            self.completed_lessons.saturating_add(self.completed_quizzes),
            self.totals().items(),
            self.is_completed(),
        )
    }

    #[inline]
    pub fn is_completed(&self) -> bool {
        self.status == ProgressStatus::Completed
    }

    /// Both counters have reached their totals
    pub fn is_complete_eligible(&self) -> bool {
        self.completed_lessons >= self.total_lessons && self.completed_quizzes >= self.total_quizzes
    }

    /// Reject mutation of a completed record
    pub fn ensure_mutable(&self) -> ProgressResult<()> {
        if self.is_completed() {
            return Err(ProgressError::ProgressCompleted);
        }
        Ok(())
    }

    /// `not_started → in_progress`
    ///
    /// Returns `false` when the record was already in progress.
    pub fn mark_started(&mut self) -> ProgressResult<bool> {
        self.ensure_mutable()?;
        if self.status.is_started() {
            return Ok(false);
        }

        let now = Utc::now();
        self.status = ProgressStatus::InProgress;
        self.started_at = Some(now);
        self.updated_at = now;
        Ok(true)
    }

    /// Overwrite counters with absolute values
    ///
    /// Writing the values the record already holds changes nothing and
    /// returns `false`. The first non-zero activity starts the record; it
    /// never completes it.
    pub fn apply_counts(
        &mut self,
        completed_lessons: u32,
        completed_quizzes: u32,
        time_spent_minutes: u32,
    ) -> ProgressResult<bool> {
        self.ensure_mutable()?;
        if completed_lessons > self.total_lessons {
            return Err(ProgressError::InvalidProgressData(format!(
                "completed lessons {} exceeds course total {}",
                completed_lessons, self.total_lessons
            )));
        }
        if completed_quizzes > self.total_quizzes {
            return Err(ProgressError::InvalidProgressData(format!(
                "completed quizzes {} exceeds course total {}",
                completed_quizzes, self.total_quizzes
            )));
        }

        let unchanged = self.completed_lessons == completed_lessons
            && self.completed_quizzes == completed_quizzes
            && self.time_spent_minutes == time_spent_minutes;
        if unchanged {
            return Ok(false);
        }

        self.completed_lessons = completed_lessons;
        self.completed_quizzes = completed_quizzes;
        self.time_spent_minutes = time_spent_minutes;

        let has_activity = completed_lessons > 0 || completed_quizzes > 0 || time_spent_minutes > 0;
        if has_activity {
            self.mark_started()?;
        }
        self.touch();
        Ok(true)
    }

    /// One more completed lesson, capped at the course total
    ///
    /// Counts are not keyed by lesson: the same lesson reported twice
    /// counts twice. Callers that need exact per-lesson state send absolute
    /// values through [`apply_counts`](Self::apply_counts), which is
    /// idempotent.
    pub fn record_lesson(&mut self, minutes: u32) -> ProgressResult<()> {
        self.ensure_mutable()?;
        self.completed_lessons = self.completed_lessons.saturating_add(1).min(self.total_lessons);
        self.time_spent_minutes = self.time_spent_minutes.saturating_add(minutes);
        self.mark_started()?;
        self.touch();
        Ok(())
    }

    /// Record a quiz attempt; only a passing attempt counts
    ///
    /// Like [`record_lesson`](Self::record_lesson), a replayed passing
    /// attempt counts again until the total is reached.
    pub fn record_quiz_attempt(&mut self, passed: bool, minutes: u32) -> ProgressResult<()> {
        self.ensure_mutable()?;
        if passed {
            self.completed_quizzes = self.completed_quizzes.saturating_add(1).min(self.total_quizzes);
        }
        self.time_spent_minutes = self.time_spent_minutes.saturating_add(minutes);
        self.mark_started()?;
        self.touch();
        Ok(())
    }

    /// Update last-access timestamp
    pub fn touch(&mut self) {
        let now = Utc::now();
        self.last_accessed_at = Some(now);
        self.updated_at = now;
    }

    /// `in_progress → completed`
    ///
    /// ## Errors
    /// `CourseNotComplete` unless both counters equal their totals.
    pub fn mark_completed(
        &mut self,
        certificate_id: Option<CertificateId>,
        completed_at: DateTime<Utc>,
    ) -> ProgressResult<()> {
        if !self.is_complete_eligible() {
            return Err(ProgressError::CourseNotComplete {
                completed_lessons: self.completed_lessons,
                total_lessons: self.total_lessons,
                completed_quizzes: self.completed_quizzes,
                total_quizzes: self.total_quizzes,
            });
        }

        self.status = ProgressStatus::Completed;
        self.started_at.get_or_insert(completed_at);
        self.completed_at = Some(completed_at);
        self.certificate_id = certificate_id.or(self.certificate_id);
        self.updated_at = completed_at;
        Ok(())
    }

    /// Return to `not_started` and clear counters and time
    ///
    /// The certificate link is dropped only when `keep_certificate_link` is
    /// false.
    pub fn reset(&mut self, keep_certificate_link: bool) {
        self.status = ProgressStatus::NotStarted;
        self.completed_lessons = 0;
        self.completed_quizzes = 0;
        self.time_spent_minutes = 0;
        self.started_at = None;
        self.completed_at = None;
        if !keep_certificate_link {
            self.certificate_id = None;
        }
        self.updated_at = Utc::now();
    }
}
