//! Domain Services
//!
//! Pure arithmetic shared by entities and use cases.

use serde::Serialize;

use crate::error::{ProgressError, ProgressResult};

/// Round to two decimal places
#[inline]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Completion percentage of a course
///
/// `(completed / total) * 100`, rounded to two decimals. A course without
/// any lessons or quizzes reports 0 until it is completed and 100 after.
pub fn completion_percentage(completed_items: u32, total_items: u32, is_completed: bool) -> f64 {
    if total_items == 0 {
        return if is_completed { 100.0 } else { 0.0 };
    }
    let ratio = f64::from(completed_items.min(total_items)) / f64::from(total_items);
    round2(ratio * 100.0)
}

/// Outcome of grading a single quiz attempt
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizGrade {
    pub percentage: f64,
    pub passed: bool,
}

/// Grade a quiz attempt against a passing percentage
///
/// ## Errors
/// `InvalidQuizResult` when the points are negative, when nothing could be
/// earned, or when more was earned than possible.
pub fn grade_quiz(
    points_earned: f64,
    points_possible: f64,
    passing_percentage: f64,
) -> ProgressResult<QuizGrade> {
    if !points_earned.is_finite() || !points_possible.is_finite() {
        return Err(ProgressError::InvalidQuizResult(
            "points must be finite numbers".into(),
        ));
    }
    if points_possible <= 0.0 {
        return Err(ProgressError::InvalidQuizResult(
            "points possible must be greater than zero".into(),
        ));
    }
    if points_earned < 0.0 || points_earned > points_possible {
        return Err(ProgressError::InvalidQuizResult(format!(
            "points earned must be between 0 and {points_possible}"
        )));
    }

    let percentage = round2(points_earned / points_possible * 100.0);
    Ok(QuizGrade {
        percentage,
        passed: percentage >= passing_percentage,
    })
}
