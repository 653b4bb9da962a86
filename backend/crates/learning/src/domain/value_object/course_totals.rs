//! Course Totals
//!
//! Lesson and quiz counts of a course as reported by the course catalog.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CourseTotals {
    pub lessons: u32,
    pub quizzes: u32,
}

impl CourseTotals {
    pub const fn new(lessons: u32, quizzes: u32) -> Self {
        Self { lessons, quizzes }
    }

    /// Lessons plus quizzes
    #[inline]
    pub const fn items(&self) -> u32 {
        self.lessons.saturating_add(self.quizzes)
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.items() == 0
    }
}
