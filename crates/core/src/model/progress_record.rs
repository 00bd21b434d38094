use chrono::{DateTime, Utc};

use crate::model::ids::{EnrollmentId, LessonId};

/// A record asserting that a learner finished a specific lesson.
///
/// A row with a non-null `completed_at` is the sole completion signal; rows
/// are append-only and an existing row's timestamp is never rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonProgress {
    enrollment_id: EnrollmentId,
    lesson_id: LessonId,
    completed_at: Option<DateTime<Utc>>,
}

impl LessonProgress {
    #[must_use]
    pub fn new(
        enrollment_id: EnrollmentId,
        lesson_id: LessonId,
        completed_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            enrollment_id,
            lesson_id,
            completed_at,
        }
    }

    /// Convenience constructor for the mark-complete write path.
    #[must_use]
    pub fn completed(
        enrollment_id: EnrollmentId,
        lesson_id: LessonId,
        at: DateTime<Utc>,
    ) -> Self {
        Self::new(enrollment_id, lesson_id, Some(at))
    }

    #[must_use]
    pub fn enrollment_id(&self) -> EnrollmentId {
        self.enrollment_id
    }

    #[must_use]
    pub fn lesson_id(&self) -> LessonId {
        self.lesson_id
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}
