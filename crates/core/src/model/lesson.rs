use chrono::{DateTime, Utc};
use thiserror::Error;
use url::Url;

use crate::model::ids::{CourseId, LessonId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LessonError {
    #[error("lesson title cannot be empty")]
    EmptyTitle,

    #[error("video reference is not a valid URL: {raw}")]
    InvalidVideoRef { raw: String },
}

//
// ─── LESSON ────────────────────────────────────────────────────────────────────
//

/// A single lesson within a course.
///
/// `id` is unique within the course and assigned sequentially at authoring
/// time. `order_index` determines presentation and module-grouping order and
/// is the ordering key everywhere; lesson ids are never used for ordering.
/// Inactive lessons are excluded from every learner-facing computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lesson {
    id: LessonId,
    course_id: CourseId,
    title: String,
    video_ref: Option<Url>,
    duration_label: Option<String>,
    order_index: u32,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl Lesson {
    /// Creates a new active lesson.
    ///
    /// # Errors
    ///
    /// Returns `LessonError::EmptyTitle` for a blank title and
    /// `LessonError::InvalidVideoRef` if the video reference does not parse
    /// as a URL.
    pub fn new(
        id: LessonId,
        course_id: CourseId,
        title: impl Into<String>,
        video_ref: Option<&str>,
        duration_label: Option<String>,
        order_index: u32,
        created_at: DateTime<Utc>,
    ) -> Result<Self, LessonError> {
        Self::from_persisted(
            id,
            course_id,
            title,
            video_ref,
            duration_label,
            order_index,
            true,
            created_at,
        )
    }

    /// Rehydrate a lesson from persisted storage.
    ///
    /// # Errors
    ///
    /// Same validation as [`Lesson::new`].
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: LessonId,
        course_id: CourseId,
        title: impl Into<String>,
        video_ref: Option<&str>,
        duration_label: Option<String>,
        order_index: u32,
        is_active: bool,
        created_at: DateTime<Utc>,
    ) -> Result<Self, LessonError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(LessonError::EmptyTitle);
        }
        let video_ref = video_ref
            .map(|raw| {
                Url::parse(raw).map_err(|_| LessonError::InvalidVideoRef {
                    raw: raw.to_string(),
                })
            })
            .transpose()?;

        Ok(Self {
            id,
            course_id,
            title,
            video_ref,
            duration_label,
            order_index,
            is_active,
            created_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> LessonId {
        self.id
    }

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn video_ref(&self) -> Option<&Url> {
        self.video_ref.as_ref()
    }

    /// Free-text duration shown in the syllabus ("12 min"); never parsed.
    #[must_use]
    pub fn duration_label(&self) -> Option<&str> {
        self.duration_label.as_deref()
    }

    #[must_use]
    pub fn order_index(&self) -> u32 {
        self.order_index
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Hide the lesson from learners without deleting authored content.
    pub fn deactivate(&mut self) {
        self.is_active = false;
    }

    pub fn activate(&mut self) {
        self.is_active = true;
    }

    /// Move the lesson to a new position in the course sequence.
    pub fn reorder(&mut self, order_index: u32) {
        self.order_index = order_index;
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
