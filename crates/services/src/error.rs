use thiserror::Error;

use course_core::model::{EnrollmentError, LessonId, QuizError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors surfaced by the enrollment workflow.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EnrollmentServiceError {
    /// The `(course, email)` pair already has an enrollment.
    #[error("this email is already enrolled in the course")]
    AlreadyEnrolled,

    #[error("enrollment not found")]
    NotFound,

    #[error(transparent)]
    Enrollment(#[from] EnrollmentError),

    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for EnrollmentServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Conflict => Self::AlreadyEnrolled,
            StorageError::NotFound => Self::NotFound,
            other => Self::Storage(other),
        }
    }
}

/// Errors surfaced by the lesson viewer workflow.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ViewerError {
    #[error("enrollment not found")]
    EnrollmentNotFound,

    #[error("no lesson is selected")]
    NoLessonSelected,

    #[error("lesson {0} is not an active lesson of this course")]
    UnknownLesson(LessonId),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors surfaced by quiz authoring and quiz attempts.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizServiceError {
    #[error("no quiz is attached to this lesson")]
    NoQuiz,

    /// Forward navigation and finishing are gated on an answer for the
    /// question the learner is on.
    #[error("the current question has not been answered")]
    CurrentUnanswered,

    #[error("question {index} has not been answered")]
    Unanswered { index: usize },

    #[error("option {provided} is out of range")]
    InvalidOption { provided: usize },

    #[error("the quiz has no questions")]
    EmptyQuiz,

    #[error(transparent)]
    Quiz(#[from] QuizError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors raised while wiring the application services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
