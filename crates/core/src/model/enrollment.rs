use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::{CourseId, EnrollmentId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EnrollmentError {
    #[error("student name cannot be empty")]
    EmptyStudentName,

    #[error("email address is not well-formed: {raw}")]
    InvalidEmail { raw: String },
}

//
// ─── ENROLLMENT ────────────────────────────────────────────────────────────────
//

/// A learner's registration in one course.
///
/// `completed_at` is set at most once and never cleared; it is the
/// enrollment-level "completed" badge and is independent of the per-lesson
/// progress percentage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrollment {
    id: EnrollmentId,
    course_id: CourseId,
    student_name: String,
    email: String,
    enrolled_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

fn validate_email(raw: &str) -> Result<String, EnrollmentError> {
    let trimmed = raw.trim();
    let invalid = || EnrollmentError::InvalidEmail {
        raw: raw.to_string(),
    };
    let (local, domain) = trimmed.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        return Err(invalid());
    }
    Ok(trimmed.to_ascii_lowercase())
}

impl Enrollment {
    /// Creates a new, not-yet-completed enrollment.
    ///
    /// The email is normalized to lowercase so the storage uniqueness
    /// constraint on `(course, email)` cannot be bypassed by casing.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentError` if the student name is blank or the email is
    /// not minimally well-formed.
    pub fn new(
        id: EnrollmentId,
        course_id: CourseId,
        student_name: impl Into<String>,
        email: &str,
        enrolled_at: DateTime<Utc>,
    ) -> Result<Self, EnrollmentError> {
        Self::from_persisted(id, course_id, student_name, email, enrolled_at, None)
    }

    /// Rehydrate an enrollment from persisted storage.
    ///
    /// # Errors
    ///
    /// Same validation as [`Enrollment::new`].
    pub fn from_persisted(
        id: EnrollmentId,
        course_id: CourseId,
        student_name: impl Into<String>,
        email: &str,
        enrolled_at: DateTime<Utc>,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<Self, EnrollmentError> {
        let student_name = student_name.into();
        if student_name.trim().is_empty() {
            return Err(EnrollmentError::EmptyStudentName);
        }
        let email = validate_email(email)?;
        Ok(Self {
            id,
            course_id,
            student_name,
            email,
            enrolled_at,
            completed_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> EnrollmentId {
        self.id
    }

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    #[must_use]
    pub fn student_name(&self) -> &str {
        &self.student_name
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[must_use]
    pub fn enrolled_at(&self) -> DateTime<Utc> {
        self.enrolled_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Mark the enrollment completed at the given time.
    ///
    /// The timestamp is written only once; later calls keep the original
    /// value. Returns `true` when this call set it.
    pub fn mark_completed(&mut self, at: DateTime<Utc>) -> bool {
        if self.completed_at.is_some() {
            return false;
        }
        self.completed_at = Some(at);
        true
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
