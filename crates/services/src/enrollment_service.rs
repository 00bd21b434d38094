use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use course_core::Clock;
use course_core::model::{CourseId, Enrollment, EnrollmentId};
use course_core::progress::{
    EnrollmentActivity, ProgressSnapshot, enrollment_activity,
};
use storage::repository::{EnrollmentRepository, LessonRepository, ProgressRepository};

use crate::error::EnrollmentServiceError;
use crate::events::{ChangeHub, ChangedTable};

/// One dashboard row: an enrollment joined with its derived progress state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentOverview {
    pub enrollment_id: EnrollmentId,
    pub course_id: CourseId,
    pub student_name: String,
    pub percentage: u8,
    pub completed_lessons: usize,
    pub total_lessons: usize,
    pub activity: EnrollmentActivity,
    pub enrolled_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Enrollment workflow: signing up, the completion badge, and dashboard rows.
#[derive(Clone)]
pub struct EnrollmentService {
    clock: Clock,
    enrollments: Arc<dyn EnrollmentRepository>,
    lessons: Arc<dyn LessonRepository>,
    progress: Arc<dyn ProgressRepository>,
    hub: ChangeHub,
}

impl EnrollmentService {
    #[must_use]
    pub fn new(
        clock: Clock,
        enrollments: Arc<dyn EnrollmentRepository>,
        lessons: Arc<dyn LessonRepository>,
        progress: Arc<dyn ProgressRepository>,
        hub: ChangeHub,
    ) -> Self {
        Self {
            clock,
            enrollments,
            lessons,
            progress,
            hub,
        }
    }

    /// Enroll a learner in a course.
    ///
    /// The email is normalized by the domain type, so casing or surrounding
    /// whitespace cannot produce a second enrollment for the same learner.
    ///
    /// # Errors
    ///
    /// `AlreadyEnrolled` when the `(course, email)` pair exists; validation
    /// errors from the domain type; storage errors otherwise.
    pub async fn enroll(
        &self,
        course_id: CourseId,
        student_name: &str,
        email: &str,
    ) -> Result<Enrollment, EnrollmentServiceError> {
        let enrollment = Enrollment::new(
            EnrollmentId::new_random(),
            course_id,
            student_name,
            email,
            self.clock.now(),
        )?;
        self.enrollments.insert_enrollment(&enrollment).await?;
        self.hub.notify(ChangedTable::Enrollments);
        Ok(enrollment)
    }

    /// Set the enrollment-level completion badge by hand (admin action).
    ///
    /// Returns `true` when this call set the badge; `false` when it was
    /// already set, in which case the earlier timestamp is kept.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown enrollment; storage errors otherwise.
    pub async fn mark_completed(
        &self,
        enrollment_id: EnrollmentId,
    ) -> Result<bool, EnrollmentServiceError> {
        let wrote = self
            .enrollments
            .set_completed(enrollment_id, self.clock.now())
            .await?;
        if wrote {
            self.hub.notify(ChangedTable::Enrollments);
        }
        Ok(wrote)
    }

    /// Dashboard row for one enrollment.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown enrollment; storage errors otherwise.
    pub async fn overview(
        &self,
        enrollment_id: EnrollmentId,
    ) -> Result<EnrollmentOverview, EnrollmentServiceError> {
        let enrollment = self
            .enrollments
            .get_enrollment(enrollment_id)
            .await?
            .ok_or(EnrollmentServiceError::NotFound)?;
        self.build_overview(&enrollment).await
    }

    /// Dashboard rows for every course a learner is enrolled in, ordered by
    /// enrollment time.
    ///
    /// # Errors
    ///
    /// Returns storage errors.
    pub async fn list_overviews(
        &self,
        email: &str,
    ) -> Result<Vec<EnrollmentOverview>, EnrollmentServiceError> {
        let enrollments = self.enrollments.list_enrollments_by_email(email).await?;
        let mut overviews = Vec::with_capacity(enrollments.len());
        for enrollment in &enrollments {
            overviews.push(self.build_overview(enrollment).await?);
        }
        Ok(overviews)
    }

    async fn build_overview(
        &self,
        enrollment: &Enrollment,
    ) -> Result<EnrollmentOverview, EnrollmentServiceError> {
        let lessons = self
            .lessons
            .list_active_lessons(enrollment.course_id())
            .await?;
        let progress = self.progress.list_progress(enrollment.id()).await?;
        let snapshot = ProgressSnapshot::compute(&lessons, &progress);
        let latest = course_core::progress::latest_progress_at(&progress);

        Ok(EnrollmentOverview {
            enrollment_id: enrollment.id(),
            course_id: enrollment.course_id(),
            student_name: enrollment.student_name().to_owned(),
            percentage: snapshot.percentage(),
            completed_lessons: snapshot.completed_count(),
            total_lessons: snapshot.total_lessons(),
            activity: enrollment_activity(enrollment, latest, self.clock.now()),
            enrolled_at: enrollment.enrolled_at(),
            completed_at: enrollment.completed_at(),
        })
    }
}
