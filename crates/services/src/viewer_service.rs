use std::sync::Arc;

use course_core::Clock;
use course_core::model::{Enrollment, EnrollmentId, Lesson, LessonId};
use course_core::progress::ProgressSnapshot;
use storage::repository::{EnrollmentRepository, LessonRepository, ProgressRepository};

use crate::error::ViewerError;
use crate::events::{ChangeHub, ChangedTable};

//
// ─── VIEWER STATE ──────────────────────────────────────────────────────────────
//

/// In-session state of the lesson viewer for one enrollment.
///
/// The resume rule runs exactly once, in [`ViewerService::open`]; afterwards
/// the current lesson only moves by explicit selection or by the auto-advance
/// on completion. Reopening the viewer re-applies the rule.
#[derive(Debug, Clone)]
pub struct LessonViewer {
    enrollment: Enrollment,
    lessons: Vec<Lesson>,
    snapshot: ProgressSnapshot,
    current: Option<LessonId>,
}

impl LessonViewer {
    #[must_use]
    pub fn enrollment(&self) -> &Enrollment {
        &self.enrollment
    }

    /// Active lessons of the course in presentation order.
    #[must_use]
    pub fn lessons(&self) -> &[Lesson] {
        &self.lessons
    }

    #[must_use]
    pub fn snapshot(&self) -> &ProgressSnapshot {
        &self.snapshot
    }

    #[must_use]
    pub fn current_lesson_id(&self) -> Option<LessonId> {
        self.current
    }

    #[must_use]
    pub fn current_lesson(&self) -> Option<&Lesson> {
        let id = self.current?;
        self.lessons.iter().find(|l| l.id() == id)
    }

    #[must_use]
    pub fn is_lesson_completed(&self, lesson_id: LessonId) -> bool {
        self.snapshot.is_lesson_completed(lesson_id)
    }

    /// Jump to a lesson from the sidebar. Any active lesson may be selected;
    /// completion state does not gate navigation.
    ///
    /// # Errors
    ///
    /// `UnknownLesson` when the id is not in the course's active list.
    pub fn select_lesson(&mut self, lesson_id: LessonId) -> Result<(), ViewerError> {
        if !self.snapshot.ordered_lesson_ids().contains(&lesson_id) {
            return Err(ViewerError::UnknownLesson(lesson_id));
        }
        self.current = Some(lesson_id);
        Ok(())
    }
}

/// What one mark-complete action did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkCompleteOutcome {
    /// `false` when the lesson was already completed (the write is
    /// idempotent and keeps the first timestamp).
    pub newly_completed: bool,
    /// The lesson the viewer auto-advanced to, when one follows.
    pub advanced_to: Option<LessonId>,
    /// `true` when this action set the enrollment's completion badge.
    pub course_completed: bool,
    pub percentage: u8,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Lesson viewer workflow: open-with-resume, selection, mark-complete with
/// auto-advance, and the automatic enrollment completion badge.
#[derive(Clone)]
pub struct ViewerService {
    clock: Clock,
    enrollments: Arc<dyn EnrollmentRepository>,
    lessons: Arc<dyn LessonRepository>,
    progress: Arc<dyn ProgressRepository>,
    hub: ChangeHub,
}

impl ViewerService {
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

    /// Open the viewer for an enrollment, landing on the resume lesson.
    ///
    /// `current` is `None` only when the course has no active lessons; the
    /// viewer still opens so the empty state can render.
    ///
    /// # Errors
    ///
    /// `EnrollmentNotFound` for an unknown enrollment; storage errors
    /// otherwise.
    pub async fn open(&self, enrollment_id: EnrollmentId) -> Result<LessonViewer, ViewerError> {
        let enrollment = self
            .enrollments
            .get_enrollment(enrollment_id)
            .await?
            .ok_or(ViewerError::EnrollmentNotFound)?;
        let lessons = self
            .lessons
            .list_active_lessons(enrollment.course_id())
            .await?;
        let progress = self.progress.list_progress(enrollment_id).await?;
        let snapshot = ProgressSnapshot::compute(&lessons, &progress);
        let current = snapshot.resume_lesson_id();

        Ok(LessonViewer {
            enrollment,
            lessons,
            snapshot,
            current,
        })
    }

    /// Mark the viewer's current lesson complete.
    ///
    /// Records the progress row (idempotently), recomputes the snapshot,
    /// auto-advances to the next lesson in presentation order when one
    /// exists, and sets the enrollment's completion badge the moment the
    /// percentage reaches 100.
    ///
    /// # Errors
    ///
    /// `NoLessonSelected` when the course has no lessons to complete;
    /// storage errors otherwise.
    pub async fn mark_current_complete(
        &self,
        viewer: &mut LessonViewer,
    ) -> Result<MarkCompleteOutcome, ViewerError> {
        let lesson_id = viewer.current.ok_or(ViewerError::NoLessonSelected)?;
        let now = self.clock.now();

        let newly_completed = self
            .progress
            .insert_progress(viewer.enrollment.id(), lesson_id, now)
            .await?;

        let progress = self.progress.list_progress(viewer.enrollment.id()).await?;
        viewer.snapshot = ProgressSnapshot::compute(&viewer.lessons, &progress);

        let advanced_to = viewer.snapshot.next_after(lesson_id);
        if let Some(next) = advanced_to {
            viewer.current = Some(next);
        }

        let mut course_completed = false;
        if viewer.snapshot.is_complete() && !viewer.enrollment.is_completed() {
            course_completed = self
                .enrollments
                .set_completed(viewer.enrollment.id(), now)
                .await?;
            if course_completed {
                viewer.enrollment.mark_completed(now);
                self.hub.notify(ChangedTable::Enrollments);
            }
        }

        if newly_completed {
            self.hub.notify(ChangedTable::LessonProgress);
        }

        Ok(MarkCompleteOutcome {
            newly_completed,
            advanced_to,
            course_completed,
            percentage: viewer.snapshot.percentage(),
        })
    }
}
