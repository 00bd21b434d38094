use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

use course_core::model::{
    Course, CourseId, Enrollment, EnrollmentId, Lesson, LessonId, LessonProgress, Quiz,
};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Fields needed to create a course; the id comes back from storage.
#[derive(Debug, Clone)]
pub struct NewCourseRecord {
    pub title: String,
    pub description: Option<String>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

impl NewCourseRecord {
    #[must_use]
    pub fn from_course(course: &Course) -> Self {
        Self {
            title: course.title().to_owned(),
            description: course.description().map(ToOwned::to_owned),
            is_published: course.is_published(),
            created_at: course.created_at(),
        }
    }
}

/// Repository contract for catalog courses.
#[async_trait]
pub trait CourseRepository: Send + Sync {
    /// Persist a new course and return its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the course cannot be stored.
    async fn insert_course(&self, course: NewCourseRecord) -> Result<CourseId, StorageError>;

    /// Fetch a course by id; `Ok(None)` when missing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError>;

    /// List published courses ordered by id, up to `limit`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn list_published_courses(&self, limit: u32) -> Result<Vec<Course>, StorageError>;
}

/// Repository contract for course lessons.
#[async_trait]
pub trait LessonRepository: Send + Sync {
    /// Persist or update a lesson (keyed by `(course_id, lesson_id)`).
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` when another lesson in the course
    /// already occupies the same `order_index`.
    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError>;

    /// Active lessons of a course, sorted by `order_index`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn list_active_lessons(&self, course_id: CourseId) -> Result<Vec<Lesson>, StorageError>;

    /// Every lesson of a course including inactive ones, sorted by
    /// `order_index` (admin view).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn list_lessons(&self, course_id: CourseId) -> Result<Vec<Lesson>, StorageError>;
}

/// Repository contract for enrollments.
#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    /// Persist a new enrollment.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` when the `(course, email)` pair is
    /// already enrolled — uniqueness lives here, not in UI checks.
    async fn insert_enrollment(&self, enrollment: &Enrollment) -> Result<(), StorageError>;

    /// Fetch by id; `Ok(None)` when missing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn get_enrollment(
        &self,
        id: EnrollmentId,
    ) -> Result<Option<Enrollment>, StorageError>;

    /// Look up one learner's enrollment in one course.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn find_enrollment(
        &self,
        course_id: CourseId,
        email: &str,
    ) -> Result<Option<Enrollment>, StorageError>;

    /// All of a learner's enrollments across courses (dashboard view).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn list_enrollments_by_email(
        &self,
        email: &str,
    ) -> Result<Vec<Enrollment>, StorageError>;

    /// Set the enrollment-level completion badge.
    ///
    /// Writes only when the badge is still unset; the first timestamp always
    /// wins. Returns `true` when this call set it.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for an unknown enrollment.
    async fn set_completed(
        &self,
        id: EnrollmentId,
        at: DateTime<Utc>,
    ) -> Result<bool, StorageError>;
}

/// Repository contract for lesson progress rows.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Append a completed-progress row for `(enrollment, lesson)`.
    ///
    /// Idempotent: a second insert for the same pair leaves the existing row
    /// (and its timestamp) untouched and returns `false`. This is the
    /// uniqueness guarantee that keeps duplicate rows out of the pure
    /// computations.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn insert_progress(
        &self,
        enrollment_id: EnrollmentId,
        lesson_id: LessonId,
        completed_at: DateTime<Utc>,
    ) -> Result<bool, StorageError>;

    /// All progress rows for one enrollment.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn list_progress(
        &self,
        enrollment_id: EnrollmentId,
    ) -> Result<Vec<LessonProgress>, StorageError>;

    /// Timestamp of the most recent completed row, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn latest_progress_at(
        &self,
        enrollment_id: EnrollmentId,
    ) -> Result<Option<DateTime<Utc>>, StorageError>;
}

/// Repository contract for lesson quizzes.
#[async_trait]
pub trait QuizRepository: Send + Sync {
    /// Replace the quiz attached to a lesson (authoring writes the whole
    /// question list at once).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the quiz cannot be stored.
    async fn replace_quiz(&self, quiz: &Quiz) -> Result<(), StorageError>;

    /// Fetch the quiz for a lesson; `Ok(None)` when the lesson has none.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn get_quiz(
        &self,
        course_id: CourseId,
        lesson_id: LessonId,
    ) -> Result<Option<Quiz>, StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

/// Simple in-memory repository implementation for testing and prototyping.
///
/// Enforces the same uniqueness rules as the SQLite schema so services see
/// identical behavior against either backend.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    courses: Arc<Mutex<HashMap<CourseId, Course>>>,
    next_course_id: Arc<AtomicU64>,
    lessons: Arc<Mutex<HashMap<(CourseId, LessonId), Lesson>>>,
    enrollments: Arc<Mutex<HashMap<EnrollmentId, Enrollment>>>,
    progress: Arc<Mutex<HashMap<(EnrollmentId, LessonId), LessonProgress>>>,
    quizzes: Arc<Mutex<HashMap<(CourseId, LessonId), Quiz>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_course_id: Arc::new(AtomicU64::new(1)),
            ..Self::default()
        }
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl CourseRepository for InMemoryRepository {
    async fn insert_course(&self, course: NewCourseRecord) -> Result<CourseId, StorageError> {
        let id = CourseId::new(self.next_course_id.fetch_add(1, Ordering::SeqCst));
        let course = Course::new(
            id,
            course.title,
            course.description,
            course.is_published,
            course.created_at,
        )
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let mut guard = self.courses.lock().map_err(poisoned)?;
        guard.insert(id, course);
        Ok(id)
    }

    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        let guard = self.courses.lock().map_err(poisoned)?;
        Ok(guard.get(&id).cloned())
    }

    async fn list_published_courses(&self, limit: u32) -> Result<Vec<Course>, StorageError> {
        let guard = self.courses.lock().map_err(poisoned)?;
        let mut courses: Vec<Course> = guard
            .values()
            .filter(|c| c.is_published())
            .cloned()
            .collect();
        courses.sort_by_key(Course::id);
        courses.truncate(limit as usize);
        Ok(courses)
    }
}

#[async_trait]
impl LessonRepository for InMemoryRepository {
    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
        let mut guard = self.lessons.lock().map_err(poisoned)?;
        let order_taken = guard.values().any(|existing| {
            existing.course_id() == lesson.course_id()
                && existing.id() != lesson.id()
                && existing.order_index() == lesson.order_index()
        });
        if order_taken {
            return Err(StorageError::Conflict);
        }
        guard.insert((lesson.course_id(), lesson.id()), lesson.clone());
        Ok(())
    }

    async fn list_active_lessons(&self, course_id: CourseId) -> Result<Vec<Lesson>, StorageError> {
        let mut lessons = self.list_lessons(course_id).await?;
        lessons.retain(Lesson::is_active);
        Ok(lessons)
    }

    async fn list_lessons(&self, course_id: CourseId) -> Result<Vec<Lesson>, StorageError> {
        let guard = self.lessons.lock().map_err(poisoned)?;
        let mut lessons: Vec<Lesson> = guard
            .values()
            .filter(|l| l.course_id() == course_id)
            .cloned()
            .collect();
        lessons.sort_by_key(|l| (l.order_index(), l.id()));
        Ok(lessons)
    }
}

#[async_trait]
impl EnrollmentRepository for InMemoryRepository {
    async fn insert_enrollment(&self, enrollment: &Enrollment) -> Result<(), StorageError> {
        let mut guard = self.enrollments.lock().map_err(poisoned)?;
        let duplicate = guard.values().any(|existing| {
            existing.course_id() == enrollment.course_id()
                && existing.email() == enrollment.email()
        });
        if duplicate || guard.contains_key(&enrollment.id()) {
            return Err(StorageError::Conflict);
        }
        guard.insert(enrollment.id(), enrollment.clone());
        Ok(())
    }

    async fn get_enrollment(
        &self,
        id: EnrollmentId,
    ) -> Result<Option<Enrollment>, StorageError> {
        let guard = self.enrollments.lock().map_err(poisoned)?;
        Ok(guard.get(&id).cloned())
    }

    async fn find_enrollment(
        &self,
        course_id: CourseId,
        email: &str,
    ) -> Result<Option<Enrollment>, StorageError> {
        let needle = email.trim().to_ascii_lowercase();
        let guard = self.enrollments.lock().map_err(poisoned)?;
        Ok(guard
            .values()
            .find(|e| e.course_id() == course_id && e.email() == needle)
            .cloned())
    }

    async fn list_enrollments_by_email(
        &self,
        email: &str,
    ) -> Result<Vec<Enrollment>, StorageError> {
        let needle = email.trim().to_ascii_lowercase();
        let guard = self.enrollments.lock().map_err(poisoned)?;
        let mut found: Vec<Enrollment> = guard
            .values()
            .filter(|e| e.email() == needle)
            .cloned()
            .collect();
        found.sort_by_key(Enrollment::enrolled_at);
        Ok(found)
    }

    async fn set_completed(
        &self,
        id: EnrollmentId,
        at: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        let mut guard = self.enrollments.lock().map_err(poisoned)?;
        let enrollment = guard.get_mut(&id).ok_or(StorageError::NotFound)?;
        Ok(enrollment.mark_completed(at))
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn insert_progress(
        &self,
        enrollment_id: EnrollmentId,
        lesson_id: LessonId,
        completed_at: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        let mut guard = self.progress.lock().map_err(poisoned)?;
        let key = (enrollment_id, lesson_id);
        if guard.contains_key(&key) {
            return Ok(false);
        }
        guard.insert(
            key,
            LessonProgress::completed(enrollment_id, lesson_id, completed_at),
        );
        Ok(true)
    }

    async fn list_progress(
        &self,
        enrollment_id: EnrollmentId,
    ) -> Result<Vec<LessonProgress>, StorageError> {
        let guard = self.progress.lock().map_err(poisoned)?;
        let mut rows: Vec<LessonProgress> = guard
            .values()
            .filter(|row| row.enrollment_id() == enrollment_id)
            .cloned()
            .collect();
        rows.sort_by_key(LessonProgress::lesson_id);
        Ok(rows)
    }

    async fn latest_progress_at(
        &self,
        enrollment_id: EnrollmentId,
    ) -> Result<Option<DateTime<Utc>>, StorageError> {
        let rows = self.list_progress(enrollment_id).await?;
        Ok(course_core::progress::latest_progress_at(&rows))
    }
}

#[async_trait]
impl QuizRepository for InMemoryRepository {
    async fn replace_quiz(&self, quiz: &Quiz) -> Result<(), StorageError> {
        let mut guard = self.quizzes.lock().map_err(poisoned)?;
        guard.insert((quiz.course_id(), quiz.lesson_id()), quiz.clone());
        Ok(())
    }

    async fn get_quiz(
        &self,
        course_id: CourseId,
        lesson_id: LessonId,
    ) -> Result<Option<Quiz>, StorageError> {
        let guard = self.quizzes.lock().map_err(poisoned)?;
        Ok(guard.get(&(course_id, lesson_id)).cloned())
    }
}

//
// ─── AGGREGATE ─────────────────────────────────────────────────────────────────
//

/// Aggregates the per-entity repositories behind trait objects so services
/// can swap the in-memory fake for SQLite without code changes.
#[derive(Clone)]
pub struct Storage {
    pub courses: Arc<dyn CourseRepository>,
    pub lessons: Arc<dyn LessonRepository>,
    pub enrollments: Arc<dyn EnrollmentRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub quizzes: Arc<dyn QuizRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            courses: Arc::new(repo.clone()),
            lessons: Arc::new(repo.clone()),
            enrollments: Arc::new(repo.clone()),
            progress: Arc::new(repo.clone()),
            quizzes: Arc::new(repo),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use course_core::time::fixed_now;

    fn lesson(id: u64, order_index: u32) -> Lesson {
        Lesson::new(
            LessonId::new(id),
            CourseId::new(1),
            format!("Lesson {id}"),
            None,
            None,
            order_index,
            fixed_now(),
        )
        .unwrap()
    }

    fn enrollment(email: &str) -> Enrollment {
        Enrollment::new(
            EnrollmentId::new_random(),
            CourseId::new(1),
            "Dana",
            email,
            fixed_now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn active_lessons_sorted_by_order_index() {
        let repo = InMemoryRepository::new();
        repo.upsert_lesson(&lesson(2, 3)).await.unwrap();
        repo.upsert_lesson(&lesson(1, 1)).await.unwrap();
        let mut hidden = lesson(3, 2);
        hidden.deactivate();
        repo.upsert_lesson(&hidden).await.unwrap();

        let active = repo.list_active_lessons(CourseId::new(1)).await.unwrap();
        let ids: Vec<u64> = active.iter().map(|l| l.id().value()).collect();
        assert_eq!(ids, vec![1, 2]);

        let all = repo.list_lessons(CourseId::new(1)).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn lesson_order_index_is_unique_per_course() {
        let repo = InMemoryRepository::new();
        repo.upsert_lesson(&lesson(1, 1)).await.unwrap();
        let err = repo.upsert_lesson(&lesson(2, 1)).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
        // Re-upserting the same lesson keeps its own slot.
        repo.upsert_lesson(&lesson(1, 1)).await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_enrollment_is_a_conflict() {
        let repo = InMemoryRepository::new();
        repo.insert_enrollment(&enrollment("dana@example.com"))
            .await
            .unwrap();
        let err = repo
            .insert_enrollment(&enrollment("dana@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn progress_insert_is_idempotent() {
        let repo = InMemoryRepository::new();
        let e = enrollment("dana@example.com");
        repo.insert_enrollment(&e).await.unwrap();

        let first = fixed_now();
        assert!(repo
            .insert_progress(e.id(), LessonId::new(1), first)
            .await
            .unwrap());
        let later = first + chrono::Duration::hours(1);
        assert!(!repo
            .insert_progress(e.id(), LessonId::new(1), later)
            .await
            .unwrap());

        let rows = repo.list_progress(e.id()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].completed_at(), Some(first));
        assert_eq!(repo.latest_progress_at(e.id()).await.unwrap(), Some(first));
    }

    #[tokio::test]
    async fn set_completed_keeps_first_timestamp() {
        let repo = InMemoryRepository::new();
        let e = enrollment("dana@example.com");
        repo.insert_enrollment(&e).await.unwrap();

        let first = fixed_now();
        assert!(repo.set_completed(e.id(), first).await.unwrap());
        assert!(!repo
            .set_completed(e.id(), first + chrono::Duration::days(1))
            .await
            .unwrap());

        let stored = repo.get_enrollment(e.id()).await.unwrap().unwrap();
        assert_eq!(stored.completed_at(), Some(first));
    }

    #[tokio::test]
    async fn unknown_enrollment_completion_is_not_found() {
        let repo = InMemoryRepository::new();
        let err = repo
            .set_completed(EnrollmentId::new_random(), fixed_now())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }
}
