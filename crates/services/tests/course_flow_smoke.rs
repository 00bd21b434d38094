use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use course_core::model::{CourseId, Enrollment, EnrollmentId, Lesson, LessonId};
use course_core::progress::EnrollmentActivity;
use course_core::time::{fixed_clock, fixed_now};
use services::{AppServices, ChangedTable, Clock, EnrollmentServiceError};
use storage::repository::{
    EnrollmentRepository, NewCourseRecord, Storage, StorageError,
};

async fn seed_course(app: &AppServices, lesson_count: u64) -> CourseId {
    let course_id = app
        .storage
        .courses
        .insert_course(NewCourseRecord {
            title: "Personal Branding Fundamentals".to_string(),
            description: Some("Six short lessons".to_string()),
            is_published: true,
            created_at: fixed_now(),
        })
        .await
        .expect("insert course");

    for i in 1..=lesson_count {
        let lesson = Lesson::new(
            LessonId::new(i),
            course_id,
            format!("Lesson {i}"),
            None,
            Some("10 min".to_string()),
            u32::try_from(i).unwrap(),
            fixed_now(),
        )
        .unwrap();
        app.storage
            .lessons
            .upsert_lesson(&lesson)
            .await
            .expect("insert lesson");
    }
    course_id
}

#[tokio::test]
async fn enroll_watch_everything_and_finish_the_course() {
    let app = AppServices::in_memory(fixed_clock());
    let course_id = seed_course(&app, 3).await;

    let enrollment = app
        .enrollments
        .enroll(course_id, "Dana", "Dana@Example.com")
        .await
        .unwrap();
    assert_eq!(enrollment.email(), "dana@example.com");

    // Same learner, same course: storage uniqueness surfaces as a service
    // error, not a second row.
    let err = app
        .enrollments
        .enroll(course_id, "Dana", "dana@example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, EnrollmentServiceError::AlreadyEnrolled));

    let mut viewer = app.viewer.open(enrollment.id()).await.unwrap();
    assert_eq!(viewer.current_lesson_id(), Some(LessonId::new(1)));
    assert_eq!(viewer.snapshot().percentage(), 0);

    let first = app.viewer.mark_current_complete(&mut viewer).await.unwrap();
    assert!(first.newly_completed);
    assert_eq!(first.advanced_to, Some(LessonId::new(2)));
    assert_eq!(first.percentage, 33);
    assert!(!first.course_completed);

    let second = app.viewer.mark_current_complete(&mut viewer).await.unwrap();
    assert_eq!(second.advanced_to, Some(LessonId::new(3)));
    assert_eq!(second.percentage, 67);

    let last = app.viewer.mark_current_complete(&mut viewer).await.unwrap();
    assert!(last.newly_completed);
    assert_eq!(last.advanced_to, None);
    assert_eq!(last.percentage, 100);
    assert!(last.course_completed);
    assert!(viewer.enrollment().is_completed());

    let overview = app.enrollments.overview(enrollment.id()).await.unwrap();
    assert_eq!(overview.percentage, 100);
    assert_eq!(overview.completed_lessons, 3);
    assert_eq!(overview.total_lessons, 3);
    assert_eq!(overview.activity, EnrollmentActivity::Completed);
    assert_eq!(overview.completed_at, Some(fixed_now()));

    // Everything completed: reopening falls back to the first lesson.
    let reopened = app.viewer.open(enrollment.id()).await.unwrap();
    assert_eq!(reopened.current_lesson_id(), Some(LessonId::new(1)));
}

#[tokio::test]
async fn resume_runs_once_and_selection_is_user_choice() {
    let app = AppServices::in_memory(fixed_clock());
    let course_id = seed_course(&app, 3).await;
    let enrollment = app
        .enrollments
        .enroll(course_id, "Dana", "dana@example.com")
        .await
        .unwrap();

    app.storage
        .progress
        .insert_progress(enrollment.id(), LessonId::new(2), fixed_now())
        .await
        .unwrap();

    // Highest completed id is 2, so the viewer opens on lesson 3.
    let mut viewer = app.viewer.open(enrollment.id()).await.unwrap();
    assert_eq!(viewer.current_lesson_id(), Some(LessonId::new(3)));

    // The learner rewatches lesson 1; completing it advances to the next
    // lesson in order, not back to the resume target.
    viewer.select_lesson(LessonId::new(1)).unwrap();
    let outcome = app.viewer.mark_current_complete(&mut viewer).await.unwrap();
    assert_eq!(outcome.advanced_to, Some(LessonId::new(2)));
    assert_eq!(viewer.current_lesson_id(), Some(LessonId::new(2)));
}

#[tokio::test]
async fn rewatching_a_completed_lesson_changes_nothing() {
    let app = AppServices::in_memory(fixed_clock());
    let course_id = seed_course(&app, 3).await;
    let enrollment = app
        .enrollments
        .enroll(course_id, "Dana", "dana@example.com")
        .await
        .unwrap();

    let mut viewer = app.viewer.open(enrollment.id()).await.unwrap();
    app.viewer.mark_current_complete(&mut viewer).await.unwrap();

    viewer.select_lesson(LessonId::new(1)).unwrap();
    let again = app.viewer.mark_current_complete(&mut viewer).await.unwrap();
    assert!(!again.newly_completed);
    assert_eq!(again.percentage, 33);
    assert!(!again.course_completed);
}

#[tokio::test]
async fn dashboard_flags_idle_enrollments_as_stale() {
    let app = AppServices::in_memory(fixed_clock());
    let course_id = seed_course(&app, 3).await;
    let enrollment = app
        .enrollments
        .enroll(course_id, "Dana", "dana@example.com")
        .await
        .unwrap();

    let fresh = app.enrollments.overview(enrollment.id()).await.unwrap();
    assert_eq!(fresh.activity, EnrollmentActivity::Active);

    // Same storage, a clock nine days later: no progress since enrollment.
    let later = AppServices::new(
        Clock::fixed(fixed_now() + Duration::days(9)),
        app.storage.clone(),
    );
    let idle = later.enrollments.overview(enrollment.id()).await.unwrap();
    assert_eq!(idle.activity, EnrollmentActivity::Stale);

    let rows = later
        .enrollments
        .list_overviews("dana@example.com")
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].enrollment_id, enrollment.id());
}

#[tokio::test]
async fn writes_announce_their_tables() {
    let app = AppServices::in_memory(fixed_clock());
    let course_id = seed_course(&app, 1).await;

    let enrollment_events = Arc::new(AtomicUsize::new(0));
    let progress_events = Arc::new(AtomicUsize::new(0));
    {
        let enrollment_events = Arc::clone(&enrollment_events);
        let progress_events = Arc::clone(&progress_events);
        app.hub.subscribe_fn(move |table| match table {
            ChangedTable::Enrollments => {
                enrollment_events.fetch_add(1, Ordering::SeqCst);
            }
            ChangedTable::LessonProgress => {
                progress_events.fetch_add(1, Ordering::SeqCst);
            }
            _ => {}
        });
    }

    let enrollment = app
        .enrollments
        .enroll(course_id, "Dana", "dana@example.com")
        .await
        .unwrap();
    assert_eq!(enrollment_events.load(Ordering::SeqCst), 1);

    let mut viewer = app.viewer.open(enrollment.id()).await.unwrap();
    let outcome = app.viewer.mark_current_complete(&mut viewer).await.unwrap();
    assert!(outcome.course_completed);
    assert_eq!(progress_events.load(Ordering::SeqCst), 1);
    // Auto-completion also touches the enrollments table.
    assert_eq!(enrollment_events.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn empty_course_opens_without_a_selection() {
    let app = AppServices::in_memory(fixed_clock());
    let course_id = seed_course(&app, 0).await;
    let enrollment = app
        .enrollments
        .enroll(course_id, "Dana", "dana@example.com")
        .await
        .unwrap();

    let mut viewer = app.viewer.open(enrollment.id()).await.unwrap();
    assert_eq!(viewer.current_lesson_id(), None);
    assert_eq!(viewer.snapshot().percentage(), 0);
    assert!(!viewer.snapshot().is_complete());

    let err = app
        .viewer
        .mark_current_complete(&mut viewer)
        .await
        .unwrap_err();
    assert!(matches!(err, services::ViewerError::NoLessonSelected));
}

/// Enrollment repository whose every call fails with a connection error.
struct DownEnrollments;

#[async_trait]
impl EnrollmentRepository for DownEnrollments {
    async fn insert_enrollment(&self, _enrollment: &Enrollment) -> Result<(), StorageError> {
        Err(StorageError::Connection("database is down".into()))
    }

    async fn get_enrollment(
        &self,
        _id: EnrollmentId,
    ) -> Result<Option<Enrollment>, StorageError> {
        Err(StorageError::Connection("database is down".into()))
    }

    async fn find_enrollment(
        &self,
        _course_id: CourseId,
        _email: &str,
    ) -> Result<Option<Enrollment>, StorageError> {
        Err(StorageError::Connection("database is down".into()))
    }

    async fn list_enrollments_by_email(
        &self,
        _email: &str,
    ) -> Result<Vec<Enrollment>, StorageError> {
        Err(StorageError::Connection("database is down".into()))
    }

    async fn set_completed(
        &self,
        _id: EnrollmentId,
        _at: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        Err(StorageError::Connection("database is down".into()))
    }
}

#[tokio::test]
async fn outages_are_not_reported_as_duplicates() {
    let healthy = Storage::in_memory();
    let storage = Storage {
        enrollments: std::sync::Arc::new(DownEnrollments),
        ..healthy
    };
    let app = AppServices::new(fixed_clock(), storage);

    let err = app
        .enrollments
        .enroll(CourseId::new(1), "Dana", "dana@example.com")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EnrollmentServiceError::Storage(StorageError::Connection(_))
    ));
}
