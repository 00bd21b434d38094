use chrono::Duration;
use course_core::model::{
    CourseId, Enrollment, EnrollmentId, Lesson, LessonId, Quiz, QuizQuestion,
};
use course_core::time::fixed_now;
use storage::repository::{
    CourseRepository, EnrollmentRepository, LessonRepository, NewCourseRecord,
    ProgressRepository, QuizRepository, StorageError,
};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

async fn seed_course(repo: &SqliteRepository) -> CourseId {
    repo.insert_course(NewCourseRecord {
        title: "Branding".to_string(),
        description: None,
        is_published: true,
        created_at: fixed_now(),
    })
    .await
    .expect("insert course")
}

fn build_lesson(id: u64, course_id: CourseId, order_index: u32) -> Lesson {
    Lesson::new(
        LessonId::new(id),
        course_id,
        format!("Lesson {id}"),
        Some("https://videos.example.com/intro.mp4"),
        Some("10 min".to_string()),
        order_index,
        fixed_now(),
    )
    .unwrap()
}

fn build_enrollment(course_id: CourseId, email: &str) -> Enrollment {
    Enrollment::new(
        EnrollmentId::new_random(),
        course_id,
        "Dana",
        email,
        fixed_now(),
    )
    .unwrap()
}

#[tokio::test]
async fn sqlite_roundtrips_lessons_in_order() {
    let repo = connect("memdb_lessons").await;
    let course_id = seed_course(&repo).await;

    repo.upsert_lesson(&build_lesson(2, course_id, 3)).await.unwrap();
    repo.upsert_lesson(&build_lesson(1, course_id, 1)).await.unwrap();
    let mut hidden = build_lesson(3, course_id, 2);
    hidden.deactivate();
    repo.upsert_lesson(&hidden).await.unwrap();
    let no_video = Lesson::new(
        LessonId::new(4),
        course_id,
        "Lesson 4",
        None,
        None,
        4,
        fixed_now(),
    )
    .unwrap();
    repo.upsert_lesson(&no_video).await.unwrap();

    let active = repo.list_active_lessons(course_id).await.unwrap();
    let ids: Vec<u64> = active.iter().map(|l| l.id().value()).collect();
    assert_eq!(ids, vec![1, 2, 4]);
    assert_eq!(active[0].title(), "Lesson 1");
    assert_eq!(active[0].duration_label(), Some("10 min"));
    assert_eq!(
        active[0].video_ref().unwrap().as_str(),
        "https://videos.example.com/intro.mp4"
    );
    assert_eq!(active[2].video_ref(), None);

    let all = repo.list_lessons(course_id).await.unwrap();
    assert_eq!(all.len(), 4);
    assert!(!all[1].is_active());
}

#[tokio::test]
async fn sqlite_rejects_duplicate_order_index() {
    let repo = connect("memdb_order").await;
    let course_id = seed_course(&repo).await;

    repo.upsert_lesson(&build_lesson(1, course_id, 1)).await.unwrap();
    let err = repo
        .upsert_lesson(&build_lesson(2, course_id, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict));

    // Updating the same lesson in place is fine.
    repo.upsert_lesson(&build_lesson(1, course_id, 1)).await.unwrap();
}

#[tokio::test]
async fn sqlite_enforces_one_enrollment_per_course_and_email() {
    let repo = connect("memdb_enroll").await;
    let course_id = seed_course(&repo).await;

    let enrollment = build_enrollment(course_id, "dana@example.com");
    repo.insert_enrollment(&enrollment).await.unwrap();

    let duplicate = build_enrollment(course_id, "dana@example.com");
    let err = repo.insert_enrollment(&duplicate).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict));

    let found = repo
        .find_enrollment(course_id, "Dana@Example.com")
        .await
        .unwrap()
        .expect("lookup is case-insensitive via normalization");
    assert_eq!(found.id(), enrollment.id());

    let by_email = repo
        .list_enrollments_by_email("dana@example.com")
        .await
        .unwrap();
    assert_eq!(by_email.len(), 1);
}

#[tokio::test]
async fn sqlite_progress_insert_is_idempotent() {
    let repo = connect("memdb_progress").await;
    let course_id = seed_course(&repo).await;
    let enrollment = build_enrollment(course_id, "dana@example.com");
    repo.insert_enrollment(&enrollment).await.unwrap();

    let first = fixed_now();
    assert!(repo
        .insert_progress(enrollment.id(), LessonId::new(1), first)
        .await
        .unwrap());
    assert!(!repo
        .insert_progress(enrollment.id(), LessonId::new(1), first + Duration::hours(2))
        .await
        .unwrap());

    let rows = repo.list_progress(enrollment.id()).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].completed_at(), Some(first));

    let latest = repo.latest_progress_at(enrollment.id()).await.unwrap();
    assert_eq!(latest, Some(first));
}

#[tokio::test]
async fn sqlite_latest_progress_is_none_without_rows() {
    let repo = connect("memdb_latest").await;
    let course_id = seed_course(&repo).await;
    let enrollment = build_enrollment(course_id, "dana@example.com");
    repo.insert_enrollment(&enrollment).await.unwrap();

    assert_eq!(repo.latest_progress_at(enrollment.id()).await.unwrap(), None);
}

#[tokio::test]
async fn sqlite_set_completed_writes_once() {
    let repo = connect("memdb_completed").await;
    let course_id = seed_course(&repo).await;
    let enrollment = build_enrollment(course_id, "dana@example.com");
    repo.insert_enrollment(&enrollment).await.unwrap();

    let first = fixed_now();
    assert!(repo.set_completed(enrollment.id(), first).await.unwrap());
    assert!(!repo
        .set_completed(enrollment.id(), first + Duration::days(1))
        .await
        .unwrap());

    let stored = repo
        .get_enrollment(enrollment.id())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.completed_at(), Some(first));

    let missing = repo
        .set_completed(EnrollmentId::new_random(), first)
        .await
        .unwrap_err();
    assert!(matches!(missing, StorageError::NotFound));
}

#[tokio::test]
async fn sqlite_quiz_roundtrip_preserves_question_order() {
    let repo = connect("memdb_quiz").await;
    let course_id = seed_course(&repo).await;
    let lesson_id = LessonId::new(1);

    let options = |suffix: &str| -> Vec<String> {
        vec![
            format!("A{suffix}"),
            format!("B{suffix}"),
            format!("C{suffix}"),
            format!("D{suffix}"),
        ]
    };
    let quiz = Quiz::new(
        course_id,
        lesson_id,
        80,
        vec![
            QuizQuestion::new("First?", options("1"), 0, Some("why".into())).unwrap(),
            QuizQuestion::new("Second?", options("2"), 3, None).unwrap(),
        ],
    )
    .unwrap();
    repo.replace_quiz(&quiz).await.unwrap();

    let fetched = repo
        .get_quiz(course_id, lesson_id)
        .await
        .unwrap()
        .expect("quiz stored");
    assert_eq!(fetched.passing_threshold(), 80);
    assert_eq!(fetched.questions().len(), 2);
    assert_eq!(fetched.questions()[0].prompt(), "First?");
    assert_eq!(fetched.questions()[1].correct_answer(), 3);
    assert_eq!(fetched.questions()[0].explanation(), Some("why"));

    // Authoring replaces the whole question list.
    let replacement = Quiz::new(
        course_id,
        lesson_id,
        70,
        vec![QuizQuestion::new("Only?", options("3"), 1, None).unwrap()],
    )
    .unwrap();
    repo.replace_quiz(&replacement).await.unwrap();

    let fetched = repo
        .get_quiz(course_id, lesson_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fetched.questions().len(), 1);
    assert_eq!(fetched.passing_threshold(), 70);

    assert!(repo
        .get_quiz(course_id, LessonId::new(99))
        .await
        .unwrap()
        .is_none());
}
