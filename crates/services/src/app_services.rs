use course_core::Clock;
use storage::repository::Storage;

use crate::enrollment_service::EnrollmentService;
use crate::error::AppServicesError;
use crate::events::ChangeHub;
use crate::quiz_service::QuizService;
use crate::viewer_service::ViewerService;

/// Everything the presentation layer needs, wired from one [`Storage`].
///
/// All services share one [`ChangeHub`] and one [`Clock`]; the raw `storage`
/// handle stays exposed for catalog reads and admin writes that need no
/// orchestration.
#[derive(Clone)]
pub struct AppServices {
    pub enrollments: EnrollmentService,
    pub viewer: ViewerService,
    pub quizzes: QuizService,
    pub hub: ChangeHub,
    pub storage: Storage,
}

impl AppServices {
    #[must_use]
    pub fn new(clock: Clock, storage: Storage) -> Self {
        let hub = ChangeHub::new();
        Self {
            enrollments: EnrollmentService::new(
                clock,
                storage.enrollments.clone(),
                storage.lessons.clone(),
                storage.progress.clone(),
                hub.clone(),
            ),
            viewer: ViewerService::new(
                clock,
                storage.enrollments.clone(),
                storage.lessons.clone(),
                storage.progress.clone(),
                hub.clone(),
            ),
            quizzes: QuizService::new(storage.quizzes.clone(), hub.clone()),
            hub,
            storage,
        }
    }

    /// In-memory wiring for tests and prototyping.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::new(clock, Storage::in_memory())
    }

    /// SQLite-backed wiring; connects and migrates the database.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` when the database cannot be opened or
    /// migrated.
    pub async fn sqlite(clock: Clock, database_url: &str) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(database_url).await?;
        Ok(Self::new(clock, storage))
    }
}
