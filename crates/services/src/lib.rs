//! Orchestration layer: enrollment, lesson viewing, quiz attempts, and
//! table-change notifications over the repository traits in `storage`.

#![forbid(unsafe_code)]

pub mod app_services;
pub mod enrollment_service;
pub mod error;
pub mod events;
pub mod quiz_service;
pub mod viewer_service;

pub use course_core::Clock;

pub use app_services::AppServices;
pub use enrollment_service::{EnrollmentOverview, EnrollmentService};
pub use error::{AppServicesError, EnrollmentServiceError, QuizServiceError, ViewerError};
pub use events::{ChangeHub, ChangeListener, ChangedTable};
pub use quiz_service::{QuizAttempt, QuizService};
pub use viewer_service::{LessonViewer, MarkCompleteOutcome, ViewerService};
