mod course;
mod enrollment;
mod ids;
mod lesson;
mod progress_record;
mod quiz;

pub use course::{Course, CourseError};
pub use enrollment::{Enrollment, EnrollmentError};
pub use ids::{CourseId, EnrollmentId, LessonId, ParseIdError};
pub use lesson::{Lesson, LessonError};
pub use progress_record::LessonProgress;
pub use quiz::{Quiz, QuizError, QuizQuestion, DEFAULT_PASSING_THRESHOLD, QUIZ_OPTION_COUNT};
