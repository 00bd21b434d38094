use thiserror::Error;

use crate::model::ids::{CourseId, LessonId};

/// Every authored question carries exactly this many answer options.
pub const QUIZ_OPTION_COUNT: usize = 4;

/// Minimum score (percent) to pass unless the authoring form overrides it.
pub const DEFAULT_PASSING_THRESHOLD: u8 = 70;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("question prompt cannot be empty")]
    EmptyPrompt,

    #[error("expected {expected} options, got {got}")]
    WrongOptionCount { expected: usize, got: usize },

    #[error("option {index} cannot be empty")]
    EmptyOption { index: usize },

    #[error("correct answer index {index} is out of range")]
    CorrectAnswerOutOfRange { index: usize },

    #[error("passing threshold must be in 1..=100, got {provided}")]
    InvalidPassingThreshold { provided: u8 },
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A multiple-choice question: prompt, four options, the index of the correct
/// option, and an optional explanation shown on the review screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizQuestion {
    prompt: String,
    options: Vec<String>,
    correct_answer: usize,
    explanation: Option<String>,
}

impl QuizQuestion {
    /// Creates a validated question.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` if the prompt or any option is blank, the option
    /// count is not [`QUIZ_OPTION_COUNT`], or the correct index is out of
    /// range.
    pub fn new(
        prompt: impl Into<String>,
        options: Vec<String>,
        correct_answer: usize,
        explanation: Option<String>,
    ) -> Result<Self, QuizError> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(QuizError::EmptyPrompt);
        }
        if options.len() != QUIZ_OPTION_COUNT {
            return Err(QuizError::WrongOptionCount {
                expected: QUIZ_OPTION_COUNT,
                got: options.len(),
            });
        }
        if let Some(index) = options.iter().position(|o| o.trim().is_empty()) {
            return Err(QuizError::EmptyOption { index });
        }
        if correct_answer >= options.len() {
            return Err(QuizError::CorrectAnswerOutOfRange {
                index: correct_answer,
            });
        }
        Ok(Self {
            prompt,
            options,
            correct_answer,
            explanation,
        })
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct_answer(&self) -> usize {
        self.correct_answer
    }

    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }
}

//
// ─── QUIZ ──────────────────────────────────────────────────────────────────────
//

/// The quiz attached to one lesson: an ordered question list plus the
/// per-quiz passing threshold from the authoring form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quiz {
    course_id: CourseId,
    lesson_id: LessonId,
    passing_threshold: u8,
    questions: Vec<QuizQuestion>,
}

impl Quiz {
    /// Creates a quiz.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::InvalidPassingThreshold` when the threshold is 0
    /// or above 100.
    pub fn new(
        course_id: CourseId,
        lesson_id: LessonId,
        passing_threshold: u8,
        questions: Vec<QuizQuestion>,
    ) -> Result<Self, QuizError> {
        if passing_threshold == 0 || passing_threshold > 100 {
            return Err(QuizError::InvalidPassingThreshold {
                provided: passing_threshold,
            });
        }
        Ok(Self {
            course_id,
            lesson_id,
            passing_threshold,
            questions,
        })
    }

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    #[must_use]
    pub fn lesson_id(&self) -> LessonId {
        self.lesson_id
    }

    #[must_use]
    pub fn passing_threshold(&self) -> u8 {
        self.passing_threshold
    }

    #[must_use]
    pub fn questions(&self) -> &[QuizQuestion] {
        &self.questions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> Vec<String> {
        vec!["a".into(), "b".into(), "c".into(), "d".into()]
    }

    #[test]
    fn rejects_wrong_option_count() {
        let err = QuizQuestion::new("Q", vec!["a".into(), "b".into()], 0, None).unwrap_err();
        assert_eq!(
            err,
            QuizError::WrongOptionCount {
                expected: QUIZ_OPTION_COUNT,
                got: 2
            }
        );
    }

    #[test]
    fn rejects_out_of_range_answer() {
        let err = QuizQuestion::new("Q", options(), 4, None).unwrap_err();
        assert_eq!(err, QuizError::CorrectAnswerOutOfRange { index: 4 });
    }

    #[test]
    fn rejects_blank_option() {
        let mut opts = options();
        opts[2] = "  ".into();
        let err = QuizQuestion::new("Q", opts, 0, None).unwrap_err();
        assert_eq!(err, QuizError::EmptyOption { index: 2 });
    }

    #[test]
    fn quiz_threshold_must_be_percentage() {
        let q = QuizQuestion::new("Q", options(), 1, None).unwrap();
        for bad in [0_u8, 101] {
            let err =
                Quiz::new(CourseId::new(1), LessonId::new(1), bad, vec![q.clone()]).unwrap_err();
            assert!(matches!(err, QuizError::InvalidPassingThreshold { .. }));
        }
        let quiz = Quiz::new(CourseId::new(1), LessonId::new(1), 70, vec![q]).unwrap();
        assert_eq!(quiz.passing_threshold(), DEFAULT_PASSING_THRESHOLD);
        assert_eq!(quiz.len(), 1);
    }
}
