use std::sync::Arc;

use course_core::model::{CourseId, LessonId, Quiz, QuizQuestion};
use course_core::quiz::{QuizOutcome, grade_quiz};
use storage::repository::QuizRepository;

use crate::error::QuizServiceError;
use crate::events::{ChangeHub, ChangedTable};

//
// ─── ATTEMPT ───────────────────────────────────────────────────────────────────
//

/// One learner's in-flight pass through a quiz.
///
/// Navigation is one question at a time: moving forward requires an answer
/// for the question the learner is on, moving back is always allowed, and an
/// earlier answer may be changed. The attempt lives in memory only; nothing
/// is persisted until the caller does something with the [`QuizOutcome`].
#[derive(Debug, Clone)]
pub struct QuizAttempt {
    quiz: Quiz,
    selections: Vec<Option<usize>>,
    current: usize,
}

impl QuizAttempt {
    fn new(quiz: Quiz) -> Self {
        let selections = vec![None; quiz.len()];
        Self {
            quiz,
            selections,
            current: 0,
        }
    }

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.quiz.course_id()
    }

    #[must_use]
    pub fn lesson_id(&self) -> LessonId {
        self.quiz.lesson_id()
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.quiz.len()
    }

    /// 0-based index of the question the learner is on.
    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_question(&self) -> &QuizQuestion {
        &self.quiz.questions()[self.current]
    }

    #[must_use]
    pub fn selection(&self, index: usize) -> Option<usize> {
        self.selections.get(index).copied().flatten()
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.selections.iter().filter(|s| s.is_some()).count()
    }

    #[must_use]
    pub fn is_on_last(&self) -> bool {
        self.current + 1 == self.quiz.len()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.selections.iter().all(Option::is_some)
    }

    /// Record (or change) the answer for the current question.
    ///
    /// # Errors
    ///
    /// `InvalidOption` when the index is not one of the question's options.
    pub fn select_answer(&mut self, option: usize) -> Result<(), QuizServiceError> {
        if option >= self.current_question().options().len() {
            return Err(QuizServiceError::InvalidOption { provided: option });
        }
        self.selections[self.current] = Some(option);
        Ok(())
    }

    /// Move to the next question. Returns `false` when already on the last
    /// question.
    ///
    /// # Errors
    ///
    /// `CurrentUnanswered` when the current question has no answer yet.
    pub fn advance(&mut self) -> Result<bool, QuizServiceError> {
        if self.selections[self.current].is_none() {
            return Err(QuizServiceError::CurrentUnanswered);
        }
        if self.is_on_last() {
            return Ok(false);
        }
        self.current += 1;
        Ok(true)
    }

    /// Move to the previous question. Returns `false` when already on the
    /// first question. Never gated on an answer.
    pub fn back(&mut self) -> bool {
        if self.current == 0 {
            return false;
        }
        self.current -= 1;
        true
    }

    /// Grade the attempt.
    ///
    /// # Errors
    ///
    /// `Unanswered` naming the first open question when the attempt is not
    /// complete.
    pub fn finish(&self) -> Result<QuizOutcome, QuizServiceError> {
        if let Some(index) = self.selections.iter().position(Option::is_none) {
            return Err(QuizServiceError::Unanswered { index });
        }
        Ok(grade_quiz(
            self.quiz.questions(),
            &self.selections,
            self.quiz.passing_threshold(),
        ))
    }
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Quiz authoring and attempt workflow.
#[derive(Clone)]
pub struct QuizService {
    quizzes: Arc<dyn QuizRepository>,
    hub: ChangeHub,
}

impl QuizService {
    #[must_use]
    pub fn new(quizzes: Arc<dyn QuizRepository>, hub: ChangeHub) -> Self {
        Self { quizzes, hub }
    }

    /// Attach (or replace) the quiz for a lesson.
    ///
    /// # Errors
    ///
    /// Returns storage errors.
    pub async fn save_quiz(&self, quiz: &Quiz) -> Result<(), QuizServiceError> {
        self.quizzes.replace_quiz(quiz).await?;
        self.hub.notify(ChangedTable::Quizzes);
        Ok(())
    }

    /// Fetch the quiz for a lesson, if one is attached.
    ///
    /// # Errors
    ///
    /// Returns storage errors.
    pub async fn get_quiz(
        &self,
        course_id: CourseId,
        lesson_id: LessonId,
    ) -> Result<Option<Quiz>, QuizServiceError> {
        Ok(self.quizzes.get_quiz(course_id, lesson_id).await?)
    }

    /// Start an attempt at the quiz attached to a lesson.
    ///
    /// # Errors
    ///
    /// `NoQuiz` when the lesson has no quiz; `EmptyQuiz` when the stored quiz
    /// has no questions (an attempt with nothing to answer cannot be
    /// navigated); storage errors otherwise.
    pub async fn start_attempt(
        &self,
        course_id: CourseId,
        lesson_id: LessonId,
    ) -> Result<QuizAttempt, QuizServiceError> {
        let quiz = self
            .quizzes
            .get_quiz(course_id, lesson_id)
            .await?
            .ok_or(QuizServiceError::NoQuiz)?;
        if quiz.is_empty() {
            return Err(QuizServiceError::EmptyQuiz);
        }
        Ok(QuizAttempt::new(quiz))
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn question(prompt: &str, correct: usize) -> QuizQuestion {
        QuizQuestion::new(
            prompt,
            vec!["A".into(), "B".into(), "C".into(), "D".into()],
            correct,
            None,
        )
        .unwrap()
    }

    fn attempt() -> QuizAttempt {
        let quiz = Quiz::new(
            CourseId::new(1),
            LessonId::new(1),
            70,
            vec![question("First?", 0), question("Second?", 2)],
        )
        .unwrap();
        QuizAttempt::new(quiz)
    }

    #[test]
    fn advance_requires_an_answer() {
        let mut attempt = attempt();
        assert!(matches!(
            attempt.advance(),
            Err(QuizServiceError::CurrentUnanswered)
        ));

        attempt.select_answer(0).unwrap();
        assert!(attempt.advance().unwrap());
        assert_eq!(attempt.current_index(), 1);
    }

    #[test]
    fn back_is_free_and_answers_can_change() {
        let mut attempt = attempt();
        attempt.select_answer(1).unwrap();
        attempt.advance().unwrap();

        assert!(attempt.back());
        assert!(!attempt.back());
        attempt.select_answer(0).unwrap();
        assert_eq!(attempt.selection(0), Some(0));
    }

    #[test]
    fn out_of_range_option_is_rejected() {
        let mut attempt = attempt();
        assert!(matches!(
            attempt.select_answer(4),
            Err(QuizServiceError::InvalidOption { provided: 4 })
        ));
        assert_eq!(attempt.selection(0), None);
    }

    #[test]
    fn finish_names_the_first_open_question() {
        let mut attempt = attempt();
        attempt.select_answer(0).unwrap();
        attempt.advance().unwrap();

        let err = attempt.finish().unwrap_err();
        assert!(matches!(err, QuizServiceError::Unanswered { index: 1 }));
    }

    #[test]
    fn finished_attempt_grades_with_the_quiz_threshold() {
        let mut attempt = attempt();
        attempt.select_answer(0).unwrap();
        attempt.advance().unwrap();
        attempt.select_answer(1).unwrap();
        assert!(!attempt.advance().unwrap());

        let outcome = attempt.finish().unwrap();
        assert_eq!(outcome.score(), 50);
        assert!(!outcome.passed());
        assert_eq!(outcome.correct_count(), 1);
    }
}
