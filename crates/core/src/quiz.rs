use serde::{Deserialize, Serialize};

use crate::model::QuizQuestion;

//
// ─── OUTCOME ───────────────────────────────────────────────────────────────────
//

/// One row of the post-quiz review screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionReview {
    /// Position of the question within the quiz.
    pub index: usize,
    pub prompt: String,
    /// The learner's selection, if one was made and in range.
    pub selected: Option<usize>,
    pub selected_text: Option<String>,
    pub is_correct: bool,
    /// Correct option text, populated only when the answer was wrong so the
    /// review screen can show it alongside the explanation.
    pub correct_text: Option<String>,
    pub explanation: Option<String>,
}

/// Graded result of one quiz attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizOutcome {
    score: u8,
    passed: bool,
    total_questions: usize,
    correct_count: usize,
    reviews: Vec<QuestionReview>,
}

impl QuizOutcome {
    /// Percentage score rounded to the nearest integer; `0` for an empty quiz.
    #[must_use]
    pub fn score(&self) -> u8 {
        self.score
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.passed
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.total_questions
    }

    #[must_use]
    pub fn correct_count(&self) -> usize {
        self.correct_count
    }

    #[must_use]
    pub fn reviews(&self) -> &[QuestionReview] {
        &self.reviews
    }
}

//
// ─── GRADING ───────────────────────────────────────────────────────────────────
//

/// Grade a quiz attempt.
///
/// Questions and selections pair by position. A `None`, missing (shorter
/// selection list), or out-of-range selection is wrong; it can never be
/// scored correct. Zero questions grade to score `0`, not passed — never a
/// division fault.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn grade_quiz(
    questions: &[QuizQuestion],
    selections: &[Option<usize>],
    passing_threshold: u8,
) -> QuizOutcome {
    let total_questions = questions.len();
    if total_questions == 0 {
        return QuizOutcome {
            score: 0,
            passed: false,
            total_questions: 0,
            correct_count: 0,
            reviews: Vec::new(),
        };
    }

    let mut correct_count = 0_usize;
    let mut reviews = Vec::with_capacity(total_questions);

    for (index, question) in questions.iter().enumerate() {
        let selected = selections
            .get(index)
            .copied()
            .flatten()
            .filter(|i| *i < question.options().len());
        let is_correct = selected == Some(question.correct_answer());
        if is_correct {
            correct_count += 1;
        }
        reviews.push(QuestionReview {
            index,
            prompt: question.prompt().to_string(),
            selected,
            selected_text: selected.map(|i| question.options()[i].clone()),
            is_correct,
            correct_text: (!is_correct)
                .then(|| question.options()[question.correct_answer()].clone()),
            explanation: question.explanation().map(str::to_string),
        });
    }

    let score = (correct_count as f64 * 100.0 / total_questions as f64)
        .round()
        .clamp(0.0, 100.0) as u8;

    QuizOutcome {
        score,
        passed: score >= passing_threshold,
        total_questions,
        correct_count,
        reviews,
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
