use course_core::model::{CourseId, LessonId, Quiz, QuizQuestion};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{id_to_i64, map_write_err, ser};
use crate::repository::{QuizRepository, StorageError};

#[async_trait::async_trait]
impl QuizRepository for SqliteRepository {
    async fn replace_quiz(&self, quiz: &Quiz) -> Result<(), StorageError> {
        let course_id = id_to_i64("course_id", quiz.course_id().value())?;
        let lesson_id = id_to_i64("lesson_id", quiz.lesson_id().value())?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        sqlx::query(
            r"
            INSERT INTO quizzes (course_id, lesson_id, passing_threshold)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(course_id, lesson_id) DO UPDATE SET
                passing_threshold = excluded.passing_threshold
            ",
        )
        .bind(course_id)
        .bind(lesson_id)
        .bind(i64::from(quiz.passing_threshold()))
        .execute(&mut *tx)
        .await
        .map_err(map_write_err)?;

        sqlx::query("DELETE FROM quiz_questions WHERE course_id = ?1 AND lesson_id = ?2")
            .bind(course_id)
            .bind(lesson_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        for (position, question) in quiz.questions().iter().enumerate() {
            let options = serde_json::to_string(question.options()).map_err(ser)?;
            let position = i64::try_from(position)
                .map_err(|_| StorageError::Serialization("position overflow".into()))?;
            let correct = i64::try_from(question.correct_answer())
                .map_err(|_| StorageError::Serialization("correct_answer overflow".into()))?;

            sqlx::query(
                r"
                INSERT INTO quiz_questions
                    (course_id, lesson_id, position, prompt, options, correct_answer, explanation)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ",
            )
            .bind(course_id)
            .bind(lesson_id)
            .bind(position)
            .bind(question.prompt())
            .bind(options)
            .bind(correct)
            .bind(question.explanation())
            .execute(&mut *tx)
            .await
            .map_err(map_write_err)?;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))
    }

    async fn get_quiz(
        &self,
        course_id: CourseId,
        lesson_id: LessonId,
    ) -> Result<Option<Quiz>, StorageError> {
        let course = id_to_i64("course_id", course_id.value())?;
        let lesson = id_to_i64("lesson_id", lesson_id.value())?;

        let head = sqlx::query(
            r"
            SELECT passing_threshold
            FROM quizzes
            WHERE course_id = ?1 AND lesson_id = ?2
            ",
        )
        .bind(course)
        .bind(lesson)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let Some(head) = head else {
            return Ok(None);
        };
        let threshold = u8::try_from(head.try_get::<i64, _>("passing_threshold").map_err(ser)?)
            .map_err(|_| StorageError::Serialization("passing_threshold overflow".into()))?;

        let rows = sqlx::query(
            r"
            SELECT prompt, options, correct_answer, explanation
            FROM quiz_questions
            WHERE course_id = ?1 AND lesson_id = ?2
            ORDER BY position ASC
            ",
        )
        .bind(course)
        .bind(lesson)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut questions = Vec::with_capacity(rows.len());
        for row in rows {
            let options: Vec<String> =
                serde_json::from_str(&row.try_get::<String, _>("options").map_err(ser)?)
                    .map_err(ser)?;
            let correct = usize::try_from(row.try_get::<i64, _>("correct_answer").map_err(ser)?)
                .map_err(|_| StorageError::Serialization("correct_answer sign overflow".into()))?;
            questions.push(
                QuizQuestion::new(
                    row.try_get::<String, _>("prompt").map_err(ser)?,
                    options,
                    correct,
                    row.try_get::<Option<String>, _>("explanation").map_err(ser)?,
                )
                .map_err(ser)?,
            );
        }

        Quiz::new(course_id, lesson_id, threshold, questions)
            .map(Some)
            .map_err(ser)
    }
}
