use course_core::model::{CourseId, Lesson};

use super::SqliteRepository;
use super::mapping::{id_to_i64, map_lesson_row, map_write_err};
use crate::repository::{LessonRepository, StorageError};

impl SqliteRepository {
    async fn list_lessons_where(
        &self,
        course_id: CourseId,
        active_only: bool,
    ) -> Result<Vec<Lesson>, StorageError> {
        let sql = if active_only {
            r"
            SELECT id, course_id, title, video_ref, duration_label, order_index, is_active, created_at
            FROM lessons
            WHERE course_id = ?1 AND is_active = 1
            ORDER BY order_index ASC, id ASC
            "
        } else {
            r"
            SELECT id, course_id, title, video_ref, duration_label, order_index, is_active, created_at
            FROM lessons
            WHERE course_id = ?1
            ORDER BY order_index ASC, id ASC
            "
        };

        let rows = sqlx::query(sql)
            .bind(id_to_i64("course_id", course_id.value())?)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut lessons = Vec::with_capacity(rows.len());
        for row in rows {
            lessons.push(map_lesson_row(&row)?);
        }
        Ok(lessons)
    }
}

#[async_trait::async_trait]
impl LessonRepository for SqliteRepository {
    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
        let video_ref = lesson.video_ref().map(|u| u.to_string());

        sqlx::query(
            r"
            INSERT INTO lessons (id, course_id, title, video_ref, duration_label, order_index, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(id, course_id) DO UPDATE SET
                title = excluded.title,
                video_ref = excluded.video_ref,
                duration_label = excluded.duration_label,
                order_index = excluded.order_index,
                is_active = excluded.is_active
            ",
        )
        .bind(id_to_i64("lesson_id", lesson.id().value())?)
        .bind(id_to_i64("course_id", lesson.course_id().value())?)
        .bind(lesson.title())
        .bind(video_ref)
        .bind(lesson.duration_label())
        .bind(i64::from(lesson.order_index()))
        .bind(i64::from(lesson.is_active()))
        .bind(lesson.created_at())
        .execute(&self.pool)
        .await
        .map_err(map_write_err)?;

        Ok(())
    }

    async fn list_active_lessons(&self, course_id: CourseId) -> Result<Vec<Lesson>, StorageError> {
        self.list_lessons_where(course_id, true).await
    }

    async fn list_lessons(&self, course_id: CourseId) -> Result<Vec<Lesson>, StorageError> {
        self.list_lessons_where(course_id, false).await
    }
}
