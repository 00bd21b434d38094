use chrono::{DateTime, Utc};
use course_core::model::{EnrollmentId, LessonId, LessonProgress};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{id_to_i64, map_progress_row, ser};
use crate::repository::{ProgressRepository, StorageError};

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn insert_progress(
        &self,
        enrollment_id: EnrollmentId,
        lesson_id: LessonId,
        completed_at: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        // DO NOTHING on the unique (enrollment_id, lesson_id) index: a repeat
        // mark-complete never rewrites the original completion timestamp.
        let res = sqlx::query(
            r"
            INSERT INTO lesson_progress (enrollment_id, lesson_id, completed_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(enrollment_id, lesson_id) DO NOTHING
            ",
        )
        .bind(enrollment_id.value().to_string())
        .bind(id_to_i64("lesson_id", lesson_id.value())?)
        .bind(completed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(res.rows_affected() > 0)
    }

    async fn list_progress(
        &self,
        enrollment_id: EnrollmentId,
    ) -> Result<Vec<LessonProgress>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT enrollment_id, lesson_id, completed_at
            FROM lesson_progress
            WHERE enrollment_id = ?1
            ORDER BY lesson_id ASC
            ",
        )
        .bind(enrollment_id.value().to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut progress = Vec::with_capacity(rows.len());
        for row in rows {
            progress.push(map_progress_row(&row)?);
        }
        Ok(progress)
    }

    async fn latest_progress_at(
        &self,
        enrollment_id: EnrollmentId,
    ) -> Result<Option<DateTime<Utc>>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT MAX(completed_at) AS latest
            FROM lesson_progress
            WHERE enrollment_id = ?1 AND completed_at IS NOT NULL
            ",
        )
        .bind(enrollment_id.value().to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.try_get::<Option<DateTime<Utc>>, _>("latest").map_err(ser)
    }
}
