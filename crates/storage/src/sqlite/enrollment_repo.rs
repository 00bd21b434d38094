use chrono::{DateTime, Utc};
use course_core::model::{CourseId, Enrollment, EnrollmentId};

use super::SqliteRepository;
use super::mapping::{id_to_i64, map_enrollment_row, map_write_err};
use crate::repository::{EnrollmentRepository, StorageError};

const SELECT_COLUMNS: &str = "id, course_id, student_name, email, enrolled_at, completed_at";

#[async_trait::async_trait]
impl EnrollmentRepository for SqliteRepository {
    async fn insert_enrollment(&self, enrollment: &Enrollment) -> Result<(), StorageError> {
        // The UNIQUE (course_id, email) index turns duplicate sign-ups into
        // Conflict here instead of leaving it to UI checks.
        sqlx::query(
            r"
            INSERT INTO enrollments (id, course_id, student_name, email, enrolled_at, completed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(enrollment.id().value().to_string())
        .bind(id_to_i64("course_id", enrollment.course_id().value())?)
        .bind(enrollment.student_name())
        .bind(enrollment.email())
        .bind(enrollment.enrolled_at())
        .bind(enrollment.completed_at())
        .execute(&self.pool)
        .await
        .map_err(map_write_err)?;

        Ok(())
    }

    async fn get_enrollment(
        &self,
        id: EnrollmentId,
    ) -> Result<Option<Enrollment>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM enrollments WHERE id = ?1"
        ))
        .bind(id.value().to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        match row {
            Some(row) => map_enrollment_row(&row).map(Some),
            None => Ok(None),
        }
    }

    async fn find_enrollment(
        &self,
        course_id: CourseId,
        email: &str,
    ) -> Result<Option<Enrollment>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM enrollments WHERE course_id = ?1 AND email = ?2"
        ))
        .bind(id_to_i64("course_id", course_id.value())?)
        .bind(email.trim().to_ascii_lowercase())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        match row {
            Some(row) => map_enrollment_row(&row).map(Some),
            None => Ok(None),
        }
    }

    async fn list_enrollments_by_email(
        &self,
        email: &str,
    ) -> Result<Vec<Enrollment>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM enrollments WHERE email = ?1 ORDER BY enrolled_at ASC"
        ))
        .bind(email.trim().to_ascii_lowercase())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut enrollments = Vec::with_capacity(rows.len());
        for row in rows {
            enrollments.push(map_enrollment_row(&row)?);
        }
        Ok(enrollments)
    }

    async fn set_completed(
        &self,
        id: EnrollmentId,
        at: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        if self.get_enrollment(id).await?.is_none() {
            return Err(StorageError::NotFound);
        }

        // Guarded update: the badge is written once and never rewritten.
        let res = sqlx::query(
            r"
            UPDATE enrollments
            SET completed_at = ?2
            WHERE id = ?1 AND completed_at IS NULL
            ",
        )
        .bind(id.value().to_string())
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(res.rows_affected() > 0)
    }
}
