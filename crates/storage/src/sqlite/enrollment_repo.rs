use academy_core::model::{CourseId, Enrollment, LearnerId, LessonId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{
    db_err, id_to_i64, map_enrollment_overview_row, map_enrollment_row, ser,
};
use crate::repository::{EnrollmentOverview, EnrollmentRepository, StorageError};

#[async_trait::async_trait]
impl EnrollmentRepository for SqliteRepository {
    async fn insert_enrollment(&self, enrollment: &Enrollment) -> Result<(), StorageError> {
        let progress = enrollment.progress();
        sqlx::query(
            r"
            INSERT INTO enrollments (learner_id, course_id, enrolled_at, progress_percentage, completion_status)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(enrollment.learner_id().to_string())
        .bind(id_to_i64("course_id", enrollment.course_id().value())?)
        .bind(enrollment.enrolled_at())
        .bind(i64::from(progress.percentage()))
        .bind(progress.is_complete())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn get_enrollment(
        &self,
        learner_id: LearnerId,
        course_id: CourseId,
    ) -> Result<Option<Enrollment>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT learner_id, course_id, enrolled_at, progress_percentage, completion_status
            FROM enrollments
            WHERE learner_id = ?1 AND course_id = ?2
            ",
        )
        .bind(learner_id.to_string())
        .bind(id_to_i64("course_id", course_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(map_enrollment_row).transpose()
    }

    async fn enrollments_for_learner(
        &self,
        learner_id: LearnerId,
    ) -> Result<Vec<EnrollmentOverview>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT e.learner_id, e.course_id, e.enrolled_at, e.progress_percentage,
                   e.completion_status, c.title, c.category
            FROM enrollments e
            JOIN courses c ON c.id = e.course_id
            WHERE e.learner_id = ?1
            ORDER BY e.enrolled_at DESC, e.course_id DESC
            ",
        )
        .bind(learner_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(map_enrollment_overview_row).collect()
    }

    async fn completed_lessons(
        &self,
        learner_id: LearnerId,
        course_id: CourseId,
    ) -> Result<Vec<LessonId>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT l.id
            FROM lesson_completions lc
            JOIN lessons l ON l.id = lc.lesson_id
            WHERE lc.learner_id = ?1 AND l.course_id = ?2
            ORDER BY l.position ASC
            ",
        )
        .bind(learner_id.to_string())
        .bind(id_to_i64("course_id", course_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter()
            .map(|row| {
                let id: i64 = row.try_get("id").map_err(ser)?;
                u64::try_from(id)
                    .map(LessonId::new)
                    .map_err(|_| StorageError::Serialization("lesson_id sign overflow".into()))
            })
            .collect()
    }
}
