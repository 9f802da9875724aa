use academy_core::model::{CompletionRecord, CourseId, Progress};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{count_to_u32, db_err, id_to_i64, ser};
use crate::repository::{ProgressLedger, ProgressUpdate, StorageError};

#[async_trait::async_trait]
impl ProgressLedger for SqliteRepository {
    async fn record_completion(
        &self,
        record: CompletionRecord,
    ) -> Result<ProgressUpdate, StorageError> {
        let learner = record.learner_id.to_string();
        let lesson_id = id_to_i64("lesson_id", record.lesson_id.value())?;

        let mut tx = self.pool.begin().await.map_err(db_err)?;

        // Writing first takes the database write lock up front, so the counts
        // below cannot be invalidated by a concurrent completion.
        let inserted = sqlx::query(
            r"
            INSERT INTO lesson_completions (learner_id, lesson_id, completed_at)
            SELECT ?1, l.id, ?3
            FROM lessons l
            JOIN enrollments e ON e.course_id = l.course_id AND e.learner_id = ?1
            WHERE l.id = ?2
            ",
        )
        .bind(&learner)
        .bind(lesson_id)
        .bind(record.completed_at)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        let course_row = sqlx::query("SELECT course_id FROM lessons WHERE id = ?1")
            .bind(lesson_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?;
        let Some(course_row) = course_row else {
            return Err(StorageError::NotFound);
        };
        if inserted.rows_affected() == 0 {
            return Err(StorageError::NotEnrolled);
        }
        let course_raw: i64 = course_row.try_get("course_id").map_err(ser)?;

        let counts = sqlx::query(
            r"
            SELECT
                (SELECT COUNT(*) FROM lessons WHERE course_id = ?2) AS total,
                (SELECT COUNT(*)
                   FROM lesson_completions lc
                   JOIN lessons l ON l.id = lc.lesson_id
                  WHERE lc.learner_id = ?1 AND l.course_id = ?2) AS completed
            ",
        )
        .bind(&learner)
        .bind(course_raw)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;
        let total_lessons = count_to_u32("total_lessons", counts.try_get("total").map_err(ser)?)?;
        let completed_lessons =
            count_to_u32("completed_lessons", counts.try_get("completed").map_err(ser)?)?;
        let progress = Progress::from_counts(completed_lessons, total_lessons);

        let updated = sqlx::query(
            r"
            UPDATE enrollments
            SET progress_percentage = ?3, completion_status = ?4
            WHERE learner_id = ?1 AND course_id = ?2
            ",
        )
        .bind(&learner)
        .bind(course_raw)
        .bind(i64::from(progress.percentage()))
        .bind(progress.is_complete())
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
        if updated.rows_affected() == 0 {
            return Err(StorageError::NotEnrolled);
        }

        tx.commit().await.map_err(db_err)?;

        let course_id = u64::try_from(course_raw)
            .map(CourseId::new)
            .map_err(|_| StorageError::Serialization("course_id sign overflow".into()))?;
        tracing::debug!(
            learner = %record.learner_id,
            lesson = %record.lesson_id,
            completed_lessons,
            total_lessons,
            percentage = progress.percentage(),
            "completion recorded"
        );

        Ok(ProgressUpdate {
            learner_id: record.learner_id,
            course_id,
            lesson_id: record.lesson_id,
            completed_at: record.completed_at,
            completed_lessons,
            total_lessons,
            progress,
        })
    }
}
