use academy_core::model::{Course, CourseId, Lesson, LessonId};

use super::SqliteRepository;
use super::mapping::{db_err, id_to_i64, map_course_row, map_lesson_row};
use crate::repository::{CatalogRepository, StorageError};

#[async_trait::async_trait]
impl CatalogRepository for SqliteRepository {
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO courses (id, title, description, category, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                description = excluded.description,
                category = excluded.category
            ",
        )
        .bind(id_to_i64("course_id", course.id().value())?)
        .bind(course.title())
        .bind(course.description())
        .bind(course.category())
        .bind(course.created_at())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, title, description, category, created_at
            FROM courses
            WHERE id = ?1
            ",
        )
        .bind(id_to_i64("course_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(map_course_row).transpose()
    }

    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO lessons (id, course_id, title, content, video_url, position, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                course_id = excluded.course_id,
                title = excluded.title,
                content = excluded.content,
                video_url = excluded.video_url,
                position = excluded.position
            ",
        )
        .bind(id_to_i64("lesson_id", lesson.id().value())?)
        .bind(id_to_i64("course_id", lesson.course_id().value())?)
        .bind(lesson.title())
        .bind(lesson.content())
        .bind(lesson.video_url())
        .bind(i64::from(lesson.position()))
        .bind(lesson.created_at())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn get_lesson(&self, id: LessonId) -> Result<Option<Lesson>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, course_id, title, content, video_url, position, created_at
            FROM lessons
            WHERE id = ?1
            ",
        )
        .bind(id_to_i64("lesson_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(map_lesson_row).transpose()
    }

    async fn lessons_for_course(&self, course_id: CourseId) -> Result<Vec<Lesson>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, course_id, title, content, video_url, position, created_at
            FROM lessons
            WHERE course_id = ?1
            ORDER BY position ASC
            ",
        )
        .bind(id_to_i64("course_id", course_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(map_lesson_row).collect()
    }
}
