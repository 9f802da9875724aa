use academy_core::model::{
    Course, CourseId, Enrollment, ForumId, ForumReply, ForumThread, LearnerId, Lesson, LessonId,
    Progress, ReplyId,
};
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::{EnrollmentOverview, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Maps constraint violations to domain-meaningful storage errors; anything
/// else is treated as a backend failure.
pub(crate) fn db_err(e: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return StorageError::Conflict;
        }
        if db.is_foreign_key_violation() {
            return StorageError::NotFound;
        }
    }
    StorageError::Connection(e.to_string())
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn count_to_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

fn learner_id(row: &SqliteRow, column: &str) -> Result<LearnerId, StorageError> {
    row.try_get::<String, _>(column)
        .map_err(ser)?
        .parse::<LearnerId>()
        .map_err(ser)
}

pub(crate) fn map_course_row(row: &SqliteRow) -> Result<Course, StorageError> {
    Course::new(
        CourseId::new(i64_to_u64("course_id", row.try_get("id").map_err(ser)?)?),
        row.try_get::<String, _>("title").map_err(ser)?,
        row.try_get("description").map_err(ser)?,
        row.try_get("category").map_err(ser)?,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_lesson_row(row: &SqliteRow) -> Result<Lesson, StorageError> {
    let position: i64 = row.try_get("position").map_err(ser)?;
    Lesson::new(
        LessonId::new(i64_to_u64("lesson_id", row.try_get("id").map_err(ser)?)?),
        CourseId::new(i64_to_u64("course_id", row.try_get("course_id").map_err(ser)?)?),
        row.try_get::<String, _>("title").map_err(ser)?,
        row.try_get("content").map_err(ser)?,
        row.try_get("video_url").map_err(ser)?,
        count_to_u32("position", position)?,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_enrollment_row(row: &SqliteRow) -> Result<Enrollment, StorageError> {
    let percentage: i64 = row.try_get("progress_percentage").map_err(ser)?;
    let percentage = u8::try_from(percentage)
        .map_err(|_| StorageError::Serialization(format!("invalid percentage: {percentage}")))?;
    let completed: bool = row.try_get("completion_status").map_err(ser)?;
    let progress = Progress::from_persisted(percentage, completed).map_err(ser)?;

    Ok(Enrollment::from_persisted(
        learner_id(row, "learner_id")?,
        CourseId::new(i64_to_u64("course_id", row.try_get("course_id").map_err(ser)?)?),
        row.try_get("enrolled_at").map_err(ser)?,
        progress,
    ))
}

pub(crate) fn map_enrollment_overview_row(
    row: &SqliteRow,
) -> Result<EnrollmentOverview, StorageError> {
    Ok(EnrollmentOverview {
        enrollment: map_enrollment_row(row)?,
        course_title: row.try_get("title").map_err(ser)?,
        course_category: row.try_get("category").map_err(ser)?,
    })
}

pub(crate) fn map_thread_row(row: &SqliteRow) -> Result<ForumThread, StorageError> {
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(ser)?;
    let updated_at: Option<DateTime<Utc>> = row.try_get("updated_at").map_err(ser)?;
    ForumThread::from_persisted(
        ForumId::new(i64_to_u64("forum_id", row.try_get("id").map_err(ser)?)?),
        learner_id(row, "author_id")?,
        &row.try_get::<String, _>("title").map_err(ser)?,
        &row.try_get::<String, _>("content").map_err(ser)?,
        created_at,
        updated_at.unwrap_or(created_at),
    )
    .map_err(ser)
}

pub(crate) fn map_reply_row(row: &SqliteRow) -> Result<ForumReply, StorageError> {
    let parent = row
        .try_get::<Option<i64>, _>("parent_reply_id")
        .map_err(ser)?
        .map(|v| i64_to_u64("parent_reply_id", v).map(ReplyId::new))
        .transpose()?;

    Ok(ForumReply {
        id: ReplyId::new(i64_to_u64("reply_id", row.try_get("id").map_err(ser)?)?),
        forum_id: ForumId::new(i64_to_u64("forum_id", row.try_get("forum_id").map_err(ser)?)?),
        author_id: learner_id(row, "author_id")?,
        content: row.try_get("content").map_err(ser)?,
        parent_reply_id: parent,
        created_at: row.try_get("created_at").map_err(ser)?,
        updated_at: row.try_get("updated_at").map_err(ser)?,
    })
}
