use std::sync::Arc;

use academy_core::model::{
    CompletionRecord, Course, CourseId, Enrollment, ForumId, ForumReply, ForumThread, LearnerId,
    Lesson, LessonId, Progress, ReplyDraft, ReplyId, ThreadDraft,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

pub use crate::memory::InMemoryRepository;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("learner is not enrolled in the course")]
    NotEnrolled,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── RECORDS ───────────────────────────────────────────────────────────────────
//

/// State committed by a successful [`ProgressLedger::record_completion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub learner_id: LearnerId,
    pub course_id: CourseId,
    pub lesson_id: LessonId,
    pub completed_at: DateTime<Utc>,
    pub completed_lessons: u32,
    pub total_lessons: u32,
    pub progress: Progress,
}

/// An enrollment joined with the course fields a learner's dashboard needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentOverview {
    pub enrollment: Enrollment,
    pub course_title: String,
    pub course_category: Option<String>,
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

/// Courses and their lessons. Authored outside the progress core.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Persist or update a course.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the course cannot be stored.
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError>;

    /// Persist or update a lesson.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the course is missing and
    /// `StorageError::Conflict` if another lesson of the course already holds
    /// the same position.
    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn get_lesson(&self, id: LessonId) -> Result<Option<Lesson>, StorageError>;

    /// Lessons of a course ordered by position.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn lessons_for_course(&self, course_id: CourseId) -> Result<Vec<Lesson>, StorageError>;
}

#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    /// Create an enrollment.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the learner is already enrolled and
    /// `StorageError::NotFound` if the course does not exist.
    async fn insert_enrollment(&self, enrollment: &Enrollment) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn get_enrollment(
        &self,
        learner_id: LearnerId,
        course_id: CourseId,
    ) -> Result<Option<Enrollment>, StorageError>;

    /// All enrollments of a learner, most recent first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn enrollments_for_learner(
        &self,
        learner_id: LearnerId,
    ) -> Result<Vec<EnrollmentOverview>, StorageError>;

    /// Lessons of `course_id` the learner has completed, by position.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn completed_lessons(
        &self,
        learner_id: LearnerId,
        course_id: CourseId,
    ) -> Result<Vec<LessonId>, StorageError>;
}

/// The completion ledger and the enrollment progress it drives.
///
/// Implementations run the whole operation as one atomic unit: either the
/// record is appended and the enrollment carries the recomputed progress, or
/// nothing changes.
#[async_trait]
pub trait ProgressLedger: Send + Sync {
    /// Append `record` and recompute the owning enrollment's progress from
    /// the lesson and completion counts.
    ///
    /// Checks run in order and the first failure wins.
    ///
    /// # Errors
    ///
    /// - `StorageError::NotFound` if the lesson does not exist.
    /// - `StorageError::NotEnrolled` if the learner has no enrollment in the
    ///   lesson's course.
    /// - `StorageError::Conflict` if the learner already completed the lesson.
    /// - `StorageError::Connection` for backend failures; nothing is committed.
    async fn record_completion(
        &self,
        record: CompletionRecord,
    ) -> Result<ProgressUpdate, StorageError>;
}

#[async_trait]
pub trait ForumRepository: Send + Sync {
    /// Store a new thread; storage assigns the id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the thread cannot be stored.
    async fn insert_thread(
        &self,
        draft: ThreadDraft,
        created_at: DateTime<Utc>,
    ) -> Result<ForumThread, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn get_thread(&self, id: ForumId) -> Result<Option<ForumThread>, StorageError>;

    /// Every thread, newest first (ties broken by id, highest first).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn list_threads(&self) -> Result<Vec<ForumThread>, StorageError>;

    /// Persist an edited title, content and `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the thread is gone.
    async fn update_thread(&self, thread: &ForumThread) -> Result<(), StorageError>;

    /// Remove a thread together with all of its replies.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the thread is gone.
    async fn delete_thread(&self, id: ForumId) -> Result<(), StorageError>;

    /// Store a reply. The parent id is stored as given.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the thread does not exist.
    async fn insert_reply(
        &self,
        draft: ReplyDraft,
        created_at: DateTime<Utc>,
    ) -> Result<ForumReply, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn get_reply(&self, id: ReplyId) -> Result<Option<ForumReply>, StorageError>;

    /// Persist edited content and `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the reply is gone.
    async fn update_reply(&self, reply: &ForumReply) -> Result<(), StorageError>;

    /// Remove a reply. Its children keep their parent id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the reply is gone.
    async fn delete_reply(&self, id: ReplyId) -> Result<(), StorageError>;

    /// Every reply of a thread, oldest first (ties broken by id).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn replies_for_thread(&self, forum_id: ForumId) -> Result<Vec<ForumReply>, StorageError>;
}

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub catalog: Arc<dyn CatalogRepository>,
    pub enrollments: Arc<dyn EnrollmentRepository>,
    pub ledger: Arc<dyn ProgressLedger>,
    pub forum: Arc<dyn ForumRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            catalog: Arc::new(repo.clone()),
            enrollments: Arc::new(repo.clone()),
            ledger: Arc::new(repo.clone()),
            forum: Arc::new(repo),
        }
    }
}
