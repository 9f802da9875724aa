use std::sync::Arc;

use academy_core::model::{CompletionRecord, CourseId, LessonId};
use storage::repository::{CatalogRepository, EnrollmentRepository, ProgressLedger, ProgressUpdate};

use crate::Clock;
use crate::error::{ForbiddenReason, ProgressError};
use crate::identity::{Identity, require_membership};

/// Records lesson completions and keeps enrollment progress in step.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    catalog: Arc<dyn CatalogRepository>,
    enrollments: Arc<dyn EnrollmentRepository>,
    ledger: Arc<dyn ProgressLedger>,
}

impl ProgressService {
    #[must_use]
    pub fn new(
        clock: Clock,
        catalog: Arc<dyn CatalogRepository>,
        enrollments: Arc<dyn EnrollmentRepository>,
        ledger: Arc<dyn ProgressLedger>,
    ) -> Self {
        Self {
            clock,
            catalog,
            enrollments,
            ledger,
        }
    }

    /// Mark `lesson_id` complete for the caller and recompute the course
    /// percentage from the lesson and completion counts.
    ///
    /// The record and the enrollment update commit together or not at all.
    /// Nothing is retried here; callers decide based on
    /// [`ProgressError::is_retryable`].
    ///
    /// # Errors
    ///
    /// - `ProgressError::Forbidden(MembershipInactive)` before storage is touched.
    /// - `ProgressError::NotFound` if the lesson does not exist.
    /// - `ProgressError::Forbidden(NotEnrolled)` if the caller is not enrolled
    ///   in the lesson's course.
    /// - `ProgressError::Conflict` if the lesson was already completed.
    /// - `ProgressError::TransientFailure` if storage failed; nothing was committed.
    pub async fn complete_lesson(
        &self,
        identity: &Identity,
        lesson_id: LessonId,
    ) -> Result<ProgressUpdate, ProgressError> {
        require_membership(identity, self.clock).map_err(ProgressError::Forbidden)?;

        let record = CompletionRecord::new(identity.learner_id(), lesson_id, self.clock.now());
        match self.ledger.record_completion(record).await {
            Ok(update) => {
                tracing::info!(
                    learner = %update.learner_id,
                    course = %update.course_id,
                    lesson = %update.lesson_id,
                    completed = update.completed_lessons,
                    total = update.total_lessons,
                    percentage = update.progress.percentage(),
                    course_completed = update.progress.is_complete(),
                    "lesson completed"
                );
                Ok(update)
            }
            Err(err) => {
                let err = ProgressError::from(err);
                tracing::warn!(
                    learner = %identity.learner_id(),
                    lesson = %lesson_id,
                    retryable = err.is_retryable(),
                    error = %err,
                    "lesson completion rejected"
                );
                Err(err)
            }
        }
    }

    /// Lessons of `course_id` the caller has completed, in lesson order.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::NotFound` for an unknown course,
    /// `ProgressError::Forbidden` without membership or enrollment, and
    /// `ProgressError::TransientFailure` on storage failure.
    pub async fn completed_lessons(
        &self,
        identity: &Identity,
        course_id: CourseId,
    ) -> Result<Vec<LessonId>, ProgressError> {
        require_membership(identity, self.clock).map_err(ProgressError::Forbidden)?;

        if self.catalog.get_course(course_id).await?.is_none() {
            return Err(ProgressError::NotFound);
        }
        if self
            .enrollments
            .get_enrollment(identity.learner_id(), course_id)
            .await?
            .is_none()
        {
            return Err(ProgressError::Forbidden(ForbiddenReason::NotEnrolled));
        }

        let done = self
            .enrollments
            .completed_lessons(identity.learner_id(), course_id)
            .await?;
        Ok(done)
    }
}
