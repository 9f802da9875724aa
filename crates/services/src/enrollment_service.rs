use std::sync::Arc;

use academy_core::model::{CourseId, Enrollment};
use storage::repository::{CatalogRepository, EnrollmentOverview, EnrollmentRepository};

use crate::Clock;
use crate::error::EnrollmentServiceError;
use crate::identity::{Identity, require_membership};

/// Explicit enroll action and the learner's enrollment list.
#[derive(Clone)]
pub struct EnrollmentService {
    clock: Clock,
    catalog: Arc<dyn CatalogRepository>,
    enrollments: Arc<dyn EnrollmentRepository>,
}

impl EnrollmentService {
    #[must_use]
    pub fn new(
        clock: Clock,
        catalog: Arc<dyn CatalogRepository>,
        enrollments: Arc<dyn EnrollmentRepository>,
    ) -> Self {
        Self {
            clock,
            catalog,
            enrollments,
        }
    }

    /// Enroll the caller in `course_id` at 0% progress.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentServiceError::Forbidden` without an active
    /// membership, `NotFound` for an unknown course and `Conflict` when the
    /// caller is already enrolled.
    pub async fn enroll(
        &self,
        identity: &Identity,
        course_id: CourseId,
    ) -> Result<Enrollment, EnrollmentServiceError> {
        require_membership(identity, self.clock).map_err(EnrollmentServiceError::Forbidden)?;

        if self.catalog.get_course(course_id).await?.is_none() {
            return Err(EnrollmentServiceError::NotFound);
        }

        let enrollment = Enrollment::new(identity.learner_id(), course_id, self.clock.now());
        self.enrollments.insert_enrollment(&enrollment).await?;
        tracing::info!(learner = %identity.learner_id(), course = %course_id, "enrolled");
        Ok(enrollment)
    }

    /// The caller's enrollments, most recent first.
    ///
    /// Listing is allowed after a membership lapses so learners can still see
    /// where they stopped.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentServiceError::Storage` if repository access fails.
    pub async fn my_enrollments(
        &self,
        identity: &Identity,
    ) -> Result<Vec<EnrollmentOverview>, EnrollmentServiceError> {
        let list = self
            .enrollments
            .enrollments_for_learner(identity.learner_id())
            .await?;
        Ok(list)
    }
}
