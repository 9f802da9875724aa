//! Shared error types for the services crate.

use thiserror::Error;

use academy_core::model::{CourseError, ForumError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Why an authenticated learner was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForbiddenReason {
    /// No membership, or the membership has expired.
    MembershipInactive,
    /// The learner has no enrollment in the lesson's course.
    NotEnrolled,
    /// Only the author (or an admin, for deletion) may change the reply.
    NotAuthor,
}

impl core::fmt::Display for ForbiddenReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let text = match self {
            ForbiddenReason::MembershipInactive => "membership is not active",
            ForbiddenReason::NotEnrolled => "learner is not enrolled in the course",
            ForbiddenReason::NotAuthor => "only the author may change this reply",
        };
        f.write_str(text)
    }
}

/// Errors emitted by `ProgressService`.
///
/// Every variant except `TransientFailure` is terminal for the request;
/// `TransientFailure` means nothing was committed and the caller may retry.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("lesson or course not found")]
    NotFound,
    #[error("forbidden: {0}")]
    Forbidden(ForbiddenReason),
    #[error("lesson already completed")]
    Conflict,
    #[error("temporary storage failure: {0}")]
    TransientFailure(#[source] StorageError),
}

impl ProgressError {
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProgressError::TransientFailure(_))
    }

    /// HTTP-style status an outer surface would answer with.
    #[must_use]
    pub fn status_hint(&self) -> u16 {
        match self {
            ProgressError::NotFound => 404,
            ProgressError::Forbidden(_) => 403,
            ProgressError::Conflict => 409,
            ProgressError::TransientFailure(_) => 503,
        }
    }
}

impl From<StorageError> for ProgressError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound => ProgressError::NotFound,
            StorageError::NotEnrolled => ProgressError::Forbidden(ForbiddenReason::NotEnrolled),
            StorageError::Conflict => ProgressError::Conflict,
            other => ProgressError::TransientFailure(other),
        }
    }
}

/// Errors emitted by `EnrollmentService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EnrollmentServiceError {
    #[error("course not found")]
    NotFound,
    #[error("forbidden: {0}")]
    Forbidden(ForbiddenReason),
    #[error("already enrolled in this course")]
    Conflict,
    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for EnrollmentServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound => EnrollmentServiceError::NotFound,
            StorageError::Conflict => EnrollmentServiceError::Conflict,
            other => EnrollmentServiceError::Storage(other),
        }
    }
}

/// Errors emitted by `ForumService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ForumServiceError {
    #[error(transparent)]
    Forum(#[from] ForumError),
    #[error("thread or reply not found")]
    NotFound,
    #[error("forbidden: {0}")]
    Forbidden(ForbiddenReason),
    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for ForumServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound => ForumServiceError::NotFound,
            other => ForumServiceError::Storage(other),
        }
    }
}

/// Errors emitted while bootstrapping app services or seeding the catalog.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Course(#[from] CourseError),
    #[error(transparent)]
    Forum(#[from] ForumServiceError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_map_to_progress_kinds() {
        assert!(matches!(
            ProgressError::from(StorageError::NotFound),
            ProgressError::NotFound
        ));
        assert!(matches!(
            ProgressError::from(StorageError::NotEnrolled),
            ProgressError::Forbidden(ForbiddenReason::NotEnrolled)
        ));
        assert!(matches!(
            ProgressError::from(StorageError::Conflict),
            ProgressError::Conflict
        ));

        let transient = ProgressError::from(StorageError::Connection("disk I/O error".into()));
        assert!(transient.is_retryable());
        assert_eq!(transient.status_hint(), 503);
    }

    #[test]
    fn only_transient_failures_are_retryable() {
        let terminal = [
            ProgressError::NotFound,
            ProgressError::Forbidden(ForbiddenReason::MembershipInactive),
            ProgressError::Conflict,
        ];
        let hints: Vec<u16> = terminal.iter().map(ProgressError::status_hint).collect();
        assert_eq!(hints, vec![404, 403, 409]);
        assert!(terminal.iter().all(|e| !e.is_retryable()));
    }
}
