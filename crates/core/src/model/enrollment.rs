use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{CourseId, LearnerId, LessonId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EnrollmentError {
    #[error("completion percentage must be in 0..=100, got {0}")]
    PercentageOutOfRange(u8),

    #[error("completion status {completed} does not match percentage {percentage}")]
    InconsistentStatus { percentage: u8, completed: bool },
}

//
// ─── PROGRESS ──────────────────────────────────────────────────────────────────
//

/// Completion state of one enrollment.
///
/// The completed flag is derived from the percentage, so a `Progress` can
/// never claim completion below 100% or deny it at 100%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Progress {
    percentage: u8,
}

impl Progress {
    /// Progress of a fresh enrollment.
    pub const NONE: Progress = Progress { percentage: 0 };

    /// Computes progress from lesson counts.
    ///
    /// Uses round-half-up on `100 * completed / total` in integer arithmetic.
    /// A course without lessons always yields 0%. `completed` above `total`
    /// is clamped.
    #[must_use]
    pub fn from_counts(completed: u32, total: u32) -> Self {
        if total == 0 {
            return Self::NONE;
        }
        let completed = u64::from(completed.min(total));
        let total = u64::from(total);
        // (100c / t + 1/2) floored == (200c + t) / 2t
        let rounded = (200 * completed + total) / (2 * total);
        Self {
            percentage: u8::try_from(rounded).unwrap_or(100),
        }
    }

    /// Rebuilds progress from stored columns, checking both agree.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentError` when the percentage exceeds 100 or the flag
    /// contradicts it.
    pub fn from_persisted(percentage: u8, completed: bool) -> Result<Self, EnrollmentError> {
        if percentage > 100 {
            return Err(EnrollmentError::PercentageOutOfRange(percentage));
        }
        let progress = Self { percentage };
        if progress.is_complete() != completed {
            return Err(EnrollmentError::InconsistentStatus {
                percentage,
                completed,
            });
        }
        Ok(progress)
    }

    #[must_use]
    pub fn percentage(&self) -> u8 {
        self.percentage
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.percentage == 100
    }
}

//
// ─── ENROLLMENT ────────────────────────────────────────────────────────────────
//

/// A learner's enrollment in a course, with its current progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrollment {
    learner_id: LearnerId,
    course_id: CourseId,
    enrolled_at: DateTime<Utc>,
    progress: Progress,
}

impl Enrollment {
    /// A new enrollment at 0% progress.
    #[must_use]
    pub fn new(learner_id: LearnerId, course_id: CourseId, enrolled_at: DateTime<Utc>) -> Self {
        Self {
            learner_id,
            course_id,
            enrolled_at,
            progress: Progress::NONE,
        }
    }

    #[must_use]
    pub fn from_persisted(
        learner_id: LearnerId,
        course_id: CourseId,
        enrolled_at: DateTime<Utc>,
        progress: Progress,
    ) -> Self {
        Self {
            learner_id,
            course_id,
            enrolled_at,
            progress,
        }
    }

    #[must_use]
    pub fn learner_id(&self) -> LearnerId {
        self.learner_id
    }

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    #[must_use]
    pub fn enrolled_at(&self) -> DateTime<Utc> {
        self.enrolled_at
    }

    #[must_use]
    pub fn progress(&self) -> Progress {
        self.progress
    }

    pub fn set_progress(&mut self, progress: Progress) {
        self.progress = progress;
    }
}

//
// ─── COMPLETION RECORD ─────────────────────────────────────────────────────────
//

/// Proof that a learner finished a lesson. Append-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionRecord {
    pub learner_id: LearnerId,
    pub lesson_id: LessonId,
    pub completed_at: DateTime<Utc>,
}

impl CompletionRecord {
    #[must_use]
    pub fn new(learner_id: LearnerId, lesson_id: LessonId, completed_at: DateTime<Utc>) -> Self {
        Self {
            learner_id,
            lesson_id,
            completed_at,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
