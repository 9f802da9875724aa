use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::{CourseId, LessonId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CourseError {
    #[error("course title cannot be empty")]
    EmptyTitle,

    #[error("lesson title cannot be empty")]
    EmptyLessonTitle,

    #[error("lesson position must be >= 1")]
    InvalidPosition,
}

fn trimmed_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

//
// ─── COURSE ────────────────────────────────────────────────────────────────────
//

/// A course in the catalog. Lessons reference it by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    id: CourseId,
    title: String,
    description: Option<String>,
    category: Option<String>,
    created_at: DateTime<Utc>,
}

impl Course {
    /// Creates a new course.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::EmptyTitle` if the title is empty or whitespace-only.
    pub fn new(
        id: CourseId,
        title: impl Into<String>,
        description: Option<String>,
        category: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, CourseError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(CourseError::EmptyTitle);
        }

        Ok(Self {
            id,
            title: title.trim().to_owned(),
            description: trimmed_optional(description),
            category: trimmed_optional(category),
            created_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> CourseId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

//
// ─── LESSON ────────────────────────────────────────────────────────────────────
//

/// A single lesson. Belongs to exactly one course and has a 1-based position
/// that is unique within that course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lesson {
    id: LessonId,
    course_id: CourseId,
    title: String,
    content: Option<String>,
    video_url: Option<String>,
    position: u32,
    created_at: DateTime<Utc>,
}

impl Lesson {
    /// Creates a new lesson.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::EmptyLessonTitle` for a blank title and
    /// `CourseError::InvalidPosition` when `position` is zero.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: LessonId,
        course_id: CourseId,
        title: impl Into<String>,
        content: Option<String>,
        video_url: Option<String>,
        position: u32,
        created_at: DateTime<Utc>,
    ) -> Result<Self, CourseError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(CourseError::EmptyLessonTitle);
        }
        if position == 0 {
            return Err(CourseError::InvalidPosition);
        }

        Ok(Self {
            id,
            course_id,
            title: title.trim().to_owned(),
            content: trimmed_optional(content),
            video_url: trimmed_optional(video_url),
            position,
            created_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> LessonId {
        self.id
    }

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    #[must_use]
    pub fn video_url(&self) -> Option<&str> {
        self.video_url.as_deref()
    }

    #[must_use]
    pub fn position(&self) -> u32 {
        self.position
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
