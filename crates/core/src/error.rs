use thiserror::Error;

use crate::model::{CourseError, EnrollmentError, ForumError};

/// Any domain validation failure raised by this crate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Course(#[from] CourseError),
    #[error(transparent)]
    Enrollment(#[from] EnrollmentError),
    #[error(transparent)]
    Forum(#[from] ForumError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_convert_transparently() {
        let err: Error = CourseError::EmptyTitle.into();
        assert_eq!(err.to_string(), CourseError::EmptyTitle.to_string());
        assert!(matches!(
            Error::from(ForumError::EmptyContent),
            Error::Forum(ForumError::EmptyContent)
        ));
        assert!(matches!(
            Error::from(EnrollmentError::PercentageOutOfRange(120)),
            Error::Enrollment(_)
        ));
    }
}
