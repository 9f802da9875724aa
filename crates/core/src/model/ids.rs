use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Error returned when an identifier cannot be parsed from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: &'static str,
    raw: String,
}

impl ParseIdError {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.kind
    }
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from {:?}", self.kind, self.raw)
    }
}

impl std::error::Error for ParseIdError {}

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(u64);

        impl $name {
            #[must_use]
            pub fn new(id: u64) -> Self {
                Self(id)
            }

            /// Returns the underlying u64 value
            #[must_use]
            pub fn value(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse::<u64>().map(Self).map_err(|_| ParseIdError {
                    kind: stringify!($name),
                    raw: s.to_owned(),
                })
            }
        }
    };
}

numeric_id!(
    /// Identifier of a course in the catalog.
    CourseId
);
numeric_id!(
    /// Identifier of a lesson; unique across all courses.
    LessonId
);
numeric_id!(
    /// Identifier of a forum thread.
    ForumId
);
numeric_id!(
    /// Identifier of a single forum reply.
    ReplyId
);

/// Identifier of a learner account, issued by the identity provider as a UUID.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LearnerId(Uuid);

impl LearnerId {
    #[must_use]
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Generates a fresh random learner id.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Debug for LearnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LearnerId({})", self.0)
    }
}

impl fmt::Display for LearnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LearnerId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| ParseIdError {
                kind: "LearnerId",
                raw: s.to_owned(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_ids_parse_and_display() {
        let id: LessonId = " 42 ".parse().unwrap();
        assert_eq!(id, LessonId::new(42));
        assert_eq!(id.to_string(), "42");
        assert_eq!(format!("{:?}", ReplyId::new(7)), "ReplyId(7)");
    }

    #[test]
    fn numeric_id_rejects_garbage() {
        let err = "abc".parse::<CourseId>().unwrap_err();
        assert_eq!(err.kind(), "CourseId");
    }

    #[test]
    fn learner_id_parses_uuid() {
        let raw = "67e55044-10b1-426f-9247-bb680e5fe0c8";
        let id: LearnerId = raw.parse().unwrap();
        assert_eq!(id.to_string(), raw);
        assert!("not-a-uuid".parse::<LearnerId>().is_err());
    }
}
