mod course;
mod enrollment;
mod forum;
mod ids;

pub use ids::{CourseId, ForumId, LearnerId, LessonId, ParseIdError, ReplyId};

pub use course::{Course, CourseError, Lesson};
pub use enrollment::{CompletionRecord, Enrollment, EnrollmentError, Progress};
pub use forum::{ForumError, ForumReply, ForumThread, ReplyDraft, ThreadDraft};
