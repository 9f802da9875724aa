use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::{ForumId, LearnerId, ReplyId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ForumError {
    #[error("thread title cannot be empty")]
    EmptyTitle,

    #[error("post content cannot be empty")]
    EmptyContent,

    #[error("nothing to update: supply a title or content")]
    NothingToUpdate,
}

fn required(value: &str, err: ForumError) -> Result<String, ForumError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(err);
    }
    Ok(trimmed.to_owned())
}

//
// ─── THREAD ────────────────────────────────────────────────────────────────────
//

/// Validated title and content for a thread that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadDraft {
    pub author_id: LearnerId,
    pub title: String,
    pub content: String,
}

impl ThreadDraft {
    /// # Errors
    ///
    /// Returns `ForumError::EmptyTitle` or `ForumError::EmptyContent` for blank input.
    pub fn new(author_id: LearnerId, title: &str, content: &str) -> Result<Self, ForumError> {
        Ok(Self {
            author_id,
            title: required(title, ForumError::EmptyTitle)?,
            content: required(content, ForumError::EmptyContent)?,
        })
    }
}

/// A discussion thread. Replies hang off it by `forum_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForumThread {
    id: ForumId,
    author_id: LearnerId,
    title: String,
    content: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ForumThread {
    #[must_use]
    pub fn from_draft(id: ForumId, draft: ThreadDraft, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            author_id: draft.author_id,
            title: draft.title,
            content: draft.content,
            created_at,
            updated_at: created_at,
        }
    }

    /// Rebuild a stored thread.
    ///
    /// # Errors
    ///
    /// Returns `ForumError::EmptyTitle` or `ForumError::EmptyContent` when the
    /// stored values are blank.
    pub fn from_persisted(
        id: ForumId,
        author_id: LearnerId,
        title: &str,
        content: &str,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, ForumError> {
        Ok(Self {
            id,
            author_id,
            title: required(title, ForumError::EmptyTitle)?,
            content: required(content, ForumError::EmptyContent)?,
            created_at,
            updated_at,
        })
    }

    /// Replace the title, the content, or both, stamping `updated_at`.
    ///
    /// A field left as `None` keeps its current value; nothing changes on error.
    ///
    /// # Errors
    ///
    /// Returns `ForumError::NothingToUpdate` when both are `None`, and
    /// `EmptyTitle`/`EmptyContent` when a supplied value is blank.
    pub fn edit(
        &mut self,
        title: Option<&str>,
        content: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<(), ForumError> {
        if title.is_none() && content.is_none() {
            return Err(ForumError::NothingToUpdate);
        }
        let title = title
            .map(|t| required(t, ForumError::EmptyTitle))
            .transpose()?;
        let content = content
            .map(|c| required(c, ForumError::EmptyContent))
            .transpose()?;

        if let Some(title) = title {
            self.title = title;
        }
        if let Some(content) = content {
            self.content = content;
        }
        self.updated_at = at;
        Ok(())
    }

    #[must_use]
    pub fn id(&self) -> ForumId {
        self.id
    }

    #[must_use]
    pub fn author_id(&self) -> LearnerId {
        self.author_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    #[must_use]
    pub fn is_edited(&self) -> bool {
        self.updated_at > self.created_at
    }
}

//
// ─── REPLY ─────────────────────────────────────────────────────────────────────
//

/// Validated content for a reply that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyDraft {
    pub forum_id: ForumId,
    pub author_id: LearnerId,
    pub content: String,
    pub parent_reply_id: Option<ReplyId>,
}

impl ReplyDraft {
    /// # Errors
    ///
    /// Returns `ForumError::EmptyContent` when the content is blank.
    pub fn new(
        forum_id: ForumId,
        author_id: LearnerId,
        content: &str,
        parent_reply_id: Option<ReplyId>,
    ) -> Result<Self, ForumError> {
        Ok(Self {
            forum_id,
            author_id,
            content: required(content, ForumError::EmptyContent)?,
            parent_reply_id,
        })
    }
}

/// A stored reply.
///
/// `parent_reply_id` is whatever the author supplied; it may point at a reply
/// in another thread or at one that no longer exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForumReply {
    pub id: ReplyId,
    pub forum_id: ForumId,
    pub author_id: LearnerId,
    pub content: String,
    pub parent_reply_id: Option<ReplyId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ForumReply {
    #[must_use]
    pub fn from_draft(id: ReplyId, draft: ReplyDraft, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            forum_id: draft.forum_id,
            author_id: draft.author_id,
            content: draft.content,
            parent_reply_id: draft.parent_reply_id,
            created_at,
            updated_at: created_at,
        }
    }

    /// Replace the content, stamping `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns `ForumError::EmptyContent` when the new content is blank.
    pub fn edit(&mut self, content: &str, at: DateTime<Utc>) -> Result<(), ForumError> {
        self.content = required(content, ForumError::EmptyContent)?;
        self.updated_at = at;
        Ok(())
    }

    #[must_use]
    pub fn is_edited(&self) -> bool {
        self.updated_at > self.created_at
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn thread_requires_title_and_content() {
        let author = LearnerId::random();
        let err = ThreadDraft::new(author, " ", "body").unwrap_err();
        assert_eq!(err, ForumError::EmptyTitle);
        let err = ThreadDraft::new(author, "Hi", "").unwrap_err();
        assert_eq!(err, ForumError::EmptyContent);
    }

    #[test]
    fn thread_edit_updates_given_fields_only() {
        let draft = ThreadDraft::new(LearnerId::random(), "Lifetimes", "Why?").unwrap();
        let mut thread = ForumThread::from_draft(ForumId::new(1), draft, fixed_now());
        assert!(!thread.is_edited());

        let later = fixed_now() + chrono::Duration::minutes(2);
        thread.edit(None, Some(" Why 'a? "), later).unwrap();
        assert_eq!(thread.title(), "Lifetimes");
        assert_eq!(thread.content(), "Why 'a?");
        assert_eq!(thread.updated_at(), later);
        assert!(thread.is_edited());
    }

    #[test]
    fn rejected_thread_edit_changes_nothing() {
        let draft = ThreadDraft::new(LearnerId::random(), "Title", "Body").unwrap();
        let mut thread = ForumThread::from_draft(ForumId::new(1), draft, fixed_now());
        let before = thread.clone();
        let later = fixed_now() + chrono::Duration::minutes(1);

        assert_eq!(
            thread.edit(None, None, later),
            Err(ForumError::NothingToUpdate)
        );
        assert_eq!(
            thread.edit(Some("New"), Some("  "), later),
            Err(ForumError::EmptyContent)
        );
        assert_eq!(thread, before);
    }

    #[test]
    fn reply_draft_rejects_blank_content() {
        let err = ReplyDraft::new(ForumId::new(1), LearnerId::random(), "\n ", None).unwrap_err();
        assert_eq!(err, ForumError::EmptyContent);
    }

    #[test]
    fn edit_stamps_updated_at() {
        let draft = ReplyDraft::new(ForumId::new(1), LearnerId::random(), "first", None).unwrap();
        let mut reply = ForumReply::from_draft(ReplyId::new(1), draft, fixed_now());
        assert!(!reply.is_edited());

        let later = fixed_now() + chrono::Duration::minutes(5);
        reply.edit(" second ", later).unwrap();
        assert_eq!(reply.content, "second");
        assert!(reply.is_edited());
        assert!(reply.edit("", later).is_err());
    }
}
