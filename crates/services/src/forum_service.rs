use std::sync::Arc;

use academy_core::model::{ForumId, ForumReply, ForumThread, ReplyDraft, ReplyId, ThreadDraft};
use academy_core::{ThreadForest, build_tree};
use storage::repository::ForumRepository;

use crate::Clock;
use crate::error::{ForbiddenReason, ForumServiceError};
use crate::identity::{Identity, require_membership};

/// A thread with its replies assembled into a forest.
#[derive(Debug, Clone)]
pub struct ThreadView {
    pub thread: ForumThread,
    pub replies: ThreadForest,
}

/// Discussion threads and their nested replies.
#[derive(Clone)]
pub struct ForumService {
    clock: Clock,
    forum: Arc<dyn ForumRepository>,
}

impl ForumService {
    #[must_use]
    pub fn new(clock: Clock, forum: Arc<dyn ForumRepository>) -> Self {
        Self { clock, forum }
    }

    fn gate(&self, identity: &Identity) -> Result<(), ForumServiceError> {
        require_membership(identity, self.clock).map_err(ForumServiceError::Forbidden)
    }

    /// # Errors
    ///
    /// Returns `ForumServiceError::Forum` for a blank title or content,
    /// `Forbidden` without membership, `Storage` on persistence failure.
    pub async fn create_thread(
        &self,
        identity: &Identity,
        title: &str,
        content: &str,
    ) -> Result<ForumId, ForumServiceError> {
        self.gate(identity)?;
        let draft = ThreadDraft::new(identity.learner_id(), title, content)?;
        let thread = self.forum.insert_thread(draft, self.clock.now()).await?;
        tracing::info!(forum = %thread.id(), author = %identity.learner_id(), "thread created");
        Ok(thread.id())
    }

    /// All threads, newest first.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` without membership, `Storage` on persistence failure.
    pub async fn list_threads(
        &self,
        identity: &Identity,
    ) -> Result<Vec<ForumThread>, ForumServiceError> {
        self.gate(identity)?;
        Ok(self.forum.list_threads().await?)
    }

    /// Change the title, the content, or both, of the caller's own thread.
    ///
    /// # Errors
    ///
    /// Returns `ForumServiceError::NotFound` for a missing thread,
    /// `Forbidden(NotAuthor)` when the caller did not start it, and
    /// `ForumServiceError::Forum` when nothing is supplied or a supplied
    /// field is blank.
    pub async fn edit_thread(
        &self,
        identity: &Identity,
        forum_id: ForumId,
        title: Option<&str>,
        content: Option<&str>,
    ) -> Result<ForumThread, ForumServiceError> {
        self.gate(identity)?;
        let mut thread = self
            .forum
            .get_thread(forum_id)
            .await?
            .ok_or(ForumServiceError::NotFound)?;
        if thread.author_id() != identity.learner_id() {
            return Err(ForumServiceError::Forbidden(ForbiddenReason::NotAuthor));
        }
        thread.edit(title, content, self.clock.now())?;
        self.forum.update_thread(&thread).await?;
        tracing::info!(forum = %forum_id, "thread edited");
        Ok(thread)
    }

    /// Remove a thread together with every reply in it. Allowed for its
    /// author and for admins.
    ///
    /// # Errors
    ///
    /// Returns `ForumServiceError::NotFound` for a missing thread and
    /// `ForumServiceError::Forbidden(NotAuthor)` for anyone else.
    pub async fn delete_thread(
        &self,
        identity: &Identity,
        forum_id: ForumId,
    ) -> Result<(), ForumServiceError> {
        self.gate(identity)?;
        let thread = self
            .forum
            .get_thread(forum_id)
            .await?
            .ok_or(ForumServiceError::NotFound)?;
        if thread.author_id() != identity.learner_id() && !identity.is_admin() {
            return Err(ForumServiceError::Forbidden(ForbiddenReason::NotAuthor));
        }
        self.forum.delete_thread(forum_id).await?;
        tracing::info!(forum = %forum_id, by_admin = identity.is_admin(), "thread deleted");
        Ok(())
    }

    /// Post a reply. `parent` is stored as given and is not checked against
    /// the thread; an unknown parent renders as a top-level reply.
    ///
    /// # Errors
    ///
    /// Returns `ForumServiceError::NotFound` if the thread does not exist and
    /// `ForumServiceError::Forum` for blank content.
    pub async fn post_reply(
        &self,
        identity: &Identity,
        forum_id: ForumId,
        content: &str,
        parent: Option<ReplyId>,
    ) -> Result<ForumReply, ForumServiceError> {
        self.gate(identity)?;
        let draft = ReplyDraft::new(forum_id, identity.learner_id(), content, parent)?;
        let reply = self.forum.insert_reply(draft, self.clock.now()).await?;
        tracing::info!(forum = %forum_id, reply = %reply.id, "reply posted");
        Ok(reply)
    }

    /// Replace the content of the caller's own reply.
    ///
    /// # Errors
    ///
    /// Returns `ForumServiceError::NotFound` for a missing reply and
    /// `ForumServiceError::Forbidden(NotAuthor)` when the caller did not write it.
    pub async fn edit_reply(
        &self,
        identity: &Identity,
        reply_id: ReplyId,
        content: &str,
    ) -> Result<ForumReply, ForumServiceError> {
        self.gate(identity)?;
        let mut reply = self
            .forum
            .get_reply(reply_id)
            .await?
            .ok_or(ForumServiceError::NotFound)?;
        if reply.author_id != identity.learner_id() {
            return Err(ForumServiceError::Forbidden(ForbiddenReason::NotAuthor));
        }
        reply.edit(content, self.clock.now())?;
        self.forum.update_reply(&reply).await?;
        Ok(reply)
    }

    /// Remove a reply. Allowed for its author and for admins.
    ///
    /// # Errors
    ///
    /// Returns `ForumServiceError::NotFound` for a missing reply and
    /// `ForumServiceError::Forbidden(NotAuthor)` for anyone else.
    pub async fn delete_reply(
        &self,
        identity: &Identity,
        reply_id: ReplyId,
    ) -> Result<(), ForumServiceError> {
        self.gate(identity)?;
        let reply = self
            .forum
            .get_reply(reply_id)
            .await?
            .ok_or(ForumServiceError::NotFound)?;
        if reply.author_id != identity.learner_id() && !identity.is_admin() {
            return Err(ForumServiceError::Forbidden(ForbiddenReason::NotAuthor));
        }
        self.forum.delete_reply(reply_id).await?;
        tracing::info!(reply = %reply_id, by_admin = identity.is_admin(), "reply deleted");
        Ok(())
    }

    /// Load a thread and assemble its replies. The tree is rebuilt on every
    /// call, so it always reflects the stored replies.
    ///
    /// # Errors
    ///
    /// Returns `ForumServiceError::NotFound` if the thread does not exist.
    pub async fn view_thread(
        &self,
        identity: &Identity,
        forum_id: ForumId,
    ) -> Result<ThreadView, ForumServiceError> {
        self.gate(identity)?;
        let thread = self
            .forum
            .get_thread(forum_id)
            .await?
            .ok_or(ForumServiceError::NotFound)?;
        let replies = build_tree(self.forum.replies_for_thread(forum_id).await?);
        tracing::debug!(
            forum = %forum_id,
            replies = replies.len(),
            roots = replies.roots().len(),
            "thread assembled"
        );
        Ok(ThreadView { thread, replies })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use academy_core::model::{ForumError, LearnerId};
    use academy_core::time::fixed_now;
    use storage::repository::InMemoryRepository;

    fn service() -> ForumService {
        ForumService::new(Clock::fixed(fixed_now()), Arc::new(InMemoryRepository::new()))
    }

    #[tokio::test]
    async fn blank_input_is_rejected() {
        let service = service();
        let member = Identity::member(LearnerId::random(), None);
        let err = service
            .create_thread(&member, "  ", "content")
            .await
            .unwrap_err();
        assert!(matches!(err, ForumServiceError::Forum(ForumError::EmptyTitle)));

        let forum = service
            .create_thread(&member, "Title", "content")
            .await
            .unwrap();
        let err = service
            .post_reply(&member, forum, "\n", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ForumServiceError::Forum(ForumError::EmptyContent)));
    }

    #[tokio::test]
    async fn only_author_edits_and_admin_may_delete() {
        let service = service();
        let author = Identity::member(LearnerId::random(), None);
        let other = Identity::member(LearnerId::random(), None);
        let admin = Identity::admin(LearnerId::random());

        let forum = service
            .create_thread(&author, "Borrowck", "help")
            .await
            .unwrap();
        let reply = service
            .post_reply(&author, forum, "first try", None)
            .await
            .unwrap();

        let err = service
            .edit_reply(&other, reply.id, "hijack")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ForumServiceError::Forbidden(ForbiddenReason::NotAuthor)
        ));
        let edited = service
            .edit_reply(&author, reply.id, "second try")
            .await
            .unwrap();
        assert_eq!(edited.content, "second try");

        let err = service.delete_reply(&other, reply.id).await.unwrap_err();
        assert!(matches!(err, ForumServiceError::Forbidden(_)));
        service.delete_reply(&admin, reply.id).await.unwrap();

        let err = service.delete_reply(&admin, reply.id).await.unwrap_err();
        assert!(matches!(err, ForumServiceError::NotFound));
    }

    #[tokio::test]
    async fn missing_thread_is_not_found() {
        let service = service();
        let member = Identity::member(LearnerId::random(), None);
        let err = service
            .view_thread(&member, ForumId::new(12))
            .await
            .unwrap_err();
        assert!(matches!(err, ForumServiceError::NotFound));
        let err = service
            .post_reply(&member, ForumId::new(12), "hello", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ForumServiceError::NotFound));
    }

    #[tokio::test]
    async fn only_the_author_edits_a_thread() {
        let service = service();
        let author = Identity::member(LearnerId::random(), None);
        let other = Identity::member(LearnerId::random(), None);
        let admin = Identity::admin(LearnerId::random());
        let forum = service
            .create_thread(&author, "Generics", "Where clauses")
            .await
            .unwrap();

        for intruder in [&other, &admin] {
            let err = service
                .edit_thread(intruder, forum, Some("Mine now"), None)
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                ForumServiceError::Forbidden(ForbiddenReason::NotAuthor)
            ));
        }

        let err = service
            .edit_thread(&author, forum, None, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ForumServiceError::Forum(ForumError::NothingToUpdate)
        ));

        let edited = service
            .edit_thread(&author, forum, None, Some("Where clauses and bounds"))
            .await
            .unwrap();
        assert_eq!(edited.title(), "Generics");
        assert_eq!(edited.content(), "Where clauses and bounds");

        let err = service
            .edit_thread(&author, ForumId::new(99), Some("x"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ForumServiceError::NotFound));
    }

    #[tokio::test]
    async fn deleting_a_thread_takes_its_replies() {
        let service = service();
        let author = Identity::member(LearnerId::random(), None);
        let other = Identity::member(LearnerId::random(), None);
        let admin = Identity::admin(LearnerId::random());
        let doomed = service
            .create_thread(&author, "Macros", "macro_rules or proc?")
            .await
            .unwrap();
        let kept = service
            .create_thread(&other, "Closures", "FnMut vs FnOnce")
            .await
            .unwrap();
        let reply = service
            .post_reply(&other, doomed, "Start declarative", None)
            .await
            .unwrap();

        let err = service.delete_thread(&other, doomed).await.unwrap_err();
        assert!(matches!(
            err,
            ForumServiceError::Forbidden(ForbiddenReason::NotAuthor)
        ));

        service.delete_thread(&admin, doomed).await.unwrap();
        let err = service.view_thread(&author, doomed).await.unwrap_err();
        assert!(matches!(err, ForumServiceError::NotFound));
        let err = service
            .edit_reply(&other, reply.id, "still here?")
            .await
            .unwrap_err();
        assert!(matches!(err, ForumServiceError::NotFound));

        let remaining: Vec<ForumId> = service
            .list_threads(&author)
            .await
            .unwrap()
            .iter()
            .map(ForumThread::id)
            .collect();
        assert_eq!(remaining, vec![kept]);

        service.delete_thread(&other, kept).await.unwrap();
        let err = service.delete_thread(&other, kept).await.unwrap_err();
        assert!(matches!(err, ForumServiceError::NotFound));
    }
}
