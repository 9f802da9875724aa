use academy_core::model::{ForumId, ForumReply, ForumThread, ReplyDraft, ReplyId, ThreadDraft};
use chrono::{DateTime, Utc};

use super::SqliteRepository;
use super::mapping::{db_err, id_to_i64, map_reply_row, map_thread_row};
use crate::repository::{ForumRepository, StorageError};

fn forum_id_from_i64(v: i64) -> Result<ForumId, StorageError> {
    u64::try_from(v)
        .map(ForumId::new)
        .map_err(|_| StorageError::Serialization("forum_id sign overflow".into()))
}

fn reply_id_from_i64(v: i64) -> Result<ReplyId, StorageError> {
    u64::try_from(v)
        .map(ReplyId::new)
        .map_err(|_| StorageError::Serialization("reply_id sign overflow".into()))
}

#[async_trait::async_trait]
impl ForumRepository for SqliteRepository {
    async fn insert_thread(
        &self,
        draft: ThreadDraft,
        created_at: DateTime<Utc>,
    ) -> Result<ForumThread, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO forums (author_id, title, content, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?4)
            ",
        )
        .bind(draft.author_id.to_string())
        .bind(draft.title.as_str())
        .bind(draft.content.as_str())
        .bind(created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        let id = forum_id_from_i64(res.last_insert_rowid())?;
        Ok(ForumThread::from_draft(id, draft, created_at))
    }

    async fn get_thread(&self, id: ForumId) -> Result<Option<ForumThread>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, author_id, title, content, created_at, updated_at
            FROM forums
            WHERE id = ?1
            ",
        )
        .bind(id_to_i64("forum_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(map_thread_row).transpose()
    }

    async fn list_threads(&self) -> Result<Vec<ForumThread>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, author_id, title, content, created_at, updated_at
            FROM forums
            ORDER BY created_at DESC, id DESC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(map_thread_row).collect()
    }

    async fn update_thread(&self, thread: &ForumThread) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
            UPDATE forums
            SET title = ?2, content = ?3, updated_at = ?4
            WHERE id = ?1
            ",
        )
        .bind(id_to_i64("forum_id", thread.id().value())?)
        .bind(thread.title())
        .bind(thread.content())
        .bind(thread.updated_at())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    // Replies go with the thread through the forum_id ON DELETE CASCADE.
    async fn delete_thread(&self, id: ForumId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM forums WHERE id = ?1")
            .bind(id_to_i64("forum_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn insert_reply(
        &self,
        draft: ReplyDraft,
        created_at: DateTime<Utc>,
    ) -> Result<ForumReply, StorageError> {
        let parent = draft
            .parent_reply_id
            .map(|id| id_to_i64("parent_reply_id", id.value()))
            .transpose()?;

        // A missing thread trips the forum_id foreign key, mapped to NotFound.
        let res = sqlx::query(
            r"
            INSERT INTO forum_replies (forum_id, author_id, content, parent_reply_id, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            ",
        )
        .bind(id_to_i64("forum_id", draft.forum_id.value())?)
        .bind(draft.author_id.to_string())
        .bind(draft.content.as_str())
        .bind(parent)
        .bind(created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        let id = reply_id_from_i64(res.last_insert_rowid())?;
        Ok(ForumReply::from_draft(id, draft, created_at))
    }

    async fn get_reply(&self, id: ReplyId) -> Result<Option<ForumReply>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, forum_id, author_id, content, parent_reply_id, created_at, updated_at
            FROM forum_replies
            WHERE id = ?1
            ",
        )
        .bind(id_to_i64("reply_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(map_reply_row).transpose()
    }

    async fn update_reply(&self, reply: &ForumReply) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
            UPDATE forum_replies
            SET content = ?2, updated_at = ?3
            WHERE id = ?1
            ",
        )
        .bind(id_to_i64("reply_id", reply.id.value())?)
        .bind(reply.content.as_str())
        .bind(reply.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn delete_reply(&self, id: ReplyId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM forum_replies WHERE id = ?1")
            .bind(id_to_i64("reply_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn replies_for_thread(&self, forum_id: ForumId) -> Result<Vec<ForumReply>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, forum_id, author_id, content, parent_reply_id, created_at, updated_at
            FROM forum_replies
            WHERE forum_id = ?1
            ORDER BY created_at ASC, id ASC
            ",
        )
        .bind(id_to_i64("forum_id", forum_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(map_reply_row).collect()
    }
}
