use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Schema versions, applied in order. Each runs in its own transaction.
const MIGRATIONS: &[(i64, &[&str])] = &[
    (
        1,
        &[
            r"
            CREATE TABLE IF NOT EXISTS courses (
                id INTEGER PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT,
                category TEXT,
                created_at TEXT NOT NULL
            );
            ",
            r"
            CREATE TABLE IF NOT EXISTS lessons (
                id INTEGER PRIMARY KEY,
                course_id INTEGER NOT NULL,
                title TEXT NOT NULL,
                content TEXT,
                video_url TEXT,
                position INTEGER NOT NULL CHECK (position >= 1),
                created_at TEXT NOT NULL,
                UNIQUE (course_id, position),
                FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE
            );
            ",
            r"
            CREATE TABLE IF NOT EXISTS enrollments (
                id INTEGER PRIMARY KEY,
                learner_id TEXT NOT NULL,
                course_id INTEGER NOT NULL,
                enrolled_at TEXT NOT NULL,
                progress_percentage INTEGER NOT NULL DEFAULT 0
                    CHECK (progress_percentage BETWEEN 0 AND 100),
                completion_status INTEGER NOT NULL DEFAULT 0
                    CHECK (completion_status = (progress_percentage = 100)),
                UNIQUE (learner_id, course_id),
                FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE
            );
            ",
            r"
            CREATE TABLE IF NOT EXISTS lesson_completions (
                id INTEGER PRIMARY KEY,
                learner_id TEXT NOT NULL,
                lesson_id INTEGER NOT NULL,
                completed_at TEXT NOT NULL,
                UNIQUE (learner_id, lesson_id),
                FOREIGN KEY (lesson_id) REFERENCES lessons(id) ON DELETE CASCADE
            );
            ",
            r"
            CREATE INDEX IF NOT EXISTS idx_enrollments_learner_enrolled
                ON enrollments (learner_id, enrolled_at);
            ",
        ],
    ),
    (
        2,
        &[
            r"
            CREATE TABLE IF NOT EXISTS forums (
                id INTEGER PRIMARY KEY,
                author_id TEXT NOT NULL,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            ",
            // No foreign key on parent_reply_id: children of a deleted reply
            // keep the stale id.
            r"
            CREATE TABLE IF NOT EXISTS forum_replies (
                id INTEGER PRIMARY KEY,
                forum_id INTEGER NOT NULL,
                author_id TEXT NOT NULL,
                content TEXT NOT NULL,
                parent_reply_id INTEGER,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (forum_id) REFERENCES forums(id) ON DELETE CASCADE
            );
            ",
            r"
            CREATE INDEX IF NOT EXISTS idx_forum_replies_forum_created
                ON forum_replies (forum_id, created_at, id);
            ",
        ],
    ),
    (
        3,
        &[
            "ALTER TABLE forums ADD COLUMN updated_at TEXT;",
            "UPDATE forums SET updated_at = created_at WHERE updated_at IS NULL;",
            r"
            CREATE INDEX IF NOT EXISTS idx_forums_created
                ON forums (created_at, id);
            ",
        ],
    ),
];

/// Brings the schema up to the latest version.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    for (version, statements) in MIGRATIONS {
        if is_applied(pool, *version).await? {
            continue;
        }

        let mut tx = pool.begin().await?;
        for statement in *statements {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(*version)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!(version = *version, "applied schema migration");
    }

    Ok(())
}
