//! Command-line and environment configuration for the `academy` binary.

use academy_core::model::{CourseId, ForumId, LearnerId, LessonId, ReplyId};
use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Args as ClapArgs, Parser, Subcommand};
use services::Identity;

/// Academy - course progress and discussion threads
#[derive(Parser, Debug, Clone)]
#[command(name = "academy")]
#[command(about = "Track lesson progress and browse course discussions")]
pub struct Args {
    /// SQLite database (path or sqlite:// URL)
    #[arg(long = "db", env = "ACADEMY_DB_URL", default_value = "sqlite://dev.sqlite3")]
    pub db_url: String,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, env = "ACADEMY_LOG", default_value = "info")]
    pub log_level: String,

    #[command(flatten)]
    pub caller: CallerArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Who is acting. Credentials are verified before this binary is reached.
#[derive(ClapArgs, Debug, Clone)]
pub struct CallerArgs {
    #[arg(long = "learner", env = "ACADEMY_LEARNER_ID", global = true)]
    pub learner_id: Option<LearnerId>,

    /// Membership end (RFC 3339); omit for a lifetime membership
    #[arg(long, env = "ACADEMY_MEMBER_UNTIL", global = true)]
    pub member_until: Option<DateTime<Utc>>,

    #[arg(long, env = "ACADEMY_ADMIN", global = true, default_value_t = false)]
    pub admin: bool,
}

impl CallerArgs {
    pub fn identity(&self) -> anyhow::Result<Identity> {
        let learner = self
            .learner_id
            .context("--learner (or ACADEMY_LEARNER_ID) is required for this command")?;
        Ok(if self.admin {
            Identity::admin(learner)
        } else {
            Identity::member(learner, self.member_until)
        })
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create a demo course with lessons and a welcome thread
    Seed {
        #[arg(long, default_value_t = CourseId::new(1))]
        course: CourseId,
        #[arg(long, default_value = "Rust from scratch")]
        title: String,
        #[arg(long, default_value_t = 4)]
        lessons: u32,
    },
    /// Enroll the caller in a course
    Enroll { course: CourseId },
    /// Mark a lesson complete
    Complete { lesson: LessonId },
    /// Show completed lessons of a course
    Progress { course: CourseId },
    /// List the caller's enrollments
    Enrollments,
    /// Start a discussion thread
    NewThread { title: String, content: String },
    /// List threads, newest first
    Threads,
    /// Change the title and/or content of one of the caller's threads
    EditThread {
        forum: ForumId,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
    },
    /// Remove a thread and all of its replies (author or admin)
    DeleteThread { forum: ForumId },
    /// Print a thread with its nested replies
    Thread { forum: ForumId },
    /// Reply to a thread, optionally under another reply
    Reply {
        forum: ForumId,
        content: String,
        #[arg(long)]
        parent: Option<ReplyId>,
    },
    /// Replace the content of one of the caller's replies
    EditReply { reply: ReplyId, content: String },
    /// Remove a reply (author or admin)
    DeleteReply { reply: ReplyId },
}

/// Turn a bare path or `sqlite:` URL into an absolute `sqlite://` URL.
pub fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed == "sqlite::memory:" || trimmed.starts_with("sqlite://") {
        return trimmed.to_owned();
    }

    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = std::path::Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// Make sure the database file and its directory exist before connecting.
pub fn prepare_sqlite_file(db_url: &str) -> anyhow::Result<()> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .with_context(|| format!("invalid --db value: {db_url}"))?;
    let path = path.split('?').next().unwrap_or(path);
    anyhow::ensure!(!path.is_empty(), "invalid --db value: {db_url}");

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("creating {}", path.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_are_left_alone_or_made_absolute() {
        assert_eq!(normalize_sqlite_url("sqlite::memory:"), "sqlite::memory:");
        assert_eq!(
            normalize_sqlite_url("sqlite:///tmp/a.sqlite3"),
            "sqlite:///tmp/a.sqlite3"
        );
        assert_eq!(
            normalize_sqlite_url("sqlite:/tmp/b.sqlite3"),
            "sqlite:///tmp/b.sqlite3"
        );
        assert!(normalize_sqlite_url("dev.sqlite3").starts_with("sqlite:///"));
    }

    #[test]
    fn caller_flags_build_identity() {
        let args = Args::try_parse_from([
            "academy",
            "--learner",
            "6f1c9a8e-6a3e-4c39-9d2c-0f6e2a9f4b11",
            "complete",
            "3",
        ])
        .unwrap();
        let identity = args.caller.identity().unwrap();
        assert!(!identity.is_admin());
        assert!(identity.membership_expires_at().is_none());
        assert!(matches!(args.command, Command::Complete { lesson } if lesson == LessonId::new(3)));
    }

    #[test]
    fn missing_learner_is_reported() {
        let args = Args::try_parse_from(["academy", "enrollments"]).unwrap();
        assert!(args.caller.identity().is_err());
    }

    #[test]
    fn edit_thread_takes_optional_fields() {
        let args =
            Args::try_parse_from(["academy", "edit-thread", "4", "--title", "Renamed"]).unwrap();
        match args.command {
            Command::EditThread {
                forum,
                title,
                content,
            } => {
                assert_eq!(forum, ForumId::new(4));
                assert_eq!(title.as_deref(), Some("Renamed"));
                assert!(content.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
