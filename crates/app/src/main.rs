use anyhow::Context;
use clap::Parser;
use services::{AppServices, Clock};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod render;
mod seed;

use config::{Args, Command, normalize_sqlite_url, prepare_sqlite_file};
use seed::{SeedPlan, seed_demo};

async fn run(args: Args) -> anyhow::Result<()> {
    let db_url = normalize_sqlite_url(&args.db_url);
    prepare_sqlite_file(&db_url)?;
    let clock = Clock::default();
    let app = AppServices::new_sqlite(&db_url, clock)
        .await
        .with_context(|| format!("opening {db_url}"))?;

    match args.command {
        Command::Seed {
            course,
            title,
            lessons,
        } => {
            let plan = SeedPlan {
                course_id: course,
                title,
                lessons,
            };
            let report = seed_demo(&app, &plan, clock.now()).await?;
            println!(
                "seeded course {} with {} lessons (thread author {})",
                report.course_id, report.lessons, report.author
            );
        }
        Command::Enroll { course } => {
            let identity = args.caller.identity()?;
            let enrollment = app.enrollments().enroll(&identity, course).await?;
            println!(
                "enrolled in course {} at {}",
                enrollment.course_id(),
                enrollment.enrolled_at()
            );
        }
        Command::Complete { lesson } => {
            let identity = args.caller.identity()?;
            let update = app.progress().complete_lesson(&identity, lesson).await?;
            let status = if update.progress.is_complete() {
                "completed"
            } else {
                "in progress"
            };
            println!(
                "course {}: {}/{} lessons, {}% ({status})",
                update.course_id,
                update.completed_lessons,
                update.total_lessons,
                update.progress.percentage()
            );
        }
        Command::Progress { course } => {
            let identity = args.caller.identity()?;
            let done = app.progress().completed_lessons(&identity, course).await?;
            let ids: Vec<String> = done.iter().map(ToString::to_string).collect();
            println!("completed lessons in course {course}: [{}]", ids.join(", "));
        }
        Command::Enrollments => {
            let identity = args.caller.identity()?;
            for item in app.enrollments().my_enrollments(&identity).await? {
                println!(
                    "{:>4}  {:>3}%  {}",
                    item.enrollment.course_id(),
                    item.enrollment.progress().percentage(),
                    item.course_title
                );
            }
        }
        Command::NewThread { title, content } => {
            let identity = args.caller.identity()?;
            let id = app.forum().create_thread(&identity, &title, &content).await?;
            println!("created thread {id}");
        }
        Command::Threads => {
            let identity = args.caller.identity()?;
            for thread in app.forum().list_threads(&identity).await? {
                println!(
                    "{:>4}  {}  {}",
                    thread.id(),
                    thread.created_at().format("%Y-%m-%d %H:%M"),
                    thread.title()
                );
            }
        }
        Command::EditThread {
            forum,
            title,
            content,
        } => {
            let identity = args.caller.identity()?;
            app.forum()
                .edit_thread(&identity, forum, title.as_deref(), content.as_deref())
                .await?;
            println!("updated thread {forum}");
        }
        Command::DeleteThread { forum } => {
            let identity = args.caller.identity()?;
            app.forum().delete_thread(&identity, forum).await?;
            println!("deleted thread {forum} and its replies");
        }
        Command::Thread { forum } => {
            let identity = args.caller.identity()?;
            let view = app.forum().view_thread(&identity, forum).await?;
            print!("{}", render::thread_to_text(&view));
        }
        Command::Reply {
            forum,
            content,
            parent,
        } => {
            let identity = args.caller.identity()?;
            let reply = app
                .forum()
                .post_reply(&identity, forum, &content, parent)
                .await?;
            println!("posted reply {}", reply.id);
        }
        Command::EditReply { reply, content } => {
            let identity = args.caller.identity()?;
            app.forum().edit_reply(&identity, reply, &content).await?;
            println!("updated reply {reply}");
        }
        Command::DeleteReply { reply } => {
            let identity = args.caller.identity()?;
            app.forum().delete_reply(&identity, reply).await?;
            println!("deleted reply {reply}");
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    run(args).await
}
