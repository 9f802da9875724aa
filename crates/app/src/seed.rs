use academy_core::model::{Course, CourseId, LearnerId, Lesson, LessonId};
use chrono::{DateTime, Utc};
use services::{AppServices, AppServicesError, Identity};
use storage::repository::CatalogRepository;

#[derive(Debug, Clone)]
pub struct SeedPlan {
    pub course_id: CourseId,
    pub title: String,
    pub lessons: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct SeedReport {
    pub course_id: CourseId,
    pub lessons: u32,
    pub author: LearnerId,
}

/// Upsert a course with `plan.lessons` lessons and open a welcome thread.
///
/// Lesson ids are derived from the course id so reseeding overwrites the same
/// rows instead of adding new ones.
pub async fn seed_demo(
    app: &AppServices,
    plan: &SeedPlan,
    now: DateTime<Utc>,
) -> Result<SeedReport, AppServicesError> {
    let catalog = app.catalog();
    let course = Course::new(
        plan.course_id,
        plan.title.as_str(),
        Some("Seeded demo course".to_owned()),
        Some("demo".to_owned()),
        now,
    )?;
    catalog.upsert_course(&course).await?;

    let base = plan.course_id.value() * 1_000;
    for position in 1..=plan.lessons {
        let lesson = Lesson::new(
            LessonId::new(base + u64::from(position)),
            course.id(),
            format!("Lesson {position}"),
            Some(format!("Notes for lesson {position}")),
            None,
            position,
            now,
        )?;
        catalog.upsert_lesson(&lesson).await?;
    }

    let author = LearnerId::random();
    app.forum()
        .create_thread(
            &Identity::admin(author),
            &format!("Welcome to {}", course.title()),
            "Introduce yourself and ask anything about the course.",
        )
        .await?;

    tracing::info!(course = %course.id(), lessons = plan.lessons, "seeded demo course");
    Ok(SeedReport {
        course_id: course.id(),
        lessons: plan.lessons,
        author,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use academy_core::time::fixed_now;
    use services::Clock;

    #[tokio::test]
    async fn reseeding_keeps_one_set_of_lessons() {
        let app = AppServices::in_memory(Clock::fixed(fixed_now()));
        let plan = SeedPlan {
            course_id: CourseId::new(2),
            title: "Async".into(),
            lessons: 3,
        };
        seed_demo(&app, &plan, fixed_now()).await.unwrap();
        seed_demo(&app, &plan, fixed_now()).await.unwrap();

        let lessons = app.catalog().lessons_for_course(plan.course_id).await.unwrap();
        let ids: Vec<u64> = lessons.iter().map(|l| l.id().value()).collect();
        assert_eq!(ids, vec![2_001, 2_002, 2_003]);
    }
}
