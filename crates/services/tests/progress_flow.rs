use std::sync::Arc;

use academy_core::model::{Course, CourseId, LearnerId, Lesson, LessonId};
use academy_core::time::fixed_now;
use services::{AppServices, Clock, ForbiddenReason, Identity, ProgressError};
use storage::repository::{CatalogRepository, EnrollmentRepository, Storage};

async fn seed(catalog: &Arc<dyn CatalogRepository>, lessons: u64) -> CourseId {
    let course = Course::new(CourseId::new(1), "Course", None, None, fixed_now()).unwrap();
    catalog.upsert_course(&course).await.unwrap();
    for i in 1..=lessons {
        let lesson = Lesson::new(
            LessonId::new(i),
            course.id(),
            format!("Lesson {i}"),
            None,
            None,
            u32::try_from(i).unwrap(),
            fixed_now(),
        )
        .unwrap();
        catalog.upsert_lesson(&lesson).await.unwrap();
    }
    course.id()
}

async fn four_lesson_walkthrough(app: AppServices) {
    let course = seed(&app.catalog(), 4).await;
    let learner = Identity::member(LearnerId::random(), None);
    app.enrollments().enroll(&learner, course).await.unwrap();

    let progress = app.progress();
    let mut percentages = Vec::new();
    for lesson in 1..=4 {
        let update = progress
            .complete_lesson(&learner, LessonId::new(lesson))
            .await
            .unwrap();
        percentages.push((update.progress.percentage(), update.progress.is_complete()));
    }
    assert_eq!(
        percentages,
        vec![(25, false), (50, false), (75, false), (100, true)]
    );

    let err = progress
        .complete_lesson(&learner, LessonId::new(2))
        .await
        .unwrap_err();
    assert!(matches!(err, ProgressError::Conflict));
    assert_eq!(err.status_hint(), 409);

    let listed = app.enrollments().my_enrollments(&learner).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].enrollment.progress().percentage(), 100);
    assert!(listed[0].enrollment.progress().is_complete());
}

#[tokio::test]
async fn four_lesson_course_in_memory() {
    four_lesson_walkthrough(AppServices::in_memory(Clock::fixed(fixed_now()))).await;
}

#[tokio::test]
async fn four_lesson_course_on_sqlite() {
    let app = AppServices::new_sqlite(
        "sqlite:file:memdb_services_flow?mode=memory&cache=shared",
        Clock::fixed(fixed_now()),
    )
    .await
    .expect("sqlite services");
    four_lesson_walkthrough(app).await;
}

#[tokio::test]
async fn not_enrolled_is_forbidden_and_records_nothing() {
    let app = AppServices::in_memory(Clock::fixed(fixed_now()));
    let course = seed(&app.catalog(), 2).await;
    let outsider = Identity::member(LearnerId::random(), None);

    let err = app
        .progress()
        .complete_lesson(&outsider, LessonId::new(1))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ProgressError::Forbidden(ForbiddenReason::NotEnrolled)
    ));
    assert_eq!(err.status_hint(), 403);

    // Enrolling afterwards shows no stray completion was kept.
    app.enrollments().enroll(&outsider, course).await.unwrap();
    let done = app
        .progress()
        .completed_lessons(&outsider, course)
        .await
        .unwrap();
    assert!(done.is_empty());
}

#[tokio::test]
async fn unknown_lesson_is_not_found() {
    let app = AppServices::in_memory(Clock::fixed(fixed_now()));
    let course = seed(&app.catalog(), 1).await;
    let learner = Identity::member(LearnerId::random(), None);
    app.enrollments().enroll(&learner, course).await.unwrap();

    let err = app
        .progress()
        .complete_lesson(&learner, LessonId::new(404))
        .await
        .unwrap_err();
    assert!(matches!(err, ProgressError::NotFound));
}

#[tokio::test]
async fn course_without_other_lessons_reaches_full_progress() {
    let app = AppServices::in_memory(Clock::fixed(fixed_now()));
    let course = seed(&app.catalog(), 1).await;
    let learner = Identity::member(LearnerId::random(), None);
    app.enrollments().enroll(&learner, course).await.unwrap();

    let update = app
        .progress()
        .complete_lesson(&learner, LessonId::new(1))
        .await
        .unwrap();
    assert_eq!(update.progress.percentage(), 100);
    assert!(update.progress.is_complete());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_completions_do_not_lose_updates() {
    let storage = Storage::in_memory();
    let app = AppServices::from_storage(&storage, Clock::fixed(fixed_now()));
    let course = seed(&app.catalog(), 10).await;
    let learner = Identity::member(LearnerId::random(), None);
    app.enrollments().enroll(&learner, course).await.unwrap();

    let mut handles = Vec::new();
    for lesson in 1..=10 {
        let progress = app.progress();
        handles.push(tokio::spawn(async move {
            progress
                .complete_lesson(&learner, LessonId::new(lesson))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let enrollment = storage
        .enrollments
        .get_enrollment(learner.learner_id(), course)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(enrollment.progress().percentage(), 100);
}
