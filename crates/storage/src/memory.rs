use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use academy_core::model::{
    CompletionRecord, Course, CourseId, Enrollment, ForumId, ForumReply, ForumThread, LearnerId,
    Lesson, LessonId, Progress, ReplyDraft, ReplyId, ThreadDraft,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::repository::{
    CatalogRepository, EnrollmentOverview, EnrollmentRepository, ForumRepository,
    ProgressLedger, ProgressUpdate, StorageError,
};

/// Catalog, enrollments and the completion ledger share one lock so a
/// completion is applied as a single critical section.
#[derive(Default)]
struct LearningState {
    courses: HashMap<CourseId, Course>,
    lessons: HashMap<LessonId, Lesson>,
    enrollments: HashMap<(LearnerId, CourseId), Enrollment>,
    completions: HashMap<(LearnerId, LessonId), CompletionRecord>,
}

impl LearningState {
    fn lesson_count(&self, course_id: CourseId) -> usize {
        self.lessons
            .values()
            .filter(|l| l.course_id() == course_id)
            .count()
    }

    fn completed_count(&self, learner_id: LearnerId, course_id: CourseId) -> usize {
        self.completions
            .keys()
            .filter(|(learner, lesson)| {
                *learner == learner_id
                    && self
                        .lessons
                        .get(lesson)
                        .is_some_and(|l| l.course_id() == course_id)
            })
            .count()
    }
}

#[derive(Default)]
struct ForumState {
    threads: BTreeMap<ForumId, ForumThread>,
    replies: BTreeMap<ReplyId, ForumReply>,
    next_thread_id: u64,
    next_reply_id: u64,
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    learning: Arc<Mutex<LearningState>>,
    forum: Arc<Mutex<ForumState>>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StorageError> {
    mutex
        .lock()
        .map_err(|e| StorageError::Connection(e.to_string()))
}

fn count_u32(field: &'static str, n: usize) -> Result<u32, StorageError> {
    u32::try_from(n).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogRepository for InMemoryRepository {
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        let mut guard = lock(&self.learning)?;
        guard.courses.insert(course.id(), course.clone());
        Ok(())
    }

    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        let guard = lock(&self.learning)?;
        Ok(guard.courses.get(&id).cloned())
    }

    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
        let mut guard = lock(&self.learning)?;
        if !guard.courses.contains_key(&lesson.course_id()) {
            return Err(StorageError::NotFound);
        }
        let position_taken = guard.lessons.values().any(|other| {
            other.id() != lesson.id()
                && other.course_id() == lesson.course_id()
                && other.position() == lesson.position()
        });
        if position_taken {
            return Err(StorageError::Conflict);
        }
        guard.lessons.insert(lesson.id(), lesson.clone());
        Ok(())
    }

    async fn get_lesson(&self, id: LessonId) -> Result<Option<Lesson>, StorageError> {
        let guard = lock(&self.learning)?;
        Ok(guard.lessons.get(&id).cloned())
    }

    async fn lessons_for_course(&self, course_id: CourseId) -> Result<Vec<Lesson>, StorageError> {
        let guard = lock(&self.learning)?;
        let mut lessons: Vec<Lesson> = guard
            .lessons
            .values()
            .filter(|l| l.course_id() == course_id)
            .cloned()
            .collect();
        lessons.sort_by_key(Lesson::position);
        Ok(lessons)
    }
}

#[async_trait]
impl EnrollmentRepository for InMemoryRepository {
    async fn insert_enrollment(&self, enrollment: &Enrollment) -> Result<(), StorageError> {
        let mut guard = lock(&self.learning)?;
        if !guard.courses.contains_key(&enrollment.course_id()) {
            return Err(StorageError::NotFound);
        }
        let key = (enrollment.learner_id(), enrollment.course_id());
        if guard.enrollments.contains_key(&key) {
            return Err(StorageError::Conflict);
        }
        guard.enrollments.insert(key, enrollment.clone());
        Ok(())
    }

    async fn get_enrollment(
        &self,
        learner_id: LearnerId,
        course_id: CourseId,
    ) -> Result<Option<Enrollment>, StorageError> {
        let guard = lock(&self.learning)?;
        Ok(guard.enrollments.get(&(learner_id, course_id)).cloned())
    }

    async fn enrollments_for_learner(
        &self,
        learner_id: LearnerId,
    ) -> Result<Vec<EnrollmentOverview>, StorageError> {
        let guard = lock(&self.learning)?;
        let mut out: Vec<EnrollmentOverview> = guard
            .enrollments
            .values()
            .filter(|e| e.learner_id() == learner_id)
            .filter_map(|e| {
                guard.courses.get(&e.course_id()).map(|c| EnrollmentOverview {
                    enrollment: e.clone(),
                    course_title: c.title().to_owned(),
                    course_category: c.category().map(str::to_owned),
                })
            })
            .collect();
        out.sort_by(|a, b| {
            b.enrollment
                .enrolled_at()
                .cmp(&a.enrollment.enrolled_at())
                .then(b.enrollment.course_id().cmp(&a.enrollment.course_id()))
        });
        Ok(out)
    }

    async fn completed_lessons(
        &self,
        learner_id: LearnerId,
        course_id: CourseId,
    ) -> Result<Vec<LessonId>, StorageError> {
        let guard = lock(&self.learning)?;
        let mut done: Vec<&Lesson> = guard
            .completions
            .keys()
            .filter(|(learner, _)| *learner == learner_id)
            .filter_map(|(_, lesson)| guard.lessons.get(lesson))
            .filter(|l| l.course_id() == course_id)
            .collect();
        done.sort_by_key(|l| l.position());
        Ok(done.into_iter().map(Lesson::id).collect())
    }
}

#[async_trait]
impl ProgressLedger for InMemoryRepository {
    async fn record_completion(
        &self,
        record: CompletionRecord,
    ) -> Result<ProgressUpdate, StorageError> {
        let mut guard = lock(&self.learning)?;

        let course_id = guard
            .lessons
            .get(&record.lesson_id)
            .map(Lesson::course_id)
            .ok_or(StorageError::NotFound)?;
        let enrollment_key = (record.learner_id, course_id);
        if !guard.enrollments.contains_key(&enrollment_key) {
            return Err(StorageError::NotEnrolled);
        }
        let ledger_key = (record.learner_id, record.lesson_id);
        if guard.completions.contains_key(&ledger_key) {
            return Err(StorageError::Conflict);
        }

        let total_lessons = count_u32("total_lessons", guard.lesson_count(course_id))?;
        let completed_lessons = count_u32(
            "completed_lessons",
            guard.completed_count(record.learner_id, course_id) + 1,
        )?;
        let progress = Progress::from_counts(completed_lessons, total_lessons);

        guard.completions.insert(ledger_key, record);
        if let Some(enrollment) = guard.enrollments.get_mut(&enrollment_key) {
            enrollment.set_progress(progress);
        }

        Ok(ProgressUpdate {
            learner_id: record.learner_id,
            course_id,
            lesson_id: record.lesson_id,
            completed_at: record.completed_at,
            completed_lessons,
            total_lessons,
            progress,
        })
    }
}

#[async_trait]
impl ForumRepository for InMemoryRepository {
    async fn insert_thread(
        &self,
        draft: ThreadDraft,
        created_at: DateTime<Utc>,
    ) -> Result<ForumThread, StorageError> {
        let mut guard = lock(&self.forum)?;
        guard.next_thread_id += 1;
        let thread = ForumThread::from_draft(ForumId::new(guard.next_thread_id), draft, created_at);
        guard.threads.insert(thread.id(), thread.clone());
        Ok(thread)
    }

    async fn get_thread(&self, id: ForumId) -> Result<Option<ForumThread>, StorageError> {
        let guard = lock(&self.forum)?;
        Ok(guard.threads.get(&id).cloned())
    }

    async fn list_threads(&self) -> Result<Vec<ForumThread>, StorageError> {
        let guard = lock(&self.forum)?;
        let mut threads: Vec<ForumThread> = guard.threads.values().cloned().collect();
        threads.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then(b.id().cmp(&a.id()))
        });
        Ok(threads)
    }

    async fn update_thread(&self, thread: &ForumThread) -> Result<(), StorageError> {
        let mut guard = lock(&self.forum)?;
        let stored = guard
            .threads
            .get_mut(&thread.id())
            .ok_or(StorageError::NotFound)?;
        *stored = thread.clone();
        Ok(())
    }

    async fn delete_thread(&self, id: ForumId) -> Result<(), StorageError> {
        let mut guard = lock(&self.forum)?;
        if guard.threads.remove(&id).is_none() {
            return Err(StorageError::NotFound);
        }
        guard.replies.retain(|_, reply| reply.forum_id != id);
        Ok(())
    }

    async fn insert_reply(
        &self,
        draft: ReplyDraft,
        created_at: DateTime<Utc>,
    ) -> Result<ForumReply, StorageError> {
        let mut guard = lock(&self.forum)?;
        if !guard.threads.contains_key(&draft.forum_id) {
            return Err(StorageError::NotFound);
        }
        guard.next_reply_id += 1;
        let reply = ForumReply::from_draft(ReplyId::new(guard.next_reply_id), draft, created_at);
        guard.replies.insert(reply.id, reply.clone());
        Ok(reply)
    }

    async fn get_reply(&self, id: ReplyId) -> Result<Option<ForumReply>, StorageError> {
        let guard = lock(&self.forum)?;
        Ok(guard.replies.get(&id).cloned())
    }

    async fn update_reply(&self, reply: &ForumReply) -> Result<(), StorageError> {
        let mut guard = lock(&self.forum)?;
        let stored = guard
            .replies
            .get_mut(&reply.id)
            .ok_or(StorageError::NotFound)?;
        stored.content.clone_from(&reply.content);
        stored.updated_at = reply.updated_at;
        Ok(())
    }

    async fn delete_reply(&self, id: ReplyId) -> Result<(), StorageError> {
        let mut guard = lock(&self.forum)?;
        guard
            .replies
            .remove(&id)
            .map(|_| ())
            .ok_or(StorageError::NotFound)
    }

    async fn replies_for_thread(&self, forum_id: ForumId) -> Result<Vec<ForumReply>, StorageError> {
        let guard = lock(&self.forum)?;
        let mut replies: Vec<ForumReply> = guard
            .replies
            .values()
            .filter(|r| r.forum_id == forum_id)
            .cloned()
            .collect();
        replies.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(replies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use academy_core::time::fixed_now;

    async fn seeded(lessons: u64) -> (InMemoryRepository, LearnerId) {
        let repo = InMemoryRepository::new();
        let now = fixed_now();
        let course = Course::new(CourseId::new(1), "Course", None, None, now).unwrap();
        repo.upsert_course(&course).await.unwrap();
        for i in 1..=lessons {
            let lesson = Lesson::new(
                LessonId::new(i),
                course.id(),
                format!("Lesson {i}"),
                None,
                None,
                u32::try_from(i).unwrap(),
                now,
            )
            .unwrap();
            repo.upsert_lesson(&lesson).await.unwrap();
        }
        let learner = LearnerId::random();
        repo.insert_enrollment(&Enrollment::new(learner, course.id(), now))
            .await
            .unwrap();
        (repo, learner)
    }

    #[tokio::test]
    async fn completion_recomputes_progress() {
        let (repo, learner) = seeded(3).await;
        let update = repo
            .record_completion(CompletionRecord::new(learner, LessonId::new(2), fixed_now()))
            .await
            .unwrap();
        assert_eq!(update.completed_lessons, 1);
        assert_eq!(update.total_lessons, 3);
        assert_eq!(update.progress.percentage(), 33);

        let enrollment = repo
            .get_enrollment(learner, CourseId::new(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(enrollment.progress(), update.progress);
    }

    #[tokio::test]
    async fn duplicate_completion_leaves_state_untouched() {
        let (repo, learner) = seeded(2).await;
        let record = CompletionRecord::new(learner, LessonId::new(1), fixed_now());
        repo.record_completion(record).await.unwrap();
        let err = repo.record_completion(record).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict));

        let done = repo
            .completed_lessons(learner, CourseId::new(1))
            .await
            .unwrap();
        assert_eq!(done, vec![LessonId::new(1)]);
    }

    #[tokio::test]
    async fn checks_run_in_order() {
        let (repo, _) = seeded(1).await;
        let stranger = LearnerId::random();

        let err = repo
            .record_completion(CompletionRecord::new(stranger, LessonId::new(9), fixed_now()))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound));

        let err = repo
            .record_completion(CompletionRecord::new(stranger, LessonId::new(1), fixed_now()))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotEnrolled));
    }

    #[tokio::test]
    async fn lesson_positions_are_unique_per_course() {
        let (repo, _) = seeded(2).await;
        let clash = Lesson::new(
            LessonId::new(10),
            CourseId::new(1),
            "Clash",
            None,
            None,
            2,
            fixed_now(),
        )
        .unwrap();
        let err = repo.upsert_lesson(&clash).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn replies_come_back_oldest_first() {
        let repo = InMemoryRepository::new();
        let author = LearnerId::random();
        let forum_id = repo
            .insert_thread(
                ThreadDraft::new(author, "Hello", "World").unwrap(),
                fixed_now(),
            )
            .await
            .unwrap()
            .id();

        let later = fixed_now() + chrono::Duration::minutes(1);
        let second = ReplyDraft::new(forum_id, author, "second", None).unwrap();
        let first = ReplyDraft::new(forum_id, author, "first", None).unwrap();
        repo.insert_reply(second, later).await.unwrap();
        repo.insert_reply(first, fixed_now()).await.unwrap();

        let replies = repo.replies_for_thread(forum_id).await.unwrap();
        let contents: Vec<&str> = replies.iter().map(|r| r.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second"]);

        let missing = ReplyDraft::new(ForumId::new(99), author, "x", None).unwrap();
        let err = repo.insert_reply(missing, fixed_now()).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn deleting_a_thread_drops_its_replies() {
        let repo = InMemoryRepository::new();
        let author = LearnerId::random();
        let doomed = repo
            .insert_thread(ThreadDraft::new(author, "Doomed", "x").unwrap(), fixed_now())
            .await
            .unwrap();
        let kept = repo
            .insert_thread(
                ThreadDraft::new(author, "Kept", "y").unwrap(),
                fixed_now() + chrono::Duration::seconds(1),
            )
            .await
            .unwrap();
        for forum in [doomed.id(), kept.id()] {
            let draft = ReplyDraft::new(forum, author, "reply", None).unwrap();
            repo.insert_reply(draft, fixed_now()).await.unwrap();
        }

        let listed: Vec<ForumId> = repo
            .list_threads()
            .await
            .unwrap()
            .iter()
            .map(ForumThread::id)
            .collect();
        assert_eq!(listed, vec![kept.id(), doomed.id()]);

        repo.delete_thread(doomed.id()).await.unwrap();
        assert!(repo.get_thread(doomed.id()).await.unwrap().is_none());
        assert!(repo.replies_for_thread(doomed.id()).await.unwrap().is_empty());
        assert_eq!(repo.replies_for_thread(kept.id()).await.unwrap().len(), 1);

        let err = repo.delete_thread(doomed.id()).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }
}
