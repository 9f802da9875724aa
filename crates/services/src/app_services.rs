use std::sync::Arc;

use storage::repository::{CatalogRepository, Storage};

use crate::Clock;
use crate::enrollment_service::EnrollmentService;
use crate::error::AppServicesError;
use crate::forum_service::ForumService;
use crate::progress_service::ProgressService;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    catalog: Arc<dyn CatalogRepository>,
    progress: Arc<ProgressService>,
    enrollments: Arc<EnrollmentService>,
    forum: Arc<ForumService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage, running migrations first.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock))
    }

    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::from_storage(&Storage::in_memory(), clock)
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock) -> Self {
        let progress = Arc::new(ProgressService::new(
            clock,
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.enrollments),
            Arc::clone(&storage.ledger),
        ));
        let enrollments = Arc::new(EnrollmentService::new(
            clock,
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.enrollments),
        ));
        let forum = Arc::new(ForumService::new(clock, Arc::clone(&storage.forum)));

        Self {
            catalog: Arc::clone(&storage.catalog),
            progress,
            enrollments,
            forum,
        }
    }

    /// Course authoring sits outside the services; seeding writes through this.
    #[must_use]
    pub fn catalog(&self) -> Arc<dyn CatalogRepository> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn enrollments(&self) -> Arc<EnrollmentService> {
        Arc::clone(&self.enrollments)
    }

    #[must_use]
    pub fn forum(&self) -> Arc<ForumService> {
        Arc::clone(&self.forum)
    }
}
