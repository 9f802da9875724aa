#![forbid(unsafe_code)]

pub mod app_services;
pub mod enrollment_service;
pub mod error;
pub mod forum_service;
pub mod identity;
pub mod progress_service;

pub use academy_core::Clock;

pub use app_services::AppServices;
pub use enrollment_service::EnrollmentService;
pub use error::{
    AppServicesError, EnrollmentServiceError, ForbiddenReason, ForumServiceError, ProgressError,
};
pub use forum_service::{ForumService, ThreadView};
pub use identity::{Identity, Role};
pub use progress_service::ProgressService;
pub use storage::repository::{EnrollmentOverview, ProgressUpdate};
