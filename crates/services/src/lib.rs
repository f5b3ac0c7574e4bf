#![forbid(unsafe_code)]

pub mod app_services;
pub mod catalog_service;
pub mod course_progress_service;
pub mod enrollment_service;
pub mod error;

pub use learn_core::Clock;

pub use app_services::AppServices;
pub use catalog_service::CatalogService;
pub use course_progress_service::CourseProgressService;
pub use enrollment_service::EnrollmentService;
pub use error::{AppServicesError, CatalogServiceError, EnrollmentServiceError};
