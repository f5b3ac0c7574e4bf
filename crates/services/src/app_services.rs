use std::sync::Arc;

use storage::repository::Storage;
use storage::supabase::SupabaseConfig;

use crate::Clock;
use crate::catalog_service::CatalogService;
use crate::course_progress_service::CourseProgressService;
use crate::enrollment_service::EnrollmentService;
use crate::error::AppServicesError;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    catalog: Arc<CatalogService>,
    progress: Arc<CourseProgressService>,
    enrollments: Arc<EnrollmentService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock))
    }

    /// Build services backed by a Supabase project.
    #[must_use]
    pub fn new_supabase(config: SupabaseConfig, clock: Clock) -> Self {
        Self::from_storage(&Storage::supabase(config), clock)
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock) -> Self {
        Self {
            catalog: Arc::new(CatalogService::new(Arc::clone(&storage.courses))),
            progress: Arc::new(CourseProgressService::new(Arc::clone(&storage.enrollments))),
            enrollments: Arc::new(EnrollmentService::new(
                clock,
                Arc::clone(&storage.enrollments),
            )),
        }
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<CatalogService> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<CourseProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn enrollments(&self) -> Arc<EnrollmentService> {
        Arc::clone(&self.enrollments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use learn_core::model::UserId;
    use learn_core::time::fixed_now;

    #[tokio::test]
    async fn services_share_one_backend() {
        let services = AppServices::from_storage(&Storage::in_memory(), Clock::fixed(fixed_now()));
        let course = services.catalog().add_course("c1", "Intro", 0).await.unwrap();
        let courses = services.catalog().list_courses().await.unwrap();

        let user = UserId::random();
        services
            .enrollments()
            .enroll(user, &courses, course.id())
            .await
            .unwrap();
        services.enrollments().complete(user, course.id()).await.unwrap();

        let statuses = services.progress().derive(Some(user), &courses).await;
        assert!(statuses.status_or_locked(course.id()).is_completed);
    }
}
