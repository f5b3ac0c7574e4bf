use std::sync::Arc;

use learn_core::model::{Course, CourseId};
use storage::repository::CourseRepository;

use crate::error::CatalogServiceError;

/// Read/write access to the course catalog.
#[derive(Clone)]
pub struct CatalogService {
    courses: Arc<dyn CourseRepository>,
}

impl CatalogService {
    #[must_use]
    pub fn new(courses: Arc<dyn CourseRepository>) -> Self {
        Self { courses }
    }

    /// The catalog in sequence order.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` if repository access fails.
    pub async fn list_courses(&self) -> Result<Vec<Course>, CatalogServiceError> {
        Ok(self.courses.list_courses().await?)
    }

    /// Fetch a course by raw id. Returns `Ok(None)` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Id` for a blank id.
    /// Returns `CatalogServiceError::Storage` if repository access fails.
    pub async fn get_course(&self, raw_id: &str) -> Result<Option<Course>, CatalogServiceError> {
        let id = CourseId::new(raw_id)?;
        Ok(self.courses.get_course(&id).await?)
    }

    /// Create or replace a course.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Id` or `CatalogServiceError::Course` on invalid input.
    /// Returns `CatalogServiceError::Storage` if persistence fails.
    pub async fn add_course(
        &self,
        raw_id: &str,
        title: &str,
        position: u32,
    ) -> Result<Course, CatalogServiceError> {
        let course = Course::new(CourseId::new(raw_id)?, title, position)?;
        self.courses.upsert_course(&course).await?;
        Ok(course)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::repository::InMemoryRepository;

    #[tokio::test]
    async fn added_courses_are_listed_in_order() {
        let service = CatalogService::new(Arc::new(InMemoryRepository::new()));
        service.add_course("async", "Async Rust", 1).await.unwrap();
        service.add_course("basics", "Rust Basics", 0).await.unwrap();

        let titles: Vec<String> = service
            .list_courses()
            .await
            .unwrap()
            .iter()
            .map(|c| c.title().to_string())
            .collect();
        assert_eq!(titles, ["Rust Basics", "Async Rust"]);
        assert!(service.get_course("basics").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn invalid_input_is_rejected_before_storage() {
        let service = CatalogService::new(Arc::new(InMemoryRepository::new()));
        assert!(matches!(
            service.add_course(" ", "Title", 0).await,
            Err(CatalogServiceError::Id(_))
        ));
        assert!(matches!(
            service.add_course("c1", "", 0).await,
            Err(CatalogServiceError::Course(_))
        ));
        assert!(service.list_courses().await.unwrap().is_empty());
    }
}
