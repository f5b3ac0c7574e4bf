use async_trait::async_trait;
use learn_core::model::{Course, CourseId, Enrollment, UserId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Repository contract for the course catalog.
#[async_trait]
pub trait CourseRepository: Send + Sync {
    /// Persist or update a course.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the course cannot be stored.
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError>;

    /// Fetch a course by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures. A missing course is `Ok(None)`.
    async fn get_course(&self, id: &CourseId) -> Result<Option<Course>, StorageError>;

    /// List the catalog ordered by position, ties broken by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_courses(&self) -> Result<Vec<Course>, StorageError>;
}

/// Repository contract for user enrollments.
#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    /// Fetch the enrollment of `user` in `course`, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures. No enrollment is `Ok(None)`.
    async fn get_enrollment(
        &self,
        user: UserId,
        course: &CourseId,
    ) -> Result<Option<Enrollment>, StorageError>;

    /// Fetch every enrollment of `user`, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_enrollments(&self, user: UserId) -> Result<Vec<Enrollment>, StorageError>;

    /// Persist or update an enrollment keyed by (user, course).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the enrollment cannot be stored.
    async fn upsert_enrollment(&self, enrollment: &Enrollment) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    courses: Arc<Mutex<HashMap<CourseId, Course>>>,
    enrollments: Arc<Mutex<HashMap<(UserId, CourseId), Enrollment>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CourseRepository for InMemoryRepository {
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        let mut guard = self
            .courses
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(course.id().clone(), course.clone());
        Ok(())
    }

    async fn get_course(&self, id: &CourseId) -> Result<Option<Course>, StorageError> {
        let guard = self
            .courses
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(id).cloned())
    }

    async fn list_courses(&self) -> Result<Vec<Course>, StorageError> {
        let guard = self
            .courses
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut courses: Vec<Course> = guard.values().cloned().collect();
        courses.sort_by(|a, b| {
            a.position()
                .cmp(&b.position())
                .then_with(|| a.id().cmp(b.id()))
        });
        Ok(courses)
    }
}

#[async_trait]
impl EnrollmentRepository for InMemoryRepository {
    async fn get_enrollment(
        &self,
        user: UserId,
        course: &CourseId,
    ) -> Result<Option<Enrollment>, StorageError> {
        let guard = self
            .enrollments
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&(user, course.clone())).cloned())
    }

    async fn list_enrollments(&self, user: UserId) -> Result<Vec<Enrollment>, StorageError> {
        let guard = self
            .enrollments
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .values()
            .filter(|e| e.user_id() == user)
            .cloned()
            .collect())
    }

    async fn upsert_enrollment(&self, enrollment: &Enrollment) -> Result<(), StorageError> {
        let mut guard = self
            .enrollments
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(
            (enrollment.user_id(), enrollment.course_id().clone()),
            enrollment.clone(),
        );
        Ok(())
    }
}

/// Aggregates repository implementations behind trait objects for easy swapping.
#[derive(Clone)]
pub struct Storage {
    pub courses: Arc<dyn CourseRepository>,
    pub enrollments: Arc<dyn EnrollmentRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_repository(InMemoryRepository::new())
    }

    /// Wires one adapter that serves both catalog and enrollments.
    #[must_use]
    pub fn from_repository<R>(repo: R) -> Self
    where
        R: CourseRepository + EnrollmentRepository + Clone + 'static,
    {
        let courses: Arc<dyn CourseRepository> = Arc::new(repo.clone());
        let enrollments: Arc<dyn EnrollmentRepository> = Arc::new(repo);
        Self {
            courses,
            enrollments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use learn_core::model::ProgressPercent;
    use learn_core::time::fixed_now;

    fn course(id: &str, position: u32) -> Course {
        Course::new(CourseId::new(id).unwrap(), format!("Course {id}"), position).unwrap()
    }

    #[tokio::test]
    async fn lists_courses_by_position() {
        let repo = InMemoryRepository::new();
        repo.upsert_course(&course("b", 1)).await.unwrap();
        repo.upsert_course(&course("c", 0)).await.unwrap();
        repo.upsert_course(&course("a", 1)).await.unwrap();

        let ids: Vec<String> = repo
            .list_courses()
            .await
            .unwrap()
            .iter()
            .map(|c| c.id().to_string())
            .collect();
        assert_eq!(ids, ["c", "a", "b"]);
    }

    #[tokio::test]
    async fn enrollments_are_scoped_per_user() {
        let repo = InMemoryRepository::new();
        let alice = UserId::random();
        let bob = UserId::random();
        let c1 = CourseId::new("c1").unwrap();

        let mut enrollment = Enrollment::new(alice, c1.clone(), fixed_now());
        enrollment.record_progress(ProgressPercent::new(30).unwrap());
        repo.upsert_enrollment(&enrollment).await.unwrap();

        let fetched = repo.get_enrollment(alice, &c1).await.unwrap().unwrap();
        assert_eq!(fetched.progress().value(), 30);
        assert!(repo.get_enrollment(bob, &c1).await.unwrap().is_none());
        assert_eq!(repo.list_enrollments(alice).await.unwrap().len(), 1);
        assert!(repo.list_enrollments(bob).await.unwrap().is_empty());
    }
}
