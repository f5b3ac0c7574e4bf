use std::sync::Arc;

use learn_core::model::{Course, CourseId, Enrollment, ProgressPercent, UserId};
use storage::repository::EnrollmentRepository;
use tracing::{info, warn};

use crate::Clock;
use crate::course_progress_service::CourseProgressService;
use crate::error::EnrollmentServiceError;

/// Enrollment workflow: joining unlocked courses, recording progress, completing.
#[derive(Clone)]
pub struct EnrollmentService {
    clock: Clock,
    enrollments: Arc<dyn EnrollmentRepository>,
    progress: CourseProgressService,
}

impl EnrollmentService {
    #[must_use]
    pub fn new(clock: Clock, enrollments: Arc<dyn EnrollmentRepository>) -> Self {
        let progress = CourseProgressService::new(Arc::clone(&enrollments));
        Self {
            clock,
            enrollments,
            progress,
        }
    }

    /// Enroll `user` in `course_id`, which must be unlocked within `courses`.
    ///
    /// Returns the existing enrollment unchanged when the user already has one.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentServiceError::UnknownCourse` if the course is not in `courses`.
    /// Returns `EnrollmentServiceError::Locked` if its predecessor is not completed
    /// or its status cannot be derived.
    /// Returns `EnrollmentServiceError::Storage` if repository access fails
    /// after the status is known.
    pub async fn enroll(
        &self,
        user: UserId,
        courses: &[Course],
        course_id: &CourseId,
    ) -> Result<Enrollment, EnrollmentServiceError> {
        let status = match self.progress.status_of(user, courses, course_id).await {
            Ok(Some(status)) => status,
            Ok(None) => return Err(EnrollmentServiceError::UnknownCourse(course_id.clone())),
            Err(err) => {
                warn!(%user, %course_id, error = %err, "course status unavailable, treating as locked");
                return Err(EnrollmentServiceError::Locked(course_id.clone()));
            }
        };

        if let Some(existing) = self.enrollments.get_enrollment(user, course_id).await? {
            return Ok(existing);
        }
        if !status.is_unlocked {
            return Err(EnrollmentServiceError::Locked(course_id.clone()));
        }

        let enrollment = Enrollment::new(user, course_id.clone(), self.clock.now());
        self.enrollments.upsert_enrollment(&enrollment).await?;
        info!(%user, %course_id, "enrolled");
        Ok(enrollment)
    }

    /// Overwrite the user's progress percentage in a course.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentServiceError::NotEnrolled` without an enrollment.
    /// Returns `EnrollmentServiceError::Storage` if repository access fails.
    pub async fn record_progress(
        &self,
        user: UserId,
        course_id: &CourseId,
        progress: ProgressPercent,
    ) -> Result<Enrollment, EnrollmentServiceError> {
        let mut enrollment = self.require_enrollment(user, course_id).await?;
        enrollment.record_progress(progress);
        self.enrollments.upsert_enrollment(&enrollment).await?;
        Ok(enrollment)
    }

    /// Mark the course completed now. Completing twice keeps the first timestamp.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentServiceError::NotEnrolled` without an enrollment.
    /// Returns `EnrollmentServiceError::Enrollment` if the clock predates enrollment.
    /// Returns `EnrollmentServiceError::Storage` if repository access fails.
    pub async fn complete(
        &self,
        user: UserId,
        course_id: &CourseId,
    ) -> Result<Enrollment, EnrollmentServiceError> {
        let mut enrollment = self.require_enrollment(user, course_id).await?;
        let already_completed = enrollment.is_completed();
        enrollment.mark_completed(self.clock.now())?;
        self.enrollments.upsert_enrollment(&enrollment).await?;
        if !already_completed {
            info!(%user, %course_id, "course completed");
        }
        Ok(enrollment)
    }

    async fn require_enrollment(
        &self,
        user: UserId,
        course_id: &CourseId,
    ) -> Result<Enrollment, EnrollmentServiceError> {
        self.enrollments
            .get_enrollment(user, course_id)
            .await?
            .ok_or_else(|| EnrollmentServiceError::NotEnrolled(course_id.clone()))
    }
}
