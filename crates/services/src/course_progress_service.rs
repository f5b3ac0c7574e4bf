use std::collections::HashSet;
use std::sync::Arc;

use learn_core::model::{Course, CourseId, CourseStatus, CourseStatusMap, ProgressOverview, UserId};
use learn_core::unlock;
use storage::repository::{EnrollmentRepository, StorageError};
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Derives per-course unlock, completion and progress state for a user.
///
/// Every call is a fresh read-only snapshot; callers replace whatever they
/// derived before and drop results whose inputs have since changed.
#[derive(Clone)]
pub struct CourseProgressService {
    enrollments: Arc<dyn EnrollmentRepository>,
}

impl CourseProgressService {
    #[must_use]
    pub fn new(enrollments: Arc<dyn EnrollmentRepository>) -> Self {
        Self { enrollments }
    }

    /// Derive statuses for `courses`, in slice order, with one concurrent
    /// lookup task per course.
    ///
    /// Without a user nothing is fetched and the map is empty. A course whose
    /// lookups fail is logged and left out of the map, where it reads as locked.
    /// A course id repeated in `courses` is derived once, at its first index.
    pub async fn derive(&self, user: Option<UserId>, courses: &[Course]) -> CourseStatusMap {
        let Some(user) = user else {
            debug!("no user, skipping course status derivation");
            return CourseStatusMap::new();
        };

        let mut seen = HashSet::new();
        let mut tasks = JoinSet::new();
        for (index, course) in courses.iter().enumerate() {
            if !seen.insert(course.id()) {
                debug!(course_id = %course.id(), index, "skipping repeated course");
                continue;
            }
            let enrollments = Arc::clone(&self.enrollments);
            let course_id = course.id().clone();
            let previous_id = previous_course(courses, index).cloned();

            tasks.spawn(async move {
                let result =
                    lookup_status(enrollments.as_ref(), user, &course_id, index, previous_id.as_ref())
                        .await;
                (course_id, result)
            });
        }

        let mut statuses = CourseStatusMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(status))) => statuses.insert(status),
                Ok((course_id, Err(err))) => {
                    warn!(%user, %course_id, error = %err, "course status lookup failed");
                }
                Err(err) => warn!(%user, error = %err, "course status task did not finish"),
            }
        }

        debug!(%user, derived = statuses.len(), requested = courses.len(), "derived course statuses");
        statuses
    }

    /// Same result as [`derive`](Self::derive), computed from a single
    /// "all enrollments of this user" query.
    ///
    /// If that query fails every course is unknown, so the map is empty.
    pub async fn derive_batched(&self, user: Option<UserId>, courses: &[Course]) -> CourseStatusMap {
        let Some(user) = user else {
            return CourseStatusMap::new();
        };

        match self.enrollments.list_enrollments(user).await {
            Ok(enrollments) => unlock::scan(courses, &enrollments),
            Err(err) => {
                warn!(%user, error = %err, "enrollment listing failed");
                CourseStatusMap::new()
            }
        }
    }

    /// Status of a single course in the sequence.
    ///
    /// Unlike [`derive`](Self::derive), lookup failures are returned to the
    /// caller. `Ok(None)` means the course is not part of `courses`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if either enrollment lookup fails.
    pub async fn status_of(
        &self,
        user: UserId,
        courses: &[Course],
        course_id: &CourseId,
    ) -> Result<Option<CourseStatus>, StorageError> {
        let Some(index) = courses.iter().position(|c| c.id() == course_id) else {
            return Ok(None);
        };
        let previous_id = previous_course(courses, index);
        lookup_status(self.enrollments.as_ref(), user, course_id, index, previous_id)
            .await
            .map(Some)
    }

    /// Derive and summarize progress over the whole sequence.
    pub async fn overview(&self, user: Option<UserId>, courses: &[Course]) -> ProgressOverview {
        let statuses = self.derive(user, courses).await;
        ProgressOverview::from_statuses(courses, &statuses)
    }
}

fn previous_course(courses: &[Course], index: usize) -> Option<&CourseId> {
    index
        .checked_sub(1)
        .and_then(|prev| courses.get(prev))
        .map(Course::id)
}

/// Fetches the course's own enrollment and, past the first course, the
/// previous course's enrollment concurrently, then applies the unlock rule.
async fn lookup_status(
    enrollments: &dyn EnrollmentRepository,
    user: UserId,
    course_id: &CourseId,
    index: usize,
    previous_id: Option<&CourseId>,
) -> Result<CourseStatus, StorageError> {
    let own = enrollments.get_enrollment(user, course_id);
    let previous = async {
        match previous_id {
            Some(id) => enrollments.get_enrollment(user, id).await,
            None => Ok(None),
        }
    };

    let (own, previous) = tokio::join!(own, previous);
    Ok(unlock::status_for(
        course_id.clone(),
        index,
        own?.as_ref(),
        previous?.as_ref(),
    ))
}
