use std::collections::HashMap;

use crate::model::{Course, CourseId, ProgressPercent};

/// Derived, per-render view of one course for one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseStatus {
    pub course_id: CourseId,
    pub is_unlocked: bool,
    pub is_completed: bool,
    pub progress: ProgressPercent,
}

impl CourseStatus {
    /// The conservative reading for a course whose status could not be derived.
    #[must_use]
    pub fn locked(course_id: CourseId) -> Self {
        Self {
            course_id,
            is_unlocked: false,
            is_completed: false,
            progress: ProgressPercent::ZERO,
        }
    }
}

/// Result of a derivation, keyed by course id.
///
/// Entries may be missing when a lookup failed; such courses read as locked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CourseStatusMap {
    entries: HashMap<CourseId, CourseStatus>,
}

impl CourseStatusMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a status, replacing any previous entry for the same course.
    pub fn insert(&mut self, status: CourseStatus) {
        self.entries.insert(status.course_id.clone(), status);
    }

    #[must_use]
    pub fn get(&self, id: &CourseId) -> Option<&CourseStatus> {
        self.entries.get(id)
    }

    #[must_use]
    pub fn status_or_locked(&self, id: &CourseId) -> CourseStatus {
        self.entries
            .get(id)
            .cloned()
            .unwrap_or_else(|| CourseStatus::locked(id.clone()))
    }

    #[must_use]
    pub fn is_unlocked(&self, id: &CourseId) -> bool {
        self.entries.get(id).is_some_and(|s| s.is_unlocked)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<CourseStatus> for CourseStatusMap {
    fn from_iter<T: IntoIterator<Item = CourseStatus>>(iter: T) -> Self {
        let mut map = Self::new();
        for status in iter {
            map.insert(status);
        }
        map
    }
}

/// Dashboard-level summary of a user's progress through a course sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressOverview {
    pub total: usize,
    pub completed: usize,
    /// Mean of per-course progress, rounded down. Unknown courses count as 0.
    pub overall: ProgressPercent,
    /// First unlocked course that is not yet completed.
    pub next_course: Option<CourseId>,
}

impl ProgressOverview {
    #[must_use]
    pub fn from_statuses(courses: &[Course], statuses: &CourseStatusMap) -> Self {
        let mut completed = 0_usize;
        let mut sum = 0_u64;
        let mut next_course = None;

        for course in courses {
            let status = statuses.status_or_locked(course.id());
            if status.is_completed {
                completed += 1;
            }
            sum += u64::from(status.progress.value());
            if next_course.is_none() && status.is_unlocked && !status.is_completed {
                next_course = Some(course.id().clone());
            }
        }

        let overall = if courses.is_empty() {
            ProgressPercent::ZERO
        } else {
            let len = u64::try_from(courses.len()).unwrap_or(u64::MAX);
            ProgressPercent::clamped(sum / len)
        };

        Self {
            total: courses.len(),
            completed,
            overall,
            next_course,
        }
    }
}
