use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{CourseId, UserId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EnrollmentError {
    #[error("progress must be between 0 and 100, got {0}")]
    ProgressOutOfRange(i64),

    #[error("completed_at is before enrolled_at")]
    InvalidTimeRange,
}

//
// ─── PROGRESS ──────────────────────────────────────────────────────────────────
//

/// Completion percentage of a course, always within `0..=100`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct ProgressPercent(u8);

impl ProgressPercent {
    pub const ZERO: Self = Self(0);
    pub const COMPLETE: Self = Self(100);

    /// Validates a raw percentage.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentError::ProgressOutOfRange` outside `0..=100`.
    pub fn new(value: i64) -> Result<Self, EnrollmentError> {
        match u8::try_from(value) {
            Ok(v) if v <= 100 => Ok(Self(v)),
            _ => Err(EnrollmentError::ProgressOutOfRange(value)),
        }
    }

    /// Caps `value` at 100.
    #[must_use]
    pub fn clamped(value: u64) -> Self {
        Self(u8::try_from(value.min(100)).unwrap_or(100))
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for ProgressPercent {
    type Error = EnrollmentError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ProgressPercent> for i64 {
    fn from(p: ProgressPercent) -> Self {
        i64::from(p.0)
    }
}

impl std::fmt::Display for ProgressPercent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0)
    }
}

//
// ─── ENROLLMENT ────────────────────────────────────────────────────────────────
//

/// A user's enrollment in one course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrollment {
    user_id: UserId,
    course_id: CourseId,
    enrolled_at: DateTime<Utc>,
    progress: ProgressPercent,
    completed_at: Option<DateTime<Utc>>,
}

impl Enrollment {
    /// Starts a fresh enrollment at 0% progress.
    #[must_use]
    pub fn new(user_id: UserId, course_id: CourseId, enrolled_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            course_id,
            enrolled_at,
            progress: ProgressPercent::ZERO,
            completed_at: None,
        }
    }

    /// Rehydrate an enrollment from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentError::InvalidTimeRange` if the completion predates enrollment.
    pub fn from_persisted(
        user_id: UserId,
        course_id: CourseId,
        enrolled_at: DateTime<Utc>,
        progress: ProgressPercent,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<Self, EnrollmentError> {
        if completed_at.is_some_and(|done| done < enrolled_at) {
            return Err(EnrollmentError::InvalidTimeRange);
        }
        Ok(Self {
            user_id,
            course_id,
            enrolled_at,
            progress,
            completed_at,
        })
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn course_id(&self) -> &CourseId {
        &self.course_id
    }

    #[must_use]
    pub fn enrolled_at(&self) -> DateTime<Utc> {
        self.enrolled_at
    }

    #[must_use]
    pub fn progress(&self) -> ProgressPercent {
        self.progress
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Completion is the presence of a timestamp, not 100% progress.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Overwrites the stored percentage. Completion state is untouched.
    pub fn record_progress(&mut self, progress: ProgressPercent) {
        self.progress = progress;
    }

    /// Marks the course completed. The first completion timestamp wins.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentError::InvalidTimeRange` if `at` predates enrollment.
    pub fn mark_completed(&mut self, at: DateTime<Utc>) -> Result<(), EnrollmentError> {
        if at < self.enrolled_at {
            return Err(EnrollmentError::InvalidTimeRange);
        }
        if self.completed_at.is_none() {
            self.completed_at = Some(at);
        }
        self.progress = ProgressPercent::COMPLETE;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn enrollment() -> Enrollment {
        Enrollment::new(UserId::random(), CourseId::new("c1").unwrap(), fixed_now())
    }

    #[test]
    fn progress_bounds() {
        assert_eq!(ProgressPercent::new(0).unwrap().value(), 0);
        assert_eq!(ProgressPercent::new(100).unwrap().value(), 100);
        assert_eq!(
            ProgressPercent::new(101),
            Err(EnrollmentError::ProgressOutOfRange(101))
        );
        assert_eq!(
            ProgressPercent::new(-1),
            Err(EnrollmentError::ProgressOutOfRange(-1))
        );
    }

    #[test]
    fn recording_progress_does_not_complete() {
        let mut e = enrollment();
        e.record_progress(ProgressPercent::COMPLETE);
        assert!(!e.is_completed());
        assert_eq!(e.progress().value(), 100);
    }

    #[test]
    fn first_completion_is_kept() {
        let mut e = enrollment();
        let first = fixed_now() + Duration::days(1);
        e.mark_completed(first).unwrap();
        e.mark_completed(first + Duration::days(3)).unwrap();
        assert_eq!(e.completed_at(), Some(first));
        assert_eq!(e.progress(), ProgressPercent::COMPLETE);
    }

    #[test]
    fn completion_before_enrollment_is_rejected() {
        let mut e = enrollment();
        let err = e.mark_completed(fixed_now() - Duration::seconds(1)).unwrap_err();
        assert_eq!(err, EnrollmentError::InvalidTimeRange);

        let persisted = Enrollment::from_persisted(
            UserId::random(),
            CourseId::new("c1").unwrap(),
            fixed_now(),
            ProgressPercent::ZERO,
            Some(fixed_now() - Duration::days(1)),
        );
        assert_eq!(persisted, Err(EnrollmentError::InvalidTimeRange));
    }
}
