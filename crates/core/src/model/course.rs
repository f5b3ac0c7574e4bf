use thiserror::Error;

use crate::model::ids::CourseId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CourseError {
    #[error("course title cannot be empty")]
    EmptyTitle,
}

/// Validated course title (trimmed, non-empty).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CourseTitle(String);

impl CourseTitle {
    /// Create a validated title.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::EmptyTitle` if the title is empty after trimming.
    pub fn new(value: impl Into<String>) -> Result<Self, CourseError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CourseError::EmptyTitle);
        }
        Ok(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CourseTitle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A course in the catalog.
///
/// `position` orders the catalog when it is listed from storage. Once a
/// sequence has been handed to the deriver, slice order is what decides which
/// course gates which.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    id: CourseId,
    title: CourseTitle,
    position: u32,
}

impl Course {
    /// Creates a course from raw parts.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::EmptyTitle` when the title is blank.
    pub fn new(id: CourseId, title: impl Into<String>, position: u32) -> Result<Self, CourseError> {
        Ok(Self {
            id,
            title: CourseTitle::new(title)?,
            position,
        })
    }

    #[must_use]
    pub fn id(&self) -> &CourseId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &CourseTitle {
        &self.title
    }

    #[must_use]
    pub fn position(&self) -> u32 {
        self.position
    }
}
