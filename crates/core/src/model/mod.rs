mod course;
mod enrollment;
mod ids;
mod status;

pub use ids::{CourseId, IdError, UserId};

pub use course::{Course, CourseError, CourseTitle};
pub use enrollment::{Enrollment, EnrollmentError, ProgressPercent};
pub use status::{CourseStatus, CourseStatusMap, ProgressOverview};
