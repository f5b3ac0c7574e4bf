use chrono::{DateTime, Utc};
use learn_core::model::{Course, CourseId, Enrollment, ProgressPercent, UserId};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use uuid::Uuid;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

pub(crate) fn position_from_i64(v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid position: {v}")))
}

pub(crate) fn course_id_from_str(raw: String) -> Result<CourseId, StorageError> {
    CourseId::new(raw).map_err(ser)
}

pub(crate) fn map_course_row(row: &SqliteRow) -> Result<Course, StorageError> {
    Course::new(
        course_id_from_str(row.try_get::<String, _>("id").map_err(ser)?)?,
        row.try_get::<String, _>("title").map_err(ser)?,
        position_from_i64(row.try_get::<i64, _>("position").map_err(ser)?)?,
    )
    .map_err(ser)
}

pub(crate) fn map_enrollment_row(row: &SqliteRow) -> Result<Enrollment, StorageError> {
    let user_id = UserId::new(row.try_get::<Uuid, _>("user_id").map_err(ser)?);
    let course_id = course_id_from_str(row.try_get::<String, _>("course_id").map_err(ser)?)?;
    let enrolled_at: DateTime<Utc> = row.try_get("enrolled_at").map_err(ser)?;
    let progress =
        ProgressPercent::new(row.try_get::<i64, _>("progress_percentage").map_err(ser)?)
            .map_err(ser)?;
    let completed_at: Option<DateTime<Utc>> = row.try_get("completed_at").map_err(ser)?;

    Enrollment::from_persisted(user_id, course_id, enrolled_at, progress, completed_at)
        .map_err(ser)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_position_is_rejected() {
        assert!(matches!(
            position_from_i64(-1),
            Err(StorageError::Serialization(_))
        ));
        assert_eq!(position_from_i64(7).unwrap(), 7);
    }

    #[test]
    fn blank_course_id_is_a_serialization_error() {
        assert!(matches!(
            course_id_from_str("  ".into()),
            Err(StorageError::Serialization(_))
        ));
    }
}
