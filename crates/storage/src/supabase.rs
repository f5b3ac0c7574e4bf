//! Supabase (PostgREST) adapter.
//!
//! Tables mirror the SQLite schema: `courses(id, title, position)` and
//! `enrollments(user_id, course_id, enrolled_at, progress_percentage, completed_at)`.

use std::env;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use learn_core::model::{Course, CourseId, Enrollment, ProgressPercent, UserId};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::repository::{CourseRepository, EnrollmentRepository, Storage, StorageError};

const COURSE_COLUMNS: &str = "id,title,position";
const ENROLLMENT_COLUMNS: &str = "user_id,course_id,enrolled_at,progress_percentage,completed_at";

#[derive(Clone, Debug)]
pub struct SupabaseConfig {
    pub base_url: String,
    pub api_key: String,
}

impl SupabaseConfig {
    /// Reads `LEARN_SUPABASE_URL` and `LEARN_SUPABASE_KEY`; `None` unless both are set.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        Self::from_values(
            env::var("LEARN_SUPABASE_URL").ok(),
            env::var("LEARN_SUPABASE_KEY").ok(),
        )
    }

    /// `None` unless both values are present and non-blank.
    #[must_use]
    pub fn from_values(base_url: Option<String>, api_key: Option<String>) -> Option<Self> {
        let (base_url, api_key) = (base_url?, api_key?);
        if base_url.trim().is_empty() || api_key.trim().is_empty() {
            return None;
        }
        Some(Self { base_url, api_key })
    }
}

#[derive(Clone)]
pub struct SupabaseRepository {
    client: Client,
    config: SupabaseConfig,
}

impl SupabaseRepository {
    #[must_use]
    pub fn new(config: SupabaseConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn endpoint(&self, table: &str) -> String {
        format!(
            "{}/rest/v1/{table}",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.config.api_key)
    }

    fn fetch_request(&self, table: &str, query: &[(&str, String)]) -> RequestBuilder {
        self.authorized(self.client.get(self.endpoint(table)))
            .query(query)
    }

    fn upsert_request<T: Serialize>(&self, table: &str, on_conflict: &str, row: &T) -> RequestBuilder {
        self.authorized(self.client.post(self.endpoint(table)))
            .query(&[("on_conflict", on_conflict)])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&[row])
    }

    async fn fetch_rows<T>(&self, table: &str, query: &[(&str, String)]) -> Result<Vec<T>, StorageError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let response = self
            .fetch_request(table, query)
            .send()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let response = check_status(response)?;
        response
            .json::<Vec<T>>()
            .await
            .map_err(|e| StorageError::Serialization(e.to_string()))
    }

    async fn upsert_row<T: Serialize + Sync>(
        &self,
        table: &str,
        on_conflict: &str,
        row: &T,
    ) -> Result<(), StorageError> {
        let response = self
            .upsert_request(table, on_conflict, row)
            .send()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        check_status(response)?;
        Ok(())
    }
}

fn ser<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Maps a PostgREST response status to a storage error; `None` on success.
fn status_error(status: StatusCode) -> Option<StorageError> {
    match status {
        status if status.is_success() => None,
        StatusCode::NOT_FOUND => Some(StorageError::NotFound),
        StatusCode::CONFLICT => Some(StorageError::Conflict),
        status => Some(StorageError::Connection(format!(
            "supabase returned status {status}"
        ))),
    }
}

fn check_status(response: Response) -> Result<Response, StorageError> {
    match status_error(response.status()) {
        None => Ok(response),
        Some(err) => {
            tracing::debug!(status = %response.status(), url = %response.url(), "supabase request rejected");
            Err(err)
        }
    }
}

fn enrollment_filter(user: UserId, course: Option<&CourseId>) -> Vec<(&'static str, String)> {
    let mut query = vec![
        ("select", ENROLLMENT_COLUMNS.to_string()),
        ("user_id", format!("eq.{user}")),
    ];
    if let Some(course) = course {
        query.push(("course_id", format!("eq.{course}")));
        query.push(("limit", "1".to_string()));
    }
    query
}

#[derive(Debug, Serialize, Deserialize)]
struct CourseRow {
    id: String,
    title: String,
    position: i64,
}

impl CourseRow {
    fn from_course(course: &Course) -> Self {
        Self {
            id: course.id().to_string(),
            title: course.title().to_string(),
            position: i64::from(course.position()),
        }
    }

    fn into_course(self) -> Result<Course, StorageError> {
        let position = u32::try_from(self.position)
            .map_err(|_| StorageError::Serialization(format!("invalid position: {}", self.position)))?;
        let id = CourseId::new(self.id).map_err(ser)?;
        Course::new(id, self.title, position).map_err(ser)
    }
}

/// Ids and progress are validated while the payload is decoded.
#[derive(Debug, Serialize, Deserialize)]
struct EnrollmentRow {
    user_id: UserId,
    course_id: CourseId,
    enrolled_at: DateTime<Utc>,
    progress_percentage: ProgressPercent,
    completed_at: Option<DateTime<Utc>>,
}

impl EnrollmentRow {
    fn from_enrollment(enrollment: &Enrollment) -> Self {
        Self {
            user_id: enrollment.user_id(),
            course_id: enrollment.course_id().clone(),
            enrolled_at: enrollment.enrolled_at(),
            progress_percentage: enrollment.progress(),
            completed_at: enrollment.completed_at(),
        }
    }

    fn into_enrollment(self) -> Result<Enrollment, StorageError> {
        Enrollment::from_persisted(
            self.user_id,
            self.course_id,
            self.enrolled_at,
            self.progress_percentage,
            self.completed_at,
        )
        .map_err(ser)
    }
}

#[async_trait]
impl CourseRepository for SupabaseRepository {
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        self.upsert_row("courses", "id", &CourseRow::from_course(course))
            .await
    }

    async fn get_course(&self, id: &CourseId) -> Result<Option<Course>, StorageError> {
        let rows: Vec<CourseRow> = self
            .fetch_rows(
                "courses",
                &[
                    ("select", COURSE_COLUMNS.to_string()),
                    ("id", format!("eq.{id}")),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        rows.into_iter().next().map(CourseRow::into_course).transpose()
    }

    async fn list_courses(&self) -> Result<Vec<Course>, StorageError> {
        let rows: Vec<CourseRow> = self
            .fetch_rows(
                "courses",
                &[
                    ("select", COURSE_COLUMNS.to_string()),
                    ("order", "position.asc,id.asc".to_string()),
                ],
            )
            .await?;
        rows.into_iter().map(CourseRow::into_course).collect()
    }
}

#[async_trait]
impl EnrollmentRepository for SupabaseRepository {
    async fn get_enrollment(
        &self,
        user: UserId,
        course: &CourseId,
    ) -> Result<Option<Enrollment>, StorageError> {
        let rows: Vec<EnrollmentRow> = self
            .fetch_rows("enrollments", &enrollment_filter(user, Some(course)))
            .await?;
        rows.into_iter()
            .next()
            .map(EnrollmentRow::into_enrollment)
            .transpose()
    }

    async fn list_enrollments(&self, user: UserId) -> Result<Vec<Enrollment>, StorageError> {
        let rows: Vec<EnrollmentRow> = self
            .fetch_rows("enrollments", &enrollment_filter(user, None))
            .await?;
        rows.into_iter().map(EnrollmentRow::into_enrollment).collect()
    }

    async fn upsert_enrollment(&self, enrollment: &Enrollment) -> Result<(), StorageError> {
        self.upsert_row(
            "enrollments",
            "user_id,course_id",
            &EnrollmentRow::from_enrollment(enrollment),
        )
        .await
    }
}

impl Storage {
    /// Build a `Storage` backed by a Supabase project's REST endpoint.
    #[must_use]
    pub fn supabase(config: SupabaseConfig) -> Self {
        Self::from_repository(SupabaseRepository::new(config))
    }
}
