use std::sync::Arc;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use crate::config::{ConfigSource, SessionConfig};
use crate::error::ApiError;
use crate::models::{
    ActivationRequest, Batch, BulkMarks, Course, Credentials, Enrollment, Envelope, FeeStructure,
    Feedback, FeedbackUpdate, Id, LoginResponse, MessageResponse, MonthlyAttendanceQuery,
    AttendanceRow, Schedule, Student, StudentUpdate, Subject,
};
use crate::storage::{LocalStore, TOKEN_KEY};

pub const DEFAULT_API_BASE: &str = "http://localhost:5000";

/// Thin wrapper over `reqwest` that knows the ERP backend's conventions:
/// bearer auth taken from the local store, JSON bodies and the
/// 401/403 forced-logout rule.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Arc<str>,
    store: Arc<LocalStore>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, store: Arc<LocalStore>) -> Self {
        let base_url: String = base_url.into();
        Self {
            http: reqwest::Client::new(),
            base_url: Arc::from(base_url.trim_end_matches('/')),
            store,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut builder = self
            .http
            .request(method, self.url(path))
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json");
        // Read on every call so a fresh login is picked up without rebuilding the client.
        if let Some(token) = self.store.get(TOKEN_KEY) {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        builder
    }

    /// Sends a request and maps non-success statuses to [`ApiError`].
    ///
    /// On 401/403 the stored token is dropped and `AuthExpired` is returned
    /// without reading the body, so callers never act on that response.
    pub async fn call<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Response, ApiError> {
        debug!(%method, path, "api request");
        let mut builder = self.request(method, path);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        self.send(builder).await
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        self.send_with(builder, AuthFailure::EndSession).await
    }

    async fn send_with(&self, builder: RequestBuilder, on_auth: AuthFailure) -> Result<Response, ApiError> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if is_auth_failure(status) {
            if on_auth == AuthFailure::EndSession {
                warn!(status = status.as_u16(), "authorization rejected, clearing session token");
                self.store.remove(TOKEN_KEY);
            } else {
                debug!(status = status.as_u16(), "authorization rejected for optional resource");
            }
            return Err(ApiError::AuthExpired);
        }
        let body = response.text().await.unwrap_or_default();
        Err(error_for_status(status, &body))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.call::<()>(Method::GET, path, None).await?;
        let envelope: Envelope<T> = response.json().await?;
        Ok(envelope.into_inner())
    }

    async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.call(method, path, Some(body)).await?;
        let envelope: Envelope<T> = response.json().await?;
        Ok(envelope.into_inner())
    }

    async fn send_unit<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<(), ApiError> {
        self.call(method, path, body).await?;
        Ok(())
    }

    // Students

    pub async fn list_students(&self) -> Result<Vec<Student>, ApiError> {
        self.get_json("/api/students").await
    }

    pub async fn get_student(&self, id: &Id) -> Result<Student, ApiError> {
        self.get_json(&format!("/api/students/{}", id)).await
    }

    pub async fn update_student(&self, id: &Id, update: &StudentUpdate) -> Result<(), ApiError> {
        self.send_unit(Method::PUT, &format!("/api/students/{}", id), Some(update)).await
    }

    pub async fn delete_student(&self, id: &Id) -> Result<(), ApiError> {
        self.send_unit::<()>(Method::DELETE, &format!("/api/students/{}", id), None).await
    }

    // Academics and fees

    pub async fn courses(&self) -> Result<Vec<Course>, ApiError> {
        self.get_json("/api/academicswithfees/courses").await
    }

    pub async fn batches(&self, course_id: &Id) -> Result<Vec<Batch>, ApiError> {
        self.get_json(&format!("/api/academicswithfees/courses/{}/batches", course_id)).await
    }

    pub async fn subjects(&self, course_id: &Id) -> Result<Vec<Subject>, ApiError> {
        self.get_json(&format!("/api/academicswithfees/courses/{}/subjects", course_id)).await
    }

    pub async fn find_fee_structures(
        &self,
        course_id: &Id,
        batch_id: &Id,
    ) -> Result<Vec<FeeStructure>, ApiError> {
        let builder = self
            .request(Method::GET, "/api/academicswithfees/fees/structures/find")
            .query(&[("course_id", course_id.as_str()), ("batch_id", batch_id.as_str())]);
        let response = self.send(builder).await?;
        let envelope: Envelope<Vec<FeeStructure>> = response.json().await?;
        Ok(envelope.into_inner())
    }

    pub async fn fee_structure(&self, id: &Id) -> Result<FeeStructure, ApiError> {
        self.get_json(&format!("/api/academicswithfees/fees/structures/{}", id)).await
    }

    // Feedback

    pub async fn all_feedback(&self) -> Result<Vec<Feedback>, ApiError> {
        self.get_json("/api/feedback/all").await
    }

    pub async fn update_feedback(&self, id: &Id, update: &FeedbackUpdate) -> Result<(), ApiError> {
        self.send_unit(Method::PUT, &format!("/api/feedback/update/{}", id), Some(update)).await
    }

    pub async fn delete_feedback(&self, id: &Id) -> Result<(), ApiError> {
        self.send_unit::<()>(Method::DELETE, &format!("/api/feedback/delete/{}", id), None).await
    }

    // Attendance

    pub async fn monthly_attendance(
        &self,
        query: &MonthlyAttendanceQuery,
    ) -> Result<Vec<AttendanceRow>, ApiError> {
        let builder = self
            .request(Method::GET, "/api/attendance/report/monthly")
            .query(query);
        let response = self.send(builder).await?;
        let envelope: Envelope<Vec<AttendanceRow>> = response.json().await?;
        Ok(envelope.into_inner())
    }

    // Auth

    pub async fn staff_login(&self, credentials: &Credentials) -> Result<LoginResponse, ApiError> {
        self.send_json(Method::POST, "/api/auth/login", credentials).await
    }

    pub async fn user_login(&self, credentials: &Credentials) -> Result<LoginResponse, ApiError> {
        self.send_json(Method::POST, "/api/users/login", credentials).await
    }

    pub async fn activate_student(&self, request: &ActivationRequest) -> Result<String, ApiError> {
        let response: MessageResponse =
            self.send_json(Method::POST, "/api/auth/activate-student", request).await?;
        Ok(response.message.unwrap_or_else(|| "Account activated.".to_string()))
    }

    // Mark entry

    pub async fn my_assigned_schedules(&self) -> Result<Vec<Schedule>, ApiError> {
        self.get_json("/api/mark-entry/my-assigned-schedules").await
    }

    pub async fn enrollments(&self, schedule_id: &Id) -> Result<Vec<Enrollment>, ApiError> {
        self.get_json(&format!("/api/mark-entry/enrollments/{}", schedule_id)).await
    }

    pub async fn bulk_save_marks(&self, schedule_id: &Id, marks: &BulkMarks) -> Result<(), ApiError> {
        self.send_unit(Method::POST, &format!("/api/mark-entry/bulk-save/{}", schedule_id), Some(marks))
            .await
    }

    // Settings

    /// Some roles may not read settings, so a refusal here leaves the token in place.
    pub async fn current_config(&self) -> Result<SessionConfig, ApiError> {
        let builder = self.request(Method::GET, "/api/settings/config/current");
        let response = self.send_with(builder, AuthFailure::KeepSession).await?;
        let envelope: Envelope<SessionConfig> = response.json().await?;
        Ok(envelope.into_inner())
    }

    /// Downloads an asset such as the institute logo. Relative paths are resolved against the API base.
    ///
    /// Assets may live on another host, so a rejected download never touches the session token.
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        let full = if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            self.url(url)
        };
        let response = self.http.get(full).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Server {
                status: status.as_u16(),
                message: format!("asset {} unavailable", url),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}

impl ConfigSource for ApiClient {
    async fn fetch_config(&self) -> Result<SessionConfig, ApiError> {
        self.current_config().await
    }
}

/// What a 401/403 does to the stored token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthFailure {
    EndSession,
    KeepSession,
}

pub fn is_auth_failure(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Maps a non-success, non-auth status to an error, keeping the server's prose when present.
pub fn error_for_status(status: StatusCode, body: &str) -> ApiError {
    if status == StatusCode::NOT_FOUND {
        return ApiError::NotFound;
    }
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message.or(b.error))
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        });
    ApiError::Server { status: status.as_u16(), message }
}
