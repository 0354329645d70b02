use thiserror::Error;

/// Errors produced by the backend client and surfaced to the screens.
///
/// Every variant is `Clone` so a result can be carried inside a `Message`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// 401/403 from any endpoint. The session is dropped and the user is sent to the login screen.
    #[error("session expired, please log in again")]
    AuthExpired,
    #[error("not found")]
    NotFound,
    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },
    #[error("network error: {0}")]
    Network(String),
    /// Client-side rejection. No request was made.
    #[error("{0}")]
    Validation(String),
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Text shown in the display region closest to the failed action.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::AuthExpired => "Session expired. Please log in again.".to_string(),
            ApiError::NotFound => "No data found.".to_string(),
            ApiError::Server { message, .. } => message.clone(),
            ApiError::Network(_) => "Could not reach the server. Reload to try again.".to_string(),
            ApiError::Validation(message) => message.clone(),
            ApiError::Decode(_) => "The server sent an unexpected response.".to_string(),
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::AuthExpired)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_error_shows_backend_prose() {
        let err = ApiError::Server { status: 500, message: "Database unavailable".into() };
        assert_eq!(err.user_message(), "Database unavailable");
        assert!(!err.is_auth());
    }

    #[test]
    fn not_found_is_a_no_data_state() {
        assert_eq!(ApiError::NotFound.user_message(), "No data found.");
    }
}
