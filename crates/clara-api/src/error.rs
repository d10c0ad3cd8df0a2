//! Error types for clara-api

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

/// clara-api error type
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Authentication failed")]
    AuthFailed,

    #[error(transparent)]
    Core(#[from] clara_core::Error),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::AuthFailed => StatusCode::UNAUTHORIZED,
            Self::Core(clara_core::Error::ConversationNotFound(_)) => StatusCode::NOT_FOUND,
            Self::Core(clara_core::Error::ModelNotAvailable(_)) => StatusCode::BAD_REQUEST,
            Self::Core(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        let body = Json(serde_json::json!({
            "status": "error",
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::BadRequest("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::AuthFailed.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::from(clara_core::Error::ConversationNotFound(7)).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(clara_core::Error::ModelNotAvailable("m".into())).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(clara_core::Error::Other("boom".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_model_not_available_message() {
        let err = ApiError::from(clara_core::Error::ModelNotAvailable("llama3".into()));
        assert_eq!(err.to_string(), "Model llama3 not available");
    }
}
