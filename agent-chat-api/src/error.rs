use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use openrouter_sdk::ChatError;
use shared_types::ErrorResponse;
use thiserror::Error;

use crate::storage::StorageError;

/// Error surfaced by an HTTP handler
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error("Internal error: {0}")]
    Storage(#[from] StorageError),

    /// Validation failures, already joined for display
    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    NotFound(String),
}

impl ApiError {
    pub fn validation(errors: Vec<String>) -> Self {
        ApiError::InvalidRequest(errors.join(", "))
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        let code = match self {
            ApiError::Chat(e) => e.status_code(),
            ApiError::Storage(_) => 500,
            ApiError::InvalidRequest(_) => 400,
            ApiError::NotFound(_) => 404,
        };
        StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_GATEWAY)
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        }
        HttpResponse::build(status).json(ErrorResponse::new(status.as_u16(), self.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::from(ChatError::invalid_input("x")), 400),
            (ApiError::from(ChatError::not_found("x")), 404),
            (ApiError::from(ChatError::upstream_rejected("x", 429)), 429),
            (ApiError::from(ChatError::malformed("x")), 500),
            (ApiError::from(ChatError::transport("x")), 502),
            (ApiError::from(ChatError::internal("x")), 500),
            (ApiError::from(StorageError::Other("x".to_string())), 500),
            (ApiError::validation(vec!["a".to_string(), "b".to_string()]), 400),
        ];
        for (err, expected) in cases {
            assert_eq!(err.status_code().as_u16(), expected, "{}", err);
        }
    }

    #[test]
    fn test_validation_messages_joined() {
        let err = ApiError::validation(vec![
            "Name is required".to_string(),
            "Model selection is required".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "Name is required, Model selection is required"
        );
    }

    #[test]
    fn test_out_of_range_upstream_status_falls_back() {
        let err = ApiError::from(ChatError::upstream_rejected("weird", 42));
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }
}
