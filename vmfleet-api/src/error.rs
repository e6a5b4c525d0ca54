///! API error responses
///!
///! Errors are rendered as plain-text bodies with the matching status code

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::debug;

/// API error types
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// 404 Not Found
    #[error("{0}")]
    NotFound(String),

    /// 400 Bad Request
    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        debug!(status = status.as_u16(), "Request failed: {}", self);

        (status, self.to_string()).into_response()
    }
}

impl From<vmfleet_common::Error> for ApiError {
    fn from(err: vmfleet_common::Error) -> Self {
        if err.is_not_found() {
            ApiError::NotFound(err.to_string())
        } else {
            ApiError::BadRequest(err.to_string())
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vmfleet_common::Error;

    #[test]
    fn test_domain_error_conversion() {
        let err: ApiError = Error::HostNotFound("h1".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Host not found: h1");

        let err: ApiError = Error::VmNotLocated("v1".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let err: ApiError = Error::Validation("id must not be empty".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err: ApiError = Error::MissingConnection("h1".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_plain_text_response() {
        let response = ApiError::NotFound("Host not found: h1".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let content_type = response.headers().get("content-type").unwrap();
        assert!(content_type.to_str().unwrap().starts_with("text/plain"));
    }
}
