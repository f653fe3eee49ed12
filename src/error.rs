use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::{repository::RepositoryError, validators::FieldError};

/// ApiError
///
/// Every failure a handler or the auth gate can report. Each variant maps to
/// exactly one HTTP status; 500s carry the raw message from the failing layer.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No bearer token on a protected route.
    #[error("Unauthorized")]
    Unauthorized,

    /// A bearer token was sent but its signature or expiry did not verify.
    #[error("Forbidden")]
    Forbidden,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("{0}")]
    NotFound(&'static str),

    #[error("validation failed on {} field(s)", .0.len())]
    ValidationFailed(Vec<FieldError>),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

/// A body that is not JSON or does not fit the typed request is reported the
/// same way as a validator failure, on the `body` field.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::ValidationFailed(vec![FieldError::new("body", rejection.body_text())])
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            ApiError::ValidationFailed(errors) => {
                tracing::debug!(?errors, "request body rejected by validator");
                (status, Json(json!({ "errors": errors }))).into_response()
            }
            ApiError::Internal(message) => {
                tracing::error!("internal error: {}", message);
                (status, Json(json!({ "error": message }))).into_response()
            }
            other => {
                tracing::debug!(%status, "request rejected: {}", other);
                (status, other.to_string()).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn not_found_renders_plain_text() {
        let response = ApiError::NotFound("Book not found").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_text(response).await, "Book not found");
    }

    #[tokio::test]
    async fn internal_error_exposes_raw_message() {
        let response = ApiError::Internal("relation \"books\" does not exist".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["error"], "relation \"books\" does not exist");
    }

    #[tokio::test]
    async fn validation_failure_lists_every_field() {
        let errors = vec![
            FieldError::new("title", "Title is required"),
            FieldError::new("genre", "Genre must be a string"),
        ];
        let response = ApiError::ValidationFailed(errors).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["errors"].as_array().unwrap().len(), 2);
        assert_eq!(body["errors"][0]["field"], "title");
        assert_eq!(body["errors"][1]["message"], "Genre must be a string");
    }

    #[tokio::test]
    async fn json_rejection_becomes_body_validation_error() {
        use axum::{body::Body, extract::FromRequest, http::Request};

        let request = Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"city":"X"}"#))
            .unwrap();
        let rejection = Json::<crate::models::CreateAuthorRequest>::from_request(request, &())
            .await
            .unwrap_err();

        match ApiError::from(rejection) {
            ApiError::ValidationFailed(errors) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field, "body");
                assert!(errors[0].message.contains("name"));
            }
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn auth_failures_map_to_distinct_statuses() {
        assert_eq!(ApiError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::InvalidCredentials.status_code(), StatusCode::UNAUTHORIZED);
    }
}
