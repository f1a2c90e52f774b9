use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use error_ext::StdErrorExt;
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use thiserror::Error;
use tracing::warn;
use utoipa::ToSchema;

/// Error envelope returned for every failed request.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("account id {0} not found")]
    NotFound(i32),

    /// Storage error text is passed on to the caller verbatim.
    #[error("{0}")]
    Storage(String),

    #[error("failed to create token")]
    TokenIssue,

    #[error("access denied")]
    AuthDenied,
}

impl ApiError {
    pub fn invalid_json() -> Self {
        Self::InvalidInput("invalid json format".to_string())
    }

    pub fn invalid_id(id: &str) -> Self {
        Self::InvalidInput(format!("invalid id {id}"))
    }

    pub fn storage<E>(error: E) -> Self
    where
        E: StdError,
    {
        Self::Storage(error.as_chain())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::AuthDenied => StatusCode::UNAUTHORIZED,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        warn!(error = self.as_chain(), %status, "request failed");

        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body;
    use serde_json::{json, Value};

    #[tokio::test]
    async fn test_into_response() {
        let response = ApiError::NotFound(42).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/json"
        );
        let body = body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice::<Value>(&body).unwrap();
        assert_eq!(body, json!({ "error": "account id 42 not found" }));

        let response = ApiError::AuthDenied.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice::<Value>(&body).unwrap();
        assert_eq!(body, json!({ "error": "access denied" }));
    }

    #[test]
    fn test_messages() {
        assert_eq!(ApiError::invalid_json().to_string(), "invalid json format");
        assert_eq!(ApiError::invalid_id("abc").to_string(), "invalid id abc");
        assert_eq!(ApiError::TokenIssue.to_string(), "failed to create token");
    }
}
