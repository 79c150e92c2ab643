use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::extraction::ExtractionError;
use crate::llm_client::LlmError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// Validation problems are the caller's to fix; upstream failures come from the
/// model API and carry a retry hint; everything else is internal.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Extraction(#[from] ExtractionError),

    #[error("{0}")]
    Upstream(#[from] LlmError),

    #[error("{0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Extraction(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Extraction(_) => "EXTRACTION_ERROR",
            AppError::Upstream(_) => "UPSTREAM_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Upstream(e) => e.is_retryable(),
            _ => false,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let detail = match &self {
            AppError::Validation(msg) => msg.clone(),
            AppError::Extraction(e) => {
                tracing::warn!("Resume extraction failed: {e}");
                format!("An error occurred: {e}")
            }
            AppError::Upstream(e) => {
                tracing::error!("LLM error: {e}");
                format!("An error occurred: {e}")
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                format!("An error occurred: {e}")
            }
        };

        let body = Json(json!({
            "detail": detail,
            "code": self.code(),
            "retryable": self.is_retryable(),
        }));

        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::Value;

    async fn body_json(error: AppError) -> (StatusCode, Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_validation_error_is_plain_400() {
        let (status, body) =
            body_json(AppError::Validation("Only PDF files are supported.".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Only PDF files are supported.");
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["retryable"], false);
    }

    #[tokio::test]
    async fn test_rate_limited_upstream_is_retryable_502() {
        let (status, body) = body_json(AppError::Upstream(LlmError::Api {
            status: 429,
            message: "quota exceeded".into(),
        }))
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(
            body["detail"],
            "An error occurred: API error (status 429): quota exceeded"
        );
        assert_eq!(body["retryable"], true);
    }

    #[tokio::test]
    async fn test_extraction_error_is_422() {
        let (status, body) = body_json(AppError::Extraction(ExtractionError::Parse(
            "bad xref".into(),
        )))
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "EXTRACTION_ERROR");
        assert_eq!(body["detail"], "An error occurred: Failed to parse PDF: bad xref");
    }

    #[tokio::test]
    async fn test_internal_error_is_500_with_message() {
        let (status, body) = body_json(AppError::Internal(anyhow::anyhow!("disk full"))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"], "An error occurred: disk full");
        assert_eq!(body["retryable"], false);
    }
}
