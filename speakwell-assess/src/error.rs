//! HTTP error mapping for speakwell-assess

use crate::types::AssessmentError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Provider adapter returned an impossible result (502)
    #[error("Upstream returned malformed result: {0}")]
    BadGateway(String),

    /// Submission cancelled before a terminal state (408)
    #[error("Request cancelled")]
    Cancelled,
}

impl From<AssessmentError> for ApiError {
    fn from(err: AssessmentError) -> Self {
        match err {
            AssessmentError::InvalidSubmission(msg) => ApiError::BadRequest(msg),
            AssessmentError::MalformedResult(msg) => ApiError::BadGateway(msg),
            AssessmentError::Cancelled => ApiError::Cancelled,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, "MALFORMED_RESULT", msg),
            ApiError::Cancelled => (
                StatusCode::REQUEST_TIMEOUT,
                "CANCELLED",
                "Request cancelled".to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assessment_error_mapping() {
        let err: ApiError = AssessmentError::InvalidSubmission("empty".into()).into();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);

        let err: ApiError = AssessmentError::MalformedResult("score 140".into()).into();
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);

        let err: ApiError = AssessmentError::Cancelled.into();
        assert_eq!(err.into_response().status(), StatusCode::REQUEST_TIMEOUT);
    }

    #[tokio::test]
    async fn test_error_body_shape() {
        use http_body_util::BodyExt;

        let response = ApiError::from(AssessmentError::MalformedResult("accuracy 140".into())).into_response();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(json["error"]["code"], "MALFORMED_RESULT");
        assert_eq!(json["error"]["message"], "accuracy 140");
    }
}
