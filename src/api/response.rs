//! HTTP 响应体与错误映射

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{error, warn};

use crate::error::{AppError, UploadError};
use crate::models::QuestionSet;

/// 成功响应
#[derive(Debug, Serialize)]
pub struct QuestionsResponse {
    pub questions: QuestionSet,
}

/// 统一错误响应
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        if let AppError::Upload(UploadError::TooLarge { .. }) = self {
            StatusCode::PAYLOAD_TOO_LARGE
        } else if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    fn to_body(&self) -> ErrorResponse {
        match self {
            AppError::MissingFile => ErrorResponse {
                error: self.to_string(),
                details: None,
            },
            AppError::Upload(UploadError::Multipart { message }) => ErrorResponse {
                error: "Invalid upload.".to_string(),
                details: Some(message.clone()),
            },
            AppError::Upload(UploadError::TooLarge { .. }) => ErrorResponse {
                error: "File too large.".to_string(),
                details: Some(self.to_string()),
            },
            _ => ErrorResponse {
                error: "Failed to generate questions.".to_string(),
                details: Some(self.to_string()),
            },
        }
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    if error.is_client_error() {
        warn!(error = %error, error_type, "⚠️ 请求被拒绝");
    } else {
        error!(error = %error, error_type, "❌ 请求处理失败");
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        log_error(&self);
        (self.status_code(), Json(self.to_body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ExtractionError, GenerationError, ParseError};

    #[test]
    fn test_missing_file_body() {
        let err = AppError::MissingFile;
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        let body = serde_json::to_value(err.to_body()).unwrap();
        assert_eq!(body, serde_json::json!({ "error": "No file uploaded." }));
    }

    #[test]
    fn test_multipart_error_is_client_error() {
        let err = AppError::Upload(UploadError::Multipart {
            message: "stream ended early".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        let body = err.to_body();
        assert_eq!(body.error, "Invalid upload.");
        assert_eq!(body.details.as_deref(), Some("stream ended early"));
    }

    #[test]
    fn test_too_large_is_payload_too_large() {
        let err = AppError::Upload(UploadError::TooLarge { limit_bytes: 1024 });
        assert!(err.is_client_error());
        assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        let body = err.to_body();
        assert_eq!(body.error, "File too large.");
        assert!(body.details.unwrap().contains("1024"));
    }

    #[test]
    fn test_server_errors_carry_details() {
        let err = AppError::Extraction(ExtractionError::UnsupportedFormat {
            extension: "exe".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = err.to_body();
        assert_eq!(body.error, "Failed to generate questions.");
        assert!(body.details.unwrap().contains("exe"));

        let source = serde_json::from_str::<QuestionSet>("nope").unwrap_err();
        let err = AppError::Generation(GenerationError::MalformedReply(ParseError { source }));
        assert_eq!(
            err.to_body().details.as_deref(),
            Some("Invalid response format from AI")
        );
    }
}
