//! JSON error rendering.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use outlay_core::workflow::WorkflowError;
use outlay_shared::AppError;

/// Error body: `{"error": <code>, "message": <text>}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Stable error code.
    pub error: &'static str,
    /// Human readable message.
    pub message: String,
}

/// An error returned by a handler.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    /// HTTP status of the response.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Stable error code of the response.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }
}

fn status_of(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        Self {
            status: status_of(err.status_code()),
            code: err.error_code(),
            message: err.to_string(),
        }
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self {
            status: status_of(err.status_code()),
            code: err.error_code(),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = if self.status.is_server_error() {
            tracing::error!(code = self.code, error = %self.message, "Request failed");
            "An error occurred".to_string()
        } else {
            tracing::warn!(code = self.code, status = %self.status, error = %self.message, "Request rejected");
            self.message
        };

        (
            self.status,
            Json(ErrorBody {
                error: self.code,
                message,
            }),
        )
            .into_response()
    }
}

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use uuid::Uuid;

    #[rstest]
    #[case(WorkflowError::ExpenseNotFound(Uuid::nil()), StatusCode::NOT_FOUND)]
    #[case(WorkflowError::AdminRequired, StatusCode::FORBIDDEN)]
    #[case(WorkflowError::ConcurrencyConflict(Uuid::nil()), StatusCode::CONFLICT)]
    #[case(WorkflowError::InvalidReorder("short".into()), StatusCode::BAD_REQUEST)]
    #[case(WorkflowError::Database("down".into()), StatusCode::INTERNAL_SERVER_ERROR)]
    fn test_workflow_error_status(#[case] err: WorkflowError, #[case] status: StatusCode) {
        let code = err.error_code();
        let api = ApiError::from(err);
        assert_eq!(api.status(), status);
        assert_eq!(api.code(), code);
    }

    #[test]
    fn test_unauthorized_app_error() {
        let api = ApiError::from(AppError::Unauthorized("missing".into()));
        assert_eq!(api.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(api.code(), "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_server_errors_hide_details() {
        use http_body_util::BodyExt;

        let response = ApiError::from(WorkflowError::Database("password=hunter2".into()))
            .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "DATABASE_ERROR");
        assert_eq!(body["message"], "An error occurred");
    }
}
