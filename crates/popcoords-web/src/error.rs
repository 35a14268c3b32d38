use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::generator::GenerateError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("No report has been generated yet. Request /generate first.")]
    NotGenerated,
    #[error(transparent)]
    Generate(#[from] GenerateError),
    #[error("Failed to read report: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::NotGenerated => StatusCode::NOT_FOUND,
            ApiError::Generate(GenerateError::Busy) => StatusCode::CONFLICT,
            ApiError::Generate(GenerateError::Pipeline(_) | GenerateError::Aborted(_))
            | ApiError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::NotGenerated => "not_found",
            ApiError::Generate(GenerateError::Busy) => "run_in_progress",
            ApiError::Generate(GenerateError::Pipeline(_)) => "render_failed",
            ApiError::Generate(GenerateError::Aborted(_)) => "run_aborted",
            ApiError::Io(_) => "io_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("Request failed: {}", self);
        }
        let body = json!({
            "error": self.code(),
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}
