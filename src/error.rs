use axum::{
    response::{IntoResponse, Response},
    Json,
    http::StatusCode,
};
use serde::Serialize;

#[derive(Serialize)]
pub struct ErrorResponse {
    error: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Scraping service unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Scrape job failed: {0}")]
    JobFailure(String),

    #[error("Failed to read dataset: {0}")]
    DatasetReadError(String),

    #[error("Timed out: {0}")]
    Timeout(String),
}

impl IntoResponse for AppError {
    // Every failure class collapses to a 500 carrying the error's description.
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.to_string(),
        });

        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::UpstreamUnavailable(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
