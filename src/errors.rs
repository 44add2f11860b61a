use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::models::ErrorBody;

/// Top-level application error.
/// Every variant renders as `{"error": "<message>"}` with a matching status code.
#[allow(dead_code)]
#[derive(Debug, Error)]
pub enum AppError {
    // ── Ollama / container errors ────────────────────────────────────────────
    #[error("Ollama container not running")]
    OllamaNotRunning,

    #[error("Model {model_name} not available")]
    ModelNotAvailable { model_name: String },

    #[error("Failed to start Ollama container: {message}")]
    ContainerStartFailed { message: String },

    #[error("Ollama API error: {message}")]
    OllamaApi { message: String },

    #[error("Failed to connect to Ollama: {message}")]
    OllamaConnection { message: String },

    // ── Document errors ──────────────────────────────────────────────────────
    #[error("File not found")]
    FileNotFound { file_id: String },

    #[error("File too large")]
    FileTooLarge { size: u64, max: u64 },

    #[error("Failed to process PDF: {message}")]
    PdfProcessing { message: String },

    #[error("Failed to read file: {message}")]
    FileRead { message: String },

    #[error("No text or image could be extracted from the file")]
    NoExtractableContent,

    // ── Validation errors ────────────────────────────────────────────────────
    #[error("No prompt, file, or manual text provided.")]
    EmptyChatRequest,

    #[error("Invalid upload: {message}")]
    InvalidUpload { message: String },

    // ── System errors ────────────────────────────────────────────────────────
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::FileNotFound { .. })
    }

    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AppError::OllamaNotRunning
                | AppError::ModelNotAvailable { .. }
                | AppError::FileTooLarge { .. }
                | AppError::PdfProcessing { .. }
                | AppError::FileRead { .. }
                | AppError::NoExtractableContent
                | AppError::EmptyChatRequest
                | AppError::InvalidUpload { .. }
        )
    }

    pub fn status_code(&self) -> StatusCode {
        if self.is_not_found() {
            StatusCode::NOT_FOUND
        } else if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody { error: self.to_string() };
        (status, Json(body)).into_response()
    }
}
