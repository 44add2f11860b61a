use axum::extract::{Multipart, State};
use axum::Json;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::models::{ChatRequest, ChatResponse, OllamaStatus, PullResponse, StartResponse, UploadResponse};
use crate::routes::AppState;

const UPLOAD_FIELD: &str = "file";

/// POST `/chat`: one chat turn, optionally grounded on an upload or pasted text
pub async fn chat_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let response = state.chat.chat(request).await.inspect_err(|e| {
        warn!("Chat request failed: {e}");
    })?;
    Ok(Json(response))
}

/// POST `/upload`: stores the multipart `file` field and returns its id
pub async fn upload_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidUpload { message: e.body_text() })?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or("upload").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidUpload { message: e.body_text() })?;
        let file_id = state.uploads.save(&bytes).await?;

        info!("Uploaded {filename} as {file_id} ({} bytes)", bytes.len());
        return Ok(Json(UploadResponse { file_id, filename }));
    }

    Err(AppError::InvalidUpload { message: "No file provided".to_string() })
}

/// GET `/ollama/status`
pub async fn status_handler(State(state): State<AppState>) -> Json<OllamaStatus> {
    Json(state.ollama.status().await)
}

/// POST `/ollama/start`
pub async fn start_handler(
    State(state): State<AppState>,
) -> Result<Json<StartResponse>, AppError> {
    Ok(Json(state.ollama.start().await?))
}

/// POST `/ollama/pull_model`
pub async fn pull_model_handler(
    State(state): State<AppState>,
) -> Result<Json<PullResponse>, AppError> {
    Ok(Json(state.ollama.pull_model().await?))
}
