use serde::{Deserialize, Serialize};

// ── Client-facing wire types ─────────────────────────────────────────────────

/// Body of `POST /chat`. Each field is `null` when the client has nothing to send.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub file_id: Option<String>,
    #[serde(default)]
    pub manual_text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadResponse {
    pub file_id: String,
    pub filename: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OllamaStatus {
    pub docker_running: bool,
    pub model_available: bool,
}

#[derive(Debug, Serialize)]
pub struct StartResponse {
    pub started: bool,
}

#[derive(Debug, Serialize)]
pub struct PullResponse {
    pub pulled: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

// ── Ollama management API ────────────────────────────────────────────────────

/// Response of Ollama `GET /api/tags`.
#[derive(Debug, Default, Deserialize)]
pub struct TagsResponse {
    #[serde(default)]
    pub models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
pub struct ModelTag {
    #[serde(default)]
    pub name: String,
}

/// Body of Ollama `POST /api/pull`.
#[derive(Debug, Serialize)]
pub struct PullRequest<'a> {
    pub name: &'a str,
    pub stream: bool,
}

/// Body of Ollama `POST /api/generate`, used when page images go along.
#[derive(Debug, Serialize)]
pub struct GenerateRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub images: &'a [String],
    pub stream: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub response: String,
}
