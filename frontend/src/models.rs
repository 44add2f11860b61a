use serde::{Deserialize, Serialize};

// ── Wire types (match the backend JSON) ──────────────────────────────────────

/// Request body for `POST /chat`. Absent parts serialize as `null`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ChatRequest {
    pub prompt: Option<String>,
    pub file_id: Option<String>,
    pub manual_text: Option<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ChatResponse {
    pub response: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct UploadResponse {
    pub file_id: String,
    pub filename: String,
}

/// Backend health snapshot from `GET /ollama/status`.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct OllamaStatus {
    pub docker_running: bool,
    pub model_available: bool,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct StartResponse {
    pub started: bool,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct PullResponse {
    pub pulled: bool,
}

/// Error payload of any non-2xx response.
#[derive(Clone, Debug, Deserialize)]
pub struct ErrorBody {
    pub error: Option<String>,
}

// ── View-side types ──────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sender {
    User,
    Ai,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Ai => "ai",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChatMessage {
    pub sender: Sender,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self { sender: Sender::User, text: text.into() }
    }

    pub fn ai(text: impl Into<String>) -> Self {
        Self { sender: Sender::Ai, text: text.into() }
    }
}

/// A server-side upload the next chat turns refer to.
#[derive(Clone, Debug, PartialEq)]
pub struct Attachment {
    pub file_id: String,
    pub file_name: String,
}

impl From<UploadResponse> for Attachment {
    fn from(resp: UploadResponse) -> Self {
        Self { file_id: resp.file_id, file_name: resp.filename }
    }
}
