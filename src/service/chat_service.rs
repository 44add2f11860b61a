use tracing::{debug, info};

use crate::agent::OllamaAgentService;
use crate::container::ContainerManager;
use crate::errors::AppError;
use crate::models::{ChatRequest, ChatResponse};
use crate::service::document::{extract_document, ExtractedDocument};
use crate::store::upload_repository::UploadRepository;

/// Longest prompt handed to the model, in characters.
const MAX_PROMPT_CHARS: usize = 4000;
const TRUNCATION_MARKER: &str = "... [Prompt truncated]";

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Wraps document content around the user's message. A document that is
/// only page images gets the image wording instead.
pub fn build_prompt(prompt: &str, document: Option<&ExtractedDocument>) -> String {
    let asked = !prompt.trim().is_empty();
    match document {
        Some(doc) if !doc.text.trim().is_empty() => {
            let content = &doc.text;
            if asked {
                format!(
                    "The user has uploaded a document. Document content:\n{content}\n\nUser message: {prompt}"
                )
            } else {
                format!(
                    "The user has uploaded a document. Document content:\n{content}\n\nPlease analyze this document."
                )
            }
        }
        Some(doc) if !doc.images.is_empty() => {
            if asked {
                format!("The user has uploaded a document image. User message: {prompt}")
            } else {
                "The user has uploaded a document image. Please analyze the document content."
                    .to_string()
            }
        }
        _ => prompt.to_string(),
    }
}

pub fn truncate_prompt(prompt: String) -> String {
    if prompt.chars().count() <= MAX_PROMPT_CHARS {
        return prompt;
    }
    let mut truncated: String = prompt.chars().take(MAX_PROMPT_CHARS).collect();
    truncated.push_str(TRUNCATION_MARKER);
    debug!("Truncated prompt to {MAX_PROMPT_CHARS} characters");
    truncated
}

/// Picks the document for a chat turn: pasted text wins over an upload, and
/// an empty `file_id` counts as no upload.
pub async fn resolve_document(
    uploads: &UploadRepository,
    request: &ChatRequest,
) -> Result<Option<ExtractedDocument>, AppError> {
    if let Some(text) = non_blank(request.manual_text.as_deref()) {
        debug!("Using manual text input ({} chars)", text.len());
        return Ok(Some(ExtractedDocument::text(text.to_string())));
    }

    let Some(file_id) = non_blank(request.file_id.as_deref()) else {
        return Ok(None);
    };

    let bytes = uploads.load(file_id).await?;
    let document = extract_document(bytes).await?;
    if document.is_empty() {
        return Err(AppError::NoExtractableContent);
    }
    Ok(Some(document))
}

#[derive(Clone)]
pub struct ChatService {
    agent: OllamaAgentService,
    containers: ContainerManager,
    uploads: UploadRepository,
}

impl ChatService {
    pub fn new(
        agent: OllamaAgentService,
        containers: ContainerManager,
        uploads: UploadRepository,
    ) -> Self {
        Self { agent, containers, uploads }
    }

    pub async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, AppError> {
        // ── Backend readiness ─────────────────────────────────────────────────
        if !self.containers.is_running().await {
            return Err(AppError::OllamaNotRunning);
        }
        if !self.agent.is_model_available().await {
            return Err(AppError::ModelNotAvailable {
                model_name: self.agent.model().to_string(),
            });
        }

        // ── Gather input ──────────────────────────────────────────────────────
        let prompt = request.prompt.clone().unwrap_or_default();
        let document = resolve_document(&self.uploads, &request).await?;
        if document.is_none() && prompt.trim().is_empty() {
            return Err(AppError::EmptyChatRequest);
        }

        // ── Generate ──────────────────────────────────────────────────────────
        let full_prompt = truncate_prompt(build_prompt(&prompt, document.as_ref()));
        let images = document.map(|doc| doc.images).unwrap_or_default();
        let response = self.agent.generate(&full_prompt, &images).await?;
        info!("Model answered with {} chars", response.len());

        Ok(ChatResponse { response })
    }
}
