use std::time::Duration;

use rig::client::Nothing;
use rig::completion::Chat;
use rig::message::Message as RigMessage;
use rig::prelude::CompletionClient;
use rig::providers::ollama;
use tracing::{debug, error, warn};

use crate::errors::AppError;
use crate::models::{GenerateRequest, GenerateResponse, PullRequest, TagsResponse};

/// Upper bound for a single non-streaming generation.
const GENERATION_TIMEOUT: Duration = Duration::from_secs(180);

/// Maps an inference failure onto the client-facing error kinds.
fn classify_inference_error(message: String) -> AppError {
    if message.contains("Connection refused") || message.contains("connect") {
        AppError::OllamaConnection { message }
    } else {
        AppError::OllamaApi { message }
    }
}

/// Display text of `err` followed by each of its sources. Transport errors
/// only name the cause (e.g. "tcp connect error") deeper in the chain.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn timed_out() -> AppError {
    AppError::OllamaConnection {
        message: format!("request timed out after {}s", GENERATION_TIMEOUT.as_secs()),
    }
}

/// Talks to the Ollama server: text generation goes through the rig
/// [`ollama::Client`]; generation with page images and model management
/// (`/api/generate`, `/api/tags`, `/api/pull`) go through plain HTTP.
#[derive(Clone)]
pub struct OllamaAgentService {
    client: ollama::Client,
    http: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaAgentService {
    pub fn new(base_url: &str, model: &str) -> Result<Self, AppError> {
        let client = ollama::Client::builder()
            .api_key(Nothing)
            .base_url(base_url)
            .build()
            .map_err(|e| AppError::Unexpected(format!("Failed to build Ollama client: {e:?}")))?;
        Ok(Self {
            client,
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Runs one stateless completion for `prompt` and returns the model's answer.
    /// Page images (base64) switch to Ollama's `/api/generate`, which carries them.
    pub async fn generate(&self, prompt: &str, images: &[String]) -> Result<String, AppError> {
        debug!(
            "Sending {} prompt chars and {} images to model {}",
            prompt.chars().count(),
            images.len(),
            self.model
        );
        if images.is_empty() {
            self.chat(prompt).await
        } else {
            self.generate_with_images(prompt, images).await
        }
    }

    async fn chat(&self, prompt: &str) -> Result<String, AppError> {
        let agent = self.client.agent(&self.model).build();
        let history: Vec<RigMessage> = Vec::new();

        match tokio::time::timeout(GENERATION_TIMEOUT, agent.chat(prompt, history)).await {
            Ok(Ok(content)) => Ok(content),
            Ok(Err(e)) => {
                error!("Ollama inference failed for model {}: {e}", self.model);
                Err(classify_inference_error(error_chain(&e)))
            }
            Err(_) => {
                error!("Ollama inference timed out after {GENERATION_TIMEOUT:?}");
                Err(timed_out())
            }
        }
    }

    async fn generate_with_images(&self, prompt: &str, images: &[String]) -> Result<String, AppError> {
        let body = GenerateRequest { model: &self.model, prompt, images, stream: false };
        let result = self
            .http
            .post(format!("{}/api/generate", self.base_url))
            .timeout(GENERATION_TIMEOUT)
            .json(&body)
            .send()
            .await
            .and_then(|resp| resp.error_for_status());

        let response = match result {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                error!("Ollama generation timed out after {GENERATION_TIMEOUT:?}");
                return Err(timed_out());
            }
            Err(e) if e.is_status() => {
                error!("Ollama generation failed for model {}: {e}", self.model);
                return Err(AppError::OllamaApi { message: e.to_string() });
            }
            Err(e) => {
                error!("Could not reach Ollama for model {}: {e}", self.model);
                return Err(AppError::OllamaConnection { message: error_chain(&e) });
            }
        };

        let generated = response.json::<GenerateResponse>().await.map_err(|e| {
            error!("Unreadable Ollama generation response: {e}");
            AppError::OllamaApi { message: e.to_string() }
        })?;
        Ok(generated.response)
    }

    /// Names of the models installed in the Ollama server.
    pub async fn list_models(&self) -> Result<Vec<String>, reqwest::Error> {
        let tags = self
            .http
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json::<TagsResponse>()
            .await?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// True when the configured model is installed; any failure reads as "not available".
    pub async fn is_model_available(&self) -> bool {
        match self.list_models().await {
            Ok(models) => models.iter().any(|name| name == &self.model),
            Err(e) => {
                warn!("Could not list Ollama models: {e}");
                false
            }
        }
    }

    /// Asks Ollama to download the configured model; returns whether it succeeded.
    pub async fn pull_model(&self) -> bool {
        let body = PullRequest { name: &self.model, stream: false };
        let result = self
            .http
            .post(format!("{}/api/pull", self.base_url))
            .json(&body)
            .send()
            .await
            .and_then(|resp| resp.error_for_status());

        match result {
            Ok(_) => true,
            Err(e) => {
                error!("Failed to pull model {}: {e}", self.model);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MODEL: &str = "granite3.2:2b";

    fn agent_for(server: &MockServer) -> OllamaAgentService {
        OllamaAgentService::new(&server.uri(), MODEL)
            .unwrap_or_else(|e| panic!("client should build: {e}"))
    }

    #[tokio::test]
    async fn model_listed_in_tags_is_available() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "models": [{ "name": "llama3.2:latest" }, { "name": MODEL }]
            })))
            .mount(&server)
            .await;

        assert!(agent_for(&server).is_model_available().await);
    }

    #[tokio::test]
    async fn missing_model_is_not_available() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "models": [{ "name": "llama3.2:latest" }]
            })))
            .mount(&server)
            .await;

        assert!(!agent_for(&server).is_model_available().await);
    }

    #[tokio::test]
    async fn tags_server_error_reads_as_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let agent = agent_for(&server);
        assert!(agent.list_models().await.is_err());
        assert!(!agent.is_model_available().await);
    }

    #[tokio::test]
    async fn pull_sends_model_name_without_streaming() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/pull"))
            .and(body_json(json!({ "name": MODEL, "stream": false })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "success" })))
            .expect(1)
            .mount(&server)
            .await;

        assert!(agent_for(&server).pull_model().await);
    }

    #[tokio::test]
    async fn failed_pull_reports_false() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/pull"))
            .respond_with(ResponseTemplate::new(500).set_body_string("pull failed"))
            .mount(&server)
            .await;

        assert!(!agent_for(&server).pull_model().await);
    }

    #[tokio::test]
    async fn unreachable_server_reads_as_unavailable() {
        let agent = OllamaAgentService::new("http://127.0.0.1:9", MODEL)
            .unwrap_or_else(|e| panic!("client should build: {e}"));
        assert!(!agent.is_model_available().await);
        assert!(!agent.pull_model().await);
    }

    #[test]
    fn connection_failures_are_classified() {
        let err = classify_inference_error("error trying to connect: Connection refused".into());
        assert!(matches!(err, AppError::OllamaConnection { .. }));

        let err = classify_inference_error("CompletionError: ProviderError: 404".into());
        assert!(matches!(err, AppError::OllamaApi { .. }));
    }

    fn chat_reply(content: &str) -> serde_json::Value {
        json!({
            "model": MODEL,
            "created_at": "2025-01-10T16:21:04.113726Z",
            "message": { "role": "assistant", "content": content },
            "done_reason": "stop",
            "done": true,
            "total_duration": 912_345_000u64,
            "prompt_eval_count": 26,
            "eval_count": 12
        })
    }

    #[tokio::test]
    async fn generate_returns_model_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(json!({ "model": MODEL })))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply("Hi there")))
            .expect(1)
            .mount(&server)
            .await;

        let reply = agent_for(&server).generate("Hello", &[]).await.unwrap();
        assert_eq!(reply, "Hi there");
    }

    #[tokio::test]
    async fn generate_maps_server_failure_to_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model runner has unexpectedly stopped"))
            .mount(&server)
            .await;

        let err = agent_for(&server).generate("Hello", &[]).await.unwrap_err();
        assert!(matches!(err, AppError::OllamaApi { .. }), "got {err:?}");
        assert!(err.to_string().starts_with("Ollama API error: "));
    }

    #[tokio::test]
    async fn generate_maps_unreachable_server_to_connection_error() {
        let agent = OllamaAgentService::new("http://127.0.0.1:9", MODEL)
            .unwrap_or_else(|e| panic!("client should build: {e}"));

        let err = agent.generate("Hello", &[]).await.unwrap_err();
        assert!(matches!(err, AppError::OllamaConnection { .. }), "got {err:?}");
        assert!(err.to_string().starts_with("Failed to connect to Ollama: "));

        let err = agent.generate("Hello", &["aW1n".to_string()]).await.unwrap_err();
        assert!(matches!(err, AppError::OllamaConnection { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn page_images_go_to_generate_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(json!({
                "model": MODEL,
                "prompt": "Read this scan",
                "images": ["aW1hZ2U="],
                "stream": false
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": MODEL,
                "created_at": "2025-01-10T16:21:04.113726Z",
                "response": "It is a lease agreement.",
                "done": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let reply = agent_for(&server)
            .generate("Read this scan", &["aW1hZ2U=".to_string()])
            .await
            .unwrap();
        assert_eq!(reply, "It is a lease agreement.");
    }

    #[tokio::test]
    async fn image_generation_error_status_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "model does not support images"
            })))
            .mount(&server)
            .await;

        let err = agent_for(&server)
            .generate("Read this scan", &["aW1hZ2U=".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::OllamaApi { .. }), "got {err:?}");
    }

    #[test]
    fn error_chain_includes_sources() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "Connection refused");
        let wrapped = AppError::Storage(io);
        let message = error_chain(&wrapped);
        assert!(message.ends_with(": Connection refused"), "{message}");
    }
}
