pub mod api_routes;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::MAX_UPLOAD_BYTES;
use crate::service::chat_service::ChatService;
use crate::service::ollama_service::OllamaService;
use crate::store::upload_repository::UploadRepository;

use api_routes::{chat_handler, pull_model_handler, start_handler, status_handler, upload_handler};

/// Room for multipart boundaries and headers on top of the document itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub chat: ChatService,
    pub ollama: OllamaService,
    pub uploads: UploadRepository,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/chat", post(chat_handler))
        .route(
            "/upload",
            post(upload_handler)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + MULTIPART_OVERHEAD_BYTES)),
        )
        .route("/ollama/status", get(status_handler))
        .route("/ollama/start", post(start_handler))
        .route("/ollama/pull_model", post(pull_model_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::OllamaAgentService;
    use crate::container::ContainerManager;
    use reqwest::multipart::{Form, Part};
    use serde_json::{json, Value};

    /// Serves the router on an ephemeral port with docker unavailable.
    async fn spawn_server(upload_dir: &std::path::Path) -> String {
        let agent = OllamaAgentService::new("http://127.0.0.1:9", "granite3.2:2b").unwrap();
        let containers = ContainerManager::new("ollama_server", "ollama/ollama", false)
            .with_docker_binary("definitely-not-a-docker-binary");
        let uploads = UploadRepository::new(upload_dir);
        uploads.init().await.unwrap();

        let state = AppState {
            chat: ChatService::new(agent.clone(), containers.clone(), uploads.clone()),
            ollama: OllamaService::new(agent, containers),
            uploads,
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn upload_returns_id_and_filename() {
        let dir = tempfile::tempdir().unwrap();
        let base = spawn_server(dir.path()).await;

        let form = Form::new().part(
            "file",
            Part::bytes(b"meeting notes".to_vec()).file_name("notes.txt"),
        );
        let resp = reqwest::Client::new()
            .post(format!("{base}/upload"))
            .multipart(form)
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["filename"], "notes.txt");
        let file_id = body["file_id"].as_str().unwrap();
        assert!(dir.path().join(file_id).exists());
    }

    #[tokio::test]
    async fn upload_without_file_field_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let base = spawn_server(dir.path()).await;

        let form = Form::new().text("comment", "no file here");
        let resp = reqwest::Client::new()
            .post(format!("{base}/upload"))
            .multipart(form)
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), 400);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "Invalid upload: No file provided");
    }

    #[tokio::test]
    async fn status_reports_stopped_backend() {
        let dir = tempfile::tempdir().unwrap();
        let base = spawn_server(dir.path()).await;

        let body: Value = reqwest::get(format!("{base}/ollama/status"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body, json!({ "docker_running": false, "model_available": false }));
    }

    #[tokio::test]
    async fn chat_and_pull_need_running_container() {
        let dir = tempfile::tempdir().unwrap();
        let base = spawn_server(dir.path()).await;
        let client = reqwest::Client::new();

        let resp = client
            .post(format!("{base}/chat"))
            .json(&json!({ "prompt": "Hello", "file_id": null, "manual_text": null }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "Ollama container not running");

        let resp = client.post(format!("{base}/ollama/pull_model")).send().await.unwrap();
        assert_eq!(resp.status(), 400);
    }

    #[tokio::test]
    async fn start_failure_surfaces_error_body() {
        let dir = tempfile::tempdir().unwrap();
        let base = spawn_server(dir.path()).await;

        let resp = reqwest::Client::new()
            .post(format!("{base}/ollama/start"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 500);
        let body: Value = resp.json().await.unwrap();
        assert!(body["error"]
            .as_str()
            .unwrap()
            .starts_with("Failed to start Ollama container"));
    }
}
