use std::fmt;

use gloo_net::http::{Request, Response};
use serde::de::DeserializeOwned;
use wasm_bindgen::JsValue;
use web_sys::{File, FormData};

use crate::config::endpoint;
use crate::models::{
    ChatRequest, ChatResponse, ErrorBody, OllamaStatus, PullResponse, StartResponse,
    UploadResponse,
};

/// Why a backend call failed.
#[derive(Clone, Debug, PartialEq)]
pub enum ApiError {
    /// The request never completed (connection refused, CORS, aborted…).
    Network(String),
    /// Non-2xx response; `message` is the JSON `error` field when there was one.
    Server { status: u16, message: Option<String> },
    /// 2xx response whose body was not the expected JSON.
    Parse(String),
}

impl ApiError {
    pub fn from_response_body(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.error)
            .filter(|m| !m.trim().is_empty());
        ApiError::Server { status, message }
    }

    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Server { message: Some(m), .. } => Some(m),
            _ => None,
        }
    }

    /// Text for an inline notice: the server's own words when it gave any,
    /// otherwise `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        self.server_message().unwrap_or(fallback).to_string()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Network(e) => write!(f, "Network error: {e}"),
            ApiError::Server { message: Some(m), .. } => f.write_str(m),
            ApiError::Server { status, message: None } => write!(f, "Server error: {status}"),
            ApiError::Parse(e) => write!(f, "Parse error: {e}"),
        }
    }
}

fn network(e: impl fmt::Display) -> ApiError {
    ApiError::Network(e.to_string())
}

fn js_error(e: JsValue) -> ApiError {
    ApiError::Network(e.as_string().unwrap_or_else(|| format!("{e:?}")))
}

async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
    if !resp.ok() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        return Err(ApiError::from_response_body(status, &body));
    }

    resp.json::<T>()
        .await
        .map_err(|e| ApiError::Parse(e.to_string()))
}

/// Sends one chat turn (non-streaming).
pub async fn send_chat(request: &ChatRequest) -> Result<ChatResponse, ApiError> {
    let resp = Request::post(&endpoint("/chat"))
        .json(request)
        .map_err(|e| ApiError::Parse(format!("Serialize error: {e}")))?
        .send()
        .await
        .map_err(network)?;
    read_json(resp).await
}

/// Uploads a document as the multipart field `file`.
pub async fn upload_file(file: &File) -> Result<UploadResponse, ApiError> {
    let form = FormData::new().map_err(js_error)?;
    form.append_with_blob_and_filename("file", file, &file.name())
        .map_err(js_error)?;

    let resp = Request::post(&endpoint("/upload"))
        .body(form)
        .map_err(network)?
        .send()
        .await
        .map_err(network)?;
    read_json(resp).await
}

pub async fn fetch_status() -> Result<OllamaStatus, ApiError> {
    let resp = Request::get(&endpoint("/ollama/status"))
        .send()
        .await
        .map_err(network)?;
    read_json(resp).await
}

pub async fn start_ollama() -> Result<StartResponse, ApiError> {
    let resp = Request::post(&endpoint("/ollama/start"))
        .send()
        .await
        .map_err(network)?;
    read_json(resp).await
}

pub async fn pull_model() -> Result<PullResponse, ApiError> {
    let resp = Request::post(&endpoint("/ollama/pull_model"))
        .send()
        .await
        .map_err(network)?;
    read_json(resp).await
}
