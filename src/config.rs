use std::path::PathBuf;

/// Largest document accepted for chat context (10 MiB).
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "granite3.2:2b";
const DEFAULT_CONTAINER_NAME: &str = "ollama_server";
const DEFAULT_IMAGE: &str = "ollama/ollama";
const DEFAULT_DOCKER_BIN: &str = "docker";
const DEFAULT_UPLOAD_DIR: &str = "uploads";

/// Runtime settings, read once at startup from the environment (and `.env`).
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub port: u16,
    pub ollama_base_url: String,
    pub model: String,
    pub container_name: String,
    pub image: String,
    /// Container CLI to invoke (`docker`, or a compatible one such as `podman`).
    pub docker_binary: String,
    /// Pass `--gpus all` to `docker run`.
    pub use_gpu: bool,
    pub upload_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            ollama_base_url: DEFAULT_OLLAMA_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            container_name: DEFAULT_CONTAINER_NAME.to_string(),
            image: DEFAULT_IMAGE.to_string(),
            docker_binary: DEFAULT_DOCKER_BIN.to_string(),
            use_gpu: cfg!(target_os = "linux"),
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup; unset or unparsable
    /// values fall back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            ollama_base_url: lookup("OLLAMA_API_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.ollama_base_url),
            model: lookup("OLLAMA_MODEL").unwrap_or(defaults.model),
            container_name: lookup("OLLAMA_CONTAINER_NAME").unwrap_or(defaults.container_name),
            image: lookup("OLLAMA_IMAGE").unwrap_or(defaults.image),
            docker_binary: lookup("DOCKER_BIN").unwrap_or(defaults.docker_binary),
            use_gpu: lookup("OLLAMA_USE_GPU")
                .and_then(|v| parse_flag(&v))
                .unwrap_or(defaults.use_gpu),
            upload_dir: lookup("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
