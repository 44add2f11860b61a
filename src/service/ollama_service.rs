use tracing::info;

use crate::agent::OllamaAgentService;
use crate::container::ContainerManager;
use crate::errors::AppError;
use crate::models::{OllamaStatus, PullResponse, StartResponse};

/// Lifecycle control of the model-serving backend: container plus model.
#[derive(Clone)]
pub struct OllamaService {
    agent: OllamaAgentService,
    containers: ContainerManager,
}

impl OllamaService {
    pub fn new(agent: OllamaAgentService, containers: ContainerManager) -> Self {
        Self { agent, containers }
    }

    pub async fn status(&self) -> OllamaStatus {
        let docker_running = self.containers.is_running().await;
        let model_available = docker_running && self.agent.is_model_available().await;
        OllamaStatus { docker_running, model_available }
    }

    pub async fn start(&self) -> Result<StartResponse, AppError> {
        let started = self.containers.start().await?;
        Ok(StartResponse { started })
    }

    pub async fn pull_model(&self) -> Result<PullResponse, AppError> {
        if !self.containers.is_running().await {
            return Err(AppError::OllamaNotRunning);
        }
        info!("Pulling model {}", self.agent.model());
        let pulled = self.agent.pull_model().await;
        Ok(PullResponse { pulled })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service_without_docker() -> OllamaService {
        let agent = OllamaAgentService::new("http://127.0.0.1:9", "granite3.2:2b")
            .unwrap_or_else(|e| panic!("client should build: {e}"));
        let containers = ContainerManager::new("ollama_server", "ollama/ollama", false)
            .with_docker_binary("definitely-not-a-docker-binary");
        OllamaService::new(agent, containers)
    }

    #[tokio::test]
    async fn status_is_all_false_without_docker() {
        let status = service_without_docker().status().await;
        assert_eq!(
            status,
            OllamaStatus { docker_running: false, model_available: false }
        );
    }

    #[tokio::test]
    async fn pull_requires_running_container() {
        let result = service_without_docker().pull_model().await;
        assert!(matches!(result, Err(AppError::OllamaNotRunning)));
    }
}
