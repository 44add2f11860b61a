use std::process::Output;

use tokio::process::Command;
use tracing::{error, info, warn};

use crate::errors::AppError;

const OLLAMA_PORT_MAPPING: &str = "11434:11434";
const STOPPED_STATES: [&str; 3] = ["Exited", "Created", "Dead"];

/// True when `docker ps --format {{.Names}}` output lists exactly `name`.
fn lists_container(stdout: &str, name: &str) -> bool {
    stdout.lines().any(|line| line.trim() == name)
}

/// Extracts container ids from `docker ps -a --format {{.ID}}:{{.Status}}`
/// output whose status marks them as stopped.
fn stopped_container_ids(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter_map(|line| line.trim().split_once(':'))
        .filter(|(_, status)| STOPPED_STATES.iter().any(|s| status.contains(s)))
        .map(|(id, _)| id.to_string())
        .collect()
}

/// Manages the Ollama container through the docker CLI.
#[derive(Debug, Clone)]
pub struct ContainerManager {
    docker: String,
    name: String,
    image: String,
    use_gpu: bool,
}

impl ContainerManager {
    pub fn new(name: &str, image: &str, use_gpu: bool) -> Self {
        Self {
            docker: "docker".to_string(),
            name: name.to_string(),
            image: image.to_string(),
            use_gpu,
        }
    }

    /// Overrides the docker executable (e.g. `podman`).
    pub fn with_docker_binary(mut self, binary: &str) -> Self {
        self.docker = binary.to_string();
        self
    }

    async fn docker(&self, args: &[String]) -> std::io::Result<Output> {
        Command::new(&self.docker).args(args).output().await
    }

    fn name_filter(&self) -> String {
        format!("name={}", self.name)
    }

    /// Whether the container is currently running. CLI failures read as "not running".
    pub async fn is_running(&self) -> bool {
        let args = [
            "ps".to_string(),
            "--filter".to_string(),
            self.name_filter(),
            "--format".to_string(),
            "{{.Names}}".to_string(),
        ];
        match self.docker(&args).await {
            Ok(output) => lists_container(&String::from_utf8_lossy(&output.stdout), &self.name),
            Err(e) => {
                warn!("docker ps failed: {e}");
                false
            }
        }
    }

    /// Removes leftover stopped containers that would block `docker run --name`.
    async fn remove_stopped(&self) {
        let args = [
            "ps".to_string(),
            "-a".to_string(),
            "--filter".to_string(),
            self.name_filter(),
            "--format".to_string(),
            "{{.ID}}:{{.Status}}".to_string(),
        ];
        let output = match self.docker(&args).await {
            Ok(output) => output,
            Err(e) => {
                warn!("docker ps -a failed: {e}");
                return;
            }
        };

        for id in stopped_container_ids(&String::from_utf8_lossy(&output.stdout)) {
            info!("Removing stopped container {id}");
            if let Err(e) = self.docker(&["rm".to_string(), id.clone()]).await {
                warn!("docker rm {id} failed: {e}");
            }
        }
    }

    pub fn run_args(&self) -> Vec<String> {
        let mut args = vec![
            "run".to_string(),
            "-d".to_string(),
            "--name".to_string(),
            self.name.clone(),
            "-p".to_string(),
            OLLAMA_PORT_MAPPING.to_string(),
        ];
        if self.use_gpu {
            args.push("--gpus".to_string());
            args.push("all".to_string());
        }
        args.push(self.image.clone());
        args
    }

    /// Starts the container unless it is already running.
    /// Returns `true` when a new container was launched.
    pub async fn start(&self) -> Result<bool, AppError> {
        if self.is_running().await {
            info!("Container {} already running", self.name);
            return Ok(false);
        }

        self.remove_stopped().await;

        let output = self.docker(&self.run_args()).await.map_err(|e| {
            error!("Failed to invoke {}: {e}", self.docker);
            AppError::ContainerStartFailed { message: e.to_string() }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            error!("docker run exited with {}: {stderr}", output.status);
            return Err(AppError::ContainerStartFailed { message: stderr });
        }

        info!("Started container {} from {}", self.name, self.image);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_check_matches_whole_names() {
        assert!(lists_container("ollama_server\n", "ollama_server"));
        assert!(!lists_container("ollama_server_old\n", "ollama_server"));
        assert!(!lists_container("", "ollama_server"));
    }

    #[test]
    fn only_stopped_containers_are_collected() {
        let stdout = "a1b2:Exited (0) 2 hours ago\n\
                      c3d4:Up 5 minutes\n\
                      e5f6:Created\n\
                      \n\
                      0789:Dead\n";
        assert_eq!(stopped_container_ids(stdout), vec!["a1b2", "e5f6", "0789"]);
    }

    #[test]
    fn run_args_include_gpu_flag_when_enabled() {
        let manager = ContainerManager::new("ollama_server", "ollama/ollama", true);
        assert_eq!(
            manager.run_args(),
            vec![
                "run", "-d", "--name", "ollama_server", "-p", "11434:11434", "--gpus", "all",
                "ollama/ollama",
            ]
        );

        let cpu_only = ContainerManager::new("ollama_server", "ollama/ollama", false);
        assert!(!cpu_only.run_args().contains(&"--gpus".to_string()));
        assert_eq!(cpu_only.run_args().last().map(String::as_str), Some("ollama/ollama"));
    }

    #[tokio::test]
    async fn missing_docker_binary_reads_as_not_running() {
        let manager = ContainerManager::new("ollama_server", "ollama/ollama", false)
            .with_docker_binary("definitely-not-a-docker-binary");
        assert!(!manager.is_running().await);
        assert!(matches!(
            manager.start().await,
            Err(AppError::ContainerStartFailed { .. })
        ));
    }

    /// Shell scripts used below to stand in for the docker CLI. Every call
    /// is appended to `calls.log` before `body` runs.
    const NOT_RUNNING: &str = r#"
case "$1 $2" in
  "ps -a") printf 'a1b2:Exited (0) 2 hours ago\nc3d4:Up 3 minutes\n' ;;
  "run -d") echo 0123456789ab ;;
esac
"#;

    const RUNNING: &str = r#"
case "$1" in
  ps) echo ollama_server ;;
esac
"#;

    const RUN_FAILS: &str = r#"
case "$1" in
  run) echo 'docker: Error response from daemon: port is already allocated.' >&2; exit 125 ;;
esac
"#;

    fn manager_with(dir: &tempfile::TempDir, body: &str) -> ContainerManager {
        let binary = testing::fake_docker(dir.path(), body);
        ContainerManager::new("ollama_server", "ollama/ollama", false).with_docker_binary(&binary)
    }

    fn calls(dir: &tempfile::TempDir) -> Vec<String> {
        std::fs::read_to_string(dir.path().join("calls.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[tokio::test]
    async fn start_cleans_up_and_launches_container() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_with(&dir, NOT_RUNNING);

        assert!(manager.start().await.unwrap());
        assert_eq!(
            calls(&dir),
            vec![
                "ps --filter name=ollama_server --format {{.Names}}",
                "ps -a --filter name=ollama_server --format {{.ID}}:{{.Status}}",
                "rm a1b2",
                "run -d --name ollama_server -p 11434:11434 ollama/ollama",
            ]
        );
    }

    #[tokio::test]
    async fn start_is_a_no_op_when_already_running() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_with(&dir, RUNNING);

        assert!(manager.is_running().await);
        assert!(!manager.start().await.unwrap());
        assert!(calls(&dir).iter().all(|call| call.starts_with("ps --filter")));
    }

    #[tokio::test]
    async fn failed_run_reports_daemon_message() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_with(&dir, RUN_FAILS);

        let err = manager.start().await.unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        match err {
            AppError::ContainerStartFailed { message } => {
                assert!(message.contains("port is already allocated"), "{message}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    /// Writes an executable `docker` stand-in into `dir` that logs its
    /// arguments to `dir/calls.log` and then runs `body`. Returns its path.
    pub(crate) fn fake_docker(dir: &Path, body: &str) -> String {
        let script = dir.join("docker");
        let log = dir.join("calls.log");
        let source = format!("#!/bin/sh\necho \"$*\" >> '{}'\n{body}", log.display());
        std::fs::write(&script, source).unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script.display().to_string()
    }
}
