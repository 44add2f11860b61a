use crate::api::ApiError;
use crate::models::{OllamaStatus, PullResponse, StartResponse};

pub const STARTED: &str = "Ollama started.";
pub const ALREADY_RUNNING: &str = "Ollama already running.";
pub const START_FAILED: &str = "Failed to start Ollama.";
pub const PULLED: &str = "Model pulled successfully or already available.";
pub const PULL_FAILED: &str = "Failed to pull model.";
pub const STATUS_FAILED: &str = "Failed to fetch status.";

/// The one dashboard operation allowed in flight at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DashboardOp {
    FetchStatus,
    StartBackend,
    PullModel,
}

/// Dashboard state: the last status snapshot, the busy slot and the inline message.
#[derive(Clone, Debug, Default)]
pub struct DashboardState {
    status: OllamaStatus,
    current: Option<DashboardOp>,
    message: Option<String>,
}

impl DashboardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> OllamaStatus {
        self.status
    }

    pub fn current(&self) -> Option<DashboardOp> {
        self.current
    }

    pub fn is_busy(&self) -> bool {
        self.current.is_some()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Claims the busy slot for `op`; `false` means another operation holds it.
    pub fn begin(&mut self, op: DashboardOp) -> bool {
        if self.current.is_some() {
            return false;
        }
        self.current = Some(op);
        true
    }

    fn finish(&mut self, op: DashboardOp) {
        if self.current == Some(op) {
            self.current = None;
        } else {
            log::warn!("{op:?} finished while {:?} held the busy slot", self.current);
        }
    }

    pub fn complete_fetch(&mut self, result: Result<OllamaStatus, ApiError>) {
        self.finish(DashboardOp::FetchStatus);
        match result {
            Ok(status) => self.status = status,
            Err(err) => {
                log::error!("Status fetch failed: {err}");
                self.message = Some(err.user_message(STATUS_FAILED));
            }
        }
    }

    /// Records the start outcome and immediately claims the slot for the
    /// follow-up status fetch. Returns whether that fetch must be dispatched.
    pub fn complete_start(&mut self, result: Result<StartResponse, ApiError>) -> bool {
        self.finish(DashboardOp::StartBackend);
        self.message = Some(match result {
            Ok(StartResponse { started: true }) => STARTED.to_string(),
            Ok(StartResponse { started: false }) => ALREADY_RUNNING.to_string(),
            Err(err) => {
                log::error!("Start request failed: {err}");
                err.user_message(START_FAILED)
            }
        });
        self.begin(DashboardOp::FetchStatus)
    }

    /// Same contract as [`Self::complete_start`] for the pull operation.
    pub fn complete_pull(&mut self, result: Result<PullResponse, ApiError>) -> bool {
        self.finish(DashboardOp::PullModel);
        self.message = Some(match result {
            Ok(PullResponse { pulled: true }) => PULLED.to_string(),
            Ok(PullResponse { pulled: false }) => PULL_FAILED.to_string(),
            Err(err) => {
                log::error!("Pull request failed: {err}");
                err.user_message(PULL_FAILED)
            }
        });
        self.begin(DashboardOp::FetchStatus)
    }
}
