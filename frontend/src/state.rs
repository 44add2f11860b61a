use leptos::prelude::*;
use leptos::task::spawn_local;
use gloo_timers::future::TimeoutFuture;
use web_sys::File;

use crate::api;
use crate::config;
use crate::dashboard::{DashboardOp, DashboardState};
use crate::models::ChatRequest;
use crate::session::ChatSession;

/// Chat view state, provided via Leptos context.
#[derive(Clone, Copy)]
pub struct ChatState {
    pub session: RwSignal<ChatSession>,
}

impl ChatState {
    /// Create a new `ChatState` and provide it in the current Leptos context.
    pub fn provide() -> Self {
        let state = Self { session: RwSignal::new(ChatSession::new()) };
        provide_context(state);
        state
    }

    pub fn set_draft(&self, text: String) {
        self.session.update(|s| s.set_draft(text));
    }

    pub fn set_manual_text(&self, text: String) {
        self.session.update(|s| s.set_manual_text(text));
    }

    pub fn remove_attachment(&self) {
        self.session.update(|s| s.remove_attachment());
    }

    /// Validate the picked file and upload it.
    pub fn upload(&self, file: File) {
        let size = file.size() as u64;
        let mut ticket = None;
        self.session.update(|s| ticket = s.begin_upload(size));
        let Some(ticket) = ticket else {
            log::warn!("Rejected {} ({size} bytes): over the upload limit", file.name());
            return;
        };

        let session = self.session;
        spawn_local(async move {
            let result = api::upload_file(&file).await;
            session.try_update(|s| s.complete_upload(ticket, result));
        });
    }

    /// Send the current inputs as a chat turn.
    pub fn send(&self) {
        let mut request = None;
        self.session.update(|s| request = s.send());
        if let Some(request) = request {
            self.dispatch(request);
        }
    }

    /// Runs turns one at a time until the session's queue is drained.
    fn dispatch(&self, first: ChatRequest) {
        let session = self.session;
        spawn_local(async move {
            let mut next = Some(first);
            while let Some(request) = next {
                let result = api::send_chat(&request).await;
                next = session.try_update(|s| s.complete_send(result)).flatten();
            }
        });
    }
}

/// Dashboard state. Owned by the dashboard component, so it is disposed
/// (and polling stops) when the dashboard is hidden.
#[derive(Clone, Copy)]
pub struct DashboardStore {
    pub state: RwSignal<DashboardState>,
}

async fn run_fetch(state: RwSignal<DashboardState>) {
    let result = api::fetch_status().await;
    state.try_update(|s| s.complete_fetch(result));
}

impl DashboardStore {
    pub fn new() -> Self {
        Self { state: RwSignal::new(DashboardState::new()) }
    }

    fn claim(&self, op: DashboardOp) -> bool {
        self.state.try_update(|s| s.begin(op)).unwrap_or(false)
    }

    pub fn fetch_status(&self) {
        if !self.claim(DashboardOp::FetchStatus) {
            return;
        }
        spawn_local(run_fetch(self.state));
    }

    pub fn start_backend(&self) {
        if !self.claim(DashboardOp::StartBackend) {
            return;
        }
        let state = self.state;
        spawn_local(async move {
            let result = api::start_ollama().await;
            if state.try_update(|s| s.complete_start(result)).unwrap_or(false) {
                run_fetch(state).await;
            }
        });
    }

    pub fn pull_model(&self) {
        if !self.claim(DashboardOp::PullModel) {
            return;
        }
        let state = self.state;
        spawn_local(async move {
            let result = api::pull_model().await;
            if state.try_update(|s| s.complete_pull(result)).unwrap_or(false) {
                run_fetch(state).await;
            }
        });
    }

    /// Refresh the status periodically; ticks that find the dashboard busy are skipped.
    pub fn start_polling(&self) {
        let state = self.state;
        let interval_ms = config::status_poll_interval_ms();
        spawn_local(async move {
            loop {
                TimeoutFuture::new(interval_ms).await;
                match state.try_update(|s| s.begin(DashboardOp::FetchStatus)) {
                    None => break, // dashboard unmounted
                    Some(false) => continue,
                    Some(true) => run_fetch(state).await,
                }
            }
            log::debug!("Status polling stopped");
        });
    }
}
