use leptos::prelude::*;

use crate::dashboard::DashboardOp;
use crate::state::DashboardStore;

fn yes_no(value: bool) -> &'static str {
    if value { "Yes" } else { "No" }
}

fn busy_label(op: DashboardOp) -> &'static str {
    match op {
        DashboardOp::FetchStatus => "Checking status…",
        DashboardOp::StartBackend => "Starting Ollama…",
        DashboardOp::PullModel => "Pulling model (this can take a while)…",
    }
}

/// Backend status plus start/pull controls. Fetches on mount, then polls.
#[component]
pub fn DashboardView() -> impl IntoView {
    let store = DashboardStore::new();
    store.fetch_status();
    store.start_polling();

    let state = store.state;
    let busy = move || state.with(|s| s.is_busy());

    view! {
        <section class="dashboard">
            <h2>"Ollama Dashboard"</h2>

            <div class="status-row">
                "Docker running: "
                <strong>{move || yes_no(state.with(|s| s.status().docker_running))}</strong>
            </div>
            <div class="status-row">
                "Model available: "
                <strong>{move || yes_no(state.with(|s| s.status().model_available))}</strong>
            </div>

            <div class="controls">
                <button on:click=move |_| store.fetch_status() disabled=busy>
                    "Refresh Status"
                </button>
                <button on:click=move |_| store.start_backend() disabled=busy>
                    "Start Ollama"
                </button>
                <button on:click=move |_| store.pull_model() disabled=busy>
                    "Pull Model"
                </button>
            </div>

            {move || {
                state.with(|s| s.current()).map(|op| {
                    view! { <div class="busy">{busy_label(op)}</div> }
                })
            }}

            {move || {
                state.with(|s| s.message().map(str::to_string)).map(|message| {
                    view! { <div class="dashboard-message">{message}</div> }
                })
            }}
        </section>
    }
}
