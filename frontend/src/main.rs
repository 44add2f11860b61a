mod api;
mod components;
mod config;
mod dashboard;
mod models;
mod session;
mod state;

use leptos::prelude::*;
use leptos::mount::mount_to_body;

use components::chat::ChatView;
use state::ChatState;

/// Root application component.
#[component]
fn App() -> impl IntoView {
    ChatState::provide();

    view! {
        <div class="app-container">
            <ChatView />
        </div>
    }
}

fn main() {
    console_log::init_with_level(log::Level::Debug).expect("Failed to init logger");
    log::info!("Backend API at {}", config::API_BASE);
    mount_to_body(App);
}
