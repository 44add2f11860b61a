use leptos::ev;
use leptos::prelude::*;
use web_sys::HtmlInputElement;

use crate::components::dashboard::DashboardView;
use crate::models::{ChatMessage, Sender};
use crate::state::ChatState;

/// Conversation, document inputs and the dashboard toggle.
#[component]
pub fn ChatView() -> impl IntoView {
    let chat = expect_context::<ChatState>();
    let session = chat.session;
    let (show_dashboard, set_show_dashboard) = signal(false);

    let on_toggle = move |ev: ev::MouseEvent| {
        ev.prevent_default();
        set_show_dashboard.update(|shown| *shown = !*shown);
    };

    view! {
        <main class="chat-area">
            <div class="chat-header">
                <h1>"Local LLM Chat"</h1>
                <a href="#" class="dashboard-link" on:click=on_toggle>
                    {move || if show_dashboard.get() { "Hide Dashboard" } else { "Ollama Dashboard" }}
                </a>
            </div>

            <Show when=move || show_dashboard.get()>
                <DashboardView />
            </Show>

            // Messages
            <div class="messages-container">
                {move || {
                    if session.with(|s| s.messages().is_empty()) {
                        view! {
                            <div class="empty-state">
                                "Ask a question, upload a .txt/.pdf, or paste some text"
                            </div>
                        }.into_any()
                    } else {
                        view! {
                            <For
                                each=move || {
                                    session.with(|s| {
                                        s.messages().iter().cloned().enumerate().collect::<Vec<_>>()
                                    })
                                }
                                key=|(index, _)| *index
                                let:entry
                            >
                                <MessageBubble message=entry.1 />
                            </For>
                            <Show when=move || session.with(|s| s.is_loading())>
                                <div class="message ai pending">"Thinking…"</div>
                            </Show>
                        }.into_any()
                    }
                }}
            </div>

            <DocumentInput />
            <ChatInput />
        </main>
    }
}

/// A single chat message bubble.
#[component]
fn MessageBubble(message: ChatMessage) -> impl IntoView {
    let css_class = match message.sender {
        Sender::User => "message user",
        Sender::Ai => "message ai",
    };

    view! {
        <div class=css_class>
            <div class="role-label">{message.sender.as_str()}</div>
            <div class="message-text">{message.text}</div>
        </div>
    }
}

/// File picker, current attachment and the manual-text box.
#[component]
fn DocumentInput() -> impl IntoView {
    let chat = expect_context::<ChatState>();
    let session = chat.session;
    let busy = move || session.with(|s| s.is_loading() || s.is_uploading());

    let on_file = move |ev: ev::Event| {
        let input: HtmlInputElement = event_target(&ev);
        if let Some(file) = input.files().and_then(|files| files.get(0)) {
            chat.upload(file);
        }
        // Allow picking the same file again.
        input.set_value("");
    };

    view! {
        <div class="document-area">
            <label class="file-picker">
                "Upload document (.txt, .pdf, max 10MB): "
                <input type="file" accept=".txt,.pdf" on:change=on_file disabled=busy />
            </label>

            <Show when=move || session.with(|s| s.is_uploading())>
                <span class="uploading">"Uploading…"</span>
            </Show>

            {move || {
                session.with(|s| s.attachment().cloned()).map(|attachment| {
                    view! {
                        <div class="attachment">
                            <span>{format!("Attached: {}", attachment.file_name)}</span>
                            <button
                                class="remove-file-btn"
                                on:click=move |_| chat.remove_attachment()
                                disabled=move || session.with(|s| s.is_loading())
                            >
                                "Remove File"
                            </button>
                        </div>
                    }
                })
            }}

            {move || {
                session.with(|s| s.notice().map(str::to_string)).map(|notice| {
                    view! { <div class="notice">{notice}</div> }
                })
            }}

            <textarea
                class="manual-text"
                rows="4"
                placeholder="…or paste document text here"
                prop:value=move || session.with(|s| s.manual_text().to_string())
                on:input=move |ev| chat.set_manual_text(event_target_value(&ev))
                disabled=move || session.with(|s| s.is_loading())
            />
        </div>
    }
}

/// Prompt textarea and send button.
#[component]
fn ChatInput() -> impl IntoView {
    let chat = expect_context::<ChatState>();
    let session = chat.session;
    let is_sending = move || session.with(|s| s.is_loading());

    let on_keydown = move |ev: ev::KeyboardEvent| {
        if ev.key() == "Enter" && !ev.shift_key() {
            ev.prevent_default();
            chat.send();
        }
    };

    view! {
        <div class="input-area">
            <div class="input-row">
                <textarea
                    rows="1"
                    placeholder="Type a message… (Enter to send, Shift+Enter for newline)"
                    prop:value=move || session.with(|s| s.draft().to_string())
                    on:input=move |ev| chat.set_draft(event_target_value(&ev))
                    on:keydown=on_keydown
                    disabled=is_sending
                />
                <button
                    class="send-btn"
                    on:click=move |_| chat.send()
                    disabled=move || is_sending() || !session.with(|s| s.can_send())
                >
                    {move || match session.with(|s| (s.is_loading(), s.queued_turns())) {
                        (false, _) => "Send".to_string(),
                        (true, 0) => "Sending…".to_string(),
                        (true, queued) => format!("Sending… ({queued} queued)"),
                    }}
                </button>
            </div>
        </div>
    }
}
