//! Chat view state, independent of the UI framework.
//!
//! Every network-bound operation is split in two: a `begin`/`send` step that
//! updates the state optimistically and returns what to put on the wire, and
//! a `complete` step that folds the response back in. The Leptos layer runs
//! the request in between.

use std::collections::VecDeque;

use crate::api::ApiError;
use crate::models::{Attachment, ChatMessage, ChatRequest, ChatResponse, UploadResponse};

/// Largest file the client will upload (10 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

pub const SIZE_LIMIT_ERROR: &str = "File size exceeds 10MB limit.";
pub const UPLOAD_FAILED: &str = "File upload failed.";
pub const MANUAL_TEXT_LABEL: &str = "[Manual text provided]";

pub fn file_label(file_name: &str) -> String {
    format!("[File: {file_name}]")
}

fn present(text: &str) -> Option<String> {
    (!text.trim().is_empty()).then(|| text.to_string())
}

/// Identifies one upload attempt; responses for superseded attempts are dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UploadTicket(u64);

/// A captured send waiting for its turn on the wire.
#[derive(Clone, Debug, PartialEq)]
struct QueuedTurn {
    label: String,
    request: ChatRequest,
}

#[derive(Clone, Debug, Default)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
    draft: String,
    manual_text: String,
    attachment: Option<Attachment>,
    /// Inline message area for upload problems.
    notice: Option<String>,
    upload_generation: u64,
    pending_upload: Option<UploadTicket>,
    in_flight: bool,
    queue: VecDeque<QueuedTurn>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn manual_text(&self) -> &str {
        &self.manual_text
    }

    pub fn attachment(&self) -> Option<&Attachment> {
        self.attachment.as_ref()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// True while a chat request is outstanding.
    pub fn is_loading(&self) -> bool {
        self.in_flight
    }

    pub fn is_uploading(&self) -> bool {
        self.pending_upload.is_some()
    }

    pub fn queued_turns(&self) -> usize {
        self.queue.len()
    }

    /// Whether a send right now would do anything.
    pub fn can_send(&self) -> bool {
        present(&self.draft).is_some()
            || self.attachment.is_some()
            || present(&self.manual_text).is_some()
    }

    // ── Inputs ───────────────────────────────────────────────────────────────

    pub fn set_draft(&mut self, text: String) {
        self.draft = text;
    }

    pub fn set_manual_text(&mut self, text: String) {
        self.manual_text = text;
    }

    // ── Upload ───────────────────────────────────────────────────────────────

    /// Validates a picked file. Returns a ticket when the upload may proceed;
    /// an oversize file sets the size-limit notice and must not be sent.
    pub fn begin_upload(&mut self, size_bytes: u64) -> Option<UploadTicket> {
        if size_bytes > MAX_UPLOAD_BYTES {
            self.notice = Some(SIZE_LIMIT_ERROR.to_string());
            return None;
        }
        self.upload_generation += 1;
        let ticket = UploadTicket(self.upload_generation);
        self.pending_upload = Some(ticket);
        self.notice = None;
        Some(ticket)
    }

    pub fn complete_upload(&mut self, ticket: UploadTicket, result: Result<UploadResponse, ApiError>) {
        if self.pending_upload != Some(ticket) {
            log::debug!("Ignoring superseded upload response");
            return;
        }
        self.pending_upload = None;

        match result {
            Ok(resp) => {
                self.attachment = Some(Attachment::from(resp));
            }
            Err(err) => {
                log::error!("Upload failed: {err}");
                self.attachment = None;
                self.notice = Some(err.user_message(UPLOAD_FAILED));
            }
        }
    }

    /// Drops the attachment locally; any upload still in flight is abandoned.
    pub fn remove_attachment(&mut self) {
        self.attachment = None;
        self.pending_upload = None;
        self.upload_generation += 1;
    }

    // ── Send ─────────────────────────────────────────────────────────────────

    /// Captures the current inputs as a chat turn. Returns the request to
    /// dispatch now, or `None` when there is nothing to send or another turn
    /// is still in flight (the new one then waits in the queue).
    ///
    /// While a turn is in flight only newly typed text is queued. The
    /// attachment and manual text stay in place after a send, so a repeated
    /// click would otherwise resend the same document.
    pub fn send(&mut self) -> Option<ChatRequest> {
        if !self.can_send() {
            return None;
        }
        if self.in_flight && self.draft.trim().is_empty() {
            log::debug!("Ignoring send without new text while a turn is in flight");
            return None;
        }

        let prompt = present(&std::mem::take(&mut self.draft));
        let manual_text = present(&self.manual_text);
        let label = match (&prompt, &self.attachment) {
            (Some(text), _) => text.clone(),
            (None, Some(attachment)) => file_label(&attachment.file_name),
            (None, None) => MANUAL_TEXT_LABEL.to_string(),
        };
        let request = ChatRequest {
            prompt,
            file_id: self.attachment.as_ref().map(|a| a.file_id.clone()),
            manual_text,
        };

        self.queue.push_back(QueuedTurn { label, request });
        if self.in_flight {
            return None;
        }
        self.dispatch_next()
    }

    /// Folds the reply for the in-flight turn into the conversation and
    /// returns the next queued request, if any.
    pub fn complete_send(&mut self, result: Result<ChatResponse, ApiError>) -> Option<ChatRequest> {
        if !self.in_flight {
            log::warn!("Chat response arrived with no turn in flight");
            return None;
        }

        let reply = match result {
            Ok(resp) => resp.response,
            Err(err) => {
                log::error!("Chat request failed: {err}");
                format!("Error: {err}")
            }
        };
        self.messages.push(ChatMessage::ai(reply));
        self.draft.clear();
        self.in_flight = false;

        self.dispatch_next()
    }

    fn dispatch_next(&mut self) -> Option<ChatRequest> {
        let mut turn = self.queue.pop_front()?;
        // A turn queued before its attachment was removed must not resend it.
        let current = self.attachment.as_ref().map(|a| a.file_id.as_str());
        if turn.request.file_id.is_some() && turn.request.file_id.as_deref() != current {
            turn.request.file_id = None;
        }

        self.messages.push(ChatMessage::user(turn.label));
        self.in_flight = true;
        Some(turn.request)
    }
}
