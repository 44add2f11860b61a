//! Build-time settings. Override with e.g. `CHAT_API_BASE=http://10.0.0.5:8000 trunk build`.

/// Base URL of the backend API server.
pub const API_BASE: &str = match option_env!("CHAT_API_BASE") {
    Some(url) => url,
    None => "http://localhost:8000",
};

const DEFAULT_POLL_MS: u32 = 10_000;

/// How often the dashboard refreshes the backend status while mounted.
pub fn status_poll_interval_ms() -> u32 {
    option_env!("STATUS_POLL_MS")
        .and_then(|ms| ms.parse().ok())
        .filter(|ms| *ms > 0)
        .unwrap_or(DEFAULT_POLL_MS)
}

pub fn endpoint(path: &str) -> String {
    format!("{}{path}", API_BASE.trim_end_matches('/'))
}
