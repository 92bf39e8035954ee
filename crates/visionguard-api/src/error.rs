use thiserror::Error;

/// Top-level error type for the `visionguard-api` crate.
///
/// Covers every failure mode across the REST and SSE surfaces.
/// `visionguard-core` maps these into view-level states.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The backend rejected the request with 401. The session cookie is
    /// missing, expired, or revoked -- a fresh login is required.
    #[error("Unauthorized -- re-authentication required")]
    Unauthorized,

    /// A mutating call was attempted without a `csrf_token` cookie in the
    /// live cookie store. Raised locally, before any network traffic.
    #[error("Missing anti-forgery token -- call ensure_csrf() first")]
    MissingCsrfToken,

    // ── Local validation ────────────────────────────────────────────
    /// A required field was empty before submit. Never sent to the server.
    #[error("Validation failed: `{field}` is required")]
    Validation { field: &'static str },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS configuration or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Server ──────────────────────────────────────────────────────
    /// Non-success response from the backend. The body's `error` field is
    /// surfaced when present, otherwise the raw body.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    // ── SSE stream ──────────────────────────────────────────────────
    /// The event-stream connection could not be established or dropped
    /// mid-read. Classified transient; the stream client retries.
    #[error("Event stream error: {0}")]
    StreamConnect(String),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this error means the session is gone and
    /// re-authentication might resolve it.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    /// Returns `true` if this is a transient fault worth retrying.
    ///
    /// Auth failures and validation errors are terminal; retrying them
    /// in a loop would never succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::StreamConnect(_) => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
