//! Error types for the sync engine.

use thiserror::Error;

use super::types::PeerId;

/// Errors surfaced by the sync engine and its transport adapter.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Request never reached the backend or the response never arrived.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Backend answered with a non-2xx status.
    #[error("server returned {status}: {detail}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Response body, as far as it could be read.
        detail: String,
    },

    /// Bearer credential missing, expired, or rejected (401/403).
    #[error("authentication rejected with status {status}")]
    Auth {
        /// HTTP status code, 401 or 403.
        status: u16,
    },

    /// Caller-side rejection; no network call was made.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The configured base URL does not parse.
    #[error("invalid base URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// HTTP client construction error.
    #[error("HTTP client error: {0}")]
    Client(String),
}

impl SyncError {
    /// Whether this error must disable all background polling.
    #[must_use]
    pub const fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }

    /// Whether a later identical request could plausibly succeed.
    ///
    /// Transport faults and server-side failures are transient; everything
    /// else needs operator or configuration changes first.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Server { status: 500..=599, .. })
    }
}

/// A failed optimistic send, carrying the operator's text back to the caller.
///
/// The provisional timeline entry has already been rolled back when this is
/// returned; restoring `text` to the input box is the caller's job.
#[derive(Debug, Error)]
#[error("send to {peer} failed: {source}")]
pub struct SendError {
    /// Conversation the send was addressed to.
    pub peer: PeerId,
    /// The exact text the operator typed.
    pub text: String,
    /// Underlying transport or validation error.
    #[source]
    pub source: SyncError,
}
