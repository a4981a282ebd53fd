//! Authenticated session transport to the media server.
//!
//! The engine only ever talks to the server through [`SessionTransport`]; the
//! reqwest-backed [`HttpSessionTransport`] is the production implementation.
//! Implementations are shared across concurrent negotiations and must not
//! retry on their own.

pub mod client;
pub mod types;

use async_trait::async_trait;
use url::Url;

pub use client::HttpSessionTransport;
pub use types::{PlaybackInfoBody, PlaybackInfoRequest, PlaybackInfoResponse};

/// Failures reported by a session transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Request to {url} failed: {reason}")]
    RequestFailed { url: String, reason: String },

    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("Server returned status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Failed to decode response from {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("HTTP client setup failed: {reason}")]
    ClientSetup { reason: String },
}

/// Session collaborator issuing requests on behalf of an authenticated user.
#[async_trait]
pub trait SessionTransport: Send + Sync {
    /// Server base URL that relative paths are resolved against.
    fn base_url(&self) -> &Url;

    /// Identity of the authenticated user.
    fn user_id(&self) -> &str;

    /// Downloads a bitrate probe payload of `size_bytes` to completion.
    ///
    /// Returns the number of bytes actually received.
    ///
    /// # Errors
    /// - `TransportError::RequestFailed` - Connection or body read failure
    /// - `TransportError::Timeout` - Transport timeout elapsed
    /// - `TransportError::Status` - Non-success HTTP status
    async fn download_probe(&self, size_bytes: u64) -> Result<u64, TransportError>;

    /// Sends a playback-info request and decodes the server's answer.
    ///
    /// # Errors
    /// - `TransportError::RequestFailed` - Connection or body read failure
    /// - `TransportError::Timeout` - Transport timeout elapsed
    /// - `TransportError::Status` - Non-success HTTP status
    /// - `TransportError::Decode` - Response body is not a playback-info document
    async fn post_playback_info(
        &self,
        request: &PlaybackInfoRequest,
    ) -> Result<PlaybackInfoResponse, TransportError>;
}
