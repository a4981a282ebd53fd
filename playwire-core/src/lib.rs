//! Playwire Core - playback negotiation against Jellyfin-style media servers
//!
//! Given a media item and the media source a user picked, this crate works out
//! how the server will actually deliver it (direct play or transcode), at what
//! bitrate, and produces a ready-to-play [`PlaybackDescriptor`].
//!
//! The pipeline is strictly sequential: bitrate estimation, capability profile,
//! playback-info request, source matching, URL resolution. Everything outside
//! that pipeline (authentication, UI, library browsing) is a collaborator.

pub mod bitrate;
pub mod config;
pub mod media;
pub mod negotiation;
pub mod profile;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;
pub mod tracing_setup;
pub mod transport;

// Re-export main types for convenient access
pub use bitrate::{BitrateCeiling, BitrateEstimator};
pub use config::{NetworkConfig, PlaybackConfig, PlaywireConfig};
pub use media::{
    Chapter, ChapterInfo, ContentKind, ItemId, MediaItem, MediaSourceCandidate, MediaStream,
    PlayMethod, PlaySessionId, PlaybackDescriptor, StreamKind,
};
pub use negotiation::{NegotiationSession, PlaybackNegotiator, PlaybackResolver, SourceMatcher};
pub use profile::{
    BasicProfileProvider, CapabilityProfile, CapabilityProfileProvider, CompatibilityMode,
    PlayerType,
};
pub use transport::{HttpSessionTransport, SessionTransport, TransportError};

/// Errors that abort a playback negotiation.
///
/// Every failure is fatal to the negotiation in progress; there is no degraded
/// descriptor. Callers decide whether to retry the whole negotiation.
#[derive(Debug, thiserror::Error)]
pub enum NegotiationError {
    #[error("Network error: {source}")]
    Network {
        #[source]
        source: TransportError,
    },

    #[error("Protocol error: {reason}")]
    Protocol { reason: String },

    #[error("No server media source matches requested source {media_source_id}")]
    SourceMismatch { media_source_id: String },

    #[error("Configuration error: {reason}")]
    Configuration { reason: String },
}

impl NegotiationError {
    /// Returns a user-facing playback failure message.
    ///
    /// Distinguishes connectivity trouble from content that cannot be played,
    /// without leaking protocol details.
    pub fn user_message(&self) -> String {
        match self {
            NegotiationError::Network { .. } => {
                "Unable to reach the media server. Check your connection and try again."
                    .to_string()
            }
            NegotiationError::Protocol { .. } | NegotiationError::SourceMismatch { .. } => {
                "This content cannot be played.".to_string()
            }
            NegotiationError::Configuration { .. } => {
                "Playback settings are invalid.".to_string()
            }
        }
    }

    /// Checks whether retrying the whole negotiation could succeed.
    pub fn is_network_error(&self) -> bool {
        matches!(self, NegotiationError::Network { .. })
    }

    pub(crate) fn protocol(reason: impl Into<String>) -> Self {
        NegotiationError::Protocol {
            reason: reason.into(),
        }
    }
}

impl From<TransportError> for NegotiationError {
    fn from(source: TransportError) -> Self {
        match source {
            // A body the server sent but we cannot understand is a protocol violation.
            TransportError::Decode { url, reason } => NegotiationError::Protocol {
                reason: format!("Malformed response from {url}: {reason}"),
            },
            source => NegotiationError::Network { source },
        }
    }
}

pub type Result<T> = std::result::Result<T, NegotiationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_errors_are_network_errors() {
        let error: NegotiationError = TransportError::Timeout {
            url: "http://media.local/Playback/BitrateTest".to_string(),
        }
        .into();

        assert!(error.is_network_error());
        assert!(error.user_message().contains("media server"));
    }

    #[test]
    fn test_decode_errors_are_protocol_errors() {
        let error: NegotiationError = TransportError::Decode {
            url: "http://media.local/Items/1/PlaybackInfo".to_string(),
            reason: "expected value at line 1".to_string(),
        }
        .into();

        assert!(matches!(error, NegotiationError::Protocol { .. }));
        assert!(!error.is_network_error());
    }

    #[test]
    fn test_playability_errors_share_user_message() {
        let protocol = NegotiationError::protocol("missing play session id");
        let mismatch = NegotiationError::SourceMismatch {
            media_source_id: "abc".to_string(),
        };

        assert!(!protocol.is_network_error());
        assert_eq!(protocol.user_message(), mismatch.user_message());
        assert_eq!(
            mismatch.to_string(),
            "No server media source matches requested source abc"
        );
    }
}
