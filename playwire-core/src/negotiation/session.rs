//! Playback-info exchange with the server.

use std::sync::Arc;

use crate::media::{ContentKind, MediaItem, MediaSourceCandidate, PlaySessionId};
use crate::profile::CapabilityProfile;
use crate::transport::{PlaybackInfoBody, PlaybackInfoRequest, SessionTransport};
use crate::{NegotiationError, Result};

/// Candidates and session token returned by one playback-info exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct NegotiatedSources {
    pub candidates: Vec<MediaSourceCandidate>,
    pub play_session_id: PlaySessionId,
}

/// Sends exactly one playback-info request per negotiation.
///
/// Does not pick a candidate; that is the matcher's job.
pub struct NegotiationSession {
    transport: Arc<dyn SessionTransport>,
}

impl NegotiationSession {
    /// Creates a session over a shared transport.
    pub fn new(transport: Arc<dyn SessionTransport>) -> Self {
        Self { transport }
    }

    /// Builds the playback-info request for `requested_source`.
    ///
    /// HLS sources always disable direct play and direct stream so the server
    /// is forced to return a transcoding URL, whatever `allow_direct_play` says.
    /// Live requests carry no media source hint because live source identities
    /// are assigned by the server when the stream is opened.
    pub fn build_request(
        &self,
        item: &MediaItem,
        requested_source: &MediaSourceCandidate,
        profile: CapabilityProfile,
        max_bitrate: u64,
        allow_direct_play: bool,
        kind: ContentKind,
    ) -> PlaybackInfoRequest {
        let hls = requested_source.is_hls();
        if hls && allow_direct_play {
            tracing::debug!(
                "Source {} is HLS, disabling direct play to force transcoding",
                requested_source.id
            );
        }
        let enable_direct = allow_direct_play && !hls;

        let media_source_id = match kind {
            ContentKind::OnDemand => Some(requested_source.id.clone()),
            ContentKind::Live => None,
        };

        PlaybackInfoRequest {
            item_id: item.id.clone(),
            user_id: self.transport.user_id().to_string(),
            max_streaming_bitrate: max_bitrate,
            media_source_id,
            body: PlaybackInfoBody {
                device_profile: profile,
                enable_direct_play: enable_direct,
                enable_direct_stream: enable_direct,
            },
        }
    }

    /// Sends the playback-info request and validates the response.
    ///
    /// # Errors
    /// - `NegotiationError::Network` - Transport failure
    /// - `NegotiationError::Protocol` - Server refused playback, sent an
    ///   undecodable body, or omitted the play session id
    pub async fn negotiate(
        &self,
        item: &MediaItem,
        requested_source: &MediaSourceCandidate,
        profile: CapabilityProfile,
        max_bitrate: u64,
        allow_direct_play: bool,
        kind: ContentKind,
    ) -> Result<NegotiatedSources> {
        let request = self.build_request(
            item,
            requested_source,
            profile,
            max_bitrate,
            allow_direct_play,
            kind,
        );

        let response = self.transport.post_playback_info(&request).await?;

        tracing::info!(
            "Playback info for {} returned {} media sources",
            item.display_name(),
            response.media_sources.len()
        );
        for (index, source) in response.media_sources.iter().enumerate() {
            tracing::debug!(
                "Media source {}: id={}, container={}, transcoding_url={}",
                index,
                source.id,
                source.container.as_deref().unwrap_or("none"),
                if source.transcoding_url.is_some() { "present" } else { "none" }
            );
        }

        if let Some(code) = response.error_code {
            return Err(NegotiationError::protocol(format!(
                "Server refused playback: {code}"
            )));
        }

        let play_session_id = response
            .play_session_id
            .filter(|id| !id.is_empty())
            .map(PlaySessionId::new)
            .ok_or_else(|| {
                NegotiationError::protocol("Playback info response has no play session id")
            })?;

        Ok(NegotiatedSources {
            candidates: response.media_sources,
            play_session_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::testing::ScriptedTransport;
    use crate::transport::PlaybackInfoResponse;

    fn profile() -> CapabilityProfile {
        CapabilityProfile::new(json!({"Name": "test"}))
    }

    fn response(play_session_id: Option<&str>) -> PlaybackInfoResponse {
        PlaybackInfoResponse {
            media_sources: vec![MediaSourceCandidate::new("src-1")],
            play_session_id: play_session_id.map(str::to_string),
            error_code: None,
        }
    }

    #[test]
    fn test_hls_forces_direct_toggles_off() {
        let session = NegotiationSession::new(Arc::new(ScriptedTransport::new()));
        let item = MediaItem::new("item-1");
        let source = MediaSourceCandidate::new("src-1").with_container("HLS");

        for kind in [ContentKind::OnDemand, ContentKind::Live] {
            let request = session.build_request(&item, &source, profile(), 1, true, kind);

            assert!(!request.body.enable_direct_play, "{kind}");
            assert!(!request.body.enable_direct_stream, "{kind}");
        }
    }

    #[test]
    fn test_request_carries_identity_and_hint() {
        let session = NegotiationSession::new(Arc::new(ScriptedTransport::new()));
        let item = MediaItem::new("item-1");
        let source = MediaSourceCandidate::new("src-1").with_container("mkv");

        let request = session.build_request(
            &item,
            &source,
            profile(),
            8_000_000,
            true,
            ContentKind::OnDemand,
        );

        assert_eq!(request.user_id, "user-1");
        assert_eq!(request.item_id.as_str(), "item-1");
        assert_eq!(request.max_streaming_bitrate, 8_000_000);
        assert_eq!(request.media_source_id.as_deref(), Some("src-1"));
        assert!(request.body.enable_direct_play);
        assert!(request.body.enable_direct_stream);
        assert_eq!(request.body.device_profile, profile());
    }

    #[test]
    fn test_caller_can_disable_direct_play() {
        let session = NegotiationSession::new(Arc::new(ScriptedTransport::new()));
        let item = MediaItem::new("item-1");
        let source = MediaSourceCandidate::new("src-1").with_container("mp4");

        let request = session.build_request(&item, &source, profile(), 1, false, ContentKind::Live);

        assert!(!request.body.enable_direct_play);
        assert!(request.media_source_id.is_none());
    }

    #[tokio::test]
    async fn test_negotiate_sends_single_request() {
        let transport =
            Arc::new(ScriptedTransport::new().with_response(response(Some("play-1"))));
        let session = NegotiationSession::new(transport.clone());

        let negotiated = session
            .negotiate(
                &MediaItem::new("item-1"),
                &MediaSourceCandidate::new("src-1"),
                profile(),
                1,
                true,
                ContentKind::OnDemand,
            )
            .await
            .unwrap();

        assert_eq!(negotiated.play_session_id.as_str(), "play-1");
        assert_eq!(negotiated.candidates.len(), 1);
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_play_session_is_protocol_error() {
        for play_session_id in [None, Some("")] {
            let transport =
                Arc::new(ScriptedTransport::new().with_response(response(play_session_id)));
            let session = NegotiationSession::new(transport);

            let result = session
                .negotiate(
                    &MediaItem::new("item-1"),
                    &MediaSourceCandidate::new("src-1"),
                    profile(),
                    1,
                    true,
                    ContentKind::OnDemand,
                )
                .await;

            assert!(matches!(result, Err(NegotiationError::Protocol { .. })));
        }
    }

    #[tokio::test]
    async fn test_server_error_code_is_protocol_error() {
        let mut refused = response(Some("play-1"));
        refused.error_code = Some("NotAllowed".to_string());
        let session =
            NegotiationSession::new(Arc::new(ScriptedTransport::new().with_response(refused)));

        let error = session
            .negotiate(
                &MediaItem::new("item-1"),
                &MediaSourceCandidate::new("src-1"),
                profile(),
                1,
                true,
                ContentKind::OnDemand,
            )
            .await
            .unwrap_err();

        assert!(error.to_string().contains("NotAllowed"));
    }

    #[tokio::test]
    async fn test_transport_failure_is_network_error() {
        let session =
            NegotiationSession::new(Arc::new(ScriptedTransport::new().with_status_error(503)));

        let error = session
            .negotiate(
                &MediaItem::new("item-1"),
                &MediaSourceCandidate::new("src-1"),
                profile(),
                1,
                true,
                ContentKind::OnDemand,
            )
            .await
            .unwrap_err();

        assert!(error.is_network_error());
    }
}
