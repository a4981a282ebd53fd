//! Playback negotiation pipeline.
//!
//! One negotiation runs these steps in order, each feeding the next:
//!
//! 1. resolve the bitrate ceiling (fixed, or probed in auto mode)
//! 2. build the capability profile for that ceiling
//! 3. send the playback-info request ([`NegotiationSession`])
//! 4. match the requested source among the returned candidates ([`SourceMatcher`])
//! 5. pick the play method and playback URL ([`PlaybackResolver`])
//!
//! Play method rules, first match wins:
//!
//! | Content   | Rule                                                   | Result      |
//! |-----------|--------------------------------------------------------|-------------|
//! | any       | transcoding URL present                                | Transcode   |
//! | on-demand | HLS container without direct play support              | error       |
//! | live      | direct play supported and path parses as a URL         | DirectPlay  |
//! | any       | otherwise, static stream URL                           | DirectPlay  |
//!
//! The only suspension points are the two network calls. Dropping the future
//! returned by [`PlaybackNegotiator::negotiate_playback`] aborts whichever one
//! is in flight and no descriptor is produced.

pub mod matcher;
pub mod resolver;
pub mod session;

use std::sync::Arc;

pub use matcher::SourceMatcher;
pub use resolver::{ClassifiedStreams, PlaybackResolver};
pub use session::{NegotiatedSources, NegotiationSession};

use crate::Result;
use crate::bitrate::BitrateEstimator;
use crate::config::PlaybackConfig;
use crate::media::{ContentKind, MediaItem, MediaSourceCandidate, PlaybackDescriptor};
use crate::profile::CapabilityProfileProvider;
use crate::transport::SessionTransport;

/// Entry point used by playback surfaces.
///
/// Holds only shared, read-only collaborators; concurrent negotiations for
/// different items need no coordination.
pub struct PlaybackNegotiator {
    transport: Arc<dyn SessionTransport>,
    profiles: Arc<dyn CapabilityProfileProvider>,
    config: PlaybackConfig,
}

impl PlaybackNegotiator {
    /// Creates a negotiator over an authenticated session.
    pub fn new(
        transport: Arc<dyn SessionTransport>,
        profiles: Arc<dyn CapabilityProfileProvider>,
        config: PlaybackConfig,
    ) -> Self {
        Self {
            transport,
            profiles,
            config,
        }
    }

    /// Returns the playback settings in use.
    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    /// Negotiates playback of `media_source` for `item`.
    ///
    /// # Errors
    /// - `NegotiationError::Configuration` - Auto bitrate with a zero probe size
    /// - `NegotiationError::Network` - Probe or playback-info request failed
    /// - `NegotiationError::Protocol` - Server response violates the negotiation
    /// - `NegotiationError::SourceMismatch` - Requested source not among the candidates
    pub async fn negotiate_playback(
        &self,
        item: &MediaItem,
        media_source: &MediaSourceCandidate,
        kind: ContentKind,
    ) -> Result<PlaybackDescriptor> {
        tracing::info!(
            "Negotiating {} playback of {} (source {})",
            kind,
            item.display_name(),
            media_source.id
        );

        let estimator = BitrateEstimator::from_config(Arc::clone(&self.transport), &self.config);
        let max_bitrate = estimator.resolve(self.config.bitrate).await?;

        let profile = self.profiles.build(
            self.config.player_type,
            self.config.compatibility_mode,
            max_bitrate,
        );

        let session = NegotiationSession::new(Arc::clone(&self.transport));
        let negotiated = session
            .negotiate(
                item,
                media_source,
                profile,
                max_bitrate,
                self.config.allow_direct_play,
                kind,
            )
            .await?;

        let matched = SourceMatcher::new(kind).select(media_source, negotiated.candidates)?;

        PlaybackResolver::new(self.transport.base_url().clone()).resolve(
            matched,
            item,
            negotiated.play_session_id,
            kind,
        )
    }
}
