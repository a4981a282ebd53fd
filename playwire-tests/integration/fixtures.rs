//! Shared builders for integration scenarios.

use std::sync::Arc;

use playwire_core::testing::{ScriptedTransport, StaticProfileProvider};
use playwire_core::transport::PlaybackInfoResponse;
use playwire_core::{
    BitrateCeiling, MediaItem, MediaSourceCandidate, MediaStream, PlaybackConfig,
    PlaybackNegotiator, StreamKind,
};

pub const PLAY_SESSION: &str = "play-session-1";

/// Movie with an entity tag, as loaded from the library.
pub fn movie() -> MediaItem {
    MediaItem::new("movie-1")
        .with_name("Big Buck Bunny")
        .with_etag("item-etag")
}

/// Channel item for live TV scenarios.
pub fn channel() -> MediaItem {
    MediaItem::new("channel-7").with_name("Channel 7")
}

/// Source with a typical video/audio/subtitle layout.
pub fn source(id: &str, etag: &str, container: &str) -> MediaSourceCandidate {
    MediaSourceCandidate {
        default_audio_stream_index: Some(0),
        media_streams: vec![
            MediaStream::new(StreamKind::Video, "h264"),
            MediaStream::new(StreamKind::Audio, "aac"),
            MediaStream::new(StreamKind::Subtitle, "subrip"),
        ],
        ..MediaSourceCandidate::new(id)
            .with_etag(etag)
            .with_container(container)
    }
}

pub fn response(sources: Vec<MediaSourceCandidate>) -> PlaybackInfoResponse {
    PlaybackInfoResponse {
        media_sources: sources,
        play_session_id: Some(PLAY_SESSION.to_string()),
        error_code: None,
    }
}

pub fn negotiator(
    transport: Arc<ScriptedTransport>,
    bitrate: BitrateCeiling,
) -> PlaybackNegotiator {
    PlaybackNegotiator::new(
        transport,
        Arc::new(StaticProfileProvider::new()),
        PlaybackConfig {
            bitrate,
            probe_size_bytes: 500_000,
            ..Default::default()
        },
    )
}
