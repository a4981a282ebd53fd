//! Resolved playback output handed to the player.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use super::item::{Chapter, MediaItem};
use super::source::{MediaSourceCandidate, MediaStream};

/// Stream index sentinel understood by players: no track selected.
pub const NO_STREAM_SELECTED: i32 = -1;

/// Server-issued token scoping one negotiated playback attempt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaySessionId(String);

impl PlaySessionId {
    /// Creates PlaySessionId from the server's token.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the token as sent on the wire.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlaySessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How the server delivers the media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayMethod {
    /// Server re-encodes to a client-compatible format
    Transcode,
    /// Server repackages the container without re-encoding
    DirectStream,
    /// Client consumes the original file unmodified
    DirectPlay,
}

impl fmt::Display for PlayMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayMethod::Transcode => write!(f, "Transcode"),
            PlayMethod::DirectStream => write!(f, "DirectStream"),
            PlayMethod::DirectPlay => write!(f, "DirectPlay"),
        }
    }
}

/// Fully resolved, ready-to-play description of one negotiation's outcome.
///
/// Built once by the resolver and never mutated; `playback_url` is always a
/// valid absolute URL and `play_method` reflects how it was derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackDescriptor {
    pub playback_url: Url,
    pub item: MediaItem,
    pub media_source: MediaSourceCandidate,
    pub play_session_id: PlaySessionId,
    pub video_streams: Vec<MediaStream>,
    pub audio_streams: Vec<MediaStream>,
    pub subtitle_streams: Vec<MediaStream>,
    /// Index into `audio_streams`, `None` when no track is selected
    pub selected_audio_stream: Option<usize>,
    /// Index into `subtitle_streams`, `None` when no track is selected
    pub selected_subtitle_stream: Option<usize>,
    pub chapters: Vec<Chapter>,
    pub play_method: PlayMethod,
}

impl PlaybackDescriptor {
    /// Selected audio index in player form, `-1` meaning none.
    pub fn selected_audio_stream_index(&self) -> i32 {
        to_player_index(self.selected_audio_stream)
    }

    /// Selected subtitle index in player form, `-1` meaning none.
    pub fn selected_subtitle_stream_index(&self) -> i32 {
        to_player_index(self.selected_subtitle_stream)
    }
}

fn to_player_index(index: Option<usize>) -> i32 {
    index
        .and_then(|index| i32::try_from(index).ok())
        .unwrap_or(NO_STREAM_SELECTED)
}
