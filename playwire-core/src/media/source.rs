//! Media source candidates and their elementary streams.

use serde::{Deserialize, Serialize};

/// Elementary stream type tag.
///
/// The server reports more kinds than players consume (embedded images, data
/// tracks); those all decode as `Other` and are dropped during classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StreamKind {
    Video,
    Audio,
    Subtitle,
    #[serde(other)]
    Other,
}

/// One elementary stream inside a media source.
///
/// Beyond the type tag the metadata is passed through to the player untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MediaStream {
    #[serde(rename = "Type")]
    pub kind: StreamKind,
    #[serde(default)]
    pub index: Option<i32>,
    #[serde(default)]
    pub codec: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub display_title: Option<String>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub is_external: bool,
}

impl MediaStream {
    /// Creates a stream with only its type tag and codec set.
    pub fn new(kind: StreamKind, codec: impl Into<String>) -> Self {
        Self {
            kind,
            index: None,
            codec: Some(codec.into()),
            language: None,
            display_title: None,
            is_default: false,
            is_external: false,
        }
    }
}

/// One deliverable rendition of an item.
///
/// The caller's requested source and the sources the server returns share this
/// shape; matching reconciles the former against a list of the latter.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MediaSourceCandidate {
    pub id: String,
    #[serde(rename = "ETag", default)]
    pub etag: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub container: Option<String>,
    #[serde(default)]
    pub supports_direct_play: Option<bool>,
    #[serde(default)]
    pub supports_direct_stream: Option<bool>,
    /// Server-relative transcoding URL, present when the server chose to transcode
    #[serde(default)]
    pub transcoding_url: Option<String>,
    /// Session token assigned when a live source is opened
    #[serde(default)]
    pub open_token: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub default_audio_stream_index: Option<i32>,
    #[serde(default)]
    pub default_subtitle_stream_index: Option<i32>,
    #[serde(default)]
    pub media_streams: Vec<MediaStream>,
}

impl MediaSourceCandidate {
    /// Creates a candidate with only its identifier set.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Sets the entity tag.
    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }

    /// Sets the container format.
    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = Some(container.into());
        self
    }

    /// Returns whether the container is HLS, which the server can only transcode.
    pub fn is_hls(&self) -> bool {
        self.container
            .as_deref()
            .is_some_and(|container| container.eq_ignore_ascii_case("hls"))
    }

    /// Direct play support; an absent flag counts as unsupported.
    pub fn direct_play_supported(&self) -> bool {
        self.supports_direct_play.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hls_detection_ignores_case() {
        assert!(MediaSourceCandidate::new("a").with_container("HLS").is_hls());
        assert!(MediaSourceCandidate::new("a").with_container("hls").is_hls());
        assert!(!MediaSourceCandidate::new("a").with_container("mp4").is_hls());
        assert!(!MediaSourceCandidate::new("a").is_hls());
    }

    #[test]
    fn test_decode_server_media_source() {
        let json = r#"{
            "Id": "src-1",
            "ETag": "etag-9",
            "Container": "mkv",
            "SupportsDirectPlay": false,
            "TranscodingUrl": "/videos/1/master.m3u8?PlaySessionId=p",
            "DefaultAudioStreamIndex": 1,
            "MediaStreams": [
                {"Type": "Video", "Codec": "h264", "Index": 0},
                {"Type": "Audio", "Codec": "aac", "Index": 1, "Language": "eng"},
                {"Type": "EmbeddedImage", "Codec": "png", "Index": 2}
            ]
        }"#;

        let source: MediaSourceCandidate = serde_json::from_str(json).unwrap();

        assert_eq!(source.etag.as_deref(), Some("etag-9"));
        assert!(!source.direct_play_supported());
        assert_eq!(source.default_audio_stream_index, Some(1));
        assert_eq!(source.default_subtitle_stream_index, None);
        assert_eq!(source.media_streams[2].kind, StreamKind::Other);
        assert_eq!(source.media_streams[1].language.as_deref(), Some("eng"));
    }
}
