//! Play method selection, playback URL construction and stream classification.

use url::Url;

use crate::media::{
    ContentKind, MediaItem, MediaSourceCandidate, MediaStream, PlayMethod, PlaySessionId,
    PlaybackDescriptor, StreamKind,
};
use crate::{NegotiationError, Result};

/// Elementary streams partitioned by type, original order preserved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassifiedStreams {
    pub video: Vec<MediaStream>,
    pub audio: Vec<MediaStream>,
    pub subtitle: Vec<MediaStream>,
}

/// Turns a matched media source into a [`PlaybackDescriptor`].
///
/// Pure function of its inputs and the server base URL: resolving the same
/// source with the same play session twice yields the same URL and method.
#[derive(Debug, Clone)]
pub struct PlaybackResolver {
    base_url: Url,
}

impl PlaybackResolver {
    /// Creates a resolver building URLs against `base_url`.
    pub fn new(base_url: Url) -> Self {
        Self { base_url }
    }

    /// Resolves the playback descriptor for `source`.
    ///
    /// # Errors
    /// - `NegotiationError::Protocol` - Transcoding path unusable, HLS offered
    ///   without transcoding or direct play, or stream URL cannot be built
    pub fn resolve(
        &self,
        source: MediaSourceCandidate,
        item: &MediaItem,
        play_session_id: PlaySessionId,
        kind: ContentKind,
    ) -> Result<PlaybackDescriptor> {
        let (playback_url, play_method) =
            self.select_play_method(&source, item, &play_session_id, kind)?;

        tracing::info!(
            "Resolved {} playback for {}: {} via {}",
            kind,
            item.display_name(),
            play_method,
            playback_url
        );

        let streams = Self::classify_streams(&source.media_streams);
        let selected_audio_stream =
            Self::select_index("audio", source.default_audio_stream_index, &streams.audio);
        let selected_subtitle_stream = Self::select_index(
            "subtitle",
            source.default_subtitle_stream_index,
            &streams.subtitle,
        );

        Ok(PlaybackDescriptor {
            playback_url,
            item: item.clone(),
            media_source: source,
            play_session_id,
            video_streams: streams.video,
            audio_streams: streams.audio,
            subtitle_streams: streams.subtitle,
            selected_audio_stream,
            selected_subtitle_stream,
            chapters: item.resolved_chapters(),
            play_method,
        })
    }

    /// First matching rule wins; see the module docs of `negotiation`.
    fn select_play_method(
        &self,
        source: &MediaSourceCandidate,
        item: &MediaItem,
        play_session_id: &PlaySessionId,
        kind: ContentKind,
    ) -> Result<(Url, PlayMethod)> {
        if let Some(transcoding_url) = &source.transcoding_url {
            let url = self.resolve_server_path(transcoding_url)?;
            return Ok((url, PlayMethod::Transcode));
        }

        match kind {
            ContentKind::OnDemand => {
                if source.is_hls() && !source.direct_play_supported() {
                    tracing::error!(
                        "HLS source {} requires transcoding but none was offered",
                        source.id
                    );
                    return Err(NegotiationError::protocol(
                        "HLS content requires a transcoding URL but none was provided",
                    ));
                }
            }
            ContentKind::Live => {
                if source.direct_play_supported()
                    && let Some(url) = source.path.as_deref().and_then(|p| Url::parse(p).ok())
                {
                    return Ok((url, PlayMethod::DirectPlay));
                }
            }
        }

        let url = self.build_stream_url(item, play_session_id, source)?;
        Ok((url, PlayMethod::DirectPlay))
    }

    /// Resolve a server-provided path against the base URL.
    ///
    /// Absolute URLs are taken as-is; anything else is appended to the base
    /// URL so servers hosted under a path prefix keep that prefix.
    pub(crate) fn resolve_server_path(&self, path: &str) -> Result<Url> {
        if has_scheme(path) {
            return Url::parse(path).map_err(|e| {
                NegotiationError::protocol(format!("Unusable transcoding URL '{path}': {e}"))
            });
        }

        let base = self.base_url.as_str().trim_end_matches('/');
        let separator = if path.starts_with('/') { "" } else { "/" };
        Url::parse(&format!("{base}{separator}{path}")).map_err(|e| {
            NegotiationError::protocol(format!("Unusable transcoding path '{path}': {e}"))
        })
    }

    /// Build the static stream URL for direct play.
    pub(crate) fn build_stream_url(
        &self,
        item: &MediaItem,
        play_session_id: &PlaySessionId,
        source: &MediaSourceCandidate,
    ) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                NegotiationError::protocol(format!(
                    "Unable to build stream URL from server URL {}",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(["Videos", item.id.as_str(), "stream"]);

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("static", "true");
            if let Some(etag) = &item.etag {
                query.append_pair("tag", etag);
            }
            query
                .append_pair("playSessionId", play_session_id.as_str())
                .append_pair("mediaSourceId", &source.id);
        }

        Ok(url)
    }

    /// Partition streams by type tag, dropping unrecognized types.
    pub fn classify_streams(streams: &[MediaStream]) -> ClassifiedStreams {
        let mut classified = ClassifiedStreams::default();

        for stream in streams {
            match stream.kind {
                StreamKind::Video => classified.video.push(stream.clone()),
                StreamKind::Audio => classified.audio.push(stream.clone()),
                StreamKind::Subtitle => classified.subtitle.push(stream.clone()),
                StreamKind::Other => {}
            }
        }

        classified
    }

    /// Position in `streams` of the declared default stream.
    ///
    /// Servers declare defaults by `MediaStream.index`. Streams without any
    /// index fall back to treating the declared value as a position.
    fn select_index(
        track: &str,
        declared: Option<i32>,
        streams: &[MediaStream],
    ) -> Option<usize> {
        let declared = declared.filter(|&declared| declared >= 0)?;

        let position = if streams.iter().any(|stream| stream.index.is_some()) {
            streams
                .iter()
                .position(|stream| stream.index == Some(declared))
        } else {
            usize::try_from(declared)
                .ok()
                .filter(|&position| position < streams.len())
        };

        if position.is_none() {
            tracing::warn!(
                "Default {} stream {} not among {} classified streams, selecting none",
                track,
                declared,
                streams.len()
            );
        }

        position
    }
}

/// Whether `path` starts with a URL scheme such as `https://`.
fn has_scheme(path: &str) -> bool {
    path.split_once("://").is_some_and(|(scheme, _)| {
        scheme.starts_with(|c: char| c.is_ascii_alphabetic())
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    })
}
