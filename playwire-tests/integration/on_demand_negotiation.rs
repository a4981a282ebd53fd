//! On-demand negotiation through the full pipeline.

use std::sync::Arc;
use std::time::Duration;

use playwire_core::testing::ScriptedTransport;
use playwire_core::{
    BitrateCeiling, ChapterInfo, ContentKind, MediaItem, MediaSourceCandidate, MediaStream,
    NegotiationError, PlayMethod, StreamKind,
};

use crate::fixtures::{PLAY_SESSION, movie, negotiator, response, source};

#[tokio::test]
async fn test_direct_play_of_matching_source() {
    let requested = source("src-b", "etag-b", "mp4");
    let transport = Arc::new(ScriptedTransport::new().with_response(response(vec![
        source("src-a", "etag-a", "mkv"),
        requested.clone(),
    ])));
    let negotiator = negotiator(transport.clone(), BitrateCeiling::Fixed(40_000_000));

    let descriptor = negotiator
        .negotiate_playback(&movie(), &requested, ContentKind::OnDemand)
        .await
        .unwrap();

    assert_eq!(descriptor.play_method, PlayMethod::DirectPlay);
    assert_eq!(descriptor.media_source.id, "src-b");
    assert_eq!(descriptor.play_session_id.as_str(), PLAY_SESSION);
    assert_eq!(
        descriptor.playback_url.as_str(),
        "http://media.local:8096/Videos/movie-1/stream?static=true&tag=item-etag&playSessionId=play-session-1&mediaSourceId=src-b"
    );
    assert_eq!(descriptor.video_streams.len(), 1);
    assert_eq!(descriptor.audio_streams.len(), 1);
    assert_eq!(descriptor.subtitle_streams.len(), 1);
    assert_eq!(descriptor.selected_audio_stream_index(), 0);
    assert_eq!(descriptor.selected_subtitle_stream_index(), -1);

    let request = &transport.requests()[0];
    assert_eq!(request.media_source_id.as_deref(), Some("src-b"));
    assert!(request.body.enable_direct_play);
}

#[tokio::test]
async fn test_hls_source_negotiates_transcode() {
    let requested = source("src-hls", "etag-h", "hls");
    let offered = MediaSourceCandidate {
        transcoding_url: Some("/videos/movie-1/master.m3u8?PlaySessionId=play-session-1".into()),
        ..requested.clone()
    };
    let transport = Arc::new(ScriptedTransport::new().with_response(response(vec![offered])));
    let negotiator = negotiator(transport.clone(), BitrateCeiling::Fixed(8_000_000));

    let descriptor = negotiator
        .negotiate_playback(&movie(), &requested, ContentKind::OnDemand)
        .await
        .unwrap();

    assert_eq!(descriptor.play_method, PlayMethod::Transcode);
    assert_eq!(
        descriptor.playback_url.path(),
        "/videos/movie-1/master.m3u8"
    );

    let request = &transport.requests()[0];
    assert!(!request.body.enable_direct_play);
    assert!(!request.body.enable_direct_stream);
}

#[tokio::test]
async fn test_hls_without_transcoding_offer_fails() {
    let requested = source("src-hls", "etag-h", "hls");
    let transport =
        Arc::new(ScriptedTransport::new().with_response(response(vec![requested.clone()])));
    let negotiator = negotiator(transport, BitrateCeiling::Fixed(8_000_000));

    let error = negotiator
        .negotiate_playback(&movie(), &requested, ContentKind::OnDemand)
        .await
        .unwrap_err();

    assert!(matches!(error, NegotiationError::Protocol { .. }));
    assert_eq!(error.user_message(), "This content cannot be played.");
}

#[tokio::test]
async fn test_etag_mismatch_is_not_guessed() {
    let requested = source("src-b", "etag-z", "mp4");
    let transport = Arc::new(ScriptedTransport::new().with_response(response(vec![
        source("src-a", "etag-a", "mp4"),
        source("src-b", "etag-y", "mp4"),
    ])));
    let negotiator = negotiator(transport, BitrateCeiling::Fixed(8_000_000));

    let error = negotiator
        .negotiate_playback(&movie(), &requested, ContentKind::OnDemand)
        .await
        .unwrap_err();

    assert!(matches!(error, NegotiationError::SourceMismatch { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_auto_bitrate_clamped_into_request() {
    let requested = source("src-b", "etag-b", "mp4");
    let transport = Arc::new(
        ScriptedTransport::new()
            .with_probe_delay(Duration::from_micros(1))
            .with_response(response(vec![requested.clone()])),
    );
    let negotiator = negotiator(transport.clone(), BitrateCeiling::Auto);

    negotiator
        .negotiate_playback(&movie(), &requested, ContentKind::OnDemand)
        .await
        .unwrap();

    assert_eq!(transport.probe_sizes(), vec![500_000]);
    assert_eq!(
        transport.requests()[0].max_streaming_bitrate,
        negotiator.config().max_bitrate
    );
}

#[tokio::test(start_paused = true)]
async fn test_auto_bitrate_measured_from_probe() {
    let requested = source("src-b", "etag-b", "mp4");
    let transport = Arc::new(
        ScriptedTransport::new()
            .with_probe_delay(Duration::from_millis(500))
            .with_response(response(vec![requested.clone()])),
    );
    let negotiator = negotiator(transport.clone(), BitrateCeiling::Auto);

    negotiator
        .negotiate_playback(&movie(), &requested, ContentKind::OnDemand)
        .await
        .unwrap();

    // 500 kB in half a second
    assert_eq!(transport.requests()[0].max_streaming_bitrate, 8_000_000);
}

#[tokio::test]
async fn test_network_and_protocol_failures_are_distinguished() {
    let requested = source("src-b", "etag-b", "mp4");

    let unavailable = negotiator(
        Arc::new(ScriptedTransport::new().with_status_error(502)),
        BitrateCeiling::Fixed(1),
    );
    let error = unavailable
        .negotiate_playback(&movie(), &requested, ContentKind::OnDemand)
        .await
        .unwrap_err();
    assert!(error.is_network_error());

    let garbled = negotiator(
        Arc::new(ScriptedTransport::new().with_malformed_response()),
        BitrateCeiling::Fixed(1),
    );
    let error = garbled
        .negotiate_playback(&movie(), &requested, ContentKind::OnDemand)
        .await
        .unwrap_err();
    assert!(matches!(error, NegotiationError::Protocol { .. }));
}

#[tokio::test]
async fn test_probe_failure_aborts_before_request() {
    let requested = source("src-b", "etag-b", "mp4");
    let transport = Arc::new(
        ScriptedTransport::new()
            .with_probe_failure()
            .with_response(response(vec![requested.clone()])),
    );
    let negotiator = negotiator(transport.clone(), BitrateCeiling::Auto);

    let error = negotiator
        .negotiate_playback(&movie(), &requested, ContentKind::OnDemand)
        .await
        .unwrap_err();

    assert!(error.is_network_error());
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_descriptor_carries_chapters_and_skips_unknown_streams() {
    let mut requested = source("src-b", "etag-b", "mkv");
    requested.media_streams.insert(1, MediaStream::new(StreamKind::Other, "bin_data"));
    requested.default_subtitle_stream_index = Some(0);

    let item = MediaItem {
        run_time_ticks: Some(90 * 10_000_000),
        chapters: Some(vec![
            ChapterInfo {
                start_position_ticks: 0,
                name: Some("Opening".into()),
                image_tag: None,
            },
            ChapterInfo {
                start_position_ticks: 30 * 10_000_000,
                name: Some("Middle".into()),
                image_tag: None,
            },
        ]),
        ..movie()
    };
    let transport =
        Arc::new(ScriptedTransport::new().with_response(response(vec![requested.clone()])));
    let negotiator = negotiator(transport, BitrateCeiling::Fixed(8_000_000));

    let descriptor = negotiator
        .negotiate_playback(&item, &requested, ContentKind::OnDemand)
        .await
        .unwrap();

    let total = descriptor.video_streams.len()
        + descriptor.audio_streams.len()
        + descriptor.subtitle_streams.len();
    assert_eq!(total, 3);
    assert_eq!(descriptor.selected_subtitle_stream, Some(0));

    assert_eq!(descriptor.chapters.len(), 2);
    assert_eq!(descriptor.chapters[0].end, Some(Duration::from_secs(30)));
    assert_eq!(descriptor.chapters[1].start, Duration::from_secs(30));
    assert_eq!(descriptor.chapters[1].end, Some(Duration::from_secs(90)));
}
