//! Full negotiations through `HttpSessionTransport` against the fake server.

use std::sync::Arc;
use std::time::Duration;

use playwire_core::config::{MAX_STREAMING_BITRATE, PlaywireConfig};
use playwire_core::{
    BasicProfileProvider, BitrateCeiling, ContentKind, HttpSessionTransport, MediaItem,
    MediaSourceCandidate, NegotiationError, PlayMethod, PlaybackNegotiator, TransportError,
};

use super::fake_server::{
    BROKEN_ITEM, FakeServer, GARBLED_ITEM, PLAY_SESSION, SESSIONLESS_ITEM, SOURCE_ETAG,
    STALLED_ITEM, STREAM_BODY,
};

const TOKEN: &str = "secret-token";

fn negotiator(server: &FakeServer, config: PlaywireConfig) -> PlaybackNegotiator {
    let transport =
        HttpSessionTransport::new(server.base_url.clone(), "user-1", TOKEN, &config.network)
            .unwrap();
    PlaybackNegotiator::new(
        Arc::new(transport),
        Arc::new(BasicProfileProvider),
        config.playback,
    )
}

fn requested(container: &str) -> MediaSourceCandidate {
    MediaSourceCandidate::new("src-1")
        .with_etag(SOURCE_ETAG)
        .with_container(container)
}

#[tokio::test]
async fn test_direct_play_url_is_servable() {
    let server = FakeServer::start(None).await;
    let negotiator = negotiator(&server, PlaywireConfig::for_testing());
    let item = MediaItem::new("movie-1").with_etag("item-etag");

    let descriptor = negotiator
        .negotiate_playback(&item, &requested("mkv"), ContentKind::OnDemand)
        .await
        .unwrap();

    assert_eq!(descriptor.play_method, PlayMethod::DirectPlay);
    assert_eq!(descriptor.play_session_id.as_str(), PLAY_SESSION);
    assert_eq!(descriptor.audio_streams.len(), 2);
    assert_eq!(descriptor.subtitle_streams.len(), 1);
    assert_eq!(descriptor.video_streams.len(), 1);
    // Defaults name server stream numbers: audio 1 is the first audio track.
    let audio = descriptor.selected_audio_stream.unwrap();
    assert_eq!(descriptor.audio_streams[audio].language.as_deref(), Some("eng"));
    assert_eq!(descriptor.selected_audio_stream_index(), 0);
    assert_eq!(descriptor.selected_subtitle_stream_index(), 0);

    let body = reqwest::get(descriptor.playback_url.clone())
        .await
        .unwrap()
        .error_for_status()
        .unwrap()
        .bytes()
        .await
        .unwrap();
    assert_eq!(body.as_ref(), STREAM_BODY);
}

#[tokio::test]
async fn test_request_wire_format() {
    let server = FakeServer::start(None).await;
    let negotiator = negotiator(&server, PlaywireConfig::for_testing());

    negotiator
        .negotiate_playback(&MediaItem::new("movie-1"), &requested("mp4"), ContentKind::OnDemand)
        .await
        .unwrap();

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];

    assert_eq!(request.item_id, "movie-1");
    assert_eq!(request.query["userId"], "user-1");
    assert_eq!(request.query["maxStreamingBitrate"], "20000000");
    assert_eq!(request.query["mediaSourceId"], "src-1");

    let authorization = request.authorization.as_deref().unwrap();
    assert!(authorization.starts_with("MediaBrowser Client=\"Playwire\""));
    assert!(authorization.contains("DeviceId=\"playwire-test-device\""));
    assert!(authorization.contains("Token=\"secret-token\""));

    assert_eq!(request.body["EnableDirectPlay"], true);
    assert_eq!(request.body["EnableDirectStream"], true);
    assert_eq!(request.body["DeviceProfile"]["MaxStreamingBitrate"], 20_000_000);
}

#[tokio::test]
async fn test_hls_negotiates_transcode_under_path_prefix() {
    let server = FakeServer::start(Some("/jellyfin")).await;
    let negotiator = negotiator(&server, PlaywireConfig::for_testing());

    let descriptor = negotiator
        .negotiate_playback(&MediaItem::new("movie-1"), &requested("hls"), ContentKind::OnDemand)
        .await
        .unwrap();

    assert_eq!(descriptor.play_method, PlayMethod::Transcode);
    assert_eq!(descriptor.playback_url.path(), "/jellyfin/videos/movie-1/master.m3u8");
    assert_eq!(server.requests()[0].body["EnableDirectPlay"], false);
}

#[tokio::test]
async fn test_auto_bitrate_probes_server() {
    let server = FakeServer::start(None).await;
    let mut config = PlaywireConfig::for_testing();
    config.playback.bitrate = BitrateCeiling::Auto;
    config.playback.probe_size_bytes = 64 * 1024;
    let negotiator = negotiator(&server, config);

    negotiator
        .negotiate_playback(&MediaItem::new("movie-1"), &requested("mkv"), ContentKind::OnDemand)
        .await
        .unwrap();

    assert_eq!(server.probes(), vec![64 * 1024]);

    let sent: u64 = server.requests()[0].query["maxStreamingBitrate"]
        .parse()
        .unwrap();
    assert!(sent > 0);
    assert!(sent <= MAX_STREAMING_BITRATE);
}

#[tokio::test]
async fn test_live_request_omits_source_hint() {
    let server = FakeServer::start(None).await;
    let negotiator = negotiator(&server, PlaywireConfig::for_testing());

    let descriptor = negotiator
        .negotiate_playback(
            &MediaItem::new("channel-7"),
            &MediaSourceCandidate::new("live-src"),
            ContentKind::Live,
        )
        .await
        .unwrap();

    assert_eq!(descriptor.media_source.id, "live-src");
    assert!(!server.requests()[0].query.contains_key("mediaSourceId"));
}

#[tokio::test]
async fn test_server_failures_map_to_error_kinds() {
    let server = FakeServer::start(None).await;
    let negotiator = negotiator(&server, PlaywireConfig::for_testing());
    let source = requested("mkv");

    let broken = negotiator
        .negotiate_playback(&MediaItem::new(BROKEN_ITEM), &source, ContentKind::OnDemand)
        .await
        .unwrap_err();
    assert!(matches!(
        broken,
        NegotiationError::Network {
            source: TransportError::Status { status: 500, .. }
        }
    ));

    let garbled = negotiator
        .negotiate_playback(&MediaItem::new(GARBLED_ITEM), &source, ContentKind::OnDemand)
        .await
        .unwrap_err();
    assert!(matches!(garbled, NegotiationError::Protocol { .. }));

    let sessionless = negotiator
        .negotiate_playback(&MediaItem::new(SESSIONLESS_ITEM), &source, ContentKind::OnDemand)
        .await
        .unwrap_err();
    assert!(matches!(sessionless, NegotiationError::Protocol { .. }));
}

#[tokio::test]
async fn test_request_timeout_is_network_error() {
    let server = FakeServer::start(None).await;
    let mut config = PlaywireConfig::for_testing();
    config.network.request_timeout = Duration::from_millis(200);
    let negotiator = negotiator(&server, config);

    let error = negotiator
        .negotiate_playback(&MediaItem::new(STALLED_ITEM), &requested("mkv"), ContentKind::OnDemand)
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        NegotiationError::Network {
            source: TransportError::Timeout { .. }
        }
    ));
}

#[tokio::test]
async fn test_unreachable_server_is_network_error() {
    // Bind and drop to get a port nothing listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = PlaywireConfig::for_testing();
    let transport = HttpSessionTransport::new(
        url::Url::parse(&format!("http://{addr}")).unwrap(),
        "user-1",
        TOKEN,
        &config.network,
    )
    .unwrap();
    let negotiator = PlaybackNegotiator::new(
        Arc::new(transport),
        Arc::new(BasicProfileProvider),
        config.playback,
    );

    let error = negotiator
        .negotiate_playback(&MediaItem::new("movie-1"), &requested("mkv"), ContentKind::OnDemand)
        .await
        .unwrap_err();

    assert!(error.is_network_error());
}
