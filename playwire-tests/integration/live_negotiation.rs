//! Live TV negotiation: server-assigned source identities.

use std::sync::Arc;

use playwire_core::testing::ScriptedTransport;
use playwire_core::{
    BitrateCeiling, ContentKind, MediaSourceCandidate, NegotiationError, PlayMethod,
};

use crate::fixtures::{channel, negotiator, response};

fn live_source(id: &str, open_token: Option<&str>) -> MediaSourceCandidate {
    MediaSourceCandidate {
        open_token: open_token.map(str::to_string),
        ..MediaSourceCandidate::new(id).with_container("ts")
    }
}

#[tokio::test]
async fn test_open_token_selects_candidate_without_source_hint() {
    let requested = MediaSourceCandidate::new("tuner-7");
    let transport = Arc::new(ScriptedTransport::new().with_response(response(vec![
        live_source("live-a", Some("open_tuner-3")),
        live_source("live-b", Some("open_tuner-7_x")),
        live_source("live-c", Some("open_tuner-7_y")),
    ])));
    let negotiator = negotiator(transport.clone(), BitrateCeiling::Fixed(10_000_000));

    let descriptor = negotiator
        .negotiate_playback(&channel(), &requested, ContentKind::Live)
        .await
        .unwrap();

    assert_eq!(descriptor.media_source.id, "live-b");

    let request = &transport.requests()[0];
    assert_eq!(request.media_source_id, None);
    assert_eq!(request.item_id.as_str(), "channel-7");
}

#[tokio::test]
async fn test_falls_back_to_first_candidate() {
    let requested = MediaSourceCandidate::new("tuner-9");
    let transport = Arc::new(ScriptedTransport::new().with_response(response(vec![
        live_source("live-a", None),
        live_source("live-b", Some("")),
    ])));
    let negotiator = negotiator(transport, BitrateCeiling::Fixed(10_000_000));

    let descriptor = negotiator
        .negotiate_playback(&channel(), &requested, ContentKind::Live)
        .await
        .unwrap();

    assert_eq!(descriptor.media_source.id, "live-a");
    assert_eq!(descriptor.play_method, PlayMethod::DirectPlay);
    assert_eq!(
        descriptor.playback_url.as_str(),
        "http://media.local:8096/Videos/channel-7/stream?static=true&playSessionId=play-session-1&mediaSourceId=live-a"
    );
}

#[tokio::test]
async fn test_no_live_candidates_is_a_mismatch() {
    let transport = Arc::new(ScriptedTransport::new().with_response(response(Vec::new())));
    let negotiator = negotiator(transport, BitrateCeiling::Fixed(10_000_000));

    let error = negotiator
        .negotiate_playback(
            &channel(),
            &MediaSourceCandidate::new("tuner-7"),
            ContentKind::Live,
        )
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        NegotiationError::SourceMismatch { ref media_source_id } if media_source_id == "tuner-7"
    ));
}

#[tokio::test]
async fn test_direct_play_uses_tuner_url() {
    let offered = MediaSourceCandidate {
        supports_direct_play: Some(true),
        path: Some("http://tuner.local:5004/auto/v7".into()),
        ..live_source("live-a", Some("open_tuner-7"))
    };
    let transport = Arc::new(ScriptedTransport::new().with_response(response(vec![offered])));
    let negotiator = negotiator(transport, BitrateCeiling::Fixed(10_000_000));

    let descriptor = negotiator
        .negotiate_playback(
            &channel(),
            &MediaSourceCandidate::new("tuner-7"),
            ContentKind::Live,
        )
        .await
        .unwrap();

    assert_eq!(descriptor.play_method, PlayMethod::DirectPlay);
    assert_eq!(descriptor.playback_url.as_str(), "http://tuner.local:5004/auto/v7");
}

#[tokio::test]
async fn test_live_hls_is_still_forced_to_transcode() {
    let requested = MediaSourceCandidate::new("tuner-7").with_container("hls");
    let offered = MediaSourceCandidate {
        transcoding_url: Some("/videos/channel-7/live.m3u8".into()),
        ..live_source("live-a", Some("open_tuner-7"))
    };
    let transport = Arc::new(ScriptedTransport::new().with_response(response(vec![offered])));
    let negotiator = negotiator(transport.clone(), BitrateCeiling::Fixed(10_000_000));

    let descriptor = negotiator
        .negotiate_playback(&channel(), &requested, ContentKind::Live)
        .await
        .unwrap();

    assert_eq!(descriptor.play_method, PlayMethod::Transcode);
    assert!(!transport.requests()[0].body.enable_direct_play);
}
