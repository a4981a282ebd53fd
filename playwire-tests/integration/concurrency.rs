//! Concurrent negotiations and cancellation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use playwire_core::testing::{SCRIPTED_BASE_URL, ScriptedTransport, StaticProfileProvider};
use playwire_core::transport::{PlaybackInfoRequest, PlaybackInfoResponse};
use playwire_core::{
    BitrateCeiling, ContentKind, MediaItem, PlaybackConfig, PlaybackNegotiator, SessionTransport,
    TransportError,
};
use tokio::task::JoinSet;
use url::Url;

use crate::fixtures::{negotiator, response, source};

/// Flags its owner when the in-flight request future is dropped.
struct DropSignal(Arc<AtomicBool>);

impl Drop for DropSignal {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Transport whose playback-info request never completes.
struct StalledTransport {
    base_url: Url,
    started: AtomicUsize,
    dropped: Arc<AtomicBool>,
}

#[async_trait]
impl SessionTransport for StalledTransport {
    fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn user_id(&self) -> &str {
        "user-1"
    }

    async fn download_probe(&self, size_bytes: u64) -> Result<u64, TransportError> {
        Ok(size_bytes)
    }

    async fn post_playback_info(
        &self,
        _request: &PlaybackInfoRequest,
    ) -> Result<PlaybackInfoResponse, TransportError> {
        let _signal = DropSignal(Arc::clone(&self.dropped));
        self.started.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }
}

#[tokio::test]
async fn test_parallel_negotiations_share_transport() {
    let sources: Vec<_> = (0..8)
        .map(|n| source(&format!("src-{n}"), &format!("etag-{n}"), "mp4"))
        .collect();
    let transport = Arc::new(ScriptedTransport::new().with_response(response(sources.clone())));
    let negotiator = Arc::new(negotiator(transport.clone(), BitrateCeiling::Fixed(20_000_000)));

    let mut tasks = JoinSet::new();
    for (n, requested) in sources.into_iter().enumerate() {
        let negotiator = Arc::clone(&negotiator);
        tasks.spawn(async move {
            let item = MediaItem::new(format!("item-{n}"));
            negotiator
                .negotiate_playback(&item, &requested, ContentKind::OnDemand)
                .await
                .map(|descriptor| (requested.id, descriptor))
        });
    }

    let mut completed = 0;
    while let Some(joined) = tasks.join_next().await {
        let (requested_id, descriptor) = joined.unwrap().unwrap();
        assert_eq!(descriptor.media_source.id, requested_id);
        completed += 1;
    }

    assert_eq!(completed, 8);
    assert_eq!(transport.requests().len(), 8);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_cancels_in_flight_request() {
    let dropped = Arc::new(AtomicBool::new(false));
    let transport = Arc::new(StalledTransport {
        base_url: Url::parse(SCRIPTED_BASE_URL).unwrap(),
        started: AtomicUsize::new(0),
        dropped: Arc::clone(&dropped),
    });
    let negotiator = PlaybackNegotiator::new(
        transport.clone(),
        Arc::new(StaticProfileProvider::new()),
        PlaybackConfig {
            bitrate: BitrateCeiling::Fixed(20_000_000),
            ..Default::default()
        },
    );

    let requested = source("src-1", "etag-1", "mp4");
    let item = MediaItem::new("item-1");
    let outcome = tokio::time::timeout(
        Duration::from_secs(5),
        negotiator.negotiate_playback(&item, &requested, ContentKind::OnDemand),
    )
    .await;

    assert!(outcome.is_err());
    assert_eq!(transport.started.load(Ordering::SeqCst), 1);
    assert!(dropped.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn test_abort_during_probe_sends_no_request() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .with_probe_delay(Duration::from_secs(30))
            .with_response(response(vec![source("src-1", "etag-1", "mp4")])),
    );
    let negotiator = Arc::new(negotiator(transport.clone(), BitrateCeiling::Auto));

    let task = tokio::spawn({
        let negotiator = Arc::clone(&negotiator);
        async move {
            negotiator
                .negotiate_playback(
                    &MediaItem::new("item-1"),
                    &source("src-1", "etag-1", "mp4"),
                    ContentKind::OnDemand,
                )
                .await
        }
    });

    tokio::time::sleep(Duration::from_secs(1)).await;
    task.abort();

    assert!(task.await.unwrap_err().is_cancelled());
    assert_eq!(transport.probe_count(), 1);
    assert!(transport.requests().is_empty());
}
