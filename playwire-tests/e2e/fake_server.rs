//! In-process media server speaking just enough of the playback API.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use parking_lot::Mutex;
use serde_json::{Value, json};
use url::Url;

/// Item ids with scripted misbehavior.
pub const BROKEN_ITEM: &str = "broken";
pub const GARBLED_ITEM: &str = "garbled";
pub const SESSIONLESS_ITEM: &str = "sessionless";
pub const STALLED_ITEM: &str = "stalled";

pub const PLAY_SESSION: &str = "ps-e2e";
pub const SOURCE_ETAG: &str = "etag-1";
pub const STREAM_BODY: &[u8] = b"fake media payload";

/// Playback-info request as the server saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub item_id: String,
    pub query: HashMap<String, String>,
    pub authorization: Option<String>,
    pub body: Value,
}

#[derive(Debug, Default)]
struct Recorded {
    probes: Vec<u64>,
    requests: Vec<RecordedRequest>,
}

/// Running fake server; recorded traffic is shared with the handlers.
pub struct FakeServer {
    pub base_url: Url,
    recorded: Arc<Mutex<Recorded>>,
}

impl FakeServer {
    /// Starts the server on an ephemeral port, optionally under a path prefix.
    pub async fn start(prefix: Option<&str>) -> Self {
        let recorded = Arc::new(Mutex::new(Recorded::default()));

        let routes = Router::new()
            .route("/Playback/BitrateTest", get(bitrate_test))
            .route("/Items/{item_id}/PlaybackInfo", post(playback_info))
            .route("/Videos/{item_id}/stream", get(stream))
            .with_state(Arc::clone(&recorded));

        let app = match prefix {
            Some(prefix) => Router::new().nest(prefix, routes),
            None => routes,
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let base_url = Url::parse(&format!("http://{addr}{}", prefix.unwrap_or(""))).unwrap();
        Self { base_url, recorded }
    }

    pub fn probes(&self) -> Vec<u64> {
        self.recorded.lock().probes.clone()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.recorded.lock().requests.clone()
    }
}

async fn bitrate_test(
    State(recorded): State<Arc<Mutex<Recorded>>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let Some(size) = params.get("size").and_then(|s| s.parse::<u64>().ok()) else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    recorded.lock().probes.push(size);
    vec![0u8; size as usize].into_response()
}

async fn playback_info(
    State(recorded): State<Arc<Mutex<Recorded>>>,
    Path(item_id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    axum::Json(body): axum::Json<Value>,
) -> Response {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let direct_play = body["EnableDirectPlay"].as_bool().unwrap_or(true);
    let source_id = query
        .get("mediaSourceId")
        .cloned()
        .unwrap_or_else(|| "live-src".to_string());

    recorded.lock().requests.push(RecordedRequest {
        item_id: item_id.clone(),
        query,
        authorization,
        body,
    });

    match item_id.as_str() {
        BROKEN_ITEM => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        GARBLED_ITEM => return (StatusCode::OK, "<html>oops</html>").into_response(),
        STALLED_ITEM => {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
        _ => {}
    }

    let mut source = json!({
        "Id": source_id,
        "ETag": SOURCE_ETAG,
        "Container": "mkv",
        "SupportsDirectPlay": direct_play,
        "SupportsDirectStream": direct_play,
        "OpenToken": format!("open_{source_id}"),
        "DefaultAudioStreamIndex": 1,
        "DefaultSubtitleStreamIndex": 3,
        "MediaStreams": [
            {"Type": "Video", "Index": 0, "Codec": "h264"},
            {"Type": "Audio", "Index": 1, "Codec": "ac3", "Language": "eng"},
            {"Type": "Audio", "Index": 2, "Codec": "aac", "Language": "fra"},
            {"Type": "Subtitle", "Index": 3, "Codec": "srt", "IsExternal": true},
            {"Type": "EmbeddedImage", "Index": 4}
        ]
    });
    if !direct_play {
        source["TranscodingUrl"] =
            json!(format!("/videos/{item_id}/master.m3u8?PlaySessionId={PLAY_SESSION}"));
    }

    let mut response = json!({ "MediaSources": [source] });
    if item_id != SESSIONLESS_ITEM {
        response["PlaySessionId"] = json!(PLAY_SESSION);
    }

    axum::Json(response).into_response()
}

async fn stream(
    Path(_item_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let authorized = params.get("static").map(String::as_str) == Some("true")
        && params.get("playSessionId").map(String::as_str) == Some(PLAY_SESSION);

    if authorized {
        STREAM_BODY.into_response()
    } else {
        StatusCode::FORBIDDEN.into_response()
    }
}
