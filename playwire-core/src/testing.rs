//! Scripted collaborators for exercising the negotiation pipeline offline.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use url::Url;

use crate::profile::{CapabilityProfile, CapabilityProfileProvider, CompatibilityMode, PlayerType};
use crate::transport::{
    PlaybackInfoRequest, PlaybackInfoResponse, SessionTransport, TransportError,
};

/// Default base URL of the scripted server.
pub const SCRIPTED_BASE_URL: &str = "http://media.local:8096";

/// Default authenticated user of the scripted server.
pub const SCRIPTED_USER_ID: &str = "user-1";

#[derive(Debug, Clone)]
enum PlaybackBehavior {
    Respond(PlaybackInfoResponse),
    Status(u16),
    Malformed,
    Hang,
}

/// Session transport answering from a script and recording every request.
#[derive(Debug)]
pub struct ScriptedTransport {
    base_url: Url,
    user_id: String,
    probe_delay: Duration,
    probe_fails: bool,
    probe_body_len: Option<u64>,
    playback: PlaybackBehavior,
    probe_sizes: Mutex<Vec<u64>>,
    requests: Mutex<Vec<PlaybackInfoRequest>>,
}

impl ScriptedTransport {
    /// Creates a transport that answers probes instantly and returns an
    /// empty playback-info response.
    pub fn new() -> Self {
        Self {
            base_url: Url::parse(SCRIPTED_BASE_URL).expect("scripted base URL is valid"),
            user_id: SCRIPTED_USER_ID.to_string(),
            probe_delay: Duration::ZERO,
            probe_fails: false,
            probe_body_len: None,
            playback: PlaybackBehavior::Respond(PlaybackInfoResponse::default()),
            probe_sizes: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Uses `base_url` as the server address.
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    /// Delays probe completion by `delay` (pairs with a paused tokio clock).
    pub fn with_probe_delay(mut self, delay: Duration) -> Self {
        self.probe_delay = delay;
        self
    }

    /// Fails every probe with a connection error.
    pub fn with_probe_failure(mut self) -> Self {
        self.probe_fails = true;
        self
    }

    /// Ends every probe body after `len` bytes, whatever size was requested.
    pub fn with_probe_body_len(mut self, len: u64) -> Self {
        self.probe_body_len = Some(len);
        self
    }

    /// Answers playback-info requests with `response`.
    pub fn with_response(mut self, response: PlaybackInfoResponse) -> Self {
        self.playback = PlaybackBehavior::Respond(response);
        self
    }

    /// Answers playback-info requests with an HTTP error status.
    pub fn with_status_error(mut self, status: u16) -> Self {
        self.playback = PlaybackBehavior::Status(status);
        self
    }

    /// Answers playback-info requests with an undecodable body.
    pub fn with_malformed_response(mut self) -> Self {
        self.playback = PlaybackBehavior::Malformed;
        self
    }

    /// Never answers playback-info requests.
    pub fn with_hanging_response(mut self) -> Self {
        self.playback = PlaybackBehavior::Hang;
        self
    }

    /// Probe sizes requested so far, in order.
    pub fn probe_sizes(&self) -> Vec<u64> {
        self.probe_sizes.lock().clone()
    }

    /// Number of probes requested so far.
    pub fn probe_count(&self) -> usize {
        self.probe_sizes.lock().len()
    }

    /// Playback-info requests received so far, in order.
    pub fn requests(&self) -> Vec<PlaybackInfoRequest> {
        self.requests.lock().clone()
    }

    fn playback_info_url(&self, request: &PlaybackInfoRequest) -> String {
        format!("{}/Items/{}/PlaybackInfo", self.base_url, request.item_id)
    }
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionTransport for ScriptedTransport {
    fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn user_id(&self) -> &str {
        &self.user_id
    }

    async fn download_probe(&self, size_bytes: u64) -> Result<u64, TransportError> {
        self.probe_sizes.lock().push(size_bytes);

        if !self.probe_delay.is_zero() {
            tokio::time::sleep(self.probe_delay).await;
        }

        if self.probe_fails {
            return Err(TransportError::RequestFailed {
                url: format!("{}/Playback/BitrateTest", self.base_url),
                reason: "connection refused".to_string(),
            });
        }

        Ok(self.probe_body_len.map_or(size_bytes, |len| len.min(size_bytes)))
    }

    async fn post_playback_info(
        &self,
        request: &PlaybackInfoRequest,
    ) -> Result<PlaybackInfoResponse, TransportError> {
        self.requests.lock().push(request.clone());

        match &self.playback {
            PlaybackBehavior::Respond(response) => Ok(response.clone()),
            PlaybackBehavior::Status(status) => Err(TransportError::Status {
                url: self.playback_info_url(request),
                status: *status,
            }),
            PlaybackBehavior::Malformed => Err(TransportError::Decode {
                url: self.playback_info_url(request),
                reason: "expected value at line 1 column 1".to_string(),
            }),
            PlaybackBehavior::Hang => std::future::pending().await,
        }
    }
}

/// Profile provider returning a fixed document and recording its inputs.
#[derive(Debug, Default)]
pub struct StaticProfileProvider {
    calls: Mutex<Vec<(PlayerType, CompatibilityMode, u64)>>,
}

impl StaticProfileProvider {
    /// Creates a provider with no recorded calls.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inputs of every `build` call so far, in order.
    pub fn calls(&self) -> Vec<(PlayerType, CompatibilityMode, u64)> {
        self.calls.lock().clone()
    }
}

impl CapabilityProfileProvider for StaticProfileProvider {
    fn build(
        &self,
        player_type: PlayerType,
        compatibility_mode: CompatibilityMode,
        max_bitrate: u64,
    ) -> CapabilityProfile {
        self.calls
            .lock()
            .push((player_type, compatibility_mode, max_bitrate));

        CapabilityProfile::new(serde_json::json!({
            "Name": "static",
            "MaxStreamingBitrate": max_bitrate,
        }))
    }
}
