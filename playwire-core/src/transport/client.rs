//! HTTP session transport with endpoint building and response decoding

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use url::Url;

use super::types::{PlaybackInfoRequest, PlaybackInfoResponse};
use super::{SessionTransport, TransportError};
use crate::config::NetworkConfig;

/// reqwest-backed transport for an already-authenticated user session.
///
/// Carries the access token obtained elsewhere; it never logs in itself.
#[derive(Debug, Clone)]
pub struct HttpSessionTransport {
    pub(super) base_url: Url,
    pub(super) user_id: String,
    pub(super) authorization: String,
    client: reqwest::Client,
}

impl HttpSessionTransport {
    /// Creates a transport for `base_url` acting as `user_id`.
    ///
    /// Uses network configuration for timeout, user agent and the device
    /// fields of the authorization header. A random device id is generated
    /// when none is configured.
    ///
    /// # Errors
    /// - `TransportError::ClientSetup` - HTTP client could not be constructed
    pub fn new(
        base_url: Url,
        user_id: impl Into<String>,
        access_token: &str,
        config: &NetworkConfig,
    ) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(3))
            .build()
            .map_err(|e| TransportError::ClientSetup {
                reason: e.to_string(),
            })?;

        Ok(Self {
            base_url,
            user_id: user_id.into(),
            authorization: Self::authorization_header(config, access_token),
            client,
        })
    }

    /// Build the `MediaBrowser` authorization header value.
    pub(super) fn authorization_header(config: &NetworkConfig, access_token: &str) -> String {
        let device_id = config
            .device_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let fields = [
            ("Client", config.client_name.as_str()),
            ("Device", config.device_name.as_str()),
            ("DeviceId", device_id.as_str()),
            ("Version", config.client_version.as_str()),
            ("Token", access_token),
        ];

        let encoded: Vec<String> = fields
            .iter()
            .map(|(name, value)| format!("{name}=\"{}\"", urlencoding::encode(value)))
            .collect();

        format!("MediaBrowser {}", encoded.join(", "))
    }

    /// Append path segments to the base URL, keeping any base path prefix.
    pub(super) fn endpoint(&self, segments: &[&str]) -> Result<Url, TransportError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| TransportError::RequestFailed {
                url: self.base_url.to_string(),
                reason: "Server URL cannot carry a path".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Build bitrate probe URL
    pub(super) fn build_probe_url(&self, size_bytes: u64) -> Result<Url, TransportError> {
        let mut url = self.endpoint(&["Playback", "BitrateTest"])?;
        url.query_pairs_mut()
            .append_pair("size", &size_bytes.to_string());
        Ok(url)
    }

    /// Build playback-info URL with query parameters
    pub(super) fn build_playback_info_url(
        &self,
        request: &PlaybackInfoRequest,
    ) -> Result<Url, TransportError> {
        let mut url = self.endpoint(&["Items", request.item_id.as_str(), "PlaybackInfo"])?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("userId", &request.user_id)
                .append_pair(
                    "maxStreamingBitrate",
                    &request.max_streaming_bitrate.to_string(),
                );
            if let Some(media_source_id) = &request.media_source_id {
                query.append_pair("mediaSourceId", media_source_id);
            }
        }
        Ok(url)
    }

    fn map_send_error(url: &Url, error: reqwest::Error) -> TransportError {
        tracing::warn!("HTTP request to {} failed: {}", url, error);

        if error.is_timeout() {
            TransportError::Timeout {
                url: url.to_string(),
            }
        } else {
            TransportError::RequestFailed {
                url: url.to_string(),
                reason: error.to_string(),
            }
        }
    }

    fn check_status(url: &Url, response: &reqwest::Response) -> Result<(), TransportError> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        tracing::warn!("Server returned error status {} for {}", status, url);
        Err(TransportError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        })
    }
}

#[async_trait]
impl SessionTransport for HttpSessionTransport {
    fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Streams the probe body to completion without buffering it.
    async fn download_probe(&self, size_bytes: u64) -> Result<u64, TransportError> {
        let url = self.build_probe_url(size_bytes)?;

        let mut response = self
            .client
            .get(url.clone())
            .header(AUTHORIZATION, &self.authorization)
            .send()
            .await
            .map_err(|e| Self::map_send_error(&url, e))?;

        Self::check_status(&url, &response)?;

        let mut received = 0u64;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| Self::map_send_error(&url, e))?
        {
            received += chunk.len() as u64;
        }

        tracing::trace!("Bitrate probe received {} of {} bytes", received, size_bytes);
        Ok(received)
    }

    async fn post_playback_info(
        &self,
        request: &PlaybackInfoRequest,
    ) -> Result<PlaybackInfoResponse, TransportError> {
        let url = self.build_playback_info_url(request)?;
        tracing::debug!("Requesting playback info: {}", url);

        let response = self
            .client
            .post(url.clone())
            .header(AUTHORIZATION, &self.authorization)
            .json(&request.body)
            .send()
            .await
            .map_err(|e| Self::map_send_error(&url, e))?;

        Self::check_status(&url, &response)?;

        let body = response
            .bytes()
            .await
            .map_err(|e| Self::map_send_error(&url, e))?;

        serde_json::from_slice(&body).map_err(|e| {
            tracing::warn!("Failed to decode playback info from {}: {}", url, e);
            TransportError::Decode {
                url: url.to_string(),
                reason: e.to_string(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::media::ItemId;
    use crate::profile::CapabilityProfile;
    use crate::transport::PlaybackInfoBody;

    fn create_test_network_config() -> NetworkConfig {
        NetworkConfig {
            request_timeout: Duration::from_secs(5),
            device_id: Some("device-1".to_string()),
            ..Default::default()
        }
    }

    fn create_transport(base: &str) -> HttpSessionTransport {
        HttpSessionTransport::new(
            Url::parse(base).unwrap(),
            "user-1",
            "token-1",
            &create_test_network_config(),
        )
        .unwrap()
    }

    fn create_request(media_source_id: Option<&str>) -> PlaybackInfoRequest {
        PlaybackInfoRequest {
            item_id: ItemId::new("item-1"),
            user_id: "user-1".to_string(),
            max_streaming_bitrate: 8_000_000,
            media_source_id: media_source_id.map(str::to_string),
            body: PlaybackInfoBody {
                device_profile: CapabilityProfile::new(json!({})),
                enable_direct_play: true,
                enable_direct_stream: true,
            },
        }
    }

    #[test]
    fn test_build_probe_url() {
        let transport = create_transport("http://media.local:8096");

        let url = transport.build_probe_url(5_000_000).unwrap();
        assert_eq!(
            url.as_str(),
            "http://media.local:8096/Playback/BitrateTest?size=5000000"
        );
    }

    #[test]
    fn test_build_playback_info_url_keeps_base_path() {
        let transport = create_transport("https://example.com/jellyfin/");

        let url = transport
            .build_playback_info_url(&create_request(Some("src-1")))
            .unwrap();
        assert_eq!(url.path(), "/jellyfin/Items/item-1/PlaybackInfo");
        assert_eq!(
            url.query(),
            Some("userId=user-1&maxStreamingBitrate=8000000&mediaSourceId=src-1")
        );

        let url = transport
            .build_playback_info_url(&create_request(None))
            .unwrap();
        assert!(!url.as_str().contains("mediaSourceId"));
    }

    #[test]
    fn test_endpoint_rejects_cannot_be_a_base_url() {
        let transport = create_transport("mailto:admin@example.com");

        assert!(matches!(
            transport.build_probe_url(1),
            Err(TransportError::RequestFailed { .. })
        ));
    }

    #[test]
    fn test_authorization_header_fields() {
        let header = HttpSessionTransport::authorization_header(
            &create_test_network_config(),
            "secret token",
        );

        assert!(header.starts_with("MediaBrowser "));
        assert!(header.contains("DeviceId=\"device-1\""));
        assert!(header.contains("Token=\"secret%20token\""));
    }

    #[test]
    fn test_authorization_header_generates_device_id() {
        let config = NetworkConfig::default();
        let first = HttpSessionTransport::authorization_header(&config, "t");
        let second = HttpSessionTransport::authorization_header(&config, "t");

        assert_ne!(first, second);
    }
}
