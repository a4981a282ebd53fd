//! Playback-info wire types

use serde::{Deserialize, Serialize};

use crate::media::{ItemId, MediaSourceCandidate};
use crate::profile::CapabilityProfile;

/// Playback-info request.
///
/// Query parameters travel in the URL; `body` is posted as JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackInfoRequest {
    pub item_id: ItemId,
    pub user_id: String,
    pub max_streaming_bitrate: u64,
    /// Hint naming the source the user picked, omitted for live content
    pub media_source_id: Option<String>,
    pub body: PlaybackInfoBody,
}

/// JSON body of a playback-info request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PlaybackInfoBody {
    pub device_profile: CapabilityProfile,
    pub enable_direct_play: bool,
    pub enable_direct_stream: bool,
}

/// Playback-info response.
///
/// `play_session_id` is optional on the wire; the engine rejects responses
/// without one.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PlaybackInfoResponse {
    #[serde(default)]
    pub media_sources: Vec<MediaSourceCandidate>,
    #[serde(default)]
    pub play_session_id: Option<String>,
    /// Server-side refusal such as `NotAllowed` or `NoCompatibleStream`
    #[serde(default)]
    pub error_code: Option<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_body_uses_server_field_names() {
        let body = PlaybackInfoBody {
            device_profile: CapabilityProfile::new(json!({"Name": "test"})),
            enable_direct_play: false,
            enable_direct_stream: false,
        };

        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["DeviceProfile"]["Name"], "test");
        assert_eq!(value["EnableDirectPlay"], false);
        assert_eq!(value["EnableDirectStream"], false);
    }

    #[test]
    fn test_response_tolerates_missing_fields() {
        let response: PlaybackInfoResponse = serde_json::from_str("{}").unwrap();
        assert!(response.media_sources.is_empty());
        assert!(response.play_session_id.is_none());

        let response: PlaybackInfoResponse = serde_json::from_str(
            r#"{"MediaSources":[{"Id":"a"}],"PlaySessionId":"p-1"}"#,
        )
        .unwrap();
        assert_eq!(response.media_sources[0].id, "a");
        assert_eq!(response.play_session_id.as_deref(), Some("p-1"));
    }
}
