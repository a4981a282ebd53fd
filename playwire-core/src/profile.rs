//! Device capability profiles sent with playback-info requests.
//!
//! The engine treats a profile as an opaque JSON document; only the provider
//! knows what is inside. [`BasicProfileProvider`] is a small reference builder
//! for tools that have no player-specific profile of their own.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Player implementation a profile is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerType {
    /// Platform media framework
    Native,
    /// Bundled software player with broader codec support
    Embedded,
}

impl std::fmt::Display for PlayerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Native => write!(f, "native"),
            Self::Embedded => write!(f, "embedded"),
        }
    }
}

impl std::str::FromStr for PlayerType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "native" => Ok(Self::Native),
            "embedded" => Ok(Self::Embedded),
            _ => Err(format!(
                "Invalid player type: '{s}'. Valid options are: native, embedded"
            )),
        }
    }
}

/// How strongly the profile should favor compatibility over fidelity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompatibilityMode {
    /// Let the provider decide per player
    Auto,
    /// Only the most widely supported formats; transcode everything else
    MostCompatible,
    /// Claim support for everything and prefer direct play
    DirectPlay,
    /// User-defined profile
    Custom,
}

impl std::fmt::Display for CompatibilityMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::MostCompatible => write!(f, "compatible"),
            Self::DirectPlay => write!(f, "direct"),
            Self::Custom => write!(f, "custom"),
        }
    }
}

impl std::str::FromStr for CompatibilityMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "compatible" | "most-compatible" => Ok(Self::MostCompatible),
            "direct" | "direct-play" => Ok(Self::DirectPlay),
            "custom" => Ok(Self::Custom),
            _ => Err(format!(
                "Invalid compatibility mode: '{s}'. Valid options are: auto, compatible, direct, custom"
            )),
        }
    }
}

/// Opaque capability declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilityProfile(Value);

impl CapabilityProfile {
    /// Wraps a provider-built JSON document.
    pub fn new(document: Value) -> Self {
        Self(document)
    }

    /// Returns the underlying JSON document.
    pub fn as_json(&self) -> &Value {
        &self.0
    }
}

/// Builds capability profiles for a player configuration.
pub trait CapabilityProfileProvider: Send + Sync {
    /// Builds the profile advertised to the server for one negotiation.
    fn build(
        &self,
        player_type: PlayerType,
        compatibility_mode: CompatibilityMode,
        max_bitrate: u64,
    ) -> CapabilityProfile;
}

/// Minimal profile builder.
///
/// Declares the bitrate ceiling, a set of direct-play containers chosen by
/// compatibility mode, and an HLS transcoding target.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicProfileProvider;

impl BasicProfileProvider {
    fn direct_play_profiles(player_type: PlayerType, mode: CompatibilityMode) -> Value {
        let containers = match (mode, player_type) {
            (CompatibilityMode::MostCompatible, _) => "mp4",
            (CompatibilityMode::DirectPlay, _) | (_, PlayerType::Embedded) => {
                "mp4,m4v,mov,mkv,webm,avi,ts,mpegts"
            }
            (CompatibilityMode::Auto | CompatibilityMode::Custom, PlayerType::Native) => {
                "mp4,m4v,mov"
            }
        };

        let video_codecs = match mode {
            CompatibilityMode::MostCompatible => "h264",
            _ => "h264,hevc,vp9,av1",
        };

        json!([{
            "Type": "Video",
            "Container": containers,
            "VideoCodec": video_codecs,
            "AudioCodec": "aac,ac3,eac3,mp3,flac,opus",
        }])
    }
}

impl CapabilityProfileProvider for BasicProfileProvider {
    fn build(
        &self,
        player_type: PlayerType,
        compatibility_mode: CompatibilityMode,
        max_bitrate: u64,
    ) -> CapabilityProfile {
        CapabilityProfile::new(json!({
            "Name": format!("playwire-{player_type}-{compatibility_mode}"),
            "MaxStreamingBitrate": max_bitrate,
            "MaxStaticBitrate": max_bitrate,
            "DirectPlayProfiles": Self::direct_play_profiles(player_type, compatibility_mode),
            "TranscodingProfiles": [{
                "Type": "Video",
                "Container": "ts",
                "Protocol": "hls",
                "VideoCodec": "h264",
                "AudioCodec": "aac",
                "Context": "Streaming",
                "BreakOnNonKeyFrames": true,
            }],
            "SubtitleProfiles": [
                { "Format": "vtt", "Method": "Hls" },
                { "Format": "srt", "Method": "External" },
            ],
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_profile_declares_bitrate() {
        let profile = BasicProfileProvider.build(
            PlayerType::Native,
            CompatibilityMode::Auto,
            12_000_000,
        );

        assert_eq!(profile.as_json()["MaxStreamingBitrate"], 12_000_000);
        assert_eq!(
            profile.as_json()["TranscodingProfiles"][0]["Protocol"],
            "hls"
        );
    }

    #[test]
    fn test_compatible_mode_narrows_direct_play() {
        let compatible = BasicProfileProvider.build(
            PlayerType::Embedded,
            CompatibilityMode::MostCompatible,
            1,
        );
        let direct =
            BasicProfileProvider.build(PlayerType::Native, CompatibilityMode::DirectPlay, 1);

        assert_eq!(
            compatible.as_json()["DirectPlayProfiles"][0]["Container"],
            "mp4"
        );
        assert!(
            direct.as_json()["DirectPlayProfiles"][0]["Container"]
                .as_str()
                .unwrap()
                .contains("mkv")
        );
    }

    #[test]
    fn test_mode_and_player_parsing() {
        assert_eq!(
            "Direct".parse::<CompatibilityMode>().unwrap(),
            CompatibilityMode::DirectPlay
        );
        assert_eq!(
            "compatible".parse::<CompatibilityMode>().unwrap(),
            CompatibilityMode::MostCompatible
        );
        assert_eq!("native".parse::<PlayerType>().unwrap(), PlayerType::Native);
        assert!("vlc".parse::<PlayerType>().is_err());
    }
}
