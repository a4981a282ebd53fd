//! Centralized configuration for Playwire.
//!
//! Playback settings are read-only inputs to the negotiation pipeline; they are
//! never persisted from here.

use std::time::Duration;

use crate::bitrate::BitrateCeiling;
use crate::profile::{CompatibilityMode, PlayerType};

/// Highest bitrate the server will accept in a streaming URL (360 Mbps).
///
/// Larger values produce URLs the server rejects.
pub const MAX_STREAMING_BITRATE: u64 = 360_000_000;

/// Default bitrate probe payload (5 MB).
pub const DEFAULT_PROBE_SIZE_BYTES: u64 = 5_000_000;

/// Central configuration for all Playwire components.
#[derive(Debug, Clone, Default)]
pub struct PlaywireConfig {
    pub playback: PlaybackConfig,
    pub network: NetworkConfig,
}

/// Playback negotiation settings.
///
/// Mirrors the user-facing playback preferences: which player is in use, how
/// aggressively to prefer compatibility, and how the bitrate ceiling is chosen.
#[derive(Debug, Clone)]
pub struct PlaybackConfig {
    /// Player implementation the capability profile is built for
    pub player_type: PlayerType,
    /// Compatibility mode passed to the capability profile builder
    pub compatibility_mode: CompatibilityMode,
    /// Fixed bitrate ceiling or auto-detection
    pub bitrate: BitrateCeiling,
    /// Size of the payload downloaded when auto-detecting bitrate
    pub probe_size_bytes: u64,
    /// Upper clamp applied to auto-detected bitrates
    pub max_bitrate: u64,
    /// Whether direct play and direct stream may be offered to the server
    pub allow_direct_play: bool,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            player_type: PlayerType::Native,
            compatibility_mode: CompatibilityMode::Auto,
            bitrate: BitrateCeiling::Auto,
            probe_size_bytes: DEFAULT_PROBE_SIZE_BYTES,
            max_bitrate: MAX_STREAMING_BITRATE,
            allow_direct_play: true,
        }
    }
}

/// HTTP client and device identification settings.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Timeout applied to every request the transport sends
    pub request_timeout: Duration,
    /// User agent for HTTP requests
    pub user_agent: String,
    /// Client name reported in the authorization header
    pub client_name: String,
    /// Client version reported in the authorization header
    pub client_version: String,
    /// Device name reported in the authorization header
    pub device_name: String,
    /// Stable device identifier; a random one is generated when unset
    pub device_id: Option<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            user_agent: format!("playwire/{}", env!("CARGO_PKG_VERSION")),
            client_name: "Playwire".to_string(),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
            device_name: "playwire".to_string(),
            device_id: None,
        }
    }
}

impl PlaywireConfig {
    /// Creates configuration with environment variable overrides.
    ///
    /// Unparseable values are ignored and the default is kept.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(player) = std::env::var("PLAYWIRE_PLAYER_TYPE")
            && let Ok(player_type) = player.parse()
        {
            config.playback.player_type = player_type;
        }

        if let Ok(mode) = std::env::var("PLAYWIRE_COMPATIBILITY_MODE")
            && let Ok(compatibility_mode) = mode.parse()
        {
            config.playback.compatibility_mode = compatibility_mode;
        }

        if let Ok(bitrate) = std::env::var("PLAYWIRE_BITRATE")
            && let Ok(ceiling) = bitrate.parse()
        {
            config.playback.bitrate = ceiling;
        }

        if let Ok(size) = std::env::var("PLAYWIRE_PROBE_SIZE")
            && let Ok(bytes) = size.parse::<u64>()
        {
            config.playback.probe_size_bytes = bytes;
        }

        if let Ok(max) = std::env::var("PLAYWIRE_MAX_BITRATE")
            && let Ok(bps) = max.parse::<u64>()
        {
            config.playback.max_bitrate = bps;
        }

        if let Ok(timeout) = std::env::var("PLAYWIRE_REQUEST_TIMEOUT")
            && let Ok(seconds) = timeout.parse::<u64>()
        {
            config.network.request_timeout = Duration::from_secs(seconds);
        }

        if let Ok(device_id) = std::env::var("PLAYWIRE_DEVICE_ID") {
            config.network.device_id = Some(device_id);
        }

        config
    }

    /// Creates a configuration optimized for testing.
    ///
    /// Uses a fixed bitrate so no probe traffic is generated and a tiny probe
    /// payload for tests that switch to auto mode.
    pub fn for_testing() -> Self {
        Self {
            playback: PlaybackConfig {
                bitrate: BitrateCeiling::Fixed(20_000_000),
                probe_size_bytes: 1_000,
                ..Default::default()
            },
            network: NetworkConfig {
                request_timeout: Duration::from_secs(5),
                device_id: Some("playwire-test-device".to_string()),
                ..Default::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = PlaywireConfig::default();

        assert_eq!(config.playback.bitrate, BitrateCeiling::Auto);
        assert_eq!(config.playback.probe_size_bytes, 5_000_000);
        assert_eq!(config.playback.max_bitrate, 360_000_000);
        assert!(config.playback.allow_direct_play);
        assert_eq!(config.network.request_timeout, Duration::from_secs(30));
        assert!(config.network.device_id.is_none());
    }

    #[test]
    fn test_testing_preset_avoids_probe() {
        let config = PlaywireConfig::for_testing();

        assert!(matches!(config.playback.bitrate, BitrateCeiling::Fixed(_)));
        assert!(config.network.device_id.is_some());
    }

    #[test]
    fn test_env_override() {
        unsafe {
            std::env::set_var("PLAYWIRE_PLAYER_TYPE", "embedded");
            std::env::set_var("PLAYWIRE_COMPATIBILITY_MODE", "direct");
            std::env::set_var("PLAYWIRE_BITRATE", "8000000");
            std::env::set_var("PLAYWIRE_PROBE_SIZE", "250000");
            std::env::set_var("PLAYWIRE_MAX_BITRATE", "not-a-number");
            std::env::set_var("PLAYWIRE_REQUEST_TIMEOUT", "10");
        }

        let config = PlaywireConfig::from_env();

        assert_eq!(config.playback.player_type, PlayerType::Embedded);
        assert_eq!(
            config.playback.compatibility_mode,
            CompatibilityMode::DirectPlay
        );
        assert_eq!(config.playback.bitrate, BitrateCeiling::Fixed(8_000_000));
        assert_eq!(config.playback.probe_size_bytes, 250_000);
        assert_eq!(config.playback.max_bitrate, MAX_STREAMING_BITRATE);
        assert_eq!(config.network.request_timeout, Duration::from_secs(10));

        // Cleanup
        unsafe {
            std::env::remove_var("PLAYWIRE_PLAYER_TYPE");
            std::env::remove_var("PLAYWIRE_COMPATIBILITY_MODE");
            std::env::remove_var("PLAYWIRE_BITRATE");
            std::env::remove_var("PLAYWIRE_PROBE_SIZE");
            std::env::remove_var("PLAYWIRE_MAX_BITRATE");
            std::env::remove_var("PLAYWIRE_REQUEST_TIMEOUT");
        }
    }
}
