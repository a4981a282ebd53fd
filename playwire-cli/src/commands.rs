//! CLI command implementations

use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Subcommand};
use playwire_core::config::PlaywireConfig;
use playwire_core::{
    BasicProfileProvider, BitrateCeiling, BitrateEstimator, CompatibilityMode, ContentKind,
    HttpSessionTransport, MediaItem, MediaSourceCandidate, NegotiationError, PlaybackNegotiator,
    PlayerType, SessionTransport,
};
use url::Url;

/// Connection to an already-authenticated server session
#[derive(Args)]
pub struct SessionArgs {
    /// Server base URL, e.g. http://media.local:8096
    #[arg(long)]
    server: Url,
    /// Authenticated user id
    #[arg(long)]
    user_id: String,
    /// Access token of the session
    #[arg(long)]
    token: String,
}

/// Playback preferences overriding PLAYWIRE_* environment settings
#[derive(Args)]
pub struct PlaybackArgs {
    /// Bitrate ceiling: "auto" or bits per second
    #[arg(long)]
    bitrate: Option<BitrateCeiling>,
    /// Player the capability profile is built for (native, embedded)
    #[arg(long)]
    player: Option<PlayerType>,
    /// Compatibility mode (auto, compatible, direct, custom)
    #[arg(long)]
    compatibility: Option<CompatibilityMode>,
    /// Probe payload size in bytes for auto bitrate
    #[arg(long)]
    probe_size: Option<u64>,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Negotiate playback of a media source and print the descriptor as JSON
    Negotiate {
        #[command(flatten)]
        session: SessionArgs,
        #[command(flatten)]
        playback: PlaybackArgs,
        /// Item id
        #[arg(long)]
        item: String,
        /// Item display name
        #[arg(long)]
        item_name: Option<String>,
        /// Item entity tag
        #[arg(long)]
        item_etag: Option<String>,
        /// Requested media source id
        #[arg(long)]
        source: String,
        /// Requested media source entity tag
        #[arg(long)]
        source_etag: Option<String>,
        /// Requested media source container
        #[arg(long)]
        container: Option<String>,
        /// Treat the item as live content
        #[arg(long)]
        live: bool,
    },
    /// Measure the streaming bitrate ceiling
    Probe {
        #[command(flatten)]
        session: SessionArgs,
        #[command(flatten)]
        playback: PlaybackArgs,
    },
}

/// Handle the CLI command
///
/// # Errors
/// Returns the negotiation or setup error of the command that failed
pub async fn handle_command(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Negotiate {
            session,
            playback,
            item,
            item_name,
            item_etag,
            source,
            source_etag,
            container,
            live,
        } => {
            let item = MediaItem {
                name: item_name,
                etag: item_etag,
                ..MediaItem::new(item)
            };
            let source = MediaSourceCandidate {
                etag: source_etag,
                container,
                ..MediaSourceCandidate::new(source)
            };
            negotiate(session, playback, item, source, ContentKind::from_is_live(live)).await
        }
        Commands::Probe { session, playback } => probe(session, playback).await,
    }
}

fn build_config(playback: PlaybackArgs) -> PlaywireConfig {
    let mut config = PlaywireConfig::from_env();

    if let Some(bitrate) = playback.bitrate {
        config.playback.bitrate = bitrate;
    }
    if let Some(player) = playback.player {
        config.playback.player_type = player;
    }
    if let Some(compatibility) = playback.compatibility {
        config.playback.compatibility_mode = compatibility;
    }
    if let Some(probe_size) = playback.probe_size {
        config.playback.probe_size_bytes = probe_size;
    }

    config
}

fn connect(
    session: SessionArgs,
    config: &PlaywireConfig,
) -> anyhow::Result<Arc<HttpSessionTransport>> {
    let transport = HttpSessionTransport::new(
        session.server,
        session.user_id,
        &session.token,
        &config.network,
    )
    .context("failed to create HTTP transport")?;
    Ok(Arc::new(transport))
}

/// Negotiate playback and print the resolved descriptor
///
/// # Errors
/// - `NegotiationError` - Negotiation failed; the user-facing message is attached
pub async fn negotiate(
    session: SessionArgs,
    playback: PlaybackArgs,
    item: MediaItem,
    source: MediaSourceCandidate,
    kind: ContentKind,
) -> anyhow::Result<()> {
    let config = build_config(playback);
    let transport = connect(session, &config)?;

    let negotiator = PlaybackNegotiator::new(
        transport,
        Arc::new(BasicProfileProvider),
        config.playback,
    );

    let descriptor = negotiator
        .negotiate_playback(&item, &source, kind)
        .await
        .map_err(describe_failure)?;

    println!("{}", serde_json::to_string_pretty(&descriptor)?);
    Ok(())
}

/// Resolve the bitrate ceiling and print it
///
/// # Errors
/// - `NegotiationError` - Probe failed or probe size is zero
pub async fn probe(session: SessionArgs, playback: PlaybackArgs) -> anyhow::Result<()> {
    let config = build_config(playback);
    let transport = connect(session, &config)?;
    let base_url = transport.base_url().clone();

    let estimator = BitrateEstimator::from_config(transport, &config.playback);
    let bitrate = estimator
        .resolve(config.playback.bitrate)
        .await
        .map_err(describe_failure)?;

    println!("Server: {base_url}");
    println!(
        "Bitrate ceiling: {bitrate} bps ({:.1} Mbps)",
        bitrate as f64 / 1_000_000.0
    );
    Ok(())
}

fn describe_failure(error: NegotiationError) -> anyhow::Error {
    let message = error.user_message();
    anyhow::Error::new(error).context(message)
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    struct TestCli {
        #[command(subcommand)]
        command: Commands,
    }

    #[test]
    fn test_parse_negotiate_command() {
        let cli = TestCli::try_parse_from([
            "playwire",
            "negotiate",
            "--server",
            "http://media.local:8096",
            "--user-id",
            "user-1",
            "--token",
            "secret",
            "--item",
            "item-1",
            "--source",
            "src-1",
            "--container",
            "hls",
            "--bitrate",
            "auto",
            "--compatibility",
            "direct",
            "--live",
        ])
        .unwrap();

        let Commands::Negotiate {
            session,
            playback,
            live,
            container,
            ..
        } = cli.command
        else {
            panic!("expected negotiate command");
        };

        assert_eq!(session.server.as_str(), "http://media.local:8096/");
        assert!(live);
        assert_eq!(container.as_deref(), Some("hls"));

        let config = build_config(playback);
        assert_eq!(config.playback.bitrate, BitrateCeiling::Auto);
        assert_eq!(
            config.playback.compatibility_mode,
            CompatibilityMode::DirectPlay
        );
    }

    #[test]
    fn test_invalid_bitrate_rejected() {
        let result = TestCli::try_parse_from([
            "playwire",
            "probe",
            "--server",
            "http://media.local:8096",
            "--user-id",
            "user-1",
            "--token",
            "secret",
            "--bitrate",
            "fast",
        ]);

        assert!(result.is_err());
    }
}
