//! Streaming bitrate ceiling resolution.
//!
//! A fixed ceiling is passed through untouched. In auto mode a payload of known
//! size is downloaded and the observed throughput becomes the ceiling, clamped
//! to the configured maximum since the server rejects larger values.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::config::PlaybackConfig;
use crate::transport::SessionTransport;
use crate::{NegotiationError, Result};

/// Requested bitrate ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BitrateCeiling {
    /// Measure throughput with a probe download
    Auto,
    /// Fixed ceiling in bits per second
    Fixed(u64),
}

impl std::fmt::Display for BitrateCeiling {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Fixed(bps) => write!(f, "{bps}"),
        }
    }
}

impl std::str::FromStr for BitrateCeiling {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("auto") {
            return Ok(Self::Auto);
        }

        s.parse::<u64>().map(Self::Fixed).map_err(|_| {
            format!("Invalid bitrate: '{s}'. Expected 'auto' or bits per second")
        })
    }
}

/// Resolves the effective bitrate ceiling for one negotiation.
///
/// Holds no state between calls: every auto-mode resolution probes again.
pub struct BitrateEstimator {
    transport: Arc<dyn SessionTransport>,
    probe_size_bytes: u64,
    max_bitrate: u64,
}

impl BitrateEstimator {
    /// Creates an estimator probing with `probe_size_bytes` and clamping to `max_bitrate`.
    pub fn new(
        transport: Arc<dyn SessionTransport>,
        probe_size_bytes: u64,
        max_bitrate: u64,
    ) -> Self {
        Self {
            transport,
            probe_size_bytes,
            max_bitrate,
        }
    }

    /// Creates an estimator from playback settings.
    pub fn from_config(transport: Arc<dyn SessionTransport>, config: &PlaybackConfig) -> Self {
        Self::new(transport, config.probe_size_bytes, config.max_bitrate)
    }

    /// Resolves `requested` into bits per second.
    ///
    /// # Errors
    /// - `NegotiationError::Configuration` - Auto mode with a zero probe size (no request is sent)
    /// - `NegotiationError::Network` - Probe download failed
    /// - `NegotiationError::Protocol` - Probe body was empty
    pub async fn resolve(&self, requested: BitrateCeiling) -> Result<u64> {
        match requested {
            BitrateCeiling::Fixed(bps) => Ok(bps),
            BitrateCeiling::Auto => self.probe().await,
        }
    }

    async fn probe(&self) -> Result<u64> {
        if self.probe_size_bytes == 0 {
            return Err(NegotiationError::Configuration {
                reason: "Bitrate probe size must be greater than zero".to_string(),
            });
        }

        let started = Instant::now();
        let received = self.transport.download_probe(self.probe_size_bytes).await?;
        let elapsed = started.elapsed();

        if received == 0 {
            return Err(NegotiationError::protocol("Bitrate probe returned no data"));
        }
        if received < self.probe_size_bytes {
            tracing::warn!(
                "Bitrate probe body ended early: {} of {} bytes",
                received,
                self.probe_size_bytes
            );
        }

        // Rate over the bytes that actually arrived.
        let bitrate = Self::compute_bitrate(received, elapsed, self.max_bitrate);
        tracing::debug!(
            "Bitrate probe: {} bytes in {:?} -> {} bps (max {})",
            received,
            elapsed,
            bitrate,
            self.max_bitrate
        );

        Ok(bitrate)
    }

    /// Throughput of `size_bytes` over `elapsed`, clamped to `max_bitrate`.
    ///
    /// A zero elapsed time means the probe finished faster than the clock can
    /// measure, which clamps to the maximum.
    pub(crate) fn compute_bitrate(size_bytes: u64, elapsed: Duration, max_bitrate: u64) -> u64 {
        let seconds = elapsed.as_secs_f64();
        if seconds <= 0.0 {
            return max_bitrate;
        }

        let bitrate = (size_bytes as f64 * 8.0) / seconds;
        if !bitrate.is_finite() || bitrate >= max_bitrate as f64 {
            return max_bitrate;
        }

        bitrate as u64
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::testing::ScriptedTransport;

    const MAX: u64 = 360_000_000;

    #[tokio::test(start_paused = true)]
    async fn test_auto_measures_probe_throughput() {
        let transport = Arc::new(ScriptedTransport::new().with_probe_delay(Duration::from_secs(2)));
        let estimator = BitrateEstimator::new(transport.clone(), 1_000_000, MAX);

        let bitrate = estimator.resolve(BitrateCeiling::Auto).await.unwrap();

        assert_eq!(bitrate, 4_000_000);
        assert_eq!(transport.probe_sizes(), vec![1_000_000]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_clamps_to_maximum() {
        let transport =
            Arc::new(ScriptedTransport::new().with_probe_delay(Duration::from_millis(1)));
        let estimator = BitrateEstimator::new(transport, 5_000_000, 20_000_000);

        let bitrate = estimator.resolve(BitrateCeiling::Auto).await.unwrap();
        assert_eq!(bitrate, 20_000_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_payload_measures_received_bytes() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .with_probe_delay(Duration::from_secs(1))
                .with_probe_body_len(500_000),
        );
        let estimator = BitrateEstimator::new(transport, 1_000_000, MAX);

        let bitrate = estimator.resolve(BitrateCeiling::Auto).await.unwrap();
        assert_eq!(bitrate, 4_000_000);
    }

    #[tokio::test]
    async fn test_empty_payload_is_protocol_error() {
        let transport = Arc::new(ScriptedTransport::new().with_probe_body_len(0));
        let estimator = BitrateEstimator::new(transport, 1_000, MAX);

        let result = estimator.resolve(BitrateCeiling::Auto).await;
        assert!(matches!(result, Err(NegotiationError::Protocol { .. })));
    }

    #[tokio::test]
    async fn test_auto_probes_on_every_call() {
        let transport = Arc::new(ScriptedTransport::new());
        let estimator = BitrateEstimator::new(transport.clone(), 1_000, MAX);

        estimator.resolve(BitrateCeiling::Auto).await.unwrap();
        estimator.resolve(BitrateCeiling::Auto).await.unwrap();

        assert_eq!(transport.probe_count(), 2);
    }

    #[tokio::test]
    async fn test_zero_probe_size_rejected_before_network() {
        let transport = Arc::new(ScriptedTransport::new());
        let estimator = BitrateEstimator::new(transport.clone(), 0, MAX);

        let result = estimator.resolve(BitrateCeiling::Auto).await;

        assert!(matches!(
            result,
            Err(NegotiationError::Configuration { .. })
        ));
        assert_eq!(transport.probe_count(), 0);
    }

    #[tokio::test]
    async fn test_probe_failure_is_network_error() {
        let transport = Arc::new(ScriptedTransport::new().with_probe_failure());
        let estimator = BitrateEstimator::new(transport, 1_000, MAX);

        let error = estimator.resolve(BitrateCeiling::Auto).await.unwrap_err();
        assert!(error.is_network_error());
    }

    #[test]
    fn test_compute_bitrate_zero_elapsed_clamps() {
        assert_eq!(
            BitrateEstimator::compute_bitrate(1_000, Duration::ZERO, MAX),
            MAX
        );
    }

    #[test]
    fn test_bitrate_ceiling_parsing() {
        assert_eq!("auto".parse::<BitrateCeiling>(), Ok(BitrateCeiling::Auto));
        assert_eq!("AUTO".parse::<BitrateCeiling>(), Ok(BitrateCeiling::Auto));
        assert_eq!(
            "8000000".parse::<BitrateCeiling>(),
            Ok(BitrateCeiling::Fixed(8_000_000))
        );
        assert!("fast".parse::<BitrateCeiling>().is_err());
        assert_eq!(BitrateCeiling::Fixed(42).to_string(), "42");
    }

    proptest! {
        #[test]
        fn prop_fixed_ceiling_passes_through(bps in any::<u64>()) {
            let transport = Arc::new(ScriptedTransport::new());
            let estimator = BitrateEstimator::new(transport.clone(), 1_000, MAX);

            let resolved = tokio_test::block_on(estimator.resolve(BitrateCeiling::Fixed(bps)));

            prop_assert_eq!(resolved.unwrap(), bps);
            prop_assert_eq!(transport.probe_count(), 0);
        }

        #[test]
        fn prop_computed_bitrate_never_exceeds_max(
            size in 1u64..=u64::from(u32::MAX),
            nanos in 0u64..=10_000_000_000,
            max in 1u64..=1_000_000_000,
        ) {
            let bitrate =
                BitrateEstimator::compute_bitrate(size, Duration::from_nanos(nanos), max);
            prop_assert!(bitrate <= max);
        }
    }
}
