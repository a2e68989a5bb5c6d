//! Prometheus metrics for foulbot.
//!
//! The [`BotMetrics`] struct owns a dedicated [`Registry`] that the console
//! `metrics` command and the shutdown summary encode into the Prometheus text
//! exposition format.

use prometheus::{
    register_histogram_with_registry, register_int_counter_with_registry, Encoder, Histogram,
    HistogramOpts, IntCounter, Opts, Registry, TextEncoder,
};

use crate::BotError;

/// Central collection of all bot-level Prometheus metrics.
pub struct BotMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Polls persisted.
    pub polls_created: IntCounter,
    /// Votes upserted, including changed votes.
    pub votes_recorded: IntCounter,
    /// Polls finalized as passed.
    pub polls_passed: IntCounter,
    /// Polls finalized as failed.
    pub polls_failed: IntCounter,
    /// Sweeps that failed or timed out as a whole.
    pub sweep_failures: IntCounter,
    /// Outbound chat calls that failed.
    pub adapter_failures: IntCounter,
    /// Creation requests refused by the creator cooldown.
    pub cooldown_rejections: IntCounter,

    // ── Histograms ──────────────────────────────────────────────────────
    /// Wall time of one expiry sweep, in milliseconds.
    pub sweep_duration_ms: Histogram,
}

impl BotMetrics {
    /// Create a fresh set of metrics, all registered under a new
    /// [`Registry`].
    pub fn new() -> Self {
        let registry = Registry::new();

        let polls_created = register_int_counter_with_registry!(
            Opts::new("foulbot_polls_created_total", "Total polls created"),
            registry
        )
        .expect("failed to register polls_created counter");

        let votes_recorded = register_int_counter_with_registry!(
            Opts::new("foulbot_votes_recorded_total", "Total votes recorded"),
            registry
        )
        .expect("failed to register votes_recorded counter");

        let polls_passed = register_int_counter_with_registry!(
            Opts::new("foulbot_polls_passed_total", "Total polls that passed"),
            registry
        )
        .expect("failed to register polls_passed counter");

        let polls_failed = register_int_counter_with_registry!(
            Opts::new("foulbot_polls_failed_total", "Total polls that failed"),
            registry
        )
        .expect("failed to register polls_failed counter");

        let sweep_failures = register_int_counter_with_registry!(
            Opts::new(
                "foulbot_sweep_failures_total",
                "Expiry sweeps that failed or timed out"
            ),
            registry
        )
        .expect("failed to register sweep_failures counter");

        let adapter_failures = register_int_counter_with_registry!(
            Opts::new(
                "foulbot_adapter_failures_total",
                "Outbound chat operations that failed"
            ),
            registry
        )
        .expect("failed to register adapter_failures counter");

        let cooldown_rejections = register_int_counter_with_registry!(
            Opts::new(
                "foulbot_cooldown_rejections_total",
                "Poll creations refused by the creator cooldown"
            ),
            registry
        )
        .expect("failed to register cooldown_rejections counter");

        // Exponential buckets covering 1 ms → ~16 s.
        let sweep_duration_ms = register_histogram_with_registry!(
            HistogramOpts::new(
                "foulbot_sweep_duration_ms",
                "Expiry sweep duration in milliseconds"
            )
            .buckets(prometheus::exponential_buckets(1.0, 2.0, 15).unwrap_or_default()),
            registry
        )
        .expect("failed to register sweep_duration_ms histogram");

        Self {
            registry,
            polls_created,
            votes_recorded,
            polls_passed,
            polls_failed,
            sweep_failures,
            adapter_failures,
            cooldown_rejections,
            sweep_duration_ms,
        }
    }

    /// Render every metric in the Prometheus text format.
    pub fn encode(&self) -> Result<String, BotError> {
        let mut buf = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buf)
            .map_err(|e| BotError::Metrics(e.to_string()))?;
        String::from_utf8(buf).map_err(|e| BotError::Metrics(e.to_string()))
    }
}

impl Default for BotMetrics {
    fn default() -> Self {
        Self::new()
    }
}
