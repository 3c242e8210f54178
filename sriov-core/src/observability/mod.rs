//! Observability: structured logging and metrics.
//!
//! The library only emits `tracing` events and `metrics` counters. Installing
//! an exporter is left to the embedding process.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub mod metrics;

/// Install a global `tracing` subscriber and describe the crate's metrics.
///
/// Filtering follows `RUST_LOG`, defaulting to `info`. Calling this when a
/// subscriber is already installed leaves the existing one in place.
pub fn init() {
    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(true).with_level(true));

    if subscriber.try_init().is_ok() {
        tracing::debug!("Observability initialized");
    }

    metrics::register_metrics();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_repeatable() {
        init();
        init();
        metrics::record_vf_entry_skipped();
    }
}
