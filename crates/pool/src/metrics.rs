//! Metrics recording for pool events.
//!
//! Counters and histograms go through the `metrics` crate when the
//! `metrics` feature is enabled; otherwise every recorder is a no-op.
//! Labels carry the pool name so several pools can share one exporter.

use std::time::Duration;

#[cfg(feature = "metrics")]
pub(crate) fn acquired(pool: &str, waited: Duration) {
    metrics::counter!("loanpool.acquire.total", "pool" => pool.to_owned()).increment(1);
    metrics::histogram!("loanpool.acquire.wait_seconds", "pool" => pool.to_owned())
        .record(waited.as_secs_f64());
}

#[cfg(feature = "metrics")]
pub(crate) fn released(pool: &str, held: Duration) {
    metrics::counter!("loanpool.release.total", "pool" => pool.to_owned()).increment(1);
    metrics::histogram!("loanpool.usage.duration_seconds", "pool" => pool.to_owned())
        .record(held.as_secs_f64());
}

#[cfg(feature = "metrics")]
pub(crate) fn exhausted(pool: &str) {
    metrics::counter!("loanpool.exhausted.total", "pool" => pool.to_owned()).increment(1);
}

#[cfg(feature = "metrics")]
pub(crate) fn recreated(pool: &str) {
    metrics::counter!("loanpool.recreated.total", "pool" => pool.to_owned()).increment(1);
}

#[cfg(feature = "metrics")]
pub(crate) fn create_failed(pool: &str) {
    metrics::counter!("loanpool.create_failed.total", "pool" => pool.to_owned()).increment(1);
}

#[cfg(not(feature = "metrics"))]
pub(crate) fn acquired(_pool: &str, _waited: Duration) {}

#[cfg(not(feature = "metrics"))]
pub(crate) fn released(_pool: &str, _held: Duration) {}

#[cfg(not(feature = "metrics"))]
pub(crate) fn exhausted(_pool: &str) {}

#[cfg(not(feature = "metrics"))]
pub(crate) fn recreated(_pool: &str) {}

#[cfg(not(feature = "metrics"))]
pub(crate) fn create_failed(_pool: &str) {}
