//! Utility functions for common operations

use crate::types::{LoadScoreParams, MetricSample};

/// Create a sample from the three signals that drive the load score,
/// with neutral values for the rest
pub fn simple_sample(
    timestamp: u64,
    cpu_pct: f64,
    mem_pct: f64,
    response_time_ms: f64,
    params: &LoadScoreParams,
) -> MetricSample {
    MetricSample::new(
        timestamp,
        cpu_pct,
        mem_pct,
        50.0,
        0,
        0,
        response_time_ms,
        0,
        params,
    )
}

/// Create a sample whose load score equals `load` exactly, useful for
/// driving the pipeline with a known signal
pub fn sample_with_load(timestamp: u64, load: f64) -> MetricSample {
    // With default params, cpu == mem == response score == load gives
    // 0.4*load + 0.3*load + 0.3*load == load
    let params = LoadScoreParams::default();
    let response_time_ms = load / 100.0 * params.response_ceiling_ms;
    simple_sample(timestamp, load, load, response_time_ms, &params)
}

/// Get current Unix timestamp
pub fn current_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
